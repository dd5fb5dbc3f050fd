//! # track-core: Pure Business Logic for Track-Time Billing
//!
//! This crate is the heart of the billing engine. It contains all business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 Operator terminals / callers                     │
//! │        open ─ pause ─ resume ─ attach ─ close ─ cancel           │
//! └───────────────────────────────┬──────────────────────────────────┘
//! │                               │
//! ┌───────────────────────────────▼──────────────────────────────────┐
//! │                    track-engine (state machine)                  │
//! │       transition guards, inventory ledger, audit commits         │
//! └───────────────────────────────┬──────────────────────────────────┘
//! │                               │
//! ┌───────────────────────────────▼──────────────────────────────────┐
//! │                  ★ track-core (THIS CRATE) ★                     │
//! │                                                                  │
//! │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌──────────┐ ┌────────┐  │
//! │   │  types  │ │  money  │ │   rate   │ │ discount │ │ valid. │  │
//! │   │ Ticket  │ │  Money  │ │ TimeCharge│ │  tiers  │ │ checks │  │
//! │   └─────────┘ └─────────┘ └──────────┘ └──────────┘ └────────┘  │
//! │                                                                  │
//! │   NO I/O • NO CLOCK • NO STORAGE • PURE FUNCTIONS                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Ticket, RateDefinition, ServiceCatalogEntry, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`rate`] - The pure rate calculation (minutes → chargeable minutes → cost)
//! - [`discount`] - Membership discounts applied to the time subtotal
//! - [`error`] - Validation error types
//! - [`validation`] - Input shape checks
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output; timestamps are arguments,
//!    never read from a clock
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64), half-up rounding
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod money;
pub mod rate;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{ValidationError, ValidationResult};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum party size on a single ticket.
///
/// ## Business Reason
/// Prevents typo-sized parties (e.g. 100 instead of 10); the track
/// physically holds far fewer drivers.
pub const MAX_PARTY_SIZE: i64 = 50;

/// Absolute ceiling on a single service line quantity.
///
/// ## Business Reason
/// Catalog entries carry their own `max_per_ticket`; this is the hard
/// upper bound used when a service declares none.
pub const MAX_SERVICE_QUANTITY: i64 = 99;

/// Default block size for the standard rounding policy, in minutes.
pub const DEFAULT_BLOCK_MINUTES: i64 = 15;

/// Default grace window at the end of a block, in minutes.
pub const DEFAULT_GRACE_MINUTES: i64 = 5;

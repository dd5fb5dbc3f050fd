//! # Engine Error Types
//!
//! The typed failure taxonomy of the billing engine.
//!
//! ## Error Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                             │
//! │                                                                  │
//! │  StoreError (collaborator failure, stale CAS)                    │
//! │       │                                                          │
//! │       ▼                                                          │
//! │  EngineError (this module) ← business-rule failures join here    │
//! │       │                                                          │
//! │       ▼                                                          │
//! │  Caller decides: surface, retry with new input, or give up.      │
//! │  The engine itself never retries and never partially applies.    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is fatal to the process: every error is scoped to a
//! single ticket or service operation.

use thiserror::Error;
use track_core::{TicketState, ValidationError};

// =============================================================================
// Engine Error
// =============================================================================

/// Failures of the five primary operations (and their guards).
///
/// All variants are surfaced to the caller as-is; none are retried by the
/// engine. `NoOpenPause` and `AlreadyPaused` are defensive: the state
/// machine's own guards make them unreachable, so observing one in the
/// wild means a bug (or an out-of-band write to the store).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Attempted transition is not legal from the ticket's current state.
    ///
    /// ## When This Occurs
    /// - Pause on a non-active ticket, resume on a non-paused one
    /// - Close/cancel/attach on a terminal ticket
    /// - Losing a concurrent race: the other operator's transition
    ///   committed first and the state moved on
    #[error("ticket {ticket_id} is {state}, operation not allowed")]
    InvalidTransition {
        ticket_id: String,
        state: TicketState,
    },

    /// The rate supplied at open time does not exist, is inactive, or is
    /// outside its applicability window. Configuration issue.
    #[error("no usable rate definition for new tickets")]
    NoActiveRate,

    /// Stock exhausted (genuinely, or by a concurrent reservation).
    /// The caller may retry with an adjusted quantity; the engine won't.
    #[error("insufficient stock for {service}: available {available}, requested {requested}")]
    InsufficientStock {
        service: String,
        available: i64,
        requested: i64,
    },

    /// Quantity exceeds the service's per-ticket maximum.
    #[error("quantity {requested} exceeds maximum per ticket ({max})")]
    MaxQuantityExceeded { requested: i64, max: i64 },

    /// Cancellation requires a non-empty reason.
    #[error("cancellation reason must not be empty")]
    EmptyCancelReason,

    /// No open pause interval exists to close (defensive).
    #[error("ticket {ticket_id} has no open pause interval")]
    NoOpenPause { ticket_id: String },

    /// An open pause interval already exists (defensive).
    #[error("ticket {ticket_id} already has an open pause interval")]
    AlreadyPaused { ticket_id: String },

    /// The caller's capability set does not allow the operation.
    #[error("caller is not permitted to {action}")]
    NotPermitted { action: String },

    /// Ticket cannot be found.
    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    /// Client cannot be found.
    #[error("client not found: {0}")]
    ClientNotFound(String),

    /// Service cannot be found (or is inactive).
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// Input validation failed before any business logic ran.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The persistence collaborator failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Shorthand for the transition guard failure.
    pub fn invalid_transition(ticket_id: impl Into<String>, state: TicketState) -> Self {
        EngineError::InvalidTransition {
            ticket_id: ticket_id.into(),
            state,
        }
    }
}

// =============================================================================
// Store Error
// =============================================================================

/// Failures of the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found in the store.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A compare-and-set write lost: the guarded field no longer holds
    /// the expected value. The engine maps this to `InvalidTransition`
    /// (ticket state) or a reserve retry (stock).
    #[error("stale state for {entity} {id}")]
    StaleState { entity: String, id: String },

    /// The audit sink could not accept the record. Per the audit
    /// contract the whole commit must fail, never silently drop the
    /// trail.
    #[error("audit sink unavailable: {0}")]
    AuditUnavailable(String),

    /// Anything else the backing store reports.
    #[error("store failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a StaleState error for a given entity type and ID.
    pub fn stale(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::StaleState {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Result Aliases
// =============================================================================

/// Convenience alias for engine operation results.
pub type EngineResult<T> = Result<T, EngineError>;

/// Convenience alias for store operation results.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

//! # track-engine: Ticket Lifecycle & Time-Billing Engine
//!
//! The stateful half of the system: drives tickets through their
//! lifecycle, serializes concurrent operators, keeps tracked stock
//! consistent, and leaves an audit record for every committed change.
//! All money math and rate policy live in `track-core`; this crate only
//! orchestrates.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Track Rental Billing Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │             Operator surface (POS terminal, API, ...)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ track-engine (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  engine   │  │  ledger   │  │   audit   │  │ identity  │  │   │
//! │  │   │ lifecycle │  │ stock CAS │  │  records  │  │  callers  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   collaborators, injected:   EngineStore  +  Clock              │   │
//! │  └──────────┬──────────────────────────────────────────┬──────────┘   │
//! │             │                                          │               │
//! │  ┌──────────▼──────────┐                   ┌───────────▼───────────┐  │
//! │  │     track-core      │                   │  store implementation │  │
//! │  │  rates, money, ...  │                   │  (in-memory / SQL)    │  │
//! │  └─────────────────────┘                   └───────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - The [`engine::TicketEngine`] aggregate and its operations
//! - [`store`] - The persistence collaborator contract ([`store::EngineStore`])
//! - [`memory`] - In-memory reference store, mutex-per-commit
//! - [`ledger`] - Atomic stock reserve/release over the store's CAS
//! - [`audit`] - Audit records and structured detail payloads
//! - [`clock`] - Injected time source ([`clock::SystemClock`], [`clock::ManualClock`])
//! - [`identity`] - Callers, roles, capabilities
//! - [`error`] - [`error::EngineError`] / [`error::StoreError`]
//!
//! ## Guarantees
//!
//! 1. **Per-ticket serialization**: every commit is compare-and-set on the
//!    ticket state; racing operators get exactly one winner
//! 2. **No partial writes**: ticket row, pause bookkeeping, stock returns
//!    and the audit record land together or not at all
//! 3. **Stock never negative**: reservations go through the inventory
//!    ledger's per-service CAS loop
//! 4. **Deterministic billing**: time comes from the injected clock only

pub mod audit;
pub mod clock;
pub mod engine;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod memory;
pub mod store;

pub use audit::{AuditAction, AuditRecord};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{OpenTicket, TicketEngine};
pub use error::{EngineError, EngineResult, StoreError, StoreResult};
pub use identity::{Caller, CapabilitySet, Role};
pub use ledger::InventoryLedger;
pub use memory::InMemoryStore;
pub use store::{EngineStore, PauseOp, StockDisposition};

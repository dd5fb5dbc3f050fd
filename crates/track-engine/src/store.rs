//! # Persistence Collaborator Contract
//!
//! The engine does not implement durable storage; it talks to whatever
//! does through this trait. The contract is deliberately narrow: entity
//! reads plus a small set of **atomic commit** operations.
//!
//! ## Commit Contracts
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  commit_transition                                               │
//! │    guard:  ticket.state == expected   (compare-and-set)          │
//! │    write:  full ticket row                                       │
//! │          + optional pause open/close                             │
//! │          + tracked-stock returns per disposition (cancel)        │
//! │          + ONE audit record                                      │
//! │    all-or-nothing; guard failure → StoreError::StaleState        │
//! │                                                                  │
//! │  commit_service_line                                             │
//! │    guard:  ticket.state is open (active | paused)                │
//! │    write:  service line + ONE audit record                       │
//! │                                                                  │
//! │  compare_and_swap_stock                                          │
//! │    write:  stock := new  iff  stock == expected                  │
//! │    returns whether the swap won                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The compare-and-set guards are how per-ticket serialization works:
//! two operators racing to close and cancel the same ticket both load it
//! as `active`, but only the first commit finds the guard still true.
//! A SQL implementation maps each guard to a conditional UPDATE
//! (`... WHERE id = ? AND state = ?`) checked via rows-affected; the
//! in-memory reference implementation holds one mutex across the commit.
//!
//! Stock returns on cancel are resolved by the store from the lines
//! present AT COMMIT TIME, never from a list the caller read earlier.
//! A caller-supplied list would race with a concurrent attach: the
//! cancel could snapshot an empty line set, the attach could reserve
//! stock and commit its line while the ticket is still open, and the
//! cancel commit would then win the state CAS without returning the
//! freshly reserved unit. Resolving inside the commit closes that
//! window: a line is either visible to the cancel commit (stock comes
//! back) or its own commit finds the ticket terminal and fails.
//!
//! Audit records ride inside every commit. A store that cannot append
//! the record MUST fail the whole commit (`StoreError::AuditUnavailable`)
//! rather than apply the mutation without its trail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use track_core::{
    Client, PauseInterval, RateDefinition, ServiceCatalogEntry, Ticket, TicketServiceLine,
    TicketState,
};

use crate::audit::AuditRecord;
use crate::error::StoreResult;

// =============================================================================
// Commit Payload Types
// =============================================================================

/// Pause bookkeeping attached to a transition commit.
#[derive(Debug, Clone)]
pub enum PauseOp {
    /// Insert a new open interval (pause).
    Open(PauseInterval),
    /// Set `ended_at` on an existing open interval (resume, or close
    /// clamping a still-open pause).
    Close {
        pause_id: String,
        ended_at: DateTime<Utc>,
    },
}

/// What happens to reserved stock when a transition commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDisposition {
    /// Stock stays where it is. Pause, resume, and close (rented
    /// inventory is consumed by the visit).
    Keep,
    /// Return the quantity of every inventory-tracked line to its
    /// service's stock. Cancel only. The store resolves the lines at
    /// commit time, inside the same atomic scope as the state guard.
    ReturnTracked,
}

// =============================================================================
// Engine Store Trait
// =============================================================================

/// The persistence collaborator.
///
/// Implementations must make each `commit_*` method atomic: either the
/// whole set of writes (including the audit record) lands, or none of it
/// does.
#[async_trait]
pub trait EngineStore: Send + Sync {
    // ---- reads ----------------------------------------------------------

    async fn fetch_ticket(&self, id: &str) -> StoreResult<Option<Ticket>>;
    async fn fetch_client(&self, id: &str) -> StoreResult<Option<Client>>;
    async fn fetch_rate(&self, id: &str) -> StoreResult<Option<RateDefinition>>;
    async fn fetch_service(&self, id: &str) -> StoreResult<Option<ServiceCatalogEntry>>;

    /// All pause intervals of a ticket, oldest first.
    async fn pauses_for(&self, ticket_id: &str) -> StoreResult<Vec<PauseInterval>>;

    /// All service lines of a ticket, oldest first.
    async fn lines_for(&self, ticket_id: &str) -> StoreResult<Vec<TicketServiceLine>>;

    // ---- commits --------------------------------------------------------

    /// Inserts a freshly opened ticket together with its audit record.
    async fn insert_ticket(&self, ticket: &Ticket, audit: &AuditRecord) -> StoreResult<()>;

    /// Writes the ticket iff its stored state equals `expected`, applying
    /// the optional pause operation and the stock disposition in the same
    /// commit. With [`StockDisposition::ReturnTracked`] the store resolves
    /// the ticket's inventory-tracked lines itself, from the state it
    /// holds at commit time.
    ///
    /// Fails with [`crate::error::StoreError::StaleState`] when the guard
    /// does not hold (the transition lost a race).
    async fn commit_transition(
        &self,
        ticket: &Ticket,
        expected: TicketState,
        pause_op: Option<PauseOp>,
        stock: StockDisposition,
        audit: &AuditRecord,
    ) -> StoreResult<()>;

    /// Inserts a service line iff the ticket is still in an open state.
    async fn commit_service_line(
        &self,
        line: &TicketServiceLine,
        audit: &AuditRecord,
    ) -> StoreResult<()>;

    /// Atomically sets a tracked service's stock to `new` iff it
    /// currently equals `expected`. Returns whether the swap won.
    ///
    /// This is the primitive the inventory ledger builds its retry loop
    /// on; it must be linearizable per service id.
    async fn compare_and_swap_stock(
        &self,
        service_id: &str,
        expected: i64,
        new: i64,
    ) -> StoreResult<bool>;
}

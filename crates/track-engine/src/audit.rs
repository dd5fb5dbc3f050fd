//! # Audit Records
//!
//! Every committed state change emits exactly one audit record, appended
//! by the store **in the same commit** as the mutation. If the record
//! cannot be appended, the whole operation fails; the trail is never
//! best-effort.
//!
//! The `detail` payload is structured JSON. For a close it carries the
//! complete monetary breakdown, so the bill can be reconstructed later
//! without re-running the rate calculation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use track_core::{Bill, PaymentMethod};

use crate::identity::Caller;

// =============================================================================
// Audit Action
// =============================================================================

/// What happened. One variant per state-changing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    TicketOpened,
    TicketPaused,
    TicketResumed,
    ServiceAttached,
    TicketClosed,
    TicketCancelled,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditAction::TicketOpened => "ticket_opened",
            AuditAction::TicketPaused => "ticket_paused",
            AuditAction::TicketResumed => "ticket_resumed",
            AuditAction::ServiceAttached => "service_attached",
            AuditAction::TicketClosed => "ticket_closed",
            AuditAction::TicketCancelled => "ticket_cancelled",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Audit Record
// =============================================================================

/// An immutable log entry: who did what to which entity, with enough
/// structured detail to reconstruct the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    /// User id of the acting caller.
    pub actor: String,
    pub action: AuditAction,
    /// Entity kind, e.g. "ticket".
    pub entity_type: String,
    pub entity_id: String,
    /// Structured payload; shape depends on the action.
    pub detail: Value,
    pub at: DateTime<Utc>,
}

impl AuditRecord {
    /// Builds a record for a ticket-scoped action.
    pub fn for_ticket(
        caller: &Caller,
        action: AuditAction,
        ticket_id: impl Into<String>,
        detail: Value,
        at: DateTime<Utc>,
    ) -> Self {
        AuditRecord {
            id: uuid::Uuid::new_v4().to_string(),
            actor: caller.user_id.clone(),
            action,
            entity_type: "ticket".to_string(),
            entity_id: ticket_id.into(),
            detail,
            at,
        }
    }
}

// =============================================================================
// Detail Builders
// =============================================================================

/// Close detail: the full monetary breakdown.
pub fn close_detail(code: &str, bill: &Bill, payment_method: PaymentMethod) -> Value {
    json!({
        "code": code,
        "real_minutes": bill.time.real_minutes,
        "chargeable_minutes": bill.time.chargeable_minutes,
        "time_cents": bill.time.time_cents,
        "discount_percent": bill.discount_percent,
        "time_cents_after_discount": bill.time_cents_after_discount,
        "services_cents": bill.services_cents,
        "total_cents": bill.total_cents,
        "payment_method": payment_method.to_string(),
    })
}

/// Attach detail: quantity and the stock level the reservation left.
pub fn attach_detail(
    service_name: &str,
    quantity: i64,
    line_total_cents: i64,
    remaining_stock: Option<i64>,
) -> Value {
    json!({
        "service": service_name,
        "quantity": quantity,
        "line_total_cents": line_total_cents,
        "remaining_stock": remaining_stock,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

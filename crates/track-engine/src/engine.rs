//! # Ticket Engine
//!
//! The aggregate: owns ticket state transitions, composes the pause
//! bookkeeping, the rate calculation, and the inventory ledger, and
//! emits one audit record per committed mutation.
//!
//! ## Operation Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Ticket Lifecycle                             │
//! │                                                                  │
//! │  1. OPEN                                                         │
//! │     └── open() → Ticket { state: Active }, code TKT-…            │
//! │                                                                  │
//! │  2. TRACK TIME                                                   │
//! │     └── pause() / resume()  (any number of times)                │
//! │     └── attach_service()    (reserves stock if tracked)          │
//! │     └── preview()           (read-only running cost)             │
//! │                                                                  │
//! │  3. CLOSE (bill & pay)                                           │
//! │     └── close() → rate calc + discount + services = total        │
//! │         (Also writes the audit breakdown in the same commit)     │
//! │                                                                  │
//! │  3'. CANCEL (visit never happened)                               │
//! │     └── cancel() → reason recorded, tracked stock returned       │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Per-ticket serialization is a compare-and-set on the state field:
//! every commit names the state it loaded, and the store refuses the
//! write if the row moved on. The loser of a close-vs-cancel race sees
//! `InvalidTransition`, never a partial write. Stock is serialized per
//! service id by the [`InventoryLedger`], independently of tickets.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use track_core::rate::compute_time_charge;
use track_core::validation::{validate_party_size, validate_quantity, validate_reason};
use track_core::{
    discount, Bill, Money, PauseInterval, PaymentMethod, Ticket, TicketServiceLine, TicketState,
    ValidationError,
};

use crate::audit::{attach_detail, close_detail, AuditAction, AuditRecord};
use crate::clock::Clock;
use crate::error::{EngineError, EngineResult, StoreError};
use crate::identity::Caller;
use crate::ledger::InventoryLedger;
use crate::store::{EngineStore, PauseOp, StockDisposition};

// =============================================================================
// Open Request
// =============================================================================

/// Input for [`TicketEngine::open`].
///
/// The rate is an explicit parameter, resolved by the caller's policy
/// layer; the engine validates it but never goes hunting for "the
/// current rate" itself.
#[derive(Debug, Clone)]
pub struct OpenTicket {
    pub client_id: String,
    pub party_size: i64,
    pub rate_id: String,
    pub notes: Option<String>,
}

// =============================================================================
// Ticket Engine
// =============================================================================

/// The ticket lifecycle & time-billing engine.
pub struct TicketEngine {
    store: Arc<dyn EngineStore>,
    ledger: InventoryLedger,
    clock: Arc<dyn Clock>,
}

impl TicketEngine {
    pub fn new(store: Arc<dyn EngineStore>, clock: Arc<dyn Clock>) -> Self {
        TicketEngine {
            ledger: InventoryLedger::new(store.clone()),
            store,
            clock,
        }
    }

    // =========================================================================
    // Open
    // =========================================================================

    /// Opens a new ticket in state Active with entry timestamp = now.
    ///
    /// Fails with [`EngineError::NoActiveRate`] if the supplied rate does
    /// not exist, is inactive, or is outside its applicability window.
    pub async fn open(&self, caller: &Caller, req: OpenTicket) -> EngineResult<Ticket> {
        validate_party_size(req.party_size)?;
        let now = self.clock.now();

        let client = self
            .store
            .fetch_client(&req.client_id)
            .await?
            .ok_or_else(|| EngineError::ClientNotFound(req.client_id.clone()))?;

        let rate = self
            .store
            .fetch_rate(&req.rate_id)
            .await?
            .filter(|r| r.is_usable_at(now))
            .ok_or(EngineError::NoActiveRate)?;

        let ticket = Ticket {
            id: Uuid::new_v4().to_string(),
            code: generate_ticket_code(now),
            client_id: client.id.clone(),
            party_size: req.party_size,
            state: TicketState::Active,
            entered_at: now,
            exited_at: None,
            rate_id: rate.id.clone(),
            opened_by: caller.user_id.clone(),
            closed_by: None,
            billed_minutes: None,
            time_cents: None,
            services_cents: None,
            total_cents: None,
            payment_method: None,
            cancel_reason: None,
            notes: req.notes,
            created_at: now,
            updated_at: now,
        };

        let audit = AuditRecord::for_ticket(
            caller,
            AuditAction::TicketOpened,
            &ticket.id,
            json!({
                "code": ticket.code,
                "client": client.name,
                "party_size": ticket.party_size,
                "rate": rate.name,
            }),
            now,
        );

        self.store.insert_ticket(&ticket, &audit).await?;

        info!(code = %ticket.code, client = %client.name, "ticket opened");
        Ok(ticket)
    }

    // =========================================================================
    // Pause / Resume
    // =========================================================================

    /// Stops the clock. Legal only from Active.
    pub async fn pause(&self, caller: &Caller, ticket_id: &str) -> EngineResult<Ticket> {
        let now = self.clock.now();
        let ticket = self.load(ticket_id).await?;

        if ticket.state != TicketState::Active {
            return Err(EngineError::invalid_transition(ticket_id, ticket.state));
        }

        // Defensive: the state guard makes an existing open interval
        // unreachable, so finding one means the invariant broke upstream
        let pauses = self.store.pauses_for(ticket_id).await?;
        if pauses.iter().any(PauseInterval::is_open) {
            return Err(EngineError::AlreadyPaused {
                ticket_id: ticket_id.to_string(),
            });
        }

        let pause = PauseInterval {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            started_at: now,
            ended_at: None,
            created_at: now,
        };

        let mut updated = ticket;
        updated.state = TicketState::Paused;
        updated.updated_at = now;

        let audit = AuditRecord::for_ticket(
            caller,
            AuditAction::TicketPaused,
            ticket_id,
            json!({ "code": updated.code }),
            now,
        );

        self.commit(
            &updated,
            TicketState::Active,
            Some(PauseOp::Open(pause)),
            StockDisposition::Keep,
            &audit,
        )
        .await?;

        debug!(code = %updated.code, "ticket paused");
        Ok(updated)
    }

    /// Restarts the clock. Legal only from Paused.
    pub async fn resume(&self, caller: &Caller, ticket_id: &str) -> EngineResult<Ticket> {
        let now = self.clock.now();
        let ticket = self.load(ticket_id).await?;

        if ticket.state != TicketState::Paused {
            return Err(EngineError::invalid_transition(ticket_id, ticket.state));
        }

        let pauses = self.store.pauses_for(ticket_id).await?;
        let open = pauses
            .iter()
            .find(|p| p.is_open())
            .ok_or_else(|| EngineError::NoOpenPause {
                ticket_id: ticket_id.to_string(),
            })?;

        let mut updated = ticket;
        updated.state = TicketState::Active;
        updated.updated_at = now;

        let audit = AuditRecord::for_ticket(
            caller,
            AuditAction::TicketResumed,
            ticket_id,
            json!({ "code": updated.code, "paused_minutes": open.minutes_until(now) }),
            now,
        );

        self.commit(
            &updated,
            TicketState::Paused,
            Some(PauseOp::Close {
                pause_id: open.id.clone(),
                ended_at: now,
            }),
            StockDisposition::Keep,
            &audit,
        )
        .await?;

        debug!(code = %updated.code, "ticket resumed");
        Ok(updated)
    }

    // =========================================================================
    // Attach Service
    // =========================================================================

    /// Attaches a quantity of a catalog service to an open ticket,
    /// freezing the unit price. Inventory-tracked services are reserved
    /// atomically first; a reservation whose ticket lost a concurrent
    /// terminal transition is compensated before the error surfaces.
    pub async fn attach_service(
        &self,
        caller: &Caller,
        ticket_id: &str,
        service_id: &str,
        quantity: i64,
    ) -> EngineResult<TicketServiceLine> {
        validate_quantity(quantity)?;
        let now = self.clock.now();
        let ticket = self.load(ticket_id).await?;

        if !ticket.state.is_open() {
            return Err(EngineError::invalid_transition(ticket_id, ticket.state));
        }

        let service = self
            .store
            .fetch_service(service_id)
            .await?
            .filter(|s| s.active)
            .ok_or_else(|| EngineError::ServiceNotFound(service_id.to_string()))?;

        if quantity > service.max_per_ticket {
            return Err(EngineError::MaxQuantityExceeded {
                requested: quantity,
                max: service.max_per_ticket,
            });
        }

        // Reserve before recording: stock is the contended resource
        let remaining = if service.track_inventory {
            Some(
                self.ledger
                    .reserve(service_id, &service.name, quantity)
                    .await?,
            )
        } else {
            None
        };

        let line = TicketServiceLine {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            service_id: service_id.to_string(),
            name_snapshot: service.name.clone(),
            quantity,
            unit_price_cents: service.price_cents,
            line_total_cents: service.price().multiply_quantity(quantity).cents(),
            notes: None,
            created_at: now,
        };

        let audit = AuditRecord::for_ticket(
            caller,
            AuditAction::ServiceAttached,
            ticket_id,
            attach_detail(&service.name, quantity, line.line_total_cents, remaining),
            now,
        );

        if let Err(err) = self.store.commit_service_line(&line, &audit).await {
            // The line never landed; hand the reserved units back, but the
            // commit failure stays the error the caller sees
            if remaining.is_some() {
                if let Err(release_err) = self.ledger.release(service_id, quantity).await {
                    warn!(
                        service_id,
                        quantity,
                        error = %release_err,
                        "stock release after failed line commit also failed"
                    );
                }
            }
            return Err(match err {
                StoreError::StaleState { .. } => self.lost_race(ticket_id).await,
                other => other.into(),
            });
        }

        info!(
            code = %ticket.code,
            service = %service.name,
            quantity,
            "service attached"
        );
        Ok(line)
    }

    // =========================================================================
    // Preview
    // =========================================================================

    /// Read-only running-cost preview of an open ticket. Pure with
    /// respect to the store: no mutation, no audit record.
    pub async fn preview(
        &self,
        ticket_id: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> EngineResult<Bill> {
        let as_of = as_of.unwrap_or_else(|| self.clock.now());
        let ticket = self.load(ticket_id).await?;

        if !ticket.state.is_open() {
            return Err(EngineError::invalid_transition(ticket_id, ticket.state));
        }

        self.bill_for(&ticket, as_of).await
    }

    // =========================================================================
    // Close
    // =========================================================================

    /// Bills the visit and moves the ticket to Closed (terminal).
    ///
    /// A still-open pause is treated as ending at `as_of`, and its end
    /// is persisted in the same commit, so terminal tickets never carry
    /// an open interval. Rented inventory is consumed, not returned.
    pub async fn close(
        &self,
        caller: &Caller,
        ticket_id: &str,
        payment_method: PaymentMethod,
        as_of: Option<DateTime<Utc>>,
    ) -> EngineResult<(Ticket, Bill)> {
        let as_of = as_of.unwrap_or_else(|| self.clock.now());
        let ticket = self.load(ticket_id).await?;

        if !ticket.state.is_open() {
            return Err(EngineError::invalid_transition(ticket_id, ticket.state));
        }

        let bill = self.bill_for(&ticket, as_of).await?;

        let pauses = self.store.pauses_for(ticket_id).await?;
        let pause_op = pauses.iter().find(|p| p.is_open()).map(|p| PauseOp::Close {
            pause_id: p.id.clone(),
            ended_at: as_of,
        });

        let expected = ticket.state;
        let mut updated = ticket;
        updated.state = TicketState::Closed;
        updated.exited_at = Some(as_of);
        updated.closed_by = Some(caller.user_id.clone());
        updated.billed_minutes = Some(bill.time.chargeable_minutes);
        updated.time_cents = Some(bill.time_cents_after_discount);
        updated.services_cents = Some(bill.services_cents);
        updated.total_cents = Some(bill.total_cents);
        updated.payment_method = Some(payment_method);
        updated.updated_at = as_of;

        let audit = AuditRecord::for_ticket(
            caller,
            AuditAction::TicketClosed,
            ticket_id,
            close_detail(&updated.code, &bill, payment_method),
            as_of,
        );

        self.commit(&updated, expected, pause_op, StockDisposition::Keep, &audit)
            .await?;

        info!(
            code = %updated.code,
            total = %Money::from_cents(bill.total_cents),
            method = %payment_method,
            "ticket closed"
        );
        Ok((updated, bill))
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Voids the visit with a reason. Requires the cancel capability.
    /// Stock of every inventory-tracked line is returned in the same
    /// commit; a cancelled visit never happened.
    pub async fn cancel(
        &self,
        caller: &Caller,
        ticket_id: &str,
        reason: &str,
    ) -> EngineResult<Ticket> {
        if !caller.can_cancel() {
            return Err(EngineError::NotPermitted {
                action: "cancel tickets".to_string(),
            });
        }

        let reason = validate_reason(reason).map_err(|err| match err {
            ValidationError::Required { .. } => EngineError::EmptyCancelReason,
            other => EngineError::Validation(other),
        })?;

        let now = self.clock.now();
        let ticket = self.load(ticket_id).await?;

        if !ticket.state.is_open() {
            return Err(EngineError::invalid_transition(ticket_id, ticket.state));
        }

        // A paused ticket's open interval must not survive into a
        // terminal state
        let pauses = self.store.pauses_for(ticket_id).await?;
        let pause_op = pauses.iter().find(|p| p.is_open()).map(|p| PauseOp::Close {
            pause_id: p.id.clone(),
            ended_at: now,
        });

        let expected = ticket.state;
        let mut updated = ticket;
        updated.state = TicketState::Cancelled;
        updated.cancel_reason = Some(reason.clone());
        updated.updated_at = now;

        let audit = AuditRecord::for_ticket(
            caller,
            AuditAction::TicketCancelled,
            ticket_id,
            json!({ "code": updated.code, "reason": reason }),
            now,
        );

        // The store resolves tracked-line returns at commit time, under
        // the same atomic scope as the state guard; a line list read here
        // could miss an attach landing between the read and the commit
        self.commit(
            &updated,
            expected,
            pause_op,
            StockDisposition::ReturnTracked,
            &audit,
        )
        .await?;

        info!(code = %updated.code, "ticket cancelled");
        Ok(updated)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn load(&self, ticket_id: &str) -> EngineResult<Ticket> {
        self.store
            .fetch_ticket(ticket_id)
            .await?
            .ok_or_else(|| EngineError::TicketNotFound(ticket_id.to_string()))
    }

    /// Rate calc + services subtotal + membership discount for one ticket.
    async fn bill_for(&self, ticket: &Ticket, as_of: DateTime<Utc>) -> EngineResult<Bill> {
        let rate = self
            .store
            .fetch_rate(&ticket.rate_id)
            .await?
            .ok_or_else(|| StoreError::not_found("rate", &ticket.rate_id))?;

        // Discount percent is read now, not frozen at open: a membership
        // change mid-visit affects the bill
        let client = self
            .store
            .fetch_client(&ticket.client_id)
            .await?
            .ok_or_else(|| EngineError::ClientNotFound(ticket.client_id.clone()))?;

        let pauses = self.store.pauses_for(&ticket.id).await?;
        let charge = compute_time_charge(ticket.entered_at, as_of, &pauses, &rate);

        let services_cents: i64 = self
            .store
            .lines_for(&ticket.id)
            .await?
            .iter()
            .map(|l| l.line_total_cents)
            .sum();

        Ok(discount::assemble_bill(
            charge,
            services_cents,
            client.discount_percent,
        ))
    }

    /// Commits a transition, translating a lost CAS into the
    /// `InvalidTransition` the racing loser is promised.
    async fn commit(
        &self,
        ticket: &Ticket,
        expected: TicketState,
        pause_op: Option<PauseOp>,
        stock: StockDisposition,
        audit: &AuditRecord,
    ) -> EngineResult<()> {
        match self
            .store
            .commit_transition(ticket, expected, pause_op, stock, audit)
            .await
        {
            Ok(()) => Ok(()),
            Err(StoreError::StaleState { .. }) => Err(self.lost_race(&ticket.id).await),
            Err(other) => Err(other.into()),
        }
    }

    /// The error a caller sees after losing a per-ticket race: the
    /// ticket's actual current state, re-read.
    async fn lost_race(&self, ticket_id: &str) -> EngineError {
        match self.store.fetch_ticket(ticket_id).await {
            Ok(Some(t)) => EngineError::invalid_transition(ticket_id, t.state),
            Ok(None) => EngineError::TicketNotFound(ticket_id.to_string()),
            Err(err) => err.into(),
        }
    }
}

// =============================================================================
// Ticket Codes
// =============================================================================

/// Generates a ticket code in format: TKT-YYYYMMDD-XXXX
///
/// ## Format
/// - YYYYMMDD: entry date (from the injected clock, not the wall clock)
/// - XXXX: random hex suffix for uniqueness without coordination
///
/// ## Example
/// `TKT-20260301-A3F9`
fn generate_ticket_code(now: DateTime<Utc>) -> String {
    let date_part = now.format("%Y%m%d");
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(4)
        .collect::<String>()
        .to_uppercase();
    format!("TKT-{date_part}-{suffix}")
}

// =============================================================================
// Tests
// =============================================================================

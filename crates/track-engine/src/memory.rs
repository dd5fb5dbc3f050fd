//! # In-Memory Store
//!
//! Reference implementation of [`EngineStore`]. One mutex guards the
//! whole state, which makes every commit trivially atomic. The point
//! here is a faithful executable model of the contract (and a test
//! double), not throughput.
//!
//! Seed helpers (`add_client`, `add_rate`, `add_service`) and read-back
//! accessors (`audit_records`) exist for tests and embedding callers.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use track_core::{
    Client, PauseInterval, RateDefinition, ServiceCatalogEntry, Ticket, TicketServiceLine,
    TicketState,
};

use crate::audit::AuditRecord;
use crate::error::{StoreError, StoreResult};
use crate::store::{EngineStore, PauseOp, StockDisposition};

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Default)]
struct Inner {
    tickets: HashMap<String, Ticket>,
    clients: HashMap<String, Client>,
    rates: HashMap<String, RateDefinition>,
    services: HashMap<String, ServiceCatalogEntry>,
    pauses: Vec<PauseInterval>,
    lines: Vec<TicketServiceLine>,
    audits: Vec<AuditRecord>,
    /// When set, every commit fails as if the audit sink were down.
    audit_unavailable: bool,
}

/// In-memory [`EngineStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- seeding --------------------------------------------------------

    pub async fn add_client(&self, client: Client) {
        self.inner.lock().await.clients.insert(client.id.clone(), client);
    }

    pub async fn add_rate(&self, rate: RateDefinition) {
        self.inner.lock().await.rates.insert(rate.id.clone(), rate);
    }

    pub async fn add_service(&self, service: ServiceCatalogEntry) {
        self.inner
            .lock()
            .await
            .services
            .insert(service.id.clone(), service);
    }

    // ---- test instrumentation -------------------------------------------

    /// Simulates the audit sink going down: subsequent commits fail whole.
    pub async fn set_audit_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.audit_unavailable = unavailable;
    }

    /// Snapshot of every audit record appended so far, oldest first.
    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.inner.lock().await.audits.clone()
    }

    fn check_audit(inner: &Inner) -> StoreResult<()> {
        if inner.audit_unavailable {
            return Err(StoreError::AuditUnavailable(
                "audit sink rejected the record".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// EngineStore Implementation
// =============================================================================

#[async_trait]
impl EngineStore for InMemoryStore {
    async fn fetch_ticket(&self, id: &str) -> StoreResult<Option<Ticket>> {
        Ok(self.inner.lock().await.tickets.get(id).cloned())
    }

    async fn fetch_client(&self, id: &str) -> StoreResult<Option<Client>> {
        Ok(self.inner.lock().await.clients.get(id).cloned())
    }

    async fn fetch_rate(&self, id: &str) -> StoreResult<Option<RateDefinition>> {
        Ok(self.inner.lock().await.rates.get(id).cloned())
    }

    async fn fetch_service(&self, id: &str) -> StoreResult<Option<ServiceCatalogEntry>> {
        Ok(self.inner.lock().await.services.get(id).cloned())
    }

    async fn pauses_for(&self, ticket_id: &str) -> StoreResult<Vec<PauseInterval>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .pauses
            .iter()
            .filter(|p| p.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn lines_for(&self, ticket_id: &str) -> StoreResult<Vec<TicketServiceLine>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .lines
            .iter()
            .filter(|l| l.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn insert_ticket(&self, ticket: &Ticket, audit: &AuditRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        Self::check_audit(&inner)?;

        debug!(id = %ticket.id, code = %ticket.code, "inserting ticket");
        inner.tickets.insert(ticket.id.clone(), ticket.clone());
        inner.audits.push(audit.clone());
        Ok(())
    }

    async fn commit_transition(
        &self,
        ticket: &Ticket,
        expected: TicketState,
        pause_op: Option<PauseOp>,
        stock: StockDisposition,
        audit: &AuditRecord,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        Self::check_audit(&inner)?;

        // Guard: compare-and-set on the stored state
        let stored = inner
            .tickets
            .get(&ticket.id)
            .ok_or_else(|| StoreError::not_found("ticket", &ticket.id))?;
        if stored.state != expected {
            return Err(StoreError::stale("ticket", &ticket.id));
        }

        // Validate the pause op before touching anything, so the commit
        // stays all-or-nothing
        if let Some(PauseOp::Close { pause_id, .. }) = &pause_op {
            let open = inner
                .pauses
                .iter()
                .any(|p| &p.id == pause_id && p.ended_at.is_none());
            if !open {
                return Err(StoreError::stale("pause", pause_id));
            }
        }

        debug!(
            id = %ticket.id,
            from = %expected,
            to = %ticket.state,
            "committing ticket transition"
        );

        inner.tickets.insert(ticket.id.clone(), ticket.clone());

        match pause_op {
            Some(PauseOp::Open(pause)) => inner.pauses.push(pause),
            Some(PauseOp::Close { pause_id, ended_at }) => {
                if let Some(p) = inner.pauses.iter_mut().find(|p| p.id == pause_id) {
                    p.ended_at = Some(ended_at);
                }
            }
            None => {}
        }

        if stock == StockDisposition::ReturnTracked {
            // Resolve from the lines this commit can see, under the same
            // lock as the state guard; a line racing in behind this
            // commit finds the ticket terminal and is rejected
            let returns: Vec<(String, i64)> = inner
                .lines
                .iter()
                .filter(|l| l.ticket_id == ticket.id)
                .map(|l| (l.service_id.clone(), l.quantity))
                .collect();
            for (service_id, quantity) in returns {
                if let Some(service) = inner.services.get_mut(&service_id) {
                    if service.track_inventory {
                        if let Some(level) = service.current_stock.as_mut() {
                            *level += quantity;
                        }
                    }
                }
            }
        }

        inner.audits.push(audit.clone());
        Ok(())
    }

    async fn commit_service_line(
        &self,
        line: &TicketServiceLine,
        audit: &AuditRecord,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        Self::check_audit(&inner)?;

        let stored = inner
            .tickets
            .get(&line.ticket_id)
            .ok_or_else(|| StoreError::not_found("ticket", &line.ticket_id))?;
        if !stored.state.is_open() {
            return Err(StoreError::stale("ticket", &line.ticket_id));
        }

        debug!(
            ticket_id = %line.ticket_id,
            service_id = %line.service_id,
            quantity = line.quantity,
            "committing service line"
        );

        inner.lines.push(line.clone());
        inner.audits.push(audit.clone());
        Ok(())
    }

    async fn compare_and_swap_stock(
        &self,
        service_id: &str,
        expected: i64,
        new: i64,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;

        let service = inner
            .services
            .get_mut(service_id)
            .ok_or_else(|| StoreError::not_found("service", service_id))?;

        match service.current_stock {
            Some(stock) if stock == expected => {
                service.current_stock = Some(new);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::Backend(format!(
                "service {service_id} does not track inventory"
            ))),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use track_core::PaymentMethod;

    use crate::audit::AuditAction;
    use crate::identity::{Caller, Role};

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
    }

    fn ticket(id: &str, state: TicketState) -> Ticket {
        Ticket {
            id: id.to_string(),
            code: format!("TKT-{id}"),
            client_id: "c-1".to_string(),
            party_size: 2,
            state,
            entered_at: t0(),
            exited_at: None,
            rate_id: "r-1".to_string(),
            opened_by: "u-1".to_string(),
            closed_by: None,
            billed_minutes: None,
            time_cents: None,
            services_cents: None,
            total_cents: None,
            payment_method: None,
            cancel_reason: None,
            notes: None,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn audit(action: AuditAction, ticket_id: &str) -> AuditRecord {
        let caller = Caller::with_role("u-1", "Op", Role::Operator);
        AuditRecord::for_ticket(&caller, action, ticket_id, Value::Null, t0())
    }

    fn service(id: &str, stock: Option<i64>) -> ServiceCatalogEntry {
        ServiceCatalogEntry {
            id: id.to_string(),
            name: "Rental car".to_string(),
            description: None,
            cost_type: track_core::CostType::Flat,
            price_cents: 2500,
            track_inventory: stock.is_some(),
            current_stock: stock,
            max_per_ticket: 4,
            active: true,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    #[tokio::test]
    async fn test_transition_guard_rejects_stale_state() {
        let store = InMemoryStore::new();
        let t = ticket("t-1", TicketState::Active);
        store
            .insert_ticket(&t, &audit(AuditAction::TicketOpened, "t-1"))
            .await
            .unwrap();

        let mut closed = t.clone();
        closed.state = TicketState::Closed;
        closed.exited_at = Some(t0());
        closed.payment_method = Some(PaymentMethod::Cash);

        // Guard expects Paused but the row is Active → stale
        let res = store
            .commit_transition(
                &closed,
                TicketState::Paused,
                None,
                StockDisposition::Keep,
                &audit(AuditAction::TicketClosed, "t-1"),
            )
            .await;
        assert!(matches!(res, Err(StoreError::StaleState { .. })));

        // Correct expectation wins
        store
            .commit_transition(
                &closed,
                TicketState::Active,
                None,
                StockDisposition::Keep,
                &audit(AuditAction::TicketClosed, "t-1"),
            )
            .await
            .unwrap();

        let stored = store.fetch_ticket("t-1").await.unwrap().unwrap();
        assert_eq!(stored.state, TicketState::Closed);
    }

    #[tokio::test]
    async fn test_stock_cas() {
        let store = InMemoryStore::new();
        store.add_service(service("s-1", Some(3))).await;

        assert!(store.compare_and_swap_stock("s-1", 3, 2).await.unwrap());
        // Stale expectation loses without changing anything
        assert!(!store.compare_and_swap_stock("s-1", 3, 1).await.unwrap());

        let s = store.fetch_service("s-1").await.unwrap().unwrap();
        assert_eq!(s.current_stock, Some(2));
    }

    #[tokio::test]
    async fn test_untracked_service_has_no_stock_to_swap() {
        let store = InMemoryStore::new();
        store.add_service(service("s-2", None)).await;

        let res = store.compare_and_swap_stock("s-2", 0, 1).await;
        assert!(matches!(res, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_audit_unavailable_fails_whole_commit() {
        let store = InMemoryStore::new();
        let t = ticket("t-1", TicketState::Active);
        store
            .insert_ticket(&t, &audit(AuditAction::TicketOpened, "t-1"))
            .await
            .unwrap();

        store.set_audit_unavailable(true).await;

        let mut paused = t.clone();
        paused.state = TicketState::Paused;
        let res = store
            .commit_transition(
                &paused,
                TicketState::Active,
                None,
                StockDisposition::Keep,
                &audit(AuditAction::TicketPaused, "t-1"),
            )
            .await;
        assert!(matches!(res, Err(StoreError::AuditUnavailable(_))));

        // Nothing mutated: ticket still active, no extra audit record
        let stored = store.fetch_ticket("t-1").await.unwrap().unwrap();
        assert_eq!(stored.state, TicketState::Active);
        assert_eq!(store.audit_records().await.len(), 1);
    }

    fn line(ticket_id: &str, service_id: &str, quantity: i64) -> TicketServiceLine {
        TicketServiceLine {
            id: format!("l-{service_id}"),
            ticket_id: ticket_id.to_string(),
            service_id: service_id.to_string(),
            name_snapshot: "Rental car".to_string(),
            quantity,
            unit_price_cents: 2500,
            line_total_cents: 2500 * quantity,
            notes: None,
            created_at: t0(),
        }
    }

    #[tokio::test]
    async fn test_cancel_returns_stock_from_commit_time_lines() {
        let store = InMemoryStore::new();
        store.add_service(service("s-1", Some(1))).await;
        store.add_service(service("s-2", None)).await;
        let t = ticket("t-1", TicketState::Active);
        store
            .insert_ticket(&t, &audit(AuditAction::TicketOpened, "t-1"))
            .await
            .unwrap();

        // Two lines: one tracked (reserved down to 1), one untracked
        store
            .commit_service_line(
                &line("t-1", "s-1", 2),
                &audit(AuditAction::ServiceAttached, "t-1"),
            )
            .await
            .unwrap();
        store
            .commit_service_line(
                &line("t-1", "s-2", 1),
                &audit(AuditAction::ServiceAttached, "t-1"),
            )
            .await
            .unwrap();

        let mut cancelled = t.clone();
        cancelled.state = TicketState::Cancelled;
        cancelled.cancel_reason = Some("rain".to_string());

        store
            .commit_transition(
                &cancelled,
                TicketState::Active,
                None,
                StockDisposition::ReturnTracked,
                &audit(AuditAction::TicketCancelled, "t-1"),
            )
            .await
            .unwrap();

        // The tracked line's quantity came back; the untracked service
        // never had stock to touch
        let s1 = store.fetch_service("s-1").await.unwrap().unwrap();
        assert_eq!(s1.current_stock, Some(3));
        let s2 = store.fetch_service("s-2").await.unwrap().unwrap();
        assert_eq!(s2.current_stock, None);
    }

    #[tokio::test]
    async fn test_keep_disposition_leaves_stock_alone() {
        let store = InMemoryStore::new();
        store.add_service(service("s-1", Some(1))).await;
        let t = ticket("t-1", TicketState::Active);
        store
            .insert_ticket(&t, &audit(AuditAction::TicketOpened, "t-1"))
            .await
            .unwrap();
        store
            .commit_service_line(
                &line("t-1", "s-1", 1),
                &audit(AuditAction::ServiceAttached, "t-1"),
            )
            .await
            .unwrap();

        let mut closed = t.clone();
        closed.state = TicketState::Closed;
        store
            .commit_transition(
                &closed,
                TicketState::Active,
                None,
                StockDisposition::Keep,
                &audit(AuditAction::TicketClosed, "t-1"),
            )
            .await
            .unwrap();

        let s = store.fetch_service("s-1").await.unwrap().unwrap();
        assert_eq!(s.current_stock, Some(1));
    }
}

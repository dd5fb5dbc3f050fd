//! # Inventory Ledger
//!
//! Atomic stock adjustment for inventory-tracked services.
//!
//! ## Why a CAS loop?
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Two terminals attach the last rental car at once:               │
//! │                                                                  │
//! │  A: read stock=1 ──► swap(1→0) ──► WON, line recorded            │
//! │  B: read stock=1 ──► swap(1→0) ──► lost (stock is 0 now)         │
//! │       └──► re-read stock=0 ──► InsufficientStock                 │
//! │                                                                  │
//! │  Serialization is per service id and never blocks other          │
//! │  services or tickets.                                            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Non-tracked services never reach this module. `release` is not
//! idempotent: callers must not double-release. It is only invoked to
//! undo a reservation whose line commit failed; cancel returns happen
//! inside the store's transition commit, not here.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult, StoreError};
use crate::store::EngineStore;

/// Attempts before a reservation gives up under pathological contention.
const MAX_CAS_ATTEMPTS: u32 = 32;

// =============================================================================
// Inventory Ledger
// =============================================================================

/// Per-service atomic reserve/release over the store's stock CAS.
pub struct InventoryLedger {
    store: Arc<dyn EngineStore>,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn EngineStore>) -> Self {
        InventoryLedger { store }
    }

    /// Reserves `quantity` units of a tracked service.
    ///
    /// On success the stock is decremented and the new level returned.
    /// On insufficient remaining stock nothing changes and
    /// [`EngineError::InsufficientStock`] is returned; the engine never
    /// retries on the caller's behalf beyond the CAS interleave loop.
    pub async fn reserve(
        &self,
        service_id: &str,
        service_name: &str,
        quantity: i64,
    ) -> EngineResult<i64> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let service = self
                .store
                .fetch_service(service_id)
                .await?
                .ok_or_else(|| EngineError::ServiceNotFound(service_id.to_string()))?;

            let available = service.current_stock.unwrap_or(0);
            if available < quantity {
                return Err(EngineError::InsufficientStock {
                    service: service_name.to_string(),
                    available,
                    requested: quantity,
                });
            }

            if self
                .store
                .compare_and_swap_stock(service_id, available, available - quantity)
                .await?
            {
                debug!(
                    service_id,
                    quantity,
                    remaining = available - quantity,
                    "stock reserved"
                );
                return Ok(available - quantity);
            }
            // Lost the interleave; re-read and try again
        }

        warn!(service_id, "stock CAS contention exceeded retry budget");
        Err(EngineError::Store(StoreError::Backend(format!(
            "stock contention on service {service_id}"
        ))))
    }

    /// Returns `quantity` units to a tracked service's stock.
    pub async fn release(&self, service_id: &str, quantity: i64) -> EngineResult<()> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let service = self
                .store
                .fetch_service(service_id)
                .await?
                .ok_or_else(|| EngineError::ServiceNotFound(service_id.to_string()))?;

            let current = service.current_stock.unwrap_or(0);
            if self
                .store
                .compare_and_swap_stock(service_id, current, current + quantity)
                .await?
            {
                debug!(service_id, quantity, restored = current + quantity, "stock released");
                return Ok(());
            }
        }

        warn!(service_id, "stock CAS contention exceeded retry budget");
        Err(EngineError::Store(StoreError::Backend(format!(
            "stock contention on service {service_id}"
        ))))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use track_core::{CostType, ServiceCatalogEntry};

    use crate::memory::InMemoryStore;

    fn service(id: &str, stock: Option<i64>) -> ServiceCatalogEntry {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        ServiceCatalogEntry {
            id: id.to_string(),
            name: "Rental car".to_string(),
            description: None,
            cost_type: CostType::Flat,
            price_cents: 2500,
            track_inventory: stock.is_some(),
            current_stock: stock,
            max_per_ticket: 4,
            active: true,
            created_at: t0,
            updated_at: t0,
        }
    }

    async fn ledger_with(stock: i64) -> (Arc<InMemoryStore>, InventoryLedger) {
        let store = Arc::new(InMemoryStore::new());
        store.add_service(service("s-1", Some(stock))).await;
        let ledger = InventoryLedger::new(store.clone());
        (store, ledger)
    }

    #[tokio::test]
    async fn test_reserve_decrements_and_returns_new_level() {
        let (store, ledger) = ledger_with(5).await;

        let remaining = ledger.reserve("s-1", "Rental car", 2).await.unwrap();
        assert_eq!(remaining, 3);

        let s = store.fetch_service("s-1").await.unwrap().unwrap();
        assert_eq!(s.current_stock, Some(3));
    }

    #[tokio::test]
    async fn test_reserve_fails_without_touching_stock() {
        let (store, ledger) = ledger_with(1).await;

        let err = ledger.reserve("s-1", "Rental car", 2).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            }
        ));

        let s = store.fetch_service("s-1").await.unwrap().unwrap();
        assert_eq!(s.current_stock, Some(1));
    }

    #[tokio::test]
    async fn test_release_restores_stock() {
        let (store, ledger) = ledger_with(2).await;

        ledger.reserve("s-1", "Rental car", 2).await.unwrap();
        ledger.release("s-1", 2).await.unwrap();

        let s = store.fetch_service("s-1").await.unwrap().unwrap();
        assert_eq!(s.current_stock, Some(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reserves_exactly_one_wins_last_unit() {
        let (store, ledger) = ledger_with(1).await;
        let ledger = Arc::new(ledger);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.reserve("s-1", "Rental car", 1).await
            }));
        }

        let mut won = 0;
        let mut exhausted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(remaining) => {
                    assert_eq!(remaining, 0);
                    won += 1;
                }
                Err(EngineError::InsufficientStock { .. }) => exhausted += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(won, 1);
        assert_eq!(exhausted, 7);

        let s = store.fetch_service("s-1").await.unwrap().unwrap();
        assert_eq!(s.current_stock, Some(0));
    }
}

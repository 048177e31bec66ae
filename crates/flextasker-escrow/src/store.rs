//! Payment storage
//!
//! Storage seam for payment transactions. The one-active-payment-per-task
//! invariant is enforced by the service under the task-scoped lock exposed
//! here; a persistent backend would hang the same guarantee off a partial
//! unique index.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use flextasker_common::{FlextaskerError, PaymentTransaction, Result};

/// Storage backend for payment transactions
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persist a new payment
    async fn insert(&self, payment: PaymentTransaction) -> Result<()>;

    /// Fetch a payment by id
    async fn get(&self, payment_id: &Uuid) -> Result<Option<PaymentTransaction>>;

    /// Replace a stored payment (keyed by `payment.id`)
    async fn update(&self, payment: PaymentTransaction) -> Result<()>;

    /// All payments against a task, in creation order
    async fn payments_for_task(&self, task_id: &Uuid) -> Result<Vec<PaymentTransaction>>;

    /// All payments made by a payer
    async fn payments_for_payer(&self, payer_id: &str) -> Result<Vec<PaymentTransaction>>;

    /// Every stored payment
    async fn all(&self) -> Result<Vec<PaymentTransaction>>;

    /// The PENDING or COMPLETED payment on a task, if any
    async fn active_payment(&self, task_id: &Uuid) -> Result<Option<PaymentTransaction>>;

    /// Acquire the task-scoped lock serializing payment creation/refund
    async fn lock_task(&self, task_id: &Uuid) -> OwnedMutexGuard<()>;
}

/// In-memory payment store backed by DashMaps
pub struct InMemoryPaymentStore {
    payments: DashMap<Uuid, PaymentTransaction>,
    by_task: DashMap<Uuid, Vec<Uuid>>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self {
            payments: DashMap::new(),
            by_task: DashMap::new(),
            locks: DashMap::new(),
        }
    }
}

impl Default for InMemoryPaymentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: PaymentTransaction) -> Result<()> {
        self.by_task
            .entry(payment.task_id)
            .or_default()
            .push(payment.id);
        self.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn get(&self, payment_id: &Uuid) -> Result<Option<PaymentTransaction>> {
        Ok(self.payments.get(payment_id).map(|p| p.clone()))
    }

    async fn update(&self, payment: PaymentTransaction) -> Result<()> {
        match self.payments.get_mut(&payment.id) {
            Some(mut stored) => {
                *stored = payment;
                Ok(())
            }
            None => Err(FlextaskerError::Storage(format!(
                "payment {} not found for update",
                payment.id
            ))),
        }
    }

    async fn payments_for_task(&self, task_id: &Uuid) -> Result<Vec<PaymentTransaction>> {
        let ids = self
            .by_task
            .get(task_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();

        Ok(ids
            .iter()
            .filter_map(|id| self.payments.get(id).map(|p| p.clone()))
            .collect())
    }

    async fn payments_for_payer(&self, payer_id: &str) -> Result<Vec<PaymentTransaction>> {
        let mut payments: Vec<PaymentTransaction> = self
            .payments
            .iter()
            .filter(|p| p.payer_id == payer_id)
            .map(|p| p.clone())
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn all(&self) -> Result<Vec<PaymentTransaction>> {
        let mut payments: Vec<PaymentTransaction> =
            self.payments.iter().map(|p| p.clone()).collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn active_payment(&self, task_id: &Uuid) -> Result<Option<PaymentTransaction>> {
        Ok(self
            .payments_for_task(task_id)
            .await?
            .into_iter()
            .find(|p| p.status.blocks_new_payment()))
    }

    async fn lock_task(&self, task_id: &Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(*task_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flextasker_common::FeeSchedule;
    use rust_decimal_macros::dec;

    fn payment(task_id: Uuid, at: i64) -> PaymentTransaction {
        let fees = FeeSchedule::default().quote(dec!(100));
        PaymentTransaction::new(task_id, "owner-1", dec!(100), "card", fees, at)
    }

    #[tokio::test]
    async fn test_active_payment_tracks_status() {
        let store = InMemoryPaymentStore::new();
        let task_id = Uuid::now_v7();

        let mut p = payment(task_id, 1_000);
        store.insert(p.clone()).await.unwrap();

        // PENDING blocks
        assert!(store.active_payment(&task_id).await.unwrap().is_some());

        // FAILED does not
        p.fail().unwrap();
        store.update(p.clone()).await.unwrap();
        assert!(store.active_payment(&task_id).await.unwrap().is_none());

        // A fresh COMPLETED payment blocks again
        let mut p2 = payment(task_id, 2_000);
        p2.complete(Some("ch_1".to_string()), 2_500).unwrap();
        store.insert(p2).await.unwrap();
        assert!(store.active_payment(&task_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_payer_index_sorted_by_creation() {
        let store = InMemoryPaymentStore::new();
        store.insert(payment(Uuid::now_v7(), 2_000)).await.unwrap();
        store.insert(payment(Uuid::now_v7(), 1_000)).await.unwrap();

        let mine = store.payments_for_payer("owner-1").await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine[0].created_at <= mine[1].created_at);
    }
}

//! Bid storage
//!
//! Storage backend seam for the bid ledger. The trait exposes single-row
//! reads/writes plus a task-scoped lock; the service holds that lock across
//! its read-check-mutate window, which is the in-memory equivalent of the
//! row-level transaction a persistent backend would provide.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use flextasker_common::{Bid, FlextaskerError, Result};

/// Storage backend for bids
#[async_trait]
pub trait BidStore: Send + Sync {
    /// Persist a new bid
    async fn insert(&self, bid: Bid) -> Result<()>;

    /// Fetch a bid by id
    async fn get(&self, bid_id: &Uuid) -> Result<Option<Bid>>;

    /// Replace a stored bid (keyed by `bid.id`)
    async fn update(&self, bid: Bid) -> Result<()>;

    /// All bids on a task, in submission order
    async fn bids_for_task(&self, task_id: &Uuid) -> Result<Vec<Bid>>;

    /// All bids placed by a bidder
    async fn bids_for_bidder(&self, bidder_id: &str) -> Result<Vec<Bid>>;

    /// Every stored bid
    async fn all(&self) -> Result<Vec<Bid>>;

    /// The bidder's non-withdrawn bid on a task, if any
    async fn active_bid(&self, task_id: &Uuid, bidder_id: &str) -> Result<Option<Bid>>;

    /// Acquire the task-scoped lock serializing multi-row transitions
    async fn lock_task(&self, task_id: &Uuid) -> OwnedMutexGuard<()>;
}

/// In-memory bid store backed by DashMaps
pub struct InMemoryBidStore {
    /// All bids by id
    bids: DashMap<Uuid, Bid>,

    /// Index of bid ids by task
    by_task: DashMap<Uuid, Vec<Uuid>>,

    /// Per-task locks for multi-row transitions
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl InMemoryBidStore {
    pub fn new() -> Self {
        Self {
            bids: DashMap::new(),
            by_task: DashMap::new(),
            locks: DashMap::new(),
        }
    }
}

impl Default for InMemoryBidStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BidStore for InMemoryBidStore {
    async fn insert(&self, bid: Bid) -> Result<()> {
        self.by_task.entry(bid.task_id).or_default().push(bid.id);
        self.bids.insert(bid.id, bid);
        Ok(())
    }

    async fn get(&self, bid_id: &Uuid) -> Result<Option<Bid>> {
        Ok(self.bids.get(bid_id).map(|b| b.clone()))
    }

    async fn update(&self, bid: Bid) -> Result<()> {
        match self.bids.get_mut(&bid.id) {
            Some(mut stored) => {
                *stored = bid;
                Ok(())
            }
            None => Err(FlextaskerError::Storage(format!(
                "bid {} not found for update",
                bid.id
            ))),
        }
    }

    async fn bids_for_task(&self, task_id: &Uuid) -> Result<Vec<Bid>> {
        let ids = self
            .by_task
            .get(task_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();

        Ok(ids
            .iter()
            .filter_map(|id| self.bids.get(id).map(|b| b.clone()))
            .collect())
    }

    async fn bids_for_bidder(&self, bidder_id: &str) -> Result<Vec<Bid>> {
        let mut bids: Vec<Bid> = self
            .bids
            .iter()
            .filter(|b| b.bidder_id == bidder_id)
            .map(|b| b.clone())
            .collect();
        bids.sort_by_key(|b| b.submitted_at);
        Ok(bids)
    }

    async fn all(&self) -> Result<Vec<Bid>> {
        let mut bids: Vec<Bid> = self.bids.iter().map(|b| b.clone()).collect();
        bids.sort_by_key(|b| b.submitted_at);
        Ok(bids)
    }

    async fn active_bid(&self, task_id: &Uuid, bidder_id: &str) -> Result<Option<Bid>> {
        Ok(self
            .bids_for_task(task_id)
            .await?
            .into_iter()
            .find(|b| b.bidder_id == bidder_id && b.status.blocks_rebid()))
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

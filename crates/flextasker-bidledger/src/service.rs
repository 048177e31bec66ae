//! Bid ledger service
//!
//! All lifecycle operations on bids. Every operation checks its full set of
//! preconditions before mutating anything; the accept transition runs under
//! the task-scoped lock so that two concurrent accepts on the same task
//! cannot both succeed.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use flextasker_common::{
    Bid, BidError, Result, TaskDirectory, TaskSnapshot, TaskStatus, BudgetType,
};

use crate::store::BidStore;
use crate::OVERBID_WARNING_FACTOR;

/// Request to place a new bid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBid {
    pub task_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub timeline: String,
}

/// Partial update to a PENDING bid
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BidPatch {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub timeline: Option<String>,
}

/// Advisory emitted when a fixed-budget task receives a far-over-budget bid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetWarning {
    pub budget: Decimal,
    pub amount: Decimal,
    pub threshold: Decimal,
}

/// Result of placing a bid: the bid plus any advisory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedBid {
    pub bid: Bid,
    pub budget_warning: Option<BudgetWarning>,
}

/// Bid lifecycle ledger
pub struct BidLedger {
    pub(crate) store: Arc<dyn BidStore>,
    pub(crate) tasks: Arc<dyn TaskDirectory>,
}

impl BidLedger {
    pub fn new(store: Arc<dyn BidStore>, tasks: Arc<dyn TaskDirectory>) -> Self {
        Self { store, tasks }
    }

    /// Place a bid on an open task
    ///
    /// Fails if the task is missing, not open, past its deadline, owned by
    /// the bidder, or already carries a non-withdrawn bid from this bidder.
    /// A fixed-budget bid above `budget * 1.5` still goes through but
    /// returns a [`BudgetWarning`].
    #[instrument(skip(self, request), fields(task_id = %request.task_id))]
    pub async fn create_bid(&self, bidder_id: &str, request: NewBid) -> Result<PlacedBid> {
        if request.amount <= Decimal::ZERO {
            return Err(BidError::InvalidAmount.into());
        }

        let now = chrono::Utc::now().timestamp_millis();
        let task = self.open_task_for_bidding(&request.task_id, now).await?;

        if task.owner_id == bidder_id {
            return Err(BidError::OwnTask { task_id: task.id }.into());
        }

        // Duplicate check and insert must not race with another create_bid
        // or with an accept rewriting this bidder's rows.
        let _guard = self.store.lock_task(&task.id).await;

        if self
            .store
            .active_bid(&task.id, bidder_id)
            .await?
            .is_some()
        {
            return Err(BidError::DuplicateBid {
                task_id: task.id,
                bidder_id: bidder_id.to_string(),
            }
            .into());
        }

        let budget_warning = overbid_warning(&task, request.amount);
        if let Some(ref warning) = budget_warning {
            warn!(
                task_id = %task.id,
                amount = %warning.amount,
                budget = %warning.budget,
                "bid far exceeds fixed task budget"
            );
        }

        let bid = Bid::new(
            task.id,
            bidder_id,
            request.amount,
            request.description,
            request.timeline,
            now,
        );
        self.store.insert(bid.clone()).await?;

        info!(bid_id = %bid.id, task_id = %task.id, "bid placed");
        Ok(PlacedBid {
            bid,
            budget_warning,
        })
    }

    /// Update a PENDING bid's amount, description, or timeline
    #[instrument(skip(self, patch))]
    pub async fn update_bid(&self, bid_id: &Uuid, bidder_id: &str, patch: BidPatch) -> Result<Bid> {
        if let Some(amount) = patch.amount {
            if amount <= Decimal::ZERO {
                return Err(BidError::InvalidAmount.into());
            }
        }

        let bid = self.require_bid(bid_id).await?;
        let _guard = self.store.lock_task(&bid.task_id).await;
        let mut bid = self.require_bid(bid_id).await?;

        if bid.bidder_id != bidder_id {
            return Err(BidError::NotBidder { bid_id: bid.id }.into());
        }
        if !bid.is_pending() {
            return Err(BidError::NotPending {
                bid_id: bid.id,
                status: bid.status,
            }
            .into());
        }

        let now = chrono::Utc::now().timestamp_millis();
        self.open_task_for_bidding(&bid.task_id, now).await?;

        if let Some(amount) = patch.amount {
            bid.amount = amount;
        }
        if let Some(description) = patch.description {
            bid.description = description;
        }
        if let Some(timeline) = patch.timeline {
            bid.timeline = timeline;
        }
        self.store.update(bid.clone()).await?;

        info!(bid_id = %bid.id, "bid updated");
        Ok(bid)
    }

    /// Accept a bid: the core atomic transition
    ///
    /// Under the task lock: the bid becomes ACCEPTED, the task moves to
    /// IN_PROGRESS with the bidder assigned, and every other PENDING bid on
    /// the task becomes REJECTED. On any failure nothing is mutated.
    #[instrument(skip(self))]
    pub async fn accept_bid(&self, bid_id: &Uuid, task_owner_id: &str) -> Result<Bid> {
        let bid = self.require_bid(bid_id).await?;
        let _guard = self.store.lock_task(&bid.task_id).await;

        // Re-read under the lock; a concurrent accept may have resolved it.
        let mut bid = self.require_bid(bid_id).await?;
        let task = self.require_task(&bid.task_id).await?;

        if task.owner_id != task_owner_id {
            return Err(BidError::NotTaskOwner { task_id: task.id }.into());
        }
        if !bid.is_pending() {
            return Err(BidError::NotPending {
                bid_id: bid.id,
                status: bid.status,
            }
            .into());
        }
        if !task.status.is_open() {
            return Err(BidError::TaskNotOpen {
                task_id: task.id,
                status: task.status,
            }
            .into());
        }

        let now = chrono::Utc::now().timestamp_millis();

        // Task transition first: it is the only fallible mutation, so a
        // directory failure here leaves the bid rows untouched.
        self.tasks.set_assignee(&task.id, &bid.bidder_id).await?;
        self.tasks
            .set_status(&task.id, TaskStatus::InProgress, now)
            .await?;

        bid.accept(now)?;
        self.store.update(bid.clone()).await?;

        let mut rejected = 0usize;
        for mut other in self.store.bids_for_task(&task.id).await? {
            if other.id != bid.id && other.is_pending() {
                other.reject(now)?;
                self.store.update(other).await?;
                rejected += 1;
            }
        }

        info!(
            bid_id = %bid.id,
            task_id = %task.id,
            assignee = %bid.bidder_id,
            rejected_competitors = rejected,
            "bid accepted"
        );
        Ok(bid)
    }

    /// Reject a single PENDING bid; no other bids are affected
    #[instrument(skip(self))]
    pub async fn reject_bid(&self, bid_id: &Uuid, task_owner_id: &str) -> Result<Bid> {
        let bid = self.require_bid(bid_id).await?;
        let _guard = self.store.lock_task(&bid.task_id).await;

        let mut bid = self.require_bid(bid_id).await?;
        let task = self.require_task(&bid.task_id).await?;

        if task.owner_id != task_owner_id {
            return Err(BidError::NotTaskOwner { task_id: task.id }.into());
        }

        let now = chrono::Utc::now().timestamp_millis();
        bid.reject(now)?;
        self.store.update(bid.clone()).await?;

        info!(bid_id = %bid.id, "bid rejected");
        Ok(bid)
    }

    /// Withdraw one's own PENDING bid
    #[instrument(skip(self))]
    pub async fn withdraw_bid(&self, bid_id: &Uuid, bidder_id: &str) -> Result<Bid> {
        let bid = self.require_bid(bid_id).await?;
        let _guard = self.store.lock_task(&bid.task_id).await;

        let mut bid = self.require_bid(bid_id).await?;
        if bid.bidder_id != bidder_id {
            return Err(BidError::NotBidder { bid_id: bid.id }.into());
        }

        let now = chrono::Utc::now().timestamp_millis();
        bid.withdraw(now)?;
        self.store.update(bid.clone()).await?;

        info!(bid_id = %bid.id, "bid withdrawn");
        Ok(bid)
    }

    async fn require_bid(&self, bid_id: &Uuid) -> Result<Bid> {
        self.store
            .get(bid_id)
            .await?
            .ok_or_else(|| BidError::BidNotFound { bid_id: *bid_id }.into())
    }

    pub(crate) async fn require_task(&self, task_id: &Uuid) -> Result<TaskSnapshot> {
        self.tasks
            .get(task_id)
            .await?
            .ok_or_else(|| BidError::TaskNotFound { task_id: *task_id }.into())
    }

    /// Fetch a task and confirm it is still open for bidding as of `now`
    async fn open_task_for_bidding(&self, task_id: &Uuid, now: i64) -> Result<TaskSnapshot> {
        let task = self.require_task(task_id).await?;

        if !task.status.is_open() {
            return Err(BidError::TaskNotOpen {
                task_id: task.id,
                status: task.status,
            }
            .into());
        }
        if task.deadline_passed(now) {
            return Err(BidError::DeadlinePassed { task_id: task.id }.into());
        }
        Ok(task)
    }
}

fn overbid_warning(task: &TaskSnapshot, amount: Decimal) -> Option<BudgetWarning> {
    if task.budget_type != BudgetType::Fixed {
        return None;
    }
    let threshold = task.budget * OVERBID_WARNING_FACTOR;
    (amount > threshold).then(|| BudgetWarning {
        budget: task.budget,
        amount,
        threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryBidStore;
    use flextasker_common::{ErrorKind, InMemoryTaskDirectory};
    use rust_decimal_macros::dec;

    fn open_task(owner: &str, budget: Decimal) -> TaskSnapshot {
        TaskSnapshot {
            id: Uuid::now_v7(),
            owner_id: owner.to_string(),
            assignee_id: None,
            status: TaskStatus::Open,
            budget,
            budget_type: BudgetType::Fixed,
            deadline: None,
        }
    }

    fn ledger_with(task: &TaskSnapshot) -> BidLedger {
        let tasks = Arc::new(InMemoryTaskDirectory::new());
        tasks.upsert(task.clone());
        BidLedger::new(Arc::new(InMemoryBidStore::new()), tasks)
    }

    fn new_bid(task_id: Uuid, amount: Decimal) -> NewBid {
        NewBid {
            task_id,
            amount,
            description: "I can do this".to_string(),
            timeline: "3 days".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_bid_happy_path() {
        let task = open_task("owner-1", dec!(100));
        let ledger = ledger_with(&task);

        let placed = ledger
            .create_bid("tasker-1", new_bid(task.id, dec!(90)))
            .await
            .unwrap();

        assert!(placed.bid.is_pending());
        assert!(placed.budget_warning.is_none());
        assert_eq!(placed.bid.amount, dec!(90));
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_validation() {
        let task = open_task("owner-1", dec!(100));
        let ledger = ledger_with(&task);

        let err = ledger
            .create_bid("tasker-1", new_bid(task.id, dec!(0)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_unknown_task_is_not_found() {
        let task = open_task("owner-1", dec!(100));
        let ledger = ledger_with(&task);

        let err = ledger
            .create_bid("tasker-1", new_bid(Uuid::now_v7(), dec!(90)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_deadline_passed_is_conflict() {
        let mut task = open_task("owner-1", dec!(100));
        task.deadline = Some(1); // long past
        let ledger = ledger_with(&task);

        let err = ledger
            .create_bid("tasker-1", new_bid(task.id, dec!(90)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_overbid_on_fixed_budget_warns_but_creates() {
        let task = open_task("owner-1", dec!(100));
        let ledger = ledger_with(&task);

        let placed = ledger
            .create_bid("tasker-1", new_bid(task.id, dec!(200)))
            .await
            .unwrap();

        let warning = placed.budget_warning.expect("warning expected");
        assert_eq!(warning.threshold, dec!(150.0));
        assert!(placed.bid.is_pending());
    }

    #[tokio::test]
    async fn test_overbid_on_hourly_budget_does_not_warn() {
        let mut task = open_task("owner-1", dec!(100));
        task.budget_type = BudgetType::Hourly;
        let ledger = ledger_with(&task);

        let placed = ledger
            .create_bid("tasker-1", new_bid(task.id, dec!(500)))
            .await
            .unwrap();
        assert!(placed.budget_warning.is_none());
    }

    #[tokio::test]
    async fn test_update_bid_merges_fields() {
        let task = open_task("owner-1", dec!(100));
        let ledger = ledger_with(&task);

        let placed = ledger
            .create_bid("tasker-1", new_bid(task.id, dec!(90)))
            .await
            .unwrap();

        let patch = BidPatch {
            amount: Some(dec!(85)),
            timeline: Some("2 days".to_string()),
            ..Default::default()
        };
        let updated = ledger
            .update_bid(&placed.bid.id, "tasker-1", patch)
            .await
            .unwrap();

        assert_eq!(updated.amount, dec!(85));
        assert_eq!(updated.timeline, "2 days");
        assert_eq!(updated.description, placed.bid.description);
        assert!(updated.is_pending());
    }

    #[tokio::test]
    async fn test_update_by_other_user_is_authorization() {
        let task = open_task("owner-1", dec!(100));
        let ledger = ledger_with(&task);

        let placed = ledger
            .create_bid("tasker-1", new_bid(task.id, dec!(90)))
            .await
            .unwrap();

        let err = ledger
            .update_bid(&placed.bid.id, "tasker-2", BidPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_reject_requires_owner() {
        let task = open_task("owner-1", dec!(100));
        let ledger = ledger_with(&task);

        let placed = ledger
            .create_bid("tasker-1", new_bid(task.id, dec!(90)))
            .await
            .unwrap();

        let err = ledger
            .reject_bid(&placed.bid.id, "not-the-owner")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let rejected = ledger.reject_bid(&placed.bid.id, "owner-1").await.unwrap();
        assert_eq!(rejected.status, flextasker_common::BidStatus::Rejected);
    }
}

//! Bid search and aggregation
//!
//! Read-only views over the bid ledger. Visibility: a requester sees bids
//! they placed and bids on tasks they own, nothing else.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use flextasker_common::{Bid, BidStatus, Result, TaskDirectory};

use crate::service::BidLedger;
use crate::store::BidStore;

/// Default page size for bid searches
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Filter for [`BidLedger::search_bids`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidQuery {
    pub task_id: Option<Uuid>,
    pub bidder_id: Option<String>,
    pub status: Option<BidStatus>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub offset: usize,
    pub limit: usize,
}

impl Default for BidQuery {
    fn default() -> Self {
        Self {
            task_id: None,
            bidder_id: None,
            status: None,
            min_amount: None,
            max_amount: None,
            offset: 0,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl BidQuery {
    fn matches(&self, bid: &Bid) -> bool {
        if let Some(task_id) = self.task_id {
            if bid.task_id != task_id {
                return false;
            }
        }
        if let Some(ref bidder_id) = self.bidder_id {
            if &bid.bidder_id != bidder_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if bid.status != status {
                return false;
            }
        }
        if let Some(min) = self.min_amount {
            if bid.amount < min {
                return false;
            }
        }
        if let Some(max) = self.max_amount {
            if bid.amount > max {
                return false;
            }
        }
        true
    }
}

/// Aggregated view of the bids on one task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskBidStatistics {
    pub task_id: Option<Uuid>,
    pub total: u64,
    pub pending: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub withdrawn: u64,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub average_amount: Option<Decimal>,
    /// Submissions per calendar day (UTC), keyed "YYYY-MM-DD"
    pub submissions_per_day: BTreeMap<String, u64>,
}

impl TaskBidStatistics {
    fn accumulate(&mut self, bid: &Bid) {
        self.total += 1;
        match bid.status {
            BidStatus::Pending => self.pending += 1,
            BidStatus::Accepted => self.accepted += 1,
            BidStatus::Rejected => self.rejected += 1,
            BidStatus::Withdrawn => self.withdrawn += 1,
        }

        self.min_amount = Some(match self.min_amount {
            Some(min) => min.min(bid.amount),
            None => bid.amount,
        });
        self.max_amount = Some(match self.max_amount {
            Some(max) => max.max(bid.amount),
            None => bid.amount,
        });

        if let Some(day) = day_bucket(bid.submitted_at) {
            *self.submissions_per_day.entry(day).or_insert(0) += 1;
        }
    }
}

fn day_bucket(millis: i64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
}

impl BidLedger {
    /// Search bids visible to `requester_id`, newest first
    #[instrument(skip(self, query))]
    pub async fn search_bids(&self, requester_id: &str, query: &BidQuery) -> Result<Vec<Bid>> {
        let candidates = if let Some(task_id) = query.task_id {
            self.store.bids_for_task(&task_id).await?
        } else if let Some(ref bidder_id) = query.bidder_id {
            self.store.bids_for_bidder(bidder_id).await?
        } else {
            self.store.all().await?
        };

        let owned_tasks = self.owned_task_ids(requester_id, &candidates).await?;

        let mut visible: Vec<Bid> = candidates
            .into_iter()
            .filter(|b| query.matches(b))
            .filter(|b| b.bidder_id == requester_id || owned_tasks.contains(&b.task_id))
            .collect();

        visible.sort_by_key(|b| std::cmp::Reverse(b.submitted_at));
        Ok(visible
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    /// Aggregate the bids on a task that `requester_id` is allowed to see:
    /// the owner sees all of them, anyone else only their own.
    #[instrument(skip(self))]
    pub async fn task_bid_statistics(
        &self,
        task_id: &Uuid,
        requester_id: &str,
    ) -> Result<TaskBidStatistics> {
        let task = self.require_task(task_id).await?;
        let bids = self.store.bids_for_task(task_id).await?;

        let mut stats = TaskBidStatistics {
            task_id: Some(*task_id),
            ..Default::default()
        };

        let mut amount_sum = Decimal::ZERO;
        for bid in bids
            .iter()
            .filter(|b| task.owner_id == requester_id || b.bidder_id == requester_id)
        {
            stats.accumulate(bid);
            amount_sum += bid.amount;
        }

        if stats.total > 0 {
            stats.average_amount = Some(amount_sum / Decimal::from(stats.total));
        }
        Ok(stats)
    }

    /// Distinct task ids among `bids` that are owned by `requester_id`
    async fn owned_task_ids(&self, requester_id: &str, bids: &[Bid]) -> Result<HashSet<Uuid>> {
        let mut owned = HashSet::new();
        let mut seen = HashSet::new();
        for bid in bids {
            if !seen.insert(bid.task_id) {
                continue;
            }
            if let Some(task) = self.tasks.get(&bid.task_id).await? {
                if task.owner_id == requester_id {
                    owned.insert(bid.task_id);
                }
            }
        }
        Ok(owned)
    }
}

//! Bid - one tasker's proposal against one task
//!
//! Bids are soft-state only: they are never deleted, their `status` field
//! carries the full lifecycle. PENDING is the only non-terminal state;
//! ACCEPTED, REJECTED, and WITHDRAWN never revert.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BidError;

/// Bid lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl BidStatus {
    /// Terminal states never transition again
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BidStatus::Pending)
    }

    /// A non-withdrawn bid blocks the same bidder from bidding again
    #[inline]
    pub fn blocks_rebid(&self) -> bool {
        !matches!(self, BidStatus::Withdrawn)
    }
}

/// A tasker's proposal against a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,

    pub task_id: Uuid,

    /// Bidder's user id
    pub bidder_id: String,

    /// Proposed price (always positive)
    pub amount: Decimal,

    pub description: String,

    /// Free-form delivery estimate, e.g. "3 days"
    pub timeline: String,

    pub status: BidStatus,

    /// Submission timestamp (Unix milliseconds)
    pub submitted_at: i64,

    /// Set when the bid leaves PENDING
    pub responded_at: Option<i64>,
}

impl Bid {
    /// Create a new PENDING bid
    pub fn new(
        task_id: Uuid,
        bidder_id: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>,
        timeline: impl Into<String>,
        submitted_at: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            task_id,
            bidder_id: bidder_id.into(),
            amount,
            description: description.into(),
            timeline: timeline.into(),
            status: BidStatus::Pending,
            submitted_at,
            responded_at: None,
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == BidStatus::Pending
    }

    /// Transition PENDING -> ACCEPTED
    pub fn accept(&mut self, at: i64) -> Result<(), BidError> {
        self.respond(BidStatus::Accepted, at)
    }

    /// Transition PENDING -> REJECTED
    pub fn reject(&mut self, at: i64) -> Result<(), BidError> {
        self.respond(BidStatus::Rejected, at)
    }

    /// Transition PENDING -> WITHDRAWN
    pub fn withdraw(&mut self, at: i64) -> Result<(), BidError> {
        self.respond(BidStatus::Withdrawn, at)
    }

    fn respond(&mut self, status: BidStatus, at: i64) -> Result<(), BidError> {
        if !self.is_pending() {
            return Err(BidError::NotPending {
                bid_id: self.id,
                status: self.status,
            });
        }
        self.status = status;
        self.responded_at = Some(at);
        Ok(())
    }
}

impl std::fmt::Display for Bid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bid({} on task {} by {}: {} [{:?}])",
            self.id, self.task_id, self.bidder_id, self.amount, self.status
        )
    }
}

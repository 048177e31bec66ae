//! Task read model
//!
//! Tasks are owned by the task-management service. The ledgers only read
//! snapshots of them and request transitions through
//! [`crate::tasks::TaskDirectory`]; nothing here is persisted by this crate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task lifecycle states as exposed by the task-management service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepting bids
    Open,
    /// A bid was accepted; the assignee is working
    InProgress,
    /// Work delivered and approved; payable
    Completed,
    Cancelled,
    Disputed,
}

impl TaskStatus {
    /// Whether the task is still accepting bids
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Open)
    }
}

/// How the task budget is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetType {
    Fixed,
    Hourly,
    Negotiable,
}

/// Point-in-time view of an externally-owned task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: Uuid,

    /// Owner's user id (the party that posted the task and pays for it)
    pub owner_id: String,

    /// Assigned tasker, set when a bid is accepted
    pub assignee_id: Option<String>,

    pub status: TaskStatus,

    pub budget: Decimal,

    pub budget_type: BudgetType,

    /// Bidding deadline (Unix milliseconds); `None` means no deadline
    pub deadline: Option<i64>,
}

impl TaskSnapshot {
    /// Whether the bidding deadline has passed as of `now`
    pub fn deadline_passed(&self, now: i64) -> bool {
        matches!(self.deadline, Some(deadline) if deadline < now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_task() -> TaskSnapshot {
        TaskSnapshot {
            id: Uuid::now_v7(),
            owner_id: "owner-1".to_string(),
            assignee_id: None,
            status: TaskStatus::Open,
            budget: dec!(100),
            budget_type: BudgetType::Fixed,
            deadline: None,
        }
    }

    #[test]
    fn test_no_deadline_never_passes() {
        let task = sample_task();
        assert!(!task.deadline_passed(i64::MAX));
    }

    #[test]
    fn test_deadline_comparison() {
        let mut task = sample_task();
        task.deadline = Some(1_000);
        assert!(!task.deadline_passed(999));
        assert!(!task.deadline_passed(1_000));
        assert!(task.deadline_passed(1_001));
    }

    #[test]
    fn test_open_predicate() {
        assert!(TaskStatus::Open.is_open());
        assert!(!TaskStatus::InProgress.is_open());
        assert!(!TaskStatus::Completed.is_open());
    }
}

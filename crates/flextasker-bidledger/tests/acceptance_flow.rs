//! End-to-end bid acceptance flows
//!
//! Exercises the single-winner guarantees of the bid ledger against the
//! in-memory store and task directory, including the concurrent
//! double-accept race.

use std::sync::Arc;

use rust_decimal_macros::dec;
use uuid::Uuid;

use flextasker_bidledger::{BidLedger, BidQuery, InMemoryBidStore, NewBid};
use flextasker_common::{
    BidStatus, BudgetType, ErrorKind, InMemoryTaskDirectory, TaskDirectory, TaskSnapshot,
    TaskStatus,
};

struct Harness {
    ledger: Arc<BidLedger>,
    tasks: Arc<InMemoryTaskDirectory>,
}

impl Harness {
    fn new() -> Self {
        let tasks = Arc::new(InMemoryTaskDirectory::new());
        let ledger = Arc::new(BidLedger::new(
            Arc::new(InMemoryBidStore::new()),
            tasks.clone(),
        ));
        Self { ledger, tasks }
    }

    fn open_task(&self, owner: &str) -> TaskSnapshot {
        let task = TaskSnapshot {
            id: Uuid::now_v7(),
            owner_id: owner.to_string(),
            assignee_id: None,
            status: TaskStatus::Open,
            budget: dec!(100),
            budget_type: BudgetType::Fixed,
            deadline: None,
        };
        self.tasks.upsert(task.clone());
        task
    }

    async fn place(&self, bidder: &str, task_id: Uuid, amount: rust_decimal::Decimal) -> Uuid {
        self.ledger
            .create_bid(
                bidder,
                NewBid {
                    task_id,
                    amount,
                    description: "bid".to_string(),
                    timeline: "3 days".to_string(),
                },
            )
            .await
            .unwrap()
            .bid
            .id
    }
}

#[tokio::test]
async fn accepting_a_bid_rejects_all_competitors() {
    // Scenario: open fixed-budget task, two pending bids, owner accepts one.
    let h = Harness::new();
    let task = h.open_task("owner-1");

    let b2 = h.place("tasker-2", task.id, dec!(95)).await;
    let b1 = h.place("tasker-1", task.id, dec!(90)).await;

    let accepted = h.ledger.accept_bid(&b1, "owner-1").await.unwrap();
    assert_eq!(accepted.status, BidStatus::Accepted);
    assert!(accepted.responded_at.is_some());

    // Task moved out of OPEN with the winner assigned
    let task_now = h.tasks.get(&task.id).await.unwrap().unwrap();
    assert_eq!(task_now.status, TaskStatus::InProgress);
    assert_eq!(task_now.assignee_id.as_deref(), Some("tasker-1"));

    // The competing bid was rejected in the same transition
    let all = h
        .ledger
        .search_bids(
            "owner-1",
            &BidQuery {
                task_id: Some(task.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    let competitor = all.iter().find(|b| b.id == b2).unwrap();
    assert_eq!(competitor.status, BidStatus::Rejected);
    assert_eq!(all.iter().filter(|b| b.status == BidStatus::Pending).count(), 0);
    assert_eq!(all.iter().filter(|b| b.status == BidStatus::Accepted).count(), 1);
}

#[tokio::test]
async fn concurrent_accepts_produce_exactly_one_winner() {
    let h = Harness::new();
    let task = h.open_task("owner-1");

    let b1 = h.place("tasker-1", task.id, dec!(90)).await;
    let b2 = h.place("tasker-2", task.id, dec!(95)).await;

    let (r1, r2) = tokio::join!(
        h.ledger.accept_bid(&b1, "owner-1"),
        h.ledger.accept_bid(&b2, "owner-1"),
    );

    // Exactly one accept wins; the loser observes a conflict.
    let (winner, loser_err) = match (r1, r2) {
        (Ok(w), Err(e)) => (w, e),
        (Err(e), Ok(w)) => (w, e),
        other => panic!("expected exactly one winner, got {other:?}"),
    };
    assert_eq!(loser_err.kind(), ErrorKind::Conflict);

    let task_now = h.tasks.get(&task.id).await.unwrap().unwrap();
    assert_eq!(task_now.status, TaskStatus::InProgress);
    assert_eq!(task_now.assignee_id.as_deref(), Some(winner.bidder_id.as_str()));

    // Invariant: one accepted bid, zero pending bids.
    let all = h
        .ledger
        .search_bids(
            "owner-1",
            &BidQuery {
                task_id: Some(task.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(all.iter().filter(|b| b.status == BidStatus::Accepted).count(), 1);
    assert_eq!(all.iter().filter(|b| b.status == BidStatus::Pending).count(), 0);
}

#[tokio::test]
async fn no_bidding_after_a_winner_exists() {
    let h = Harness::new();
    let task = h.open_task("owner-1");

    let b1 = h.place("tasker-1", task.id, dec!(90)).await;
    h.ledger.accept_bid(&b1, "owner-1").await.unwrap();

    let err = h
        .ledger
        .create_bid(
            "tasker-3",
            NewBid {
                task_id: task.id,
                amount: dec!(70),
                description: "late".to_string(),
                timeline: "1 day".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn duplicate_bid_blocked_until_withdrawn() {
    let h = Harness::new();
    let task = h.open_task("owner-1");

    let first = h.place("tasker-1", task.id, dec!(90)).await;

    let err = h
        .ledger
        .create_bid(
            "tasker-1",
            NewBid {
                task_id: task.id,
                amount: dec!(85),
                description: "again".to_string(),
                timeline: "2 days".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // After withdrawing, the bidder may bid again.
    h.ledger.withdraw_bid(&first, "tasker-1").await.unwrap();
    let second = h
        .ledger
        .create_bid(
            "tasker-1",
            NewBid {
                task_id: task.id,
                amount: dec!(85),
                description: "second try".to_string(),
                timeline: "2 days".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(second.bid.is_pending());
}

#[tokio::test]
async fn owner_cannot_bid_on_own_task() {
    let h = Harness::new();
    let task = h.open_task("owner-1");

    let err = h
        .ledger
        .create_bid(
            "owner-1",
            NewBid {
                task_id: task.id,
                amount: dec!(50),
                description: "myself".to_string(),
                timeline: "1 day".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // No bid row was created.
    let stats = h
        .ledger
        .task_bid_statistics(&task.id, "owner-1")
        .await
        .unwrap();
    assert_eq!(stats.total, 0);
}

#[tokio::test]
async fn terminal_bids_reject_further_transitions() {
    let h = Harness::new();
    let task = h.open_task("owner-1");

    let winner = h.place("tasker-1", task.id, dec!(90)).await;
    let loser = h.place("tasker-2", task.id, dec!(95)).await;
    h.ledger.accept_bid(&winner, "owner-1").await.unwrap();

    // Accepted bid: no re-accept, no withdraw.
    assert_eq!(
        h.ledger.accept_bid(&winner, "owner-1").await.unwrap_err().kind(),
        ErrorKind::Conflict
    );
    assert_eq!(
        h.ledger.withdraw_bid(&winner, "tasker-1").await.unwrap_err().kind(),
        ErrorKind::Conflict
    );

    // Rejected bid: no reject, no accept.
    assert_eq!(
        h.ledger.reject_bid(&loser, "owner-1").await.unwrap_err().kind(),
        ErrorKind::Conflict
    );
    assert_eq!(
        h.ledger.accept_bid(&loser, "owner-1").await.unwrap_err().kind(),
        ErrorKind::Conflict
    );

    // Nothing moved.
    let all = h
        .ledger
        .search_bids(
            "owner-1",
            &BidQuery {
                task_id: Some(task.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(all.iter().filter(|b| b.status == BidStatus::Accepted).count(), 1);
    assert_eq!(all.iter().filter(|b| b.status == BidStatus::Rejected).count(), 1);
}

#[tokio::test]
async fn update_blocked_once_task_leaves_open() {
    let h = Harness::new();
    let task = h.open_task("owner-1");

    let winner = h.place("tasker-1", task.id, dec!(90)).await;
    let loser = h.place("tasker-2", task.id, dec!(95)).await;
    h.ledger.accept_bid(&winner, "owner-1").await.unwrap();

    let err = h
        .ledger
        .update_bid(
            &loser,
            "tasker-2",
            flextasker_bidledger::BidPatch {
                amount: Some(dec!(80)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

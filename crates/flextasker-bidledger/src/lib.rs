//! # Flextasker BidLedger
//!
//! Owns the lifecycle of bids against a task: creation, update, withdrawal,
//! rejection, and the atomic accept transition that closes out all other
//! pending bids and moves the task into an assigned state.
//!
//! ## Guarantees
//!
//! - At most one bid per task ever reaches ACCEPTED; once one does, no other
//!   bid on that task stays PENDING.
//! - Concurrent accepts on the same task serialize on a task-scoped lock;
//!   the loser observes a conflict, never a partial transition.
//! - Every precondition is checked before any mutation; a rejected request
//!   leaves no trace.

pub mod service;
pub mod stats;
pub mod store;

pub use service::{BidLedger, BidPatch, BudgetWarning, NewBid, PlacedBid};
pub use stats::{BidQuery, TaskBidStatistics};
pub use store::{BidStore, InMemoryBidStore};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixed-budget bids above `budget * 1.5` trigger an advisory warning
pub const OVERBID_WARNING_FACTOR: Decimal = dec!(1.5);

//! # Flextasker Common
//!
//! Shared types, errors, and the money model for the Flextasker marketplace
//! core.
//!
//! ## Core Types
//!
//! - [`Bid`]: a tasker's proposal against an open task
//! - [`PaymentTransaction`]: one monetary movement tied to a completed task
//! - [`TaskSnapshot`]: read model of the externally-owned Task entity
//! - [`FeeSchedule`]/[`FeeBreakdown`]: the platform/processing fee model
//! - [`TaskDirectory`]: the narrow interface to the task-management service
//!
//! ## Errors
//!
//! All ledger operations return [`Result`], with failures classified into an
//! [`ErrorKind`] (not-found, validation, conflict, authorization, gateway,
//! internal) that the API layer maps onto HTTP status codes.

pub mod error;
pub mod tasks;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{BidError, ErrorKind, FlextaskerError, PaymentError, Result};
pub use tasks::{InMemoryTaskDirectory, TaskDirectory};
pub use types::{
    bid::{Bid, BidStatus},
    fees::{FeeBreakdown, FeeSchedule},
    payment::{PaymentStatus, PaymentTransaction, RefundRecord},
    task::{BudgetType, TaskSnapshot, TaskStatus},
};

/// Flextasker core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of decimal places carried by monetary values (cents)
pub const MONEY_SCALE: u32 = 2;

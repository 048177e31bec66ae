//! Error types for the Flextasker core
//!
//! Provides a unified error type plus domain-specific variants for the bid
//! and payment ledgers. Every failure carries the entity id it refers to so
//! the API layer can produce a precise message without reaching back into
//! the ledgers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::bid::BidStatus;
use crate::types::payment::PaymentStatus;
use crate::types::task::TaskStatus;

/// Result type alias using FlextaskerError
pub type Result<T> = std::result::Result<T, FlextaskerError>;

/// Broad failure classification consumed by the API layer.
///
/// The core never shapes HTTP responses itself; callers map a kind onto a
/// status code via [`ErrorKind::http_status`]. Unclassified failures fold
/// into [`ErrorKind::Internal`] and must not leak detail to end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Referenced bid/task/payment does not exist
    NotFound,
    /// Malformed input (non-positive amount, missing field)
    Validation,
    /// Business-rule violation (task not open, duplicate bid, ...)
    Conflict,
    /// Actor is not entitled to perform the action
    Authorization,
    /// External payment gateway declined, errored, or timed out
    Gateway,
    /// Unexpected internal failure
    Internal,
}

impl ErrorKind {
    /// Canonical HTTP status code for this kind
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Validation => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Authorization => 403,
            ErrorKind::Gateway => 502,
            ErrorKind::Internal => 500,
        }
    }
}

/// Unified error type for Flextasker core operations
#[derive(Debug, Error)]
pub enum FlextaskerError {
    // Bid ledger errors
    #[error("Bid error: {0}")]
    Bid(#[from] BidError),

    // Payment ledger errors
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlextaskerError {
    /// Classification for the API layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlextaskerError::Bid(e) => e.kind(),
            FlextaskerError::Payment(e) => e.kind(),
            FlextaskerError::Storage(_)
            | FlextaskerError::Config(_)
            | FlextaskerError::Serialization(_)
            | FlextaskerError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Bid ledger errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BidError {
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: Uuid },

    #[error("Bid not found: {bid_id}")]
    BidNotFound { bid_id: Uuid },

    #[error("Task {task_id} is not open for bidding (status: {status:?})")]
    TaskNotOpen { task_id: Uuid, status: TaskStatus },

    #[error("Bidding deadline has passed for task {task_id}")]
    DeadlinePassed { task_id: Uuid },

    #[error("Task owner cannot bid on their own task {task_id}")]
    OwnTask { task_id: Uuid },

    #[error("Bidder {bidder_id} already has an active bid on task {task_id}")]
    DuplicateBid { task_id: Uuid, bidder_id: String },

    #[error("Bid {bid_id} is not pending (status: {status:?})")]
    NotPending { bid_id: Uuid, status: BidStatus },

    #[error("Actor is not the bidder on bid {bid_id}")]
    NotBidder { bid_id: Uuid },

    #[error("Actor is not the owner of task {task_id}")]
    NotTaskOwner { task_id: Uuid },

    #[error("Bid amount must be positive")]
    InvalidAmount,
}

impl BidError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BidError::TaskNotFound { .. } | BidError::BidNotFound { .. } => ErrorKind::NotFound,
            BidError::TaskNotOpen { .. }
            | BidError::DeadlinePassed { .. }
            | BidError::OwnTask { .. }
            | BidError::DuplicateBid { .. }
            | BidError::NotPending { .. } => ErrorKind::Conflict,
            BidError::NotBidder { .. } | BidError::NotTaskOwner { .. } => ErrorKind::Authorization,
            BidError::InvalidAmount => ErrorKind::Validation,
        }
    }
}

/// Payment ledger errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PaymentError {
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: Uuid },

    #[error("Payment not found: {payment_id}")]
    PaymentNotFound { payment_id: Uuid },

    #[error("Payer {payer_id} is not the owner of task {task_id}")]
    PayerMismatch { task_id: Uuid, payer_id: String },

    #[error("Task {task_id} is not completed (status: {status:?})")]
    TaskNotCompleted { task_id: Uuid, status: TaskStatus },

    #[error("An active payment already exists for task {task_id}")]
    PaymentExists { task_id: Uuid },

    #[error("Payment {payment_id} is not pending (status: {status:?})")]
    NotPending {
        payment_id: Uuid,
        status: PaymentStatus,
    },

    #[error("Payment {payment_id} cannot be refunded (status: {status:?})")]
    NotRefundable {
        payment_id: Uuid,
        status: PaymentStatus,
    },

    #[error("Refund of {requested} exceeds payment amount {available}")]
    RefundExceedsPayment {
        payment_id: Uuid,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Payment amount must be positive")]
    InvalidAmount,

    #[error("Refund amount must be positive")]
    InvalidRefundAmount,

    #[error("Payment gateway failure: {reason}")]
    Gateway { reason: String },

    #[error("Payment gateway timed out after {timeout_ms}ms")]
    GatewayTimeout { timeout_ms: u64 },
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::TaskNotFound { .. } | PaymentError::PaymentNotFound { .. } => {
                ErrorKind::NotFound
            }
            PaymentError::PayerMismatch { .. }
            | PaymentError::RefundExceedsPayment { .. }
            | PaymentError::InvalidAmount
            | PaymentError::InvalidRefundAmount => ErrorKind::Validation,
            PaymentError::TaskNotCompleted { .. }
            | PaymentError::PaymentExists { .. }
            | PaymentError::NotPending { .. }
            | PaymentError::NotRefundable { .. } => ErrorKind::Conflict,
            PaymentError::Gateway { .. } | PaymentError::GatewayTimeout { .. } => {
                ErrorKind::Gateway
            }
        }
    }
}

// Implement From for common external error types
impl From<serde_json::Error> for FlextaskerError {
    fn from(err: serde_json::Error) -> Self {
        FlextaskerError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for FlextaskerError {
    fn from(err: anyhow::Error) -> Self {
        FlextaskerError::Internal(err.to_string())
    }
}

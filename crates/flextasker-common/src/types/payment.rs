//! PaymentTransaction - one monetary movement tied to a completed task
//!
//! State machine:
//!
//! ```text
//! PENDING --gateway success--> COMPLETED --refund success--> REFUNDED
//! PENDING --gateway failure--> FAILED
//! ```
//!
//! FAILED and REFUNDED are terminal. A PENDING or COMPLETED payment blocks
//! any further payment attempt on the same task; a FAILED one does not.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PaymentError;
use crate::types::fees::FeeBreakdown;

/// Payment lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// PENDING and COMPLETED payments block a second payment on the task
    #[inline]
    pub fn blocks_new_payment(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Completed)
    }
}

/// Refund metadata attached when a payment transitions to REFUNDED
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRecord {
    pub amount: Decimal,

    pub reason: String,

    /// User id of the party that requested the refund
    pub requested_by: String,

    pub gateway_refund_id: Option<String>,

    /// Fee breakdown that was reversed against the balances
    pub fees: FeeBreakdown,

    /// Refund timestamp (Unix milliseconds)
    pub refunded_at: i64,
}

/// One monetary movement against a completed task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: Uuid,

    pub task_id: Uuid,

    /// Task owner paying for the work
    pub payer_id: String,

    pub amount: Decimal,

    pub status: PaymentStatus,

    /// Opaque payment method token, e.g. "card" or "wallet"
    pub payment_method: String,

    /// Gateway-side transaction id, set on successful charge
    pub gateway_transaction_id: Option<String>,

    pub fees: FeeBreakdown,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Set when the gateway approves the charge
    pub completed_at: Option<i64>,

    /// Set when the payment is refunded
    pub refund: Option<RefundRecord>,
}

impl PaymentTransaction {
    /// Create a new PENDING payment with its fee breakdown precomputed
    pub fn new(
        task_id: Uuid,
        payer_id: impl Into<String>,
        amount: Decimal,
        payment_method: impl Into<String>,
        fees: FeeBreakdown,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            task_id,
            payer_id: payer_id.into(),
            amount,
            status: PaymentStatus::Pending,
            payment_method: payment_method.into(),
            gateway_transaction_id: None,
            fees,
            created_at,
            completed_at: None,
            refund: None,
        }
    }

    /// Transition PENDING -> COMPLETED after gateway approval
    pub fn complete(
        &mut self,
        gateway_transaction_id: Option<String>,
        at: i64,
    ) -> Result<(), PaymentError> {
        if self.status != PaymentStatus::Pending {
            return Err(PaymentError::NotPending {
                payment_id: self.id,
                status: self.status,
            });
        }
        self.status = PaymentStatus::Completed;
        self.gateway_transaction_id = gateway_transaction_id;
        self.completed_at = Some(at);
        Ok(())
    }

    /// Transition PENDING -> FAILED after gateway decline/error
    pub fn fail(&mut self) -> Result<(), PaymentError> {
        if self.status != PaymentStatus::Pending {
            return Err(PaymentError::NotPending {
                payment_id: self.id,
                status: self.status,
            });
        }
        self.status = PaymentStatus::Failed;
        Ok(())
    }

    /// Transition COMPLETED -> REFUNDED, attaching the refund metadata
    pub fn mark_refunded(&mut self, record: RefundRecord) -> Result<(), PaymentError> {
        if self.status != PaymentStatus::Completed {
            return Err(PaymentError::NotRefundable {
                payment_id: self.id,
                status: self.status,
            });
        }
        self.status = PaymentStatus::Refunded;
        self.refund = Some(record);
        Ok(())
    }
}

//! Escrow ledger service
//!
//! Payment creation and refund reversal. Both paths check every
//! precondition before any row exists; the gateway call is the single
//! suspension point and is bounded by the configured timeout.
//!
//! Charge path: a PENDING row is inserted under the task lock (so two
//! concurrent payments for the same task cannot both pass the uniqueness
//! check), then the gateway is consulted; the row completes and the
//! balances move only on approval. A decline, transport error, or timeout
//! leaves a FAILED row and untouched balances.
//!
//! Refund path: the task lock is held across the gateway call so a payment
//! can never be refunded at the processor twice; gateway failure surfaces
//! as an error with no mutation.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use flextasker_common::{
    PaymentError, PaymentStatus, PaymentTransaction, RefundRecord, Result, TaskDirectory,
    TaskSnapshot, TaskStatus,
};

use crate::balances::BalanceLedger;
use crate::config::EscrowConfig;
use crate::gateway::PaymentGateway;
use crate::store::PaymentStore;

/// Request to pay for a completed task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub task_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
}

/// Escrow-style payment ledger
pub struct EscrowLedger {
    pub(crate) store: Arc<dyn PaymentStore>,
    pub(crate) tasks: Arc<dyn TaskDirectory>,
    pub(crate) balances: Arc<dyn BalanceLedger>,
    gateway: Arc<dyn PaymentGateway>,
    config: EscrowConfig,
}

impl EscrowLedger {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        tasks: Arc<dyn TaskDirectory>,
        balances: Arc<dyn BalanceLedger>,
        gateway: Arc<dyn PaymentGateway>,
        config: EscrowConfig,
    ) -> Self {
        Self {
            store,
            tasks,
            balances,
            gateway,
            config,
        }
    }

    fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.config.gateway_timeout_ms)
    }

    /// Pay for a completed task
    ///
    /// Returns the resulting transaction: COMPLETED with balances credited
    /// when the gateway approves, FAILED (with no balance movement, not
    /// blocking a retry) when it declines, errors, or times out.
    #[instrument(skip(self, request), fields(task_id = %request.task_id))]
    pub async fn create_payment(
        &self,
        payer_id: &str,
        request: NewPayment,
    ) -> Result<PaymentTransaction> {
        if request.amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount.into());
        }

        let task = self.require_task(&request.task_id).await?;
        if task.owner_id != payer_id {
            return Err(PaymentError::PayerMismatch {
                task_id: task.id,
                payer_id: payer_id.to_string(),
            }
            .into());
        }
        if task.status != TaskStatus::Completed {
            return Err(PaymentError::TaskNotCompleted {
                task_id: task.id,
                status: task.status,
            }
            .into());
        }

        let now = chrono::Utc::now().timestamp_millis();
        let fees = self.config.fees.quote(request.amount);

        // Uniqueness check and insert are one critical section; once the
        // PENDING row exists it blocks competitors by itself.
        let mut payment = {
            let _guard = self.store.lock_task(&task.id).await;

            if let Some(existing) = self.store.active_payment(&task.id).await? {
                warn!(task_id = %task.id, existing = %existing.id, "payment already exists");
                return Err(PaymentError::PaymentExists { task_id: task.id }.into());
            }

            let payment = PaymentTransaction::new(
                task.id,
                payer_id,
                request.amount,
                request.payment_method.clone(),
                fees,
                now,
            );
            self.store.insert(payment.clone()).await?;
            payment
        };

        let charge = tokio::time::timeout(
            self.gateway_timeout(),
            self.gateway.charge(request.amount, &request.payment_method),
        )
        .await;

        let completed_at = chrono::Utc::now().timestamp_millis();
        match charge {
            Ok(Ok(receipt)) if receipt.approved => {
                payment.complete(receipt.transaction_id, completed_at)?;
                self.store.update(payment.clone()).await?;

                self.balances
                    .increment_spent(&task.owner_id, payment.amount)
                    .await?;
                if let Some(ref assignee_id) = task.assignee_id {
                    self.balances
                        .increment_earnings(assignee_id, payment.fees.assignee_earnings)
                        .await?;
                }

                info!(
                    payment_id = %payment.id,
                    task_id = %task.id,
                    amount = %payment.amount,
                    earnings = %payment.fees.assignee_earnings,
                    "payment completed"
                );
            }
            Ok(Ok(receipt)) => {
                payment.fail()?;
                self.store.update(payment.clone()).await?;
                warn!(
                    payment_id = %payment.id,
                    details = receipt.details.as_deref().unwrap_or("no detail"),
                    "gateway declined charge"
                );
            }
            Ok(Err(err)) => {
                payment.fail()?;
                self.store.update(payment.clone()).await?;
                warn!(payment_id = %payment.id, error = %err, "gateway error on charge");
            }
            Err(_) => {
                payment.fail()?;
                self.store.update(payment.clone()).await?;
                warn!(
                    payment_id = %payment.id,
                    timeout_ms = self.config.gateway_timeout_ms,
                    "gateway charge timed out"
                );
            }
        }

        Ok(payment)
    }

    /// Refund a completed payment, exactly reversing its balance effects
    ///
    /// The fee model is re-evaluated on `refund_amount` with the schedule
    /// the ledger charged with, so a full refund restores both parties'
    /// accumulators to their pre-payment values.
    #[instrument(skip(self, reason))]
    pub async fn process_refund(
        &self,
        payment_id: &Uuid,
        refund_amount: Decimal,
        reason: &str,
        requested_by: &str,
    ) -> Result<PaymentTransaction> {
        if refund_amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidRefundAmount.into());
        }

        let payment = self.require_payment(payment_id).await?;

        // Held across the gateway call: a payment must never reach the
        // processor's refund endpoint twice.
        let _guard = self.store.lock_task(&payment.task_id).await;
        let mut payment = self.require_payment(payment_id).await?;

        if payment.status != PaymentStatus::Completed {
            return Err(PaymentError::NotRefundable {
                payment_id: payment.id,
                status: payment.status,
            }
            .into());
        }
        if refund_amount > payment.amount {
            return Err(PaymentError::RefundExceedsPayment {
                payment_id: payment.id,
                requested: refund_amount,
                available: payment.amount,
            }
            .into());
        }

        let task = self.require_task(&payment.task_id).await?;
        let gateway_ref = payment
            .gateway_transaction_id
            .clone()
            .unwrap_or_else(|| payment.id.to_string());

        let refund = tokio::time::timeout(
            self.gateway_timeout(),
            self.gateway.refund(&gateway_ref, refund_amount),
        )
        .await;

        let receipt = match refund {
            Ok(Ok(receipt)) if receipt.approved => receipt,
            Ok(Ok(receipt)) => {
                return Err(PaymentError::Gateway {
                    reason: receipt
                        .details
                        .unwrap_or_else(|| "refund declined".to_string()),
                }
                .into());
            }
            Ok(Err(err)) => {
                return Err(PaymentError::Gateway {
                    reason: err.to_string(),
                }
                .into());
            }
            Err(_) => {
                return Err(PaymentError::GatewayTimeout {
                    timeout_ms: self.config.gateway_timeout_ms,
                }
                .into());
            }
        };

        let now = chrono::Utc::now().timestamp_millis();
        let reversed_fees = self.config.fees.quote(refund_amount);

        payment.mark_refunded(RefundRecord {
            amount: refund_amount,
            reason: reason.to_string(),
            requested_by: requested_by.to_string(),
            gateway_refund_id: receipt.refund_transaction_id,
            fees: reversed_fees,
            refunded_at: now,
        })?;
        self.store.update(payment.clone()).await?;

        self.balances
            .decrement_spent(&payment.payer_id, refund_amount)
            .await?;
        if let Some(ref assignee_id) = task.assignee_id {
            self.balances
                .decrement_earnings(assignee_id, reversed_fees.assignee_earnings)
                .await?;
        }

        info!(
            payment_id = %payment.id,
            refund_amount = %refund_amount,
            reversed_earnings = %reversed_fees.assignee_earnings,
            "payment refunded"
        );
        Ok(payment)
    }

    async fn require_payment(&self, payment_id: &Uuid) -> Result<PaymentTransaction> {
        self.store.get(payment_id).await?.ok_or_else(|| {
            PaymentError::PaymentNotFound {
                payment_id: *payment_id,
            }
            .into()
        })
    }

    pub(crate) async fn require_task(&self, task_id: &Uuid) -> Result<TaskSnapshot> {
        self.tasks
            .get(task_id)
            .await?
            .ok_or_else(|| PaymentError::TaskNotFound { task_id: *task_id }.into())
    }
}

//! Payment aggregation
//!
//! Read-only views over the payment ledger: a per-user summary and a
//! period statistics block. Neither is safety-critical; both are plain
//! filter/accumulate passes over the store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use flextasker_common::{PaymentStatus, Result};

use crate::balances::{BalanceLedger, UserBalance};
use crate::service::EscrowLedger;
use crate::store::PaymentStore;

/// Per-user payment summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub user_id: String,

    /// Balance accumulators as reported by the balance collaborator
    pub balance: UserBalance,

    /// Payments this user initiated, by status
    pub pending: u64,
    pub completed: u64,
    pub failed: u64,
    pub refunded: u64,

    /// Gross volume of this user's successful charges (completed or later
    /// refunded)
    pub charged_volume: Decimal,

    /// Volume returned to this user through refunds
    pub refunded_volume: Decimal,
}

/// Half-open time range `[from, to)` over `created_at`, Unix milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatsRange {
    pub from: i64,
    pub to: i64,
}

impl StatsRange {
    pub fn contains(&self, at: i64) -> bool {
        at >= self.from && at < self.to
    }
}

/// Ledger-wide payment statistics for a period
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentStatistics {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
    pub failed: u64,
    pub refunded: u64,

    /// Sum of amounts that were successfully charged in the period
    pub gross_volume: Decimal,

    /// Fees collected on those charges
    pub fees_collected: Decimal,

    /// Sum of refund amounts in the period (by charge creation time)
    pub refunded_volume: Decimal,
}

impl EscrowLedger {
    /// Summarize one user's payment activity
    #[instrument(skip(self))]
    pub async fn payment_summary(&self, user_id: &str) -> Result<PaymentSummary> {
        let balance = self.balances.balance(user_id).await?;
        let payments = self.store.payments_for_payer(user_id).await?;

        let mut summary = PaymentSummary {
            user_id: user_id.to_string(),
            balance,
            ..Default::default()
        };

        for payment in payments {
            match payment.status {
                PaymentStatus::Pending => summary.pending += 1,
                PaymentStatus::Completed => summary.completed += 1,
                PaymentStatus::Failed => summary.failed += 1,
                PaymentStatus::Refunded => summary.refunded += 1,
            }
            if matches!(
                payment.status,
                PaymentStatus::Completed | PaymentStatus::Refunded
            ) {
                summary.charged_volume += payment.amount;
            }
            if let Some(ref refund) = payment.refund {
                summary.refunded_volume += refund.amount;
            }
        }

        Ok(summary)
    }

    /// Aggregate ledger-wide payment statistics over a creation-time range
    #[instrument(skip(self))]
    pub async fn payment_statistics(&self, range: StatsRange) -> Result<PaymentStatistics> {
        let mut stats = PaymentStatistics::default();

        for payment in self.store.all().await? {
            if !range.contains(payment.created_at) {
                continue;
            }

            stats.total += 1;
            match payment.status {
                PaymentStatus::Pending => stats.pending += 1,
                PaymentStatus::Completed => stats.completed += 1,
                PaymentStatus::Failed => stats.failed += 1,
                PaymentStatus::Refunded => stats.refunded += 1,
            }

            if matches!(
                payment.status,
                PaymentStatus::Completed | PaymentStatus::Refunded
            ) {
                stats.gross_volume += payment.amount;
                stats.fees_collected += payment.fees.total_fees;
            }
            if let Some(ref refund) = payment.refund {
                stats.refunded_volume += refund.amount;
            }
        }

        Ok(stats)
    }
}

//! Fee model - platform and processing fees on task payments
//!
//! The split for a payment of `amount`:
//!
//! ```text
//! platform_fee      = amount * 0.05
//! processing_fee    = amount * 0.029 + 0.30
//! total_fees        = platform_fee + processing_fee
//! assignee_earnings = amount - total_fees
//! ```
//!
//! Fees round to cents; earnings are derived by subtraction, so
//! `platform_fee + processing_fee + assignee_earnings == amount` holds
//! exactly for any input. The same schedule is evaluated for charging and
//! refunding, which keeps a full refund an exact reversal.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::MONEY_SCALE;

/// Platform commission rate (5%)
pub const PLATFORM_FEE_RATE: Decimal = dec!(0.05);

/// Payment processing rate (2.9%)
pub const PROCESSING_FEE_RATE: Decimal = dec!(0.029);

/// Fixed per-transaction processing fee
pub const PROCESSING_FEE_FIXED: Decimal = dec!(0.30);

/// Fee breakdown for one payment leg (charge or refund)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Platform commission
    pub platform_fee: Decimal,

    /// Gateway processing fee (rate + fixed component)
    pub processing_fee: Decimal,

    /// platform_fee + processing_fee
    pub total_fees: Decimal,

    /// What the assignee receives: amount - total_fees
    pub assignee_earnings: Decimal,
}

/// Fee calculator with configurable rates
///
/// Pure and side-effect free. A ledger holds exactly one schedule for its
/// lifetime so charge and refund legs always see the same constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub platform_rate: Decimal,
    pub processing_rate: Decimal,
    pub processing_fixed: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            platform_rate: PLATFORM_FEE_RATE,
            processing_rate: PROCESSING_FEE_RATE,
            processing_fixed: PROCESSING_FEE_FIXED,
        }
    }
}

impl FeeSchedule {
    pub fn new(platform_rate: Decimal, processing_rate: Decimal, processing_fixed: Decimal) -> Self {
        Self {
            platform_rate,
            processing_rate,
            processing_fixed,
        }
    }

    /// Compute the fee breakdown for `amount`
    pub fn quote(&self, amount: Decimal) -> FeeBreakdown {
        let platform_fee = round_money(amount * self.platform_rate);
        let processing_fee = round_money(amount * self.processing_rate + self.processing_fixed);
        let total_fees = platform_fee + processing_fee;

        FeeBreakdown {
            platform_fee,
            processing_fee,
            total_fees,
            assignee_earnings: amount - total_fees,
        }
    }
}

/// Round to cents, half away from zero
fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_breakdown() {
        // amount=100: platform 5.00, processing 100*0.029+0.30=3.20
        let fees = FeeSchedule::default().quote(dec!(100));
        assert_eq!(fees.platform_fee, dec!(5.00));
        assert_eq!(fees.processing_fee, dec!(3.20));
        assert_eq!(fees.total_fees, dec!(8.20));
        assert_eq!(fees.assignee_earnings, dec!(91.80));
    }

    #[test]
    fn test_fee_conservation() {
        let schedule = FeeSchedule::default();
        for amount in [
            dec!(0.01),
            dec!(1),
            dec!(33.33),
            dec!(99.99),
            dec!(100),
            dec!(1234.56),
            dec!(0.07),
        ] {
            let fees = schedule.quote(amount);
            assert_eq!(
                fees.platform_fee + fees.processing_fee + fees.assignee_earnings,
                amount,
                "conservation violated for {amount}"
            );
            assert_eq!(fees.total_fees, fees.platform_fee + fees.processing_fee);
        }
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        // 50.10 * 0.05 = 2.505 -> 2.51
        let fees = FeeSchedule::default().quote(dec!(50.10));
        assert_eq!(fees.platform_fee, dec!(2.51));
    }

    #[test]
    fn test_same_schedule_is_reversal_exact() {
        let schedule = FeeSchedule::default();
        let charged = schedule.quote(dec!(250));
        let reversed = schedule.quote(dec!(250));
        assert_eq!(charged, reversed);
    }

    #[test]
    fn test_custom_rates() {
        let schedule = FeeSchedule::new(dec!(0.10), dec!(0), dec!(0));
        let fees = schedule.quote(dec!(80));
        assert_eq!(fees.platform_fee, dec!(8.00));
        assert_eq!(fees.processing_fee, dec!(0.00));
        assert_eq!(fees.assignee_earnings, dec!(72.00));
    }
}

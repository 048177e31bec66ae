//! Payment gateway collaborator
//!
//! The gateway is a black box with a boolean outcome: a charge or refund is
//! either approved, declined (a normal business outcome), or the gateway is
//! unreachable (a transport error). The ledger bounds every call with a
//! timeout; none of the implementations here are consulted about fees or
//! balances.
//!
//! The simulated implementation carries the randomness a flaky processor
//! exhibits; it is seedable so tests stay deterministic, and the ledger
//! itself never touches a random source.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rust_decimal::Decimal;
use thiserror::Error;

/// Transport-level gateway failure (the processor could not be reached)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a charge attempt
#[derive(Debug, Clone)]
pub struct ChargeReceipt {
    pub approved: bool,
    /// Gateway-side transaction id, present on approval
    pub transaction_id: Option<String>,
    /// Processor detail, e.g. a decline reason
    pub details: Option<String>,
}

/// Outcome of a refund attempt
#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub approved: bool,
    pub refund_transaction_id: Option<String>,
    pub details: Option<String>,
}

/// External payment processor interface
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, amount: Decimal, method: &str) -> Result<ChargeReceipt, GatewayError>;

    async fn refund(
        &self,
        gateway_transaction_id: &str,
        amount: Decimal,
    ) -> Result<RefundReceipt, GatewayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StubMode {
    Approve,
    Decline,
    Unavailable,
}

/// Deterministic gateway double for tests and local runs
pub struct StubGateway {
    mode: StubMode,
    counter: AtomicU64,
}

impl StubGateway {
    /// Approves every charge and refund
    pub fn approving() -> Self {
        Self::with_mode(StubMode::Approve)
    }

    /// Declines every charge and refund
    pub fn declining() -> Self {
        Self::with_mode(StubMode::Decline)
    }

    /// Fails every call with a transport error
    pub fn unavailable() -> Self {
        Self::with_mode(StubMode::Unavailable)
    }

    fn with_mode(mode: StubMode) -> Self {
        Self {
            mode,
            counter: AtomicU64::new(0),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}_stub_{n}")
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn charge(&self, _amount: Decimal, _method: &str) -> Result<ChargeReceipt, GatewayError> {
        match self.mode {
            StubMode::Approve => Ok(ChargeReceipt {
                approved: true,
                transaction_id: Some(self.next_id("ch")),
                details: None,
            }),
            StubMode::Decline => Ok(ChargeReceipt {
                approved: false,
                transaction_id: None,
                details: Some("card declined".to_string()),
            }),
            StubMode::Unavailable => Err(GatewayError::Unavailable("connection refused".into())),
        }
    }

    async fn refund(
        &self,
        _gateway_transaction_id: &str,
        _amount: Decimal,
    ) -> Result<RefundReceipt, GatewayError> {
        match self.mode {
            StubMode::Approve => Ok(RefundReceipt {
                approved: true,
                refund_transaction_id: Some(self.next_id("re")),
                details: None,
            }),
            StubMode::Decline => Ok(RefundReceipt {
                approved: false,
                refund_transaction_id: None,
                details: Some("refund declined".to_string()),
            }),
            StubMode::Unavailable => Err(GatewayError::Unavailable("connection refused".into())),
        }
    }
}

/// Gateway double that approves a configurable fraction of calls
///
/// Models a flaky processor for demos and soak tests. Seeded, so a given
/// seed always produces the same approval sequence.
pub struct SimulatedGateway {
    approval_rate: f64,
    rng: Mutex<StdRng>,
    counter: AtomicU64,
}

impl SimulatedGateway {
    pub fn new(approval_rate: f64, seed: u64) -> Self {
        Self {
            approval_rate: approval_rate.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            counter: AtomicU64::new(0),
        }
    }

    fn roll(&self) -> bool {
        self.rng.lock().gen::<f64>() < self.approval_rate
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}_sim_{n}")
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, _amount: Decimal, _method: &str) -> Result<ChargeReceipt, GatewayError> {
        if self.roll() {
            Ok(ChargeReceipt {
                approved: true,
                transaction_id: Some(self.next_id("ch")),
                details: None,
            })
        } else {
            Ok(ChargeReceipt {
                approved: false,
                transaction_id: None,
                details: Some("simulated decline".to_string()),
            })
        }
    }

    async fn refund(
        &self,
        _gateway_transaction_id: &str,
        _amount: Decimal,
    ) -> Result<RefundReceipt, GatewayError> {
        if self.roll() {
            Ok(RefundReceipt {
                approved: true,
                refund_transaction_id: Some(self.next_id("re")),
                details: None,
            })
        } else {
            Ok(RefundReceipt {
                approved: false,
                refund_transaction_id: None,
                details: Some("simulated decline".to_string()),
            })
        }
    }
}

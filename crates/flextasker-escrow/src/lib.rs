//! # Flextasker Escrow
//!
//! Owns the monetary lifecycle of a task's payment: fee computation, gateway
//! submission, balance crediting/debiting for owner and assignee, and refund
//! reversal that exactly undoes a prior successful credit/debit.
//!
//! ## Guarantees
//!
//! - At most one PENDING-or-COMPLETED payment per task; failed attempts do
//!   not block a retry.
//! - Balances only move after the gateway approves, and a full refund
//!   restores both parties' accumulators to their pre-payment values.
//! - The gateway call is the only suspension point and is bounded by the
//!   configured timeout; a timeout is treated as gateway failure.

pub mod balances;
pub mod config;
pub mod gateway;
pub mod service;
pub mod stats;
pub mod store;

pub use balances::{BalanceLedger, InMemoryBalances, UserBalance};
pub use config::EscrowConfig;
pub use gateway::{
    ChargeReceipt, GatewayError, PaymentGateway, RefundReceipt, SimulatedGateway, StubGateway,
};
pub use service::{EscrowLedger, NewPayment};
pub use stats::{PaymentStatistics, PaymentSummary, StatsRange};
pub use store::{InMemoryPaymentStore, PaymentStore};

/// Default bound on a single gateway call (charge or refund)
pub const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 10_000;

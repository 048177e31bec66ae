//! Escrow configuration

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flextasker_common::FeeSchedule;

use crate::DEFAULT_GATEWAY_TIMEOUT_MS;

/// Escrow ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Fee schedule applied to charges and refunds
    pub fees: FeeSchedule,
    /// Bound on a single gateway call, in milliseconds
    pub gateway_timeout_ms: u64,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            gateway_timeout_ms: DEFAULT_GATEWAY_TIMEOUT_MS,
        }
    }
}

impl EscrowConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        if let Ok(val) = std::env::var("ESCROW_PLATFORM_FEE_RATE") {
            if let Ok(rate) = val.parse::<Decimal>() {
                cfg.fees.platform_rate = rate;
            }
        }
        if let Ok(val) = std::env::var("ESCROW_PROCESSING_FEE_RATE") {
            if let Ok(rate) = val.parse::<Decimal>() {
                cfg.fees.processing_rate = rate;
            }
        }
        if let Ok(val) = std::env::var("ESCROW_PROCESSING_FEE_FIXED") {
            if let Ok(fixed) = val.parse::<Decimal>() {
                cfg.fees.processing_fixed = fixed;
            }
        }
        if let Ok(val) = std::env::var("ESCROW_GATEWAY_TIMEOUT_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                cfg.gateway_timeout_ms = ms;
            }
        }

        Ok(cfg)
    }
}

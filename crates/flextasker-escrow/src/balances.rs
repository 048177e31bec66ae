//! User balance collaborator
//!
//! `total_earnings` / `total_spent` are running accumulators on the User
//! entity, owned externally. Only payment completion and refund reversal
//! ever move them; they are never reset independently.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flextasker_common::Result;

/// Running money accumulators for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserBalance {
    /// Lifetime earnings as an assignee (net of fees)
    pub total_earnings: Decimal,

    /// Lifetime spend as a task owner (gross)
    pub total_spent: Decimal,
}

/// Narrow interface to the external user-balance service
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    async fn increment_earnings(&self, user_id: &str, amount: Decimal) -> Result<()>;

    async fn decrement_earnings(&self, user_id: &str, amount: Decimal) -> Result<()>;

    async fn increment_spent(&self, user_id: &str, amount: Decimal) -> Result<()>;

    async fn decrement_spent(&self, user_id: &str, amount: Decimal) -> Result<()>;

    /// Snapshot of a user's accumulators (zero for unknown users)
    async fn balance(&self, user_id: &str) -> Result<UserBalance>;
}

/// In-memory balance ledger backed by a DashMap
pub struct InMemoryBalances {
    balances: DashMap<String, UserBalance>,
}

impl InMemoryBalances {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
        }
    }
}

impl Default for InMemoryBalances {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceLedger for InMemoryBalances {
    async fn increment_earnings(&self, user_id: &str, amount: Decimal) -> Result<()> {
        self.balances
            .entry(user_id.to_string())
            .or_default()
            .total_earnings += amount;
        Ok(())
    }

    async fn decrement_earnings(&self, user_id: &str, amount: Decimal) -> Result<()> {
        self.balances
            .entry(user_id.to_string())
            .or_default()
            .total_earnings -= amount;
        Ok(())
    }

    async fn increment_spent(&self, user_id: &str, amount: Decimal) -> Result<()> {
        self.balances
            .entry(user_id.to_string())
            .or_default()
            .total_spent += amount;
        Ok(())
    }

    async fn decrement_spent(&self, user_id: &str, amount: Decimal) -> Result<()> {
        self.balances
            .entry(user_id.to_string())
            .or_default()
            .total_spent -= amount;
        Ok(())
    }

    async fn balance(&self, user_id: &str) -> Result<UserBalance> {
        Ok(self
            .balances
            .get(user_id)
            .map(|b| b.clone())
            .unwrap_or_default())
    }
}

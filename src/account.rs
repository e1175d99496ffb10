use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cache::TimedCache;
use crate::error::Result;
use crate::exchange::adapter::ExchangeGateway;
use crate::model::{AccountBalance, Position};

/// Balance and position reads, each behind its own timed cache.
pub struct AccountCache {
    gateway: Arc<dyn ExchangeGateway>,
    balance: TimedCache<AccountBalance>,
    positions: TimedCache<Vec<Position>>,
}

impl AccountCache {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, ttl: Duration) -> Self {
        Self {
            gateway,
            balance: TimedCache::new("balance", ttl),
            positions: TimedCache::new("positions", ttl),
        }
    }

    pub async fn balance(&self) -> Result<AccountBalance> {
        self.balance.get(|| self.fetch_balance()).await
    }

    pub async fn positions(&self) -> Result<Vec<Position>> {
        self.positions.get(|| self.live_positions()).await
    }

    /// Read positions straight from the exchange, skipping the cache.
    pub async fn live_positions(&self) -> Result<Vec<Position>> {
        let raw = self.gateway.list_positions().await?;

        let mut positions = Vec::with_capacity(raw.len());
        for row in &raw {
            if let Some(position) = Position::from_raw(row)? {
                positions.push(position);
            }
        }
        Ok(positions)
    }

    pub fn invalidate_positions(&self) {
        self.positions.invalidate();
    }

    pub fn invalidate_all(&self) {
        self.balance.invalidate();
        self.positions.invalidate();
    }

    async fn fetch_balance(&self) -> Result<AccountBalance> {
        let raw = self.gateway.fetch_account().await?;
        let balance = AccountBalance::from_raw(&raw)?;
        info!(
            total = %balance.total_wallet_balance,
            available = %balance.available_balance,
            unrealized = %balance.total_unrealized_profit,
            "Fetched account balance"
        );
        Ok(balance)
    }
}

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::account::AccountCache;
use crate::error::{Result, TraderError};
use crate::exchange::adapter::{ExchangeGateway, LeverageOutcome, MarginModeOutcome};
use crate::metrics;
use crate::model::MarginMode;

/// Pause imposed after a leverage change before the next order on that contract.
pub const DEFAULT_LEVERAGE_COOLDOWN: Duration = Duration::from_secs(5);

/// Waits out the post-leverage-change cooldown.
#[async_trait]
pub trait Cooldown: Send + Sync {
    async fn wait(&self, period: Duration);
}

/// Real cooldown backed by the tokio timer.
pub struct TokioCooldown;

#[async_trait]
impl Cooldown for TokioCooldown {
    async fn wait(&self, period: Duration) {
        tokio::time::sleep(period).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeverageChange {
    /// Cached position already runs at the requested leverage; nothing was sent.
    Unchanged,
    /// The exchange reported the leverage was already set.
    AlreadyAtTarget,
    Switched { from: u32 },
}

/// Result of a margin-mode switch. None of these stop a trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarginReconcile {
    Applied,
    AlreadySet,
    /// An open position pins the current mode; trading continues under it.
    KeptExisting,
    Failed(String),
}

impl MarginReconcile {
    pub fn is_failure(&self) -> bool {
        matches!(self, MarginReconcile::Failed(_))
    }
}

/// Brings leverage and margin mode in line with a trade before it is placed.
pub struct PositionReconciler {
    gateway: Arc<dyn ExchangeGateway>,
    account: Arc<AccountCache>,
    cooldown: Arc<dyn Cooldown>,
    cooldown_period: Duration,
}

impl PositionReconciler {
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        account: Arc<AccountCache>,
        cooldown: Arc<dyn Cooldown>,
        cooldown_period: Duration,
    ) -> Self {
        Self {
            gateway,
            account,
            cooldown,
            cooldown_period,
        }
    }

    pub async fn ensure_leverage(&self, symbol: &str, leverage: u32) -> Result<LeverageChange> {
        let current = self.current_leverage(symbol).await;

        if current == leverage && current > 0 {
            info!(symbol = %symbol, leverage, "Leverage already set, skipping switch");
            return Ok(LeverageChange::Unchanged);
        }

        info!(symbol = %symbol, from = current, to = leverage, "Switching leverage");
        match self.gateway.update_leverage(symbol, leverage).await {
            Ok(LeverageOutcome::AlreadyAtTarget) => {
                info!(symbol = %symbol, leverage, "Exchange reports leverage already set");
                Ok(LeverageChange::AlreadyAtTarget)
            }
            Ok(LeverageOutcome::Updated) => {
                metrics::inc_leverage_switch();
                // Cached rows still carry the old leverage
                self.account.invalidate_positions();
                info!(
                    symbol = %symbol,
                    leverage,
                    cooldown_secs = self.cooldown_period.as_secs_f64(),
                    "Leverage switched, waiting out cooldown"
                );
                self.cooldown.wait(self.cooldown_period).await;
                Ok(LeverageChange::Switched { from: current })
            }
            Err(source) => Err(TraderError::LeverageUpdateFailed {
                symbol: symbol.to_string(),
                leverage,
                source,
            }),
        }
    }

    pub async fn ensure_margin_mode(&self, symbol: &str, mode: MarginMode) -> MarginReconcile {
        match self.gateway.update_margin_mode(symbol, mode).await {
            Ok(MarginModeOutcome::Updated) => {
                info!(symbol = %symbol, mode = %mode, "Margin mode set");
                MarginReconcile::Applied
            }
            Ok(MarginModeOutcome::AlreadySet) => {
                info!(symbol = %symbol, mode = %mode, "Margin mode already set");
                MarginReconcile::AlreadySet
            }
            Ok(MarginModeOutcome::BlockedByOpenPosition) => {
                warn!(
                    symbol = %symbol,
                    mode = %mode,
                    "Open position pins margin mode, keeping current mode"
                );
                MarginReconcile::KeptExisting
            }
            Err(e) => {
                metrics::inc_soft_failure("margin_mode");
                warn!(symbol = %symbol, mode = %mode, error = %e, "Failed to set margin mode, continuing");
                MarginReconcile::Failed(e.to_string())
            }
        }
    }

    /// Leverage of the cached position on `symbol`, or 0 when flat or unreadable.
    async fn current_leverage(&self, symbol: &str) -> u32 {
        match self.account.positions().await {
            Ok(positions) => positions
                .iter()
                .find(|p| p.symbol.eq_ignore_ascii_case(symbol))
                .map(|p| p.leverage)
                .unwrap_or(0),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Could not read positions for current leverage");
                0
            }
        }
    }
}

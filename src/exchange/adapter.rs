use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{MarginMode, TriggerRule};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error {label}: {message}")]
    Api { label: String, message: String },
    #[error("Signing error: {0}")]
    Signing(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Futures account snapshot. Amounts are exchange-native decimal strings; the exchange's
/// own `available` figure is not read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAccount {
    pub total: String,
    pub unrealised_pnl: String,
}

/// One row of the exchange position list. `size` is a signed lot count.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPosition {
    pub contract: String,
    pub size: i64,
    pub entry_price: String,
    pub mark_price: String,
    pub unrealised_pnl: String,
    pub leverage: String,
    pub liq_price: String,
}

/// Contract metadata as listed by the exchange.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawContract {
    pub name: String,
    pub order_price_round: String,
    pub order_size_min: i64,
    pub quanto_multiplier: String,
    pub last_price: String,
}

/// Market order, always sent as immediate-or-cancel at price "0".
#[derive(Debug, Clone, PartialEq)]
pub struct MarketOrder {
    pub contract: String,
    /// Positive buys, negative sells.
    pub size: i64,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOrder {
    pub id: i64,
    pub contract: String,
    pub status: String,
    pub price: String,
    pub size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBasis {
    Mark,
}

impl PriceBasis {
    /// Gate.io `price_type`: 0 last, 1 mark, 2 index.
    pub fn code(&self) -> i32 {
        match self {
            PriceBasis::Mark => 1,
        }
    }
}

/// Trigger half of a price-triggered order.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTrigger {
    pub price: Decimal,
    pub rule: TriggerRule,
    pub basis: PriceBasis,
}

/// Order placed by the exchange once the trigger fires. With `close` set and `size` zero
/// the exchange closes whatever is open at that moment.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialOrder {
    pub contract: String,
    pub size: i64,
    pub close: bool,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTriggerAck {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeverageOutcome {
    Updated,
    AlreadyAtTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginModeOutcome {
    Updated,
    AlreadySet,
    BlockedByOpenPosition,
}

/// Authenticated access to one futures exchange account.
///
/// Implementations report "nothing to change" style rejections through the outcome enums
/// rather than as errors, so callers never inspect error text.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn fetch_account(&self) -> Result<RawAccount, GatewayError>;

    async fn list_positions(&self) -> Result<Vec<RawPosition>, GatewayError>;

    async fn list_contracts(&self) -> Result<Vec<RawContract>, GatewayError>;

    async fn get_contract(&self, symbol: &str) -> Result<RawContract, GatewayError>;

    /// Cancel every open order on the contract
    async fn cancel_all_orders(&self, symbol: &str) -> Result<(), GatewayError>;

    async fn update_leverage(
        &self,
        symbol: &str,
        leverage: u32,
    ) -> Result<LeverageOutcome, GatewayError>;

    async fn update_margin_mode(
        &self,
        symbol: &str,
        mode: MarginMode,
    ) -> Result<MarginModeOutcome, GatewayError>;

    async fn submit_market_order(&self, order: &MarketOrder) -> Result<RawOrder, GatewayError>;

    async fn submit_trigger_order(
        &self,
        trigger: &PriceTrigger,
        initial: &InitialOrder,
    ) -> Result<RawTriggerAck, GatewayError>;

    /// Get exchange name (e.g., "gateio")
    fn name(&self) -> &str;
}

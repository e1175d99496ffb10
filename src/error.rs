use rust_decimal::Decimal;
use thiserror::Error;

use crate::exchange::adapter::GatewayError;
use crate::model::Side;

/// Failures surfaced to callers of the trader.
///
/// Convenience steps (order cleanup, margin-mode switching) never produce these; they are
/// logged and reported through soft outcome types instead.
#[derive(Error, Debug)]
pub enum TraderError {
    #[error("Transport failure: {0}")]
    Transport(#[from] GatewayError),

    #[error("Malformed {field} from exchange: {value:?}")]
    MalformedField { field: &'static str, value: String },

    #[error("Invalid quantity {quantity} for {symbol}: {reason}")]
    InvalidQuantity {
        symbol: String,
        quantity: Decimal,
        reason: String,
    },

    #[error("Quantity {quantity} for {symbol} is {lots} lots, below minimum of {min_lots}")]
    BelowMinimum {
        symbol: String,
        quantity: Decimal,
        lots: i64,
        min_lots: i64,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to set {symbol} leverage to {leverage}x: {source}")]
    LeverageUpdateFailed {
        symbol: String,
        leverage: u32,
        #[source]
        source: GatewayError,
    },

    #[error("No {side} position found for {symbol}")]
    NoPositionFound { symbol: String, side: Side },

    #[error("Failed to place trigger order for {symbol}: {source}")]
    TriggerOrderFailed {
        symbol: String,
        #[source]
        source: GatewayError,
    },

    #[error("Market order for {symbol} failed: {source}")]
    OrderRejected {
        symbol: String,
        #[source]
        source: GatewayError,
    },
}

pub type Result<T> = std::result::Result<T, TraderError>;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::error::{Result, TraderError};
use crate::model::ContractPrecision;
use crate::precision::PrecisionResolver;

/// Lots for an opening order: `floor(coin_quantity / coin_per_lot)`.
///
/// Rounding down never commits more capital than requested.
pub fn lots_for_open(
    symbol: &str,
    coin_quantity: Decimal,
    precision: &ContractPrecision,
) -> Result<i64> {
    let raw = lots_ratio(symbol, coin_quantity, precision)?;
    let lots = to_lots(symbol, coin_quantity, raw.floor())?;
    ensure_nonzero(symbol, coin_quantity, lots)?;
    ensure_minimum(symbol, coin_quantity, lots, precision)?;
    Ok(lots)
}

/// Lots for a closing order: `round(coin_quantity / coin_per_lot)`, halves away from zero.
///
/// Closing a known size should land on the nearest lot rather than leave a remainder open.
pub fn lots_for_close(
    symbol: &str,
    coin_quantity: Decimal,
    precision: &ContractPrecision,
) -> Result<i64> {
    let raw = lots_ratio(symbol, coin_quantity, precision)?;
    let rounded = raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let lots = to_lots(symbol, coin_quantity, rounded)?;
    ensure_nonzero(symbol, coin_quantity, lots)?;
    ensure_minimum(symbol, coin_quantity, lots, precision)?;
    Ok(lots)
}

/// Coin quantity represented by `lots`.
pub fn lots_to_coin(lots: i64, precision: &ContractPrecision) -> Decimal {
    Decimal::from(lots) * precision.coin_per_lot
}

fn lots_ratio(symbol: &str, coin_quantity: Decimal, precision: &ContractPrecision) -> Result<Decimal> {
    if coin_quantity <= Decimal::ZERO {
        return Err(TraderError::InvalidQuantity {
            symbol: symbol.to_string(),
            quantity: coin_quantity,
            reason: "quantity must be greater than 0".to_string(),
        });
    }

    coin_quantity
        .checked_div(precision.coin_per_lot)
        .ok_or_else(|| TraderError::InvalidQuantity {
            symbol: symbol.to_string(),
            quantity: coin_quantity,
            reason: format!("cannot divide by coin_per_lot {}", precision.coin_per_lot),
        })
}

fn to_lots(symbol: &str, coin_quantity: Decimal, whole: Decimal) -> Result<i64> {
    whole.to_i64().ok_or_else(|| TraderError::InvalidQuantity {
        symbol: symbol.to_string(),
        quantity: coin_quantity,
        reason: format!("{} lots does not fit an order size", whole),
    })
}

/// A contract minimum of 0 still never lets a zero-lot order through.
fn ensure_nonzero(symbol: &str, coin_quantity: Decimal, lots: i64) -> Result<()> {
    if lots <= 0 {
        return Err(TraderError::InvalidQuantity {
            symbol: symbol.to_string(),
            quantity: coin_quantity,
            reason: format!("rounds to {} lots", lots),
        });
    }
    Ok(())
}

fn ensure_minimum(
    symbol: &str,
    coin_quantity: Decimal,
    lots: i64,
    precision: &ContractPrecision,
) -> Result<()> {
    if lots < precision.min_lots {
        return Err(TraderError::BelowMinimum {
            symbol: symbol.to_string(),
            quantity: coin_quantity,
            lots,
            min_lots: precision.min_lots,
        });
    }
    Ok(())
}

/// Converts coin quantities into lot counts using freshly resolved contract metadata.
#[derive(Clone)]
pub struct QuantityConverter {
    resolver: PrecisionResolver,
}

impl QuantityConverter {
    pub fn new(resolver: PrecisionResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PrecisionResolver {
        &self.resolver
    }

    /// Opening-path conversion. Non-positive quantities are rejected before any lookup.
    pub async fn to_lots(&self, symbol: &str, coin_quantity: Decimal) -> Result<i64> {
        if coin_quantity <= Decimal::ZERO {
            return Err(TraderError::InvalidQuantity {
                symbol: symbol.to_string(),
                quantity: coin_quantity,
                reason: "quantity must be greater than 0".to_string(),
            });
        }
        let precision = self.resolver.resolve(symbol).await;
        lots_for_open(symbol, coin_quantity, &precision)
    }
}

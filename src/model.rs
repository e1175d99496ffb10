use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TraderError};
use crate::exchange::adapter::{InitialOrder, PriceBasis, PriceTrigger, RawAccount, RawPosition};

/// Position direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Side {
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "short")]
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }

    /// Sign a lot count for an order that opens this side.
    pub fn opening_lots(&self, lots: i64) -> i64 {
        match self {
            Side::Long => lots,
            Side::Short => -lots,
        }
    }

    /// Sign a lot count for an order that closes this side.
    pub fn closing_lots(&self, lots: i64) -> i64 {
        -self.opening_lots(lots)
    }

    pub fn matches_size(&self, signed_lots: i64) -> bool {
        match self {
            Side::Long => signed_lots > 0,
            Side::Short => signed_lots < 0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Side::Long),
            "short" => Ok(Side::Short),
            other => Err(TraderError::InvalidArgument(format!(
                "position side must be 'long' or 'short', got {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarginMode {
    Isolated,
    Cross,
}

impl MarginMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarginMode::Isolated => "ISOLATED",
            MarginMode::Cross => "CROSS",
        }
    }
}

impl fmt::Display for MarginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtectiveKind {
    StopLoss,
    TakeProfit,
}

impl ProtectiveKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProtectiveKind::StopLoss => "stoploss",
            ProtectiveKind::TakeProfit => "takeprofit",
        }
    }
}

/// Comparison the exchange applies between the basis price and the trigger price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerRule {
    /// Fires when price >= trigger
    AtOrAbove,
    /// Fires when price <= trigger
    AtOrBelow,
}

impl TriggerRule {
    /// Gate.io wire code: 1 is `>=`, 2 is `<=`.
    pub fn code(&self) -> i32 {
        match self {
            TriggerRule::AtOrAbove => 1,
            TriggerRule::AtOrBelow => 2,
        }
    }

    /// Rule for a protective order guarding a position on `side`.
    ///
    /// A stop-loss fires when price moves against the position, a take-profit when it
    /// moves in favour.
    pub fn for_protective(kind: ProtectiveKind, side: Side) -> Self {
        match (kind, side) {
            (ProtectiveKind::StopLoss, Side::Long) => TriggerRule::AtOrBelow,
            (ProtectiveKind::StopLoss, Side::Short) => TriggerRule::AtOrAbove,
            (ProtectiveKind::TakeProfit, Side::Long) => TriggerRule::AtOrAbove,
            (ProtectiveKind::TakeProfit, Side::Short) => TriggerRule::AtOrBelow,
        }
    }
}

/// Per-contract sizing metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractPrecision {
    pub price_precision: u32,
    pub min_lots: i64,
    pub coin_per_lot: Decimal,
}

impl Default for ContractPrecision {
    fn default() -> Self {
        Self {
            price_precision: 3,
            min_lots: 1,
            coin_per_lot: Decimal::ONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountBalance {
    pub total_wallet_balance: Decimal,
    pub total_unrealized_profit: Decimal,
    pub available_balance: Decimal,
}

impl AccountBalance {
    pub fn from_raw(raw: &RawAccount) -> Result<Self> {
        let total_wallet_balance = parse_decimal("total", &raw.total)?;
        let total_unrealized_profit = parse_decimal("unrealised_pnl", &raw.unrealised_pnl)?;
        Ok(Self {
            total_wallet_balance,
            total_unrealized_profit,
            available_balance: total_wallet_balance - total_unrealized_profit,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub signed_lots: i64,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub leverage: u32,
    pub liquidation_price: Decimal,
    pub side: Side,
}

impl Position {
    /// Parse an exchange row. Flat rows yield `Ok(None)`.
    pub fn from_raw(raw: &RawPosition) -> Result<Option<Self>> {
        if raw.size == 0 {
            return Ok(None);
        }

        let leverage = parse_decimal("leverage", &raw.leverage)?;
        let leverage = leverage
            .trunc()
            .to_u32()
            .ok_or_else(|| TraderError::MalformedField {
                field: "leverage",
                value: raw.leverage.clone(),
            })?;

        Ok(Some(Self {
            symbol: raw.contract.clone(),
            signed_lots: raw.size,
            entry_price: parse_decimal("entry_price", &raw.entry_price)?,
            mark_price: parse_decimal("mark_price", &raw.mark_price)?,
            unrealized_pnl: parse_decimal("unrealised_pnl", &raw.unrealised_pnl)?,
            leverage,
            liquidation_price: parse_decimal("liq_price", &raw.liq_price)?,
            side: if raw.size > 0 { Side::Long } else { Side::Short },
        }))
    }

    pub fn lots(&self) -> i64 {
        self.signed_lots.abs()
    }
}

/// Acknowledgement of an opening market order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderAck {
    pub order_id: i64,
    pub symbol: String,
    pub status: String,
    pub price: String,
    pub size: i64,
}

/// Acknowledgement of a closing market order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloseAck {
    pub order_id: i64,
    pub symbol: String,
    pub status: String,
}

/// Standing close-on-trigger order, built per call and handed to the exchange once.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerOrderSpec {
    pub symbol: String,
    pub side: Side,
    pub kind: ProtectiveKind,
    pub trigger_price: Decimal,
    pub rule: TriggerRule,
    pub basis: PriceBasis,
    pub close_existing: bool,
}

impl TriggerOrderSpec {
    pub fn new(symbol: String, side: Side, kind: ProtectiveKind, trigger_price: Decimal) -> Self {
        Self {
            symbol,
            side,
            kind,
            trigger_price,
            rule: TriggerRule::for_protective(kind, side),
            basis: PriceBasis::Mark,
            close_existing: true,
        }
    }

    pub fn trigger(&self) -> PriceTrigger {
        PriceTrigger {
            price: self.trigger_price,
            rule: self.rule,
            basis: self.basis,
        }
    }

    /// Order text must start with `t-`.
    pub fn initial_order(&self, unix_ts: i64) -> InitialOrder {
        InitialOrder {
            contract: self.symbol.clone(),
            size: 0,
            close: self.close_existing,
            text: format!("t-{}-{}-{}", self.kind.label(), self.side, unix_ts),
        }
    }
}

/// Parse an exchange decimal string. Anything unparsable, including an empty string, is
/// a malformed response rather than zero.
pub(crate) fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|_| TraderError::MalformedField {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw_position(contract: &str, size: i64, leverage: &str) -> RawPosition {
        RawPosition {
            contract: contract.to_string(),
            size,
            entry_price: "2500.5".to_string(),
            mark_price: "2510".to_string(),
            unrealised_pnl: "4.75".to_string(),
            leverage: leverage.to_string(),
            liq_price: "1800.1".to_string(),
        }
    }

    #[test]
    fn test_protective_rule_table() {
        use ProtectiveKind::*;
        assert_eq!(TriggerRule::for_protective(StopLoss, Side::Long), TriggerRule::AtOrBelow);
        assert_eq!(TriggerRule::for_protective(StopLoss, Side::Short), TriggerRule::AtOrAbove);
        assert_eq!(TriggerRule::for_protective(TakeProfit, Side::Long), TriggerRule::AtOrAbove);
        assert_eq!(TriggerRule::for_protective(TakeProfit, Side::Short), TriggerRule::AtOrBelow);
    }

    #[test]
    fn test_trigger_rule_codes() {
        assert_eq!(TriggerRule::AtOrAbove.code(), 1);
        assert_eq!(TriggerRule::AtOrBelow.code(), 2);
    }

    #[test]
    fn test_side_parsing_is_lenient_on_case_and_whitespace() {
        assert_eq!(" SHORT ".parse::<Side>().unwrap(), Side::Short);
        assert_eq!("Long".parse::<Side>().unwrap(), Side::Long);
        assert!(matches!(
            "both".parse::<Side>(),
            Err(TraderError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_side_lot_signs() {
        assert_eq!(Side::Long.opening_lots(10), 10);
        assert_eq!(Side::Short.opening_lots(10), -10);
        assert_eq!(Side::Long.closing_lots(50), -50);
        assert_eq!(Side::Short.closing_lots(50), 50);
    }

    #[test]
    fn test_position_from_raw() {
        let pos = Position::from_raw(&raw_position("ETH_USDT", -7, "10"))
            .unwrap()
            .unwrap();
        assert_eq!(pos.side, Side::Short);
        assert_eq!(pos.lots(), 7);
        assert_eq!(pos.leverage, 10);
        assert_eq!(pos.entry_price, dec!(2500.5));
        assert_eq!(pos.liquidation_price, dec!(1800.1));
    }

    #[test]
    fn test_flat_position_is_dropped() {
        assert!(Position::from_raw(&raw_position("ETH_USDT", 0, "5")).unwrap().is_none());
    }

    #[test]
    fn test_unparsable_field_is_an_error_not_zero() {
        let mut raw = raw_position("BTC_USDT", 3, "5");
        raw.mark_price = "n/a".to_string();
        let err = Position::from_raw(&raw).unwrap_err();
        assert!(matches!(err, TraderError::MalformedField { field: "mark_price", .. }));
    }

    #[test]
    fn test_balance_available_excludes_unrealized() {
        let raw = RawAccount {
            total: "1000".to_string(),
            unrealised_pnl: "-25.5".to_string(),
        };
        let balance = AccountBalance::from_raw(&raw).unwrap();
        assert_eq!(balance.available_balance, dec!(1025.5));
    }

    #[test]
    fn test_trigger_spec_defaults() {
        let spec = TriggerOrderSpec::new(
            "ETH_USDT".to_string(),
            Side::Short,
            ProtectiveKind::TakeProfit,
            dec!(3700),
        );
        assert_eq!(spec.rule, TriggerRule::AtOrBelow);
        assert_eq!(spec.basis, PriceBasis::Mark);

        let initial = spec.initial_order(1_700_000_000);
        assert_eq!(initial.size, 0);
        assert!(initial.close);
        assert_eq!(initial.text, "t-takeprofit-short-1700000000");
    }
}

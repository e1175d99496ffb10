use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::exchange::adapter::{ExchangeGateway, RawContract};
use crate::model::{ContractPrecision, parse_decimal};
use crate::symbol::normalize_symbol;

/// Looks up sizing metadata for a contract.
///
/// Metadata is fetched on every call. Lookup failures degrade to
/// [`ContractPrecision::default`] instead of failing the caller.
#[derive(Clone)]
pub struct PrecisionResolver {
    gateway: Arc<dyn ExchangeGateway>,
}

impl PrecisionResolver {
    pub fn new(gateway: Arc<dyn ExchangeGateway>) -> Self {
        Self { gateway }
    }

    pub async fn resolve(&self, symbol: &str) -> ContractPrecision {
        let symbol = normalize_symbol(symbol);

        match self.lookup(&symbol).await {
            Ok(Some(precision)) => {
                info!(
                    symbol = %symbol,
                    price_precision = precision.price_precision,
                    min_lots = precision.min_lots,
                    coin_per_lot = %precision.coin_per_lot,
                    "Resolved contract precision"
                );
                precision
            }
            Ok(None) => {
                warn!(symbol = %symbol, "Contract not listed, using default precision");
                ContractPrecision::default()
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Precision lookup failed, using default precision");
                ContractPrecision::default()
            }
        }
    }

    /// Format a quantity with the contract's price precision, for log lines.
    pub async fn format_quantity(&self, symbol: &str, quantity: Decimal) -> String {
        let precision = self.resolve(symbol).await;
        format!("{:.*}", precision.price_precision as usize, quantity)
    }

    async fn lookup(&self, symbol: &str) -> Result<Option<ContractPrecision>> {
        let contracts = self.gateway.list_contracts().await?;

        contracts
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(symbol))
            .map(precision_from_contract)
            .transpose()
    }
}

fn precision_from_contract(contract: &RawContract) -> Result<ContractPrecision> {
    let mut coin_per_lot = parse_decimal("quanto_multiplier", &contract.quanto_multiplier)?;
    if coin_per_lot.is_zero() {
        coin_per_lot = Decimal::ONE;
    }

    Ok(ContractPrecision {
        price_precision: price_precision_from_round(&contract.order_price_round),
        min_lots: contract.order_size_min.max(0),
        coin_per_lot,
    })
}

/// Decimal places of a price increment string: `"0.001"` -> 3, `"0.50"` -> 1, `"1"` -> 0.
pub fn price_precision_from_round(round: &str) -> u32 {
    match round.split_once('.') {
        Some((_, fraction)) => fraction.trim_end_matches('0').len() as u32,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::mock::{MockGateway, api_error, contract};
    use rust_decimal_macros::dec;

    fn resolver_with(mock: Arc<MockGateway>) -> PrecisionResolver {
        PrecisionResolver::new(mock)
    }

    #[test]
    fn test_price_precision_from_round() {
        assert_eq!(price_precision_from_round("0.001"), 3);
        assert_eq!(price_precision_from_round("0.010"), 2);
        assert_eq!(price_precision_from_round("0.5"), 1);
        assert_eq!(price_precision_from_round("1"), 0);
        assert_eq!(price_precision_from_round("10.000"), 0);
        assert_eq!(price_precision_from_round(""), 0);
    }

    #[tokio::test]
    async fn test_resolve_matches_case_insensitively() {
        let mock = Arc::new(MockGateway::new());
        mock.set_contracts(Ok(vec![
            contract("BTC_USDT", "0.0001", 1, "0.1"),
            contract("eth_usdt", "0.01", 2, "0.05"),
        ]));

        let precision = resolver_with(mock).resolve("ETHUSDT").await;
        assert_eq!(precision.coin_per_lot, dec!(0.01));
        assert_eq!(precision.min_lots, 2);
        assert_eq!(precision.price_precision, 2);
    }

    #[tokio::test]
    async fn test_zero_multiplier_floors_to_one() {
        let mock = Arc::new(MockGateway::new());
        mock.set_contracts(Ok(vec![contract("DOGE_USDT", "0", 1, "0.00001")]));

        let precision = resolver_with(mock).resolve("DOGE_USDT").await;
        assert_eq!(precision.coin_per_lot, Decimal::ONE);
        assert_eq!(precision.price_precision, 5);
    }

    #[tokio::test]
    async fn test_missing_contract_uses_defaults() {
        let mock = Arc::new(MockGateway::new());
        let precision = resolver_with(mock).resolve("XRP_USDT").await;
        assert_eq!(precision, ContractPrecision::default());
    }

    #[tokio::test]
    async fn test_transport_failure_uses_defaults() {
        let mock = Arc::new(MockGateway::new());
        mock.set_contracts(Err(api_error("SERVER_ERROR")));

        let precision = resolver_with(mock).resolve("ETH_USDT").await;
        assert_eq!(
            precision,
            ContractPrecision {
                price_precision: 3,
                min_lots: 1,
                coin_per_lot: Decimal::ONE,
            }
        );
    }

    #[tokio::test]
    async fn test_unparsable_multiplier_uses_defaults() {
        let mock = Arc::new(MockGateway::new());
        mock.set_contracts(Ok(vec![contract("ETH_USDT", "abc", 5, "0.01")]));

        let precision = resolver_with(mock).resolve("ETH_USDT").await;
        assert_eq!(precision, ContractPrecision::default());
    }

    #[tokio::test]
    async fn test_metadata_is_fetched_every_call() {
        let mock = Arc::new(MockGateway::new());
        let resolver = resolver_with(mock.clone());
        resolver.resolve("ETH_USDT").await;
        resolver.resolve("ETH_USDT").await;
        assert_eq!(mock.count("list_contracts"), 2);
    }

    #[tokio::test]
    async fn test_format_quantity_uses_price_precision() {
        let mock = Arc::new(MockGateway::new());
        let formatted = resolver_with(mock).format_quantity("ETH_USDT", dec!(0.1)).await;
        assert_eq!(formatted, "0.10");
    }
}

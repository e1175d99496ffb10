use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::account::AccountCache;
use crate::config::TraderConfig;
use crate::error::{Result, TraderError};
use crate::exchange::adapter::{ExchangeGateway, MarketOrder};
use crate::metrics;
use crate::model::{
    AccountBalance, CloseAck, MarginMode, OrderAck, Position, ProtectiveKind, Side,
    TriggerOrderSpec, parse_decimal,
};
use crate::precision::PrecisionResolver;
use crate::quantity::{QuantityConverter, lots_for_close, lots_to_coin};
use crate::reconciler::{
    Cooldown, LeverageChange, MarginReconcile, PositionReconciler, TokioCooldown,
};
use crate::symbol::normalize_symbol;

/// Result of a best-effort order cleanup. Never aborts a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    Skipped(String),
}

/// Coin-denominated trading on one Gate.io futures account.
///
/// Every workflow is a fixed sequence of exchange calls with no rollback: a failure part way
/// through leaves earlier steps (cancelled orders, a changed leverage) in place. Soft steps
/// log and continue; steps that would leave an unintended exposure return an error.
pub struct GateTrader {
    gateway: Arc<dyn ExchangeGateway>,
    account: Arc<AccountCache>,
    converter: QuantityConverter,
    reconciler: PositionReconciler,
}

impl GateTrader {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, config: &TraderConfig) -> Self {
        Self::with_cooldown(gateway, config, Arc::new(TokioCooldown))
    }

    pub fn with_cooldown(
        gateway: Arc<dyn ExchangeGateway>,
        config: &TraderConfig,
        cooldown: Arc<dyn Cooldown>,
    ) -> Self {
        let account = Arc::new(AccountCache::new(gateway.clone(), config.cache_ttl()));
        let reconciler = PositionReconciler::new(
            gateway.clone(),
            account.clone(),
            cooldown,
            config.leverage_cooldown(),
        );
        let converter = QuantityConverter::new(PrecisionResolver::new(gateway.clone()));

        info!(
            exchange = gateway.name(),
            cache_ttl_secs = config.cache_ttl_secs,
            leverage_cooldown_secs = config.leverage_cooldown_secs,
            "GateTrader initialized"
        );

        Self {
            gateway,
            account,
            converter,
            reconciler,
        }
    }

    pub async fn get_balance(&self) -> Result<AccountBalance> {
        self.account.balance().await
    }

    /// Open positions, served from the cache while it is fresh.
    pub async fn get_positions(&self) -> Result<Vec<Position>> {
        self.account.positions().await
    }

    pub async fn get_market_price(&self, symbol: &str) -> Result<Decimal> {
        let symbol = normalize_symbol(symbol);
        let contract = self.gateway.get_contract(&symbol).await?;
        let price = parse_decimal("last_price", &contract.last_price)?;
        info!(symbol = %symbol, price = %price, "Market price");
        Ok(price)
    }

    pub async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<LeverageChange> {
        if leverage == 0 {
            return Err(TraderError::InvalidArgument(
                "leverage must be greater than 0".to_string(),
            ));
        }
        let symbol = normalize_symbol(symbol);
        self.reconciler.ensure_leverage(&symbol, leverage).await
    }

    pub async fn set_margin_mode(&self, symbol: &str, mode: MarginMode) -> MarginReconcile {
        let symbol = normalize_symbol(symbol);
        self.reconciler.ensure_margin_mode(&symbol, mode).await
    }

    pub async fn cancel_all_orders(&self, symbol: &str) -> Result<()> {
        let symbol = normalize_symbol(symbol);
        self.gateway.cancel_all_orders(&symbol).await?;
        info!(symbol = %symbol, "Cancelled all open orders");
        Ok(())
    }

    pub async fn format_quantity(&self, symbol: &str, quantity: Decimal) -> String {
        self.converter
            .resolver()
            .format_quantity(symbol, quantity)
            .await
    }

    pub async fn open_long(
        &self,
        symbol: &str,
        coin_quantity: Decimal,
        leverage: u32,
    ) -> Result<OrderAck> {
        self.open_position(symbol, coin_quantity, leverage, Side::Long)
            .await
    }

    pub async fn open_short(
        &self,
        symbol: &str,
        coin_quantity: Decimal,
        leverage: u32,
    ) -> Result<OrderAck> {
        self.open_position(symbol, coin_quantity, leverage, Side::Short)
            .await
    }

    /// Close a long. A zero quantity closes the whole position found on the exchange.
    pub async fn close_long(&self, symbol: &str, coin_quantity: Decimal) -> Result<CloseAck> {
        self.close_position(symbol, coin_quantity, Side::Long).await
    }

    /// Close a short. A zero quantity closes the whole position found on the exchange.
    pub async fn close_short(&self, symbol: &str, coin_quantity: Decimal) -> Result<CloseAck> {
        self.close_position(symbol, coin_quantity, Side::Short).await
    }

    pub async fn set_stop_loss(
        &self,
        symbol: &str,
        position_side: &str,
        quantity: Decimal,
        stop_price: Decimal,
    ) -> Result<i64> {
        self.place_protective_order(
            symbol,
            position_side,
            quantity,
            stop_price,
            ProtectiveKind::StopLoss,
        )
        .await
    }

    pub async fn set_take_profit(
        &self,
        symbol: &str,
        position_side: &str,
        quantity: Decimal,
        take_profit_price: Decimal,
    ) -> Result<i64> {
        self.place_protective_order(
            symbol,
            position_side,
            quantity,
            take_profit_price,
            ProtectiveKind::TakeProfit,
        )
        .await
    }

    async fn open_position(
        &self,
        symbol: &str,
        coin_quantity: Decimal,
        leverage: u32,
        side: Side,
    ) -> Result<OrderAck> {
        let action = match side {
            Side::Long => "open_long",
            Side::Short => "open_short",
        };
        let result = self
            .run_open(symbol, coin_quantity, leverage, side, action)
            .await;
        if result.is_err() {
            metrics::inc_order_failure(action);
        }
        result
    }

    async fn run_open(
        &self,
        symbol: &str,
        coin_quantity: Decimal,
        leverage: u32,
        side: Side,
        action: &'static str,
    ) -> Result<OrderAck> {
        let symbol = normalize_symbol(symbol);
        if leverage == 0 {
            return Err(TraderError::InvalidArgument(
                "leverage must be greater than 0".to_string(),
            ));
        }
        if coin_quantity <= Decimal::ZERO {
            return Err(TraderError::InvalidQuantity {
                symbol,
                quantity: coin_quantity,
                reason: "quantity must be greater than 0".to_string(),
            });
        }

        // 1. Clear stale orders (usually there are none)
        self.cancel_orders_best_effort(&symbol, "pre_open").await;

        // 2. Leverage must be right before sizing
        self.reconciler.ensure_leverage(&symbol, leverage).await?;

        // 3. Isolated margin when possible
        self.reconciler
            .ensure_margin_mode(&symbol, MarginMode::Isolated)
            .await;

        // 4. Coin -> lots
        let lots = self.converter.to_lots(&symbol, coin_quantity).await?;

        // 5. Market IOC
        let order = MarketOrder {
            contract: symbol.clone(),
            size: side.opening_lots(lots),
            text: format!("t-{}", action),
        };
        let resp = self
            .gateway
            .submit_market_order(&order)
            .await
            .map_err(|source| TraderError::OrderRejected {
                symbol: symbol.clone(),
                source,
            })?;

        self.account.invalidate_all();
        metrics::inc_order_submitted(action);
        info!(
            symbol = %symbol,
            side = %side,
            coin_quantity = %coin_quantity,
            lots,
            leverage,
            order_id = resp.id,
            status = %resp.status,
            "Position opened"
        );

        Ok(OrderAck {
            order_id: resp.id,
            symbol: resp.contract,
            status: resp.status,
            price: resp.price,
            size: resp.size,
        })
    }

    async fn close_position(
        &self,
        symbol: &str,
        coin_quantity: Decimal,
        side: Side,
    ) -> Result<CloseAck> {
        let action = match side {
            Side::Long => "close_long",
            Side::Short => "close_short",
        };
        let result = self.run_close(symbol, coin_quantity, side, action).await;
        if result.is_err() {
            metrics::inc_order_failure(action);
        }
        result
    }

    async fn run_close(
        &self,
        symbol: &str,
        coin_quantity: Decimal,
        side: Side,
        action: &'static str,
    ) -> Result<CloseAck> {
        let symbol = normalize_symbol(symbol);

        // 1. Whole position when no size was given
        let detected_lots = if coin_quantity.is_zero() {
            let lots = self.detect_position_lots(&symbol, side).await?;
            info!(symbol = %symbol, side = %side, lots, "Auto-detected position size");
            Some(lots)
        } else {
            None
        };

        // 2. Precision falls back to defaults on failure
        let precision = self.converter.resolver().resolve(&symbol).await;

        // 3. Round to the nearest lot
        let coin_quantity = match detected_lots {
            Some(lots) => lots_to_coin(lots, &precision),
            None => coin_quantity,
        };
        let lots = lots_for_close(&symbol, coin_quantity, &precision)?;

        // 4. Opposite-signed market IOC
        let order = MarketOrder {
            contract: symbol.clone(),
            size: side.closing_lots(lots),
            text: format!("t-{}", action),
        };
        let resp = self
            .gateway
            .submit_market_order(&order)
            .await
            .map_err(|source| TraderError::OrderRejected {
                symbol: symbol.clone(),
                source,
            })?;

        self.account.invalidate_all();
        metrics::inc_order_submitted(action);
        info!(
            symbol = %symbol,
            side = %side,
            coin_quantity = %coin_quantity,
            lots,
            order_id = resp.id,
            status = %resp.status,
            price_precision = precision.price_precision,
            coin_per_lot = %precision.coin_per_lot,
            "Position closed"
        );

        // 5. Drop protective orders tied to the closed position
        self.cancel_orders_best_effort(&symbol, "post_close").await;

        Ok(CloseAck {
            order_id: resp.id,
            symbol: resp.contract,
            status: resp.status,
        })
    }

    /// Lot count of the live position on `side`, read from the exchange rather than the
    /// cache so a position opened moments ago is visible.
    async fn detect_position_lots(&self, symbol: &str, side: Side) -> Result<i64> {
        let positions = self.account.live_positions().await?;

        positions
            .iter()
            .find(|p| p.symbol.eq_ignore_ascii_case(symbol) && side.matches_size(p.signed_lots))
            .map(Position::lots)
            .filter(|lots| *lots > 0)
            .ok_or_else(|| TraderError::NoPositionFound {
                symbol: symbol.to_string(),
                side,
            })
    }

    async fn place_protective_order(
        &self,
        symbol: &str,
        position_side: &str,
        quantity: Decimal,
        trigger_price: Decimal,
        kind: ProtectiveKind,
    ) -> Result<i64> {
        let symbol = normalize_symbol(symbol);
        let side: Side = position_side.parse()?;
        if quantity <= Decimal::ZERO {
            return Err(TraderError::InvalidArgument(
                "quantity must be greater than 0".to_string(),
            ));
        }
        if trigger_price <= Decimal::ZERO {
            return Err(TraderError::InvalidArgument(
                "trigger price must be greater than 0".to_string(),
            ));
        }

        let spec = TriggerOrderSpec::new(symbol.clone(), side, kind, trigger_price);
        let trigger = spec.trigger();
        let initial = spec.initial_order(Utc::now().timestamp());

        let ack = self
            .gateway
            .submit_trigger_order(&trigger, &initial)
            .await
            .map_err(|source| {
                metrics::inc_order_failure(kind.label());
                TraderError::TriggerOrderFailed {
                    symbol: symbol.clone(),
                    source,
                }
            })?;

        metrics::inc_order_submitted(kind.label());
        info!(
            symbol = %symbol,
            side = %side,
            kind = kind.label(),
            trigger_price = %trigger_price,
            rule = ?spec.rule,
            trigger_order_id = ack.id,
            "Protective order placed"
        );
        Ok(ack.id)
    }

    async fn cancel_orders_best_effort(&self, symbol: &str, stage: &str) -> CancelOutcome {
        match self.gateway.cancel_all_orders(symbol).await {
            Ok(()) => {
                info!(symbol = %symbol, stage, "Cancelled open orders");
                CancelOutcome::Cancelled
            }
            Err(e) => {
                metrics::inc_soft_failure("cancel_orders");
                warn!(
                    symbol = %symbol,
                    stage,
                    error = %e,
                    "Failed to cancel open orders (possibly none), continuing"
                );
                CancelOutcome::Skipped(e.to_string())
            }
        }
    }
}

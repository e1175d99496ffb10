//! Scriptable in-memory gateway for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::exchange::adapter::{
    ExchangeGateway, GatewayError, InitialOrder, LeverageOutcome, MarginModeOutcome, MarketOrder,
    PriceTrigger, RawAccount, RawContract, RawOrder, RawPosition, RawTriggerAck,
};
use crate::model::MarginMode;
use crate::reconciler::Cooldown;

pub(crate) fn api_error(message: &str) -> GatewayError {
    GatewayError::Api {
        label: "TEST".to_string(),
        message: message.to_string(),
    }
}

pub(crate) fn contract(name: &str, quanto: &str, size_min: i64, price_round: &str) -> RawContract {
    RawContract {
        name: name.to_string(),
        order_price_round: price_round.to_string(),
        order_size_min: size_min,
        quanto_multiplier: quanto.to_string(),
        last_price: "2500.25".to_string(),
    }
}

pub(crate) fn position(contract: &str, size: i64, leverage: &str) -> RawPosition {
    RawPosition {
        contract: contract.to_string(),
        size,
        entry_price: "2500".to_string(),
        mark_price: "2510".to_string(),
        unrealised_pnl: "1.5".to_string(),
        leverage: leverage.to_string(),
        liq_price: "1900".to_string(),
    }
}

pub(crate) struct MockGateway {
    calls: Mutex<Vec<String>>,
    account: Mutex<Result<RawAccount, GatewayError>>,
    positions: Mutex<Result<Vec<RawPosition>, GatewayError>>,
    contracts: Mutex<Result<Vec<RawContract>, GatewayError>>,
    cancel: Mutex<Result<(), GatewayError>>,
    leverage: Mutex<Result<LeverageOutcome, GatewayError>>,
    margin: Mutex<Result<MarginModeOutcome, GatewayError>>,
    order: Mutex<Result<(), GatewayError>>,
    ack_contract: Mutex<Option<String>>,
    trigger: Mutex<Result<RawTriggerAck, GatewayError>>,
    market_orders: Mutex<Vec<MarketOrder>>,
    trigger_orders: Mutex<Vec<(PriceTrigger, InitialOrder)>>,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            account: Mutex::new(Ok(RawAccount {
                total: "1000".to_string(),
                unrealised_pnl: "10".to_string(),
            })),
            positions: Mutex::new(Ok(Vec::new())),
            contracts: Mutex::new(Ok(vec![contract("ETH_USDT", "0.01", 1, "0.01")])),
            cancel: Mutex::new(Ok(())),
            leverage: Mutex::new(Ok(LeverageOutcome::Updated)),
            margin: Mutex::new(Ok(MarginModeOutcome::Updated)),
            order: Mutex::new(Ok(())),
            ack_contract: Mutex::new(None),
            trigger: Mutex::new(Ok(RawTriggerAck { id: 77 })),
            market_orders: Mutex::new(Vec::new()),
            trigger_orders: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_account(&self, account: Result<RawAccount, GatewayError>) {
        *self.account.lock() = account;
    }

    pub(crate) fn set_positions(&self, positions: Result<Vec<RawPosition>, GatewayError>) {
        *self.positions.lock() = positions;
    }

    pub(crate) fn set_contracts(&self, contracts: Result<Vec<RawContract>, GatewayError>) {
        *self.contracts.lock() = contracts;
    }

    pub(crate) fn set_cancel(&self, result: Result<(), GatewayError>) {
        *self.cancel.lock() = result;
    }

    pub(crate) fn set_leverage(&self, result: Result<LeverageOutcome, GatewayError>) {
        *self.leverage.lock() = result;
    }

    pub(crate) fn set_margin(&self, result: Result<MarginModeOutcome, GatewayError>) {
        *self.margin.lock() = result;
    }

    pub(crate) fn set_order(&self, result: Result<(), GatewayError>) {
        *self.order.lock() = result;
    }

    /// Contract name echoed in order acks instead of the submitted one.
    pub(crate) fn set_ack_contract(&self, contract: &str) {
        *self.ack_contract.lock() = Some(contract.to_string());
    }

    pub(crate) fn set_trigger(&self, result: Result<RawTriggerAck, GatewayError>) {
        *self.trigger.lock() = result;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls whose name starts with `prefix`.
    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub(crate) fn market_orders(&self) -> Vec<MarketOrder> {
        self.market_orders.lock().clone()
    }

    pub(crate) fn trigger_orders(&self) -> Vec<(PriceTrigger, InitialOrder)> {
        self.trigger_orders.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    async fn fetch_account(&self) -> Result<RawAccount, GatewayError> {
        self.record("fetch_account".to_string());
        self.account.lock().clone()
    }

    async fn list_positions(&self) -> Result<Vec<RawPosition>, GatewayError> {
        self.record("list_positions".to_string());
        self.positions.lock().clone()
    }

    async fn list_contracts(&self) -> Result<Vec<RawContract>, GatewayError> {
        self.record("list_contracts".to_string());
        self.contracts.lock().clone()
    }

    async fn get_contract(&self, symbol: &str) -> Result<RawContract, GatewayError> {
        self.record(format!("get_contract:{}", symbol));
        let contracts = self.contracts.lock().clone()?;
        contracts
            .into_iter()
            .find(|c| c.name == symbol)
            .ok_or_else(|| api_error("CONTRACT_NOT_FOUND"))
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<(), GatewayError> {
        self.record(format!("cancel_all_orders:{}", symbol));
        self.cancel.lock().clone()
    }

    async fn update_leverage(
        &self,
        symbol: &str,
        leverage: u32,
    ) -> Result<LeverageOutcome, GatewayError> {
        self.record(format!("update_leverage:{}:{}", symbol, leverage));
        self.leverage.lock().clone()
    }

    async fn update_margin_mode(
        &self,
        symbol: &str,
        mode: MarginMode,
    ) -> Result<MarginModeOutcome, GatewayError> {
        self.record(format!("update_margin_mode:{}:{}", symbol, mode));
        self.margin.lock().clone()
    }

    async fn submit_market_order(&self, order: &MarketOrder) -> Result<RawOrder, GatewayError> {
        self.record(format!("submit_market_order:{}:{}", order.contract, order.size));
        self.order.lock().clone()?;
        self.market_orders.lock().push(order.clone());
        Ok(RawOrder {
            id: 1000 + self.market_orders.lock().len() as i64,
            contract: self
                .ack_contract
                .lock()
                .clone()
                .unwrap_or_else(|| order.contract.clone()),
            status: "finished".to_string(),
            price: "2501.1".to_string(),
            size: order.size,
        })
    }

    async fn submit_trigger_order(
        &self,
        trigger: &PriceTrigger,
        initial: &InitialOrder,
    ) -> Result<RawTriggerAck, GatewayError> {
        self.record(format!("submit_trigger_order:{}", initial.contract));
        let ack = self.trigger.lock().clone()?;
        self.trigger_orders
            .lock()
            .push((trigger.clone(), initial.clone()));
        Ok(ack)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Records requested cooldowns instead of sleeping.
#[derive(Default)]
pub(crate) struct RecordingCooldown {
    pub(crate) waits: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Cooldown for RecordingCooldown {
    async fn wait(&self, period: Duration) {
        self.waits.lock().push(period);
    }
}

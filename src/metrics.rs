use once_cell::sync::Lazy;
use prometheus::{
    IntCounter, IntCounterVec, register_int_counter, register_int_counter_vec,
};

pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "gate_trader_cache_lookups_total",
        "Read-cache lookups by cache and result (hit/miss)",
        &["cache", "result"]
    )
    .expect("cache_lookups counter")
});

pub static ORDERS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "gate_trader_orders_submitted_total",
        "Orders accepted by the exchange, by action",
        &["action"]
    )
    .expect("orders_submitted counter")
});

pub static ORDER_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "gate_trader_order_failures_total",
        "Trade workflows that ended in an error, by action",
        &["action"]
    )
    .expect("order_failures counter")
});

pub static LEVERAGE_SWITCHES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "gate_trader_leverage_switches_total",
        "Leverage changes applied on the exchange"
    )
    .expect("leverage_switches counter")
});

pub static SOFT_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "gate_trader_soft_failures_total",
        "Best-effort steps that failed and were skipped, by step",
        &["step"]
    )
    .expect("soft_failures counter")
});

pub fn inc_cache_lookup(cache: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    CACHE_LOOKUPS.with_label_values(&[cache, result]).inc();
}

pub fn inc_order_submitted(action: &str) {
    ORDERS_SUBMITTED.with_label_values(&[action]).inc();
}

pub fn inc_order_failure(action: &str) {
    ORDER_FAILURES.with_label_values(&[action]).inc();
}

pub fn inc_leverage_switch() {
    LEVERAGE_SWITCHES.inc();
}

pub fn inc_soft_failure(step: &str) {
    SOFT_FAILURES.with_label_values(&[step]).inc();
}

pub mod account;
pub mod cache;
pub mod config;
pub mod error;
pub mod exchange;
pub mod metrics;
pub mod model;
pub mod precision;
pub mod quantity;
pub mod reconciler;
pub mod symbol;
pub mod trader;

pub use error::{Result, TraderError};
pub use exchange::adapter::{ExchangeGateway, GatewayError};
pub use exchange::gateio::GateIoGateway;
pub use model::{AccountBalance, CloseAck, MarginMode, OrderAck, Position, Side};
pub use trader::GateTrader;

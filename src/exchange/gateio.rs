use crate::config::GateConfig;
use crate::exchange::adapter::{
    ExchangeGateway, GatewayError, InitialOrder, LeverageOutcome, MarginModeOutcome, MarketOrder,
    PriceTrigger, RawAccount, RawContract, RawOrder, RawPosition, RawTriggerAck,
};
use crate::model::MarginMode;
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sha2::{Digest, Sha512};
use std::time::Duration;
use tracing::debug;

const MAINNET_URL: &str = "https://api.gateio.ws";
const TESTNET_URL: &str = "https://fx-api-testnet.gateio.ws";

const LEVERAGE_UNCHANGED: &str = "No need to change";
const MARGIN_MODE_UNCHANGED: &str = "No need to change margin type";
const MARGIN_MODE_PINNED: &str = "cannot be changed if there exists position";

/// Gate.io error body: `{ "label": "INVALID_SIGNATURE", "message": "..." }`
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    label: String,
    #[serde(default)]
    message: String,
}

/// USDT-settled futures over the Gate.io v4 REST API.
#[derive(Clone)]
pub struct GateIoGateway {
    api_key: String,
    secret_key: String,
    base_url: String,
    settle: String,
    client: Client,
}

impl GateIoGateway {
    pub fn new(config: Option<&GateConfig>) -> Result<Self, GatewayError> {
        let config = config.ok_or(GatewayError::Configuration(
            "Missing Gate.io config".into(),
        ))?;

        let base_url = std::env::var("GATEIO_BASE_URL").ok().or_else(|| config.base_url.clone());
        let base_url = base_url.unwrap_or_else(|| {
            if config.testnet {
                TESTNET_URL.to_string()
            } else {
                MAINNET_URL.to_string()
            }
        });

        Self::with_base_url(config, base_url)
    }

    /// Build against an explicit host, ignoring the environment.
    pub fn with_base_url(config: &GateConfig, base_url: String) -> Result<Self, GatewayError> {
        let api_key = config.api_key.clone().ok_or(GatewayError::Configuration(
            "Missing Gate.io API Key".into(),
        ))?;
        let secret_key = config.secret_key.clone().ok_or(GatewayError::Configuration(
            "Missing Gate.io Secret Key".into(),
        ))?;

        Ok(Self {
            api_key,
            secret_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            settle: config.settle.to_lowercase(),
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| GatewayError::Network(e.to_string()))?,
        })
    }

    fn futures_path(&self, suffix: &str) -> String {
        format!("/api/v4/futures/{}{}", self.settle, suffix)
    }

    fn generate_signature(
        &self,
        method: &str,
        path: &str,
        query: &str,
        body: &str,
        timestamp: &str,
    ) -> Result<String, GatewayError> {
        // Method \n Path \n Query \n Hex(SHA512(Body)) \n Timestamp
        let mut hasher = Sha512::new();
        hasher.update(body.as_bytes());
        let hashed_payload = hex::encode(hasher.finalize());

        let payload = format!(
            "{}\n{}\n{}\n{}\n{}",
            method, path, query, hashed_payload, timestamp
        );

        let mut mac = Hmac::<Sha512>::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| GatewayError::Signing(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, GatewayError> {
        // The signed query must be byte-identical to the one on the wire
        let query_str =
            serde_urlencoded::to_string(query).map_err(|e| GatewayError::Parse(e.to_string()))?;
        let url = if query_str.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query_str)
        };

        let body_str = body.as_ref().map(Value::to_string).unwrap_or_default();
        let timestamp = Utc::now().timestamp().to_string();
        let signature =
            self.generate_signature(method.as_str(), path, &query_str, &body_str, &timestamp)?;

        let mut headers = HeaderMap::new();
        headers.insert("KEY", header_value(&self.api_key)?);
        headers.insert("SIGN", header_value(&signature)?);
        headers.insert("Timestamp", header_value(&timestamp)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!(method = %method, path = %path, query = %query_str, "Gate.io request");

        let mut request_builder = self.client.request(method, &url).headers(headers);
        if !body_str.is_empty() {
            request_builder = request_builder.body(body_str);
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(api_error_from_body(status.as_u16(), &text));
        }

        serde_json::from_str(&text).map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

fn header_value(value: &str) -> Result<HeaderValue, GatewayError> {
    HeaderValue::from_str(value).map_err(|e| GatewayError::Configuration(e.to_string()))
}

fn api_error_from_body(status: u16, text: &str) -> GatewayError {
    match serde_json::from_str::<ApiErrorBody>(text) {
        Ok(body) if !body.label.is_empty() || !body.message.is_empty() => GatewayError::Api {
            label: body.label,
            message: body.message,
        },
        _ => GatewayError::Api {
            label: format!("HTTP_{}", status),
            message: text.to_string(),
        },
    }
}

fn error_mentions(err: &GatewayError, marker: &str) -> bool {
    match err {
        GatewayError::Api { label, message } => {
            message.contains(marker) || label.contains(marker)
        }
        _ => false,
    }
}

pub(crate) fn classify_leverage_error(err: GatewayError) -> Result<LeverageOutcome, GatewayError> {
    if error_mentions(&err, LEVERAGE_UNCHANGED) {
        Ok(LeverageOutcome::AlreadyAtTarget)
    } else {
        Err(err)
    }
}

pub(crate) fn classify_margin_error(
    err: GatewayError,
) -> Result<MarginModeOutcome, GatewayError> {
    if error_mentions(&err, MARGIN_MODE_UNCHANGED) {
        Ok(MarginModeOutcome::AlreadySet)
    } else if error_mentions(&err, MARGIN_MODE_PINNED) {
        Ok(MarginModeOutcome::BlockedByOpenPosition)
    } else {
        Err(err)
    }
}

pub(crate) fn build_order_body(order: &MarketOrder) -> Value {
    json!({
        "contract": order.contract,
        "size": order.size,
        "price": "0",
        "tif": "ioc",
        "text": order.text,
    })
}

pub(crate) fn build_trigger_body(trigger: &PriceTrigger, initial: &InitialOrder) -> Value {
    json!({
        "initial": {
            "contract": initial.contract,
            "size": initial.size,
            "price": "0",
            "tif": "ioc",
            "close": initial.close,
            "text": initial.text,
        },
        "trigger": {
            "strategy_type": 0,
            "price_type": trigger.basis.code(),
            "price": trigger.price.to_string(),
            "rule": trigger.rule.code(),
        },
    })
}

#[async_trait]
impl ExchangeGateway for GateIoGateway {
    async fn fetch_account(&self) -> Result<RawAccount, GatewayError> {
        self.request(Method::GET, &self.futures_path("/accounts"), &[], None)
            .await
    }

    async fn list_positions(&self) -> Result<Vec<RawPosition>, GatewayError> {
        self.request(Method::GET, &self.futures_path("/positions"), &[], None)
            .await
    }

    async fn list_contracts(&self) -> Result<Vec<RawContract>, GatewayError> {
        self.request(Method::GET, &self.futures_path("/contracts"), &[], None)
            .await
    }

    async fn get_contract(&self, symbol: &str) -> Result<RawContract, GatewayError> {
        let path = self.futures_path(&format!("/contracts/{}", symbol));
        self.request(Method::GET, &path, &[], None).await
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<(), GatewayError> {
        let _: Value = self
            .request(
                Method::DELETE,
                &self.futures_path("/orders"),
                &[("contract", symbol.to_string())],
                None,
            )
            .await?;
        Ok(())
    }

    async fn update_leverage(
        &self,
        symbol: &str,
        leverage: u32,
    ) -> Result<LeverageOutcome, GatewayError> {
        let path = self.futures_path(&format!("/positions/{}/leverage", symbol));
        let result: Result<Value, GatewayError> = self
            .request(
                Method::POST,
                &path,
                &[("leverage", leverage.to_string())],
                None,
            )
            .await;

        match result {
            Ok(_) => Ok(LeverageOutcome::Updated),
            Err(e) => classify_leverage_error(e),
        }
    }

    async fn update_margin_mode(
        &self,
        symbol: &str,
        mode: MarginMode,
    ) -> Result<MarginModeOutcome, GatewayError> {
        let body = json!({ "mode": mode.as_str(), "contract": symbol });
        let result: Result<Value, GatewayError> = self
            .request(
                Method::POST,
                &self.futures_path("/dual_comp/positions/cross_mode"),
                &[],
                Some(body),
            )
            .await;

        match result {
            Ok(_) => Ok(MarginModeOutcome::Updated),
            Err(e) => classify_margin_error(e),
        }
    }

    async fn submit_market_order(&self, order: &MarketOrder) -> Result<RawOrder, GatewayError> {
        self.request(
            Method::POST,
            &self.futures_path("/orders"),
            &[],
            Some(build_order_body(order)),
        )
        .await
    }

    async fn submit_trigger_order(
        &self,
        trigger: &PriceTrigger,
        initial: &InitialOrder,
    ) -> Result<RawTriggerAck, GatewayError> {
        self.request(
            Method::POST,
            &self.futures_path("/price_orders"),
            &[],
            Some(build_trigger_body(trigger, initial)),
        )
        .await
    }

    fn name(&self) -> &str {
        "gateio"
    }
}

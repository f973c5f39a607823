//! Backend API seam.
//!
//! [`DashboardApi`] is what controllers call. [`ApiClient`] implements it over any
//! [`HttpTransport`], keeping endpoint paths, query encoding and reply classification
//! in host-testable code.

use async_trait::async_trait;
use futures::stream::LocalBoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{ApiError, decode_document, decode_reply};
use crate::models::{
    CoinPage, CoinQuery, CommandOutput, ConfigDocument, ConfigPaths, LoopCommandReply, Market,
    MarketList, OffersQuery, PriceFeed, ReconcileRequest, SageCoinPage, StatusSnapshot, TokenInfo,
    TokenList, WalletCallReply, WalletKey, WalletKeys, WalletStatus, WriteReply,
};
use crate::runtime::LiveToken;
use crate::sse::{StreamEvent, StreamOutcome, pump};

pub const LOOP_STATUS_PATH: &str = "/api/market-loop/status";
pub const LOOP_START_PATH: &str = "/api/market-loop/start";
pub const LOOP_STOP_PATH: &str = "/api/market-loop/stop";
pub const LOOP_TRIGGER_PATH: &str = "/api/market-loop/trigger";
pub const WALLET_STATUS_PATH: &str = "/api/sage-rpc/status";
pub const WALLET_KEYS_PATH: &str = "/api/sage-rpc/keys";
pub const WALLET_LOGIN_PATH: &str = "/api/sage-rpc/login";
pub const WALLET_CALL_PATH: &str = "/api/sage-rpc/call";
pub const WALLET_COINS_PATH: &str = "/api/sage-rpc/coins";
pub const WALLET_TOKENS_PATH: &str = "/api/sage-rpc/cats";
pub const PRICES_PATH: &str = "/api/prices";
pub const MARKETS_LIST_PATH: &str = "/api/markets-list";
pub const MARKETS_WRITE_PATH: &str = "/api/markets-write";
pub const OFFERS_STATUS_PATH: &str = "/api/offers-status";
pub const OFFERS_RECONCILE_PATH: &str = "/api/offers-reconcile";
pub const CLI_COINS_PATH: &str = "/api/coins-list";
pub const CONFIG_READ_PATH: &str = "/api/config-read";
pub const CONFIG_WRITE_PATH: &str = "/api/config-write";
pub const CONFIG_PATHS_PATH: &str = "/api/config-paths";
pub const DOCTOR_PATH: &str = "/api/doctor";
pub const CONFIG_VALIDATE_PATH: &str = "/api/config-validate";

/// Status code and body text of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

impl RawReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

pub type ByteStream = LocalBoxStream<'static, Result<Vec<u8>, ApiError>>;

/// Raw HTTP against the backend. Paths are absolute (`/api/...`); the transport
/// resolves them against its base URL.
#[async_trait(?Send)]
pub trait HttpTransport {
    async fn get(&self, path: &str) -> Result<RawReply, ApiError>;
    async fn post(&self, path: &str, body: &Value) -> Result<RawReply, ApiError>;
    /// Issues a POST and yields the response body as it arrives.
    async fn post_stream(&self, path: &str, body: &Value) -> Result<ByteStream, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOfferRequest {
    pub pair: String,
    pub size_base_units: u64,
    pub network: String,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoinSplitRequest {
    pub pair: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coin_id: Option<String>,
    pub amount_per_coin: u64,
    pub number_of_coins: u64,
    pub network: String,
    pub no_wait: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoinCombineRequest {
    pub pair: String,
    pub input_coin_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    pub network: String,
    pub no_wait: bool,
}

/// A long-running manager command whose output is streamed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRequest {
    BuildOffer(BuildOfferRequest),
    CoinSplit(CoinSplitRequest),
    CoinCombine(CoinCombineRequest),
}

impl StreamRequest {
    pub fn path(&self) -> &'static str {
        match self {
            Self::BuildOffer(_) => "/api/build-offer/stream",
            Self::CoinSplit(_) => "/api/coin-split/stream",
            Self::CoinCombine(_) => "/api/coin-combine/stream",
        }
    }

    pub fn body(&self) -> Value {
        let encoded = match self {
            Self::BuildOffer(request) => serde_json::to_value(request),
            Self::CoinSplit(request) => serde_json::to_value(request),
            Self::CoinCombine(request) => serde_json::to_value(request),
        };
        encoded.unwrap_or(Value::Null)
    }
}

#[async_trait(?Send)]
pub trait DashboardApi {
    async fn loop_status(&self) -> Result<StatusSnapshot, ApiError>;
    async fn start_loop(&self) -> Result<LoopCommandReply, ApiError>;
    async fn stop_loop(&self) -> Result<LoopCommandReply, ApiError>;
    async fn trigger_loop(&self) -> Result<LoopCommandReply, ApiError>;

    async fn wallet_status(&self) -> Result<WalletStatus, ApiError>;
    async fn wallet_keys(&self) -> Result<Vec<WalletKey>, ApiError>;
    async fn wallet_login(&self, fingerprint: u64) -> Result<Value, ApiError>;
    /// Raw passthrough to a wallet RPC endpoint.
    async fn wallet_call(&self, endpoint: &str, body: Value) -> Result<Value, ApiError>;
    async fn wallet_coins(&self, query: &CoinQuery) -> Result<CoinPage, ApiError>;
    async fn wallet_tokens(&self) -> Result<Vec<TokenInfo>, ApiError>;

    async fn prices(&self) -> Result<PriceFeed, ApiError>;
    async fn markets(&self) -> Result<Vec<Market>, ApiError>;
    /// Overwrites the whole market list.
    async fn write_markets(&self, markets: &[Market]) -> Result<WriteReply, ApiError>;

    async fn offers_status(&self, query: &OffersQuery) -> Result<CommandOutput, ApiError>;
    async fn reconcile_offers(&self, request: &ReconcileRequest) -> Result<CommandOutput, ApiError>;
    async fn cli_coins(&self, asset: Option<&str>) -> Result<CommandOutput, ApiError>;

    async fn read_config(&self) -> Result<ConfigDocument, ApiError>;
    /// Applies dotted-path patches such as `sage_rpc.port`.
    async fn write_config(&self, patches: &Map<String, Value>) -> Result<WriteReply, ApiError>;
    async fn config_paths(&self) -> Result<ConfigPaths, ApiError>;
    async fn doctor(&self) -> Result<CommandOutput, ApiError>;
    async fn validate_config(&self) -> Result<CommandOutput, ApiError>;

    async fn stream(
        &self,
        request: &StreamRequest,
        live: &LiveToken,
        on_event: &mut dyn FnMut(StreamEvent),
    ) -> Result<StreamOutcome, ApiError>;

    async fn cancel_offer(&self, offer_id: &str) -> Result<Value, ApiError> {
        self.wallet_call(
            "cancel_offer",
            json!({"offer_id": offer_id, "fee": 0, "auto_submit": true}),
        )
        .await
    }

    async fn cancel_all_offers(&self, offer_ids: &[String]) -> Result<Value, ApiError> {
        self.wallet_call(
            "cancel_offers",
            json!({"offer_ids": offer_ids, "fee": 0, "auto_submit": true}),
        )
        .await
    }
}

pub struct ApiClient<T> {
    transport: T,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn get_json<R>(&self, path: &str) -> Result<R, ApiError>
    where
        R: for<'de> Deserialize<'de>,
    {
        let reply = self.transport.get(path).await?;
        decode_reply(reply.status, &reply.body)
    }

    async fn post_json<R>(&self, path: &str, body: &Value) -> Result<R, ApiError>
    where
        R: for<'de> Deserialize<'de>,
    {
        let reply = self.transport.post(path, body).await?;
        decode_reply(reply.status, &reply.body)
    }

    async fn get_document<R>(&self, path: &str) -> Result<R, ApiError>
    where
        R: for<'de> Deserialize<'de>,
    {
        let reply = self.transport.get(path).await?;
        decode_document(reply.status, &reply.body)
    }
}

/// Builds `path?key=value&...`, skipping absent values.
pub fn with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let query: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|value| format!("{key}={}", urlencoding::encode(value)))
        })
        .collect();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", query.join("&"))
    }
}

#[async_trait(?Send)]
impl<T: HttpTransport> DashboardApi for ApiClient<T> {
    async fn loop_status(&self) -> Result<StatusSnapshot, ApiError> {
        self.get_json(LOOP_STATUS_PATH).await
    }

    async fn start_loop(&self) -> Result<LoopCommandReply, ApiError> {
        self.post_json(LOOP_START_PATH, &json!({})).await
    }

    async fn stop_loop(&self) -> Result<LoopCommandReply, ApiError> {
        self.post_json(LOOP_STOP_PATH, &json!({})).await
    }

    async fn trigger_loop(&self) -> Result<LoopCommandReply, ApiError> {
        self.post_json(LOOP_TRIGGER_PATH, &json!({})).await
    }

    async fn wallet_status(&self) -> Result<WalletStatus, ApiError> {
        self.get_document(WALLET_STATUS_PATH).await
    }

    async fn wallet_keys(&self) -> Result<Vec<WalletKey>, ApiError> {
        let keys: WalletKeys = self.get_json(WALLET_KEYS_PATH).await?;
        Ok(keys.keys)
    }

    async fn wallet_login(&self, fingerprint: u64) -> Result<Value, ApiError> {
        let reply: WalletCallReply = self
            .post_json(WALLET_LOGIN_PATH, &json!({"fingerprint": fingerprint}))
            .await?;
        Ok(reply.result.unwrap_or(Value::Null))
    }

    async fn wallet_call(&self, endpoint: &str, body: Value) -> Result<Value, ApiError> {
        let reply: WalletCallReply = self
            .post_json(WALLET_CALL_PATH, &json!({"endpoint": endpoint, "body": body}))
            .await?;
        Ok(reply.result.unwrap_or(Value::Null))
    }

    async fn wallet_coins(&self, query: &CoinQuery) -> Result<CoinPage, ApiError> {
        let path = with_query(
            WALLET_COINS_PATH,
            &[
                ("asset_id", query.asset_id.clone()),
                ("limit", Some(query.limit.to_string())),
                ("offset", Some(query.offset.to_string())),
            ],
        );
        let page: SageCoinPage = self.get_json(&path).await?;
        Ok(page.normalize(query.asset_id.as_deref()))
    }

    async fn wallet_tokens(&self) -> Result<Vec<TokenInfo>, ApiError> {
        let tokens: TokenList = self.get_json(WALLET_TOKENS_PATH).await?;
        Ok(tokens.cats)
    }

    async fn prices(&self) -> Result<PriceFeed, ApiError> {
        self.get_json(PRICES_PATH).await
    }

    async fn markets(&self) -> Result<Vec<Market>, ApiError> {
        let list: MarketList = self.get_json(MARKETS_LIST_PATH).await?;
        Ok(list.markets)
    }

    async fn write_markets(&self, markets: &[Market]) -> Result<WriteReply, ApiError> {
        let body = json!({"markets": markets});
        self.post_json(MARKETS_WRITE_PATH, &body).await
    }

    async fn offers_status(&self, query: &OffersQuery) -> Result<CommandOutput, ApiError> {
        let path = with_query(
            OFFERS_STATUS_PATH,
            &[
                ("limit", Some(query.limit.to_string())),
                ("events_limit", Some(query.events_limit.to_string())),
                ("market_id", query.market_id.clone()),
            ],
        );
        self.get_document(&path).await
    }

    async fn reconcile_offers(&self, request: &ReconcileRequest) -> Result<CommandOutput, ApiError> {
        let body = serde_json::to_value(request).map_err(|error| ApiError::Decode {
            message: error.to_string(),
            raw: None,
        })?;
        let reply = self.transport.post(OFFERS_RECONCILE_PATH, &body).await?;
        decode_document(reply.status, &reply.body)
    }

    async fn cli_coins(&self, asset: Option<&str>) -> Result<CommandOutput, ApiError> {
        let path = with_query(CLI_COINS_PATH, &[("asset", asset.map(str::to_string))]);
        self.get_document(&path).await
    }

    async fn read_config(&self) -> Result<ConfigDocument, ApiError> {
        self.get_json(CONFIG_READ_PATH).await
    }

    async fn write_config(&self, patches: &Map<String, Value>) -> Result<WriteReply, ApiError> {
        self.post_json(CONFIG_WRITE_PATH, &json!({"patches": patches}))
            .await
    }

    async fn config_paths(&self) -> Result<ConfigPaths, ApiError> {
        self.get_json(CONFIG_PATHS_PATH).await
    }

    async fn doctor(&self) -> Result<CommandOutput, ApiError> {
        self.get_document(DOCTOR_PATH).await
    }

    async fn validate_config(&self) -> Result<CommandOutput, ApiError> {
        self.get_document(CONFIG_VALIDATE_PATH).await
    }

    async fn stream(
        &self,
        request: &StreamRequest,
        live: &LiveToken,
        on_event: &mut dyn FnMut(StreamEvent),
    ) -> Result<StreamOutcome, ApiError> {
        tracing::info!(path = request.path(), "starting command stream");
        let chunks = self
            .transport
            .post_stream(request.path(), &request.body())
            .await?;
        pump(chunks, live, on_event).await
    }
}

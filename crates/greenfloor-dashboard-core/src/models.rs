//! Typed backend payloads.
//!
//! Every reply the dashboard consumes is decoded into a closed type here. Loosely shaped
//! fields are kept as [`Value`] only where the dashboard renders them verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::format::lenient_timestamp;
use crate::view::Tone;

pub const NATIVE_SYMBOL: &str = "XCH";

/// `xch`/`txch` (any case) and absent identifiers denote the native asset.
pub fn is_native_asset(asset_id: Option<&str>) -> bool {
    match asset_id.map(str::trim) {
        None | Some("") => true,
        Some(asset) => asset.eq_ignore_ascii_case("xch") || asset.eq_ignore_ascii_case("txch"),
    }
}

/// Canonical asset id: `None` for the native asset, otherwise the token id.
pub fn canonical_asset_id(asset_id: Option<&str>) -> Option<String> {
    if is_native_asset(asset_id) {
        None
    } else {
        asset_id.map(|asset| asset.trim().to_string())
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0, value_as_u64))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

pub fn value_as_u64(value: &Value) -> u64 {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|parsed| parsed.is_finite())
}

// ---------------------------------------------------------------------------
// Market loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEventKind {
    CycleDone,
    CycleError,
    Other(String),
}

impl From<String> for LoopEventKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "cycle_done" => Self::CycleDone,
            "cycle_error" => Self::CycleError,
            _ => Self::Other(raw),
        }
    }
}

impl Default for LoopEventKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl LoopEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::CycleDone => "cycle_done",
            Self::CycleError => "cycle_error",
            Self::Other(raw) => raw,
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Self::CycleDone => Tone::Success,
            Self::CycleError => Tone::Error,
            Self::Other(_) => Tone::Neutral,
        }
    }
}

impl<'de> Deserialize<'de> for LoopEventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?
            .map(Self::from)
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoopEvent {
    #[serde(rename = "type", default)]
    pub kind: LoopEventKind,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub can_start: bool,
    #[serde(default)]
    pub sage_connected: bool,
    #[serde(default)]
    pub enabled_markets: u64,
    #[serde(default)]
    pub cycle_count: u64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_cycle_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_result: Option<Value>,
    #[serde(default)]
    pub recent_events: Vec<LoopEvent>,
}

impl StatusSnapshot {
    /// The backend appends events; the card reads newest first.
    pub fn events_newest_first(&self) -> impl Iterator<Item = &LoopEvent> {
        self.recent_events.iter().rev()
    }
}

/// Reply of start/stop/trigger.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LoopCommandReply {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub status: Option<StatusSnapshot>,
    #[serde(default)]
    pub result: Option<Value>,
}

// ---------------------------------------------------------------------------
// Wallet bridge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct WalletStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub sync_status: Option<Value>,
    #[serde(default)]
    pub active_key: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WalletStatus {
    pub fn version_label(&self) -> Option<String> {
        match self.version.as_ref()? {
            Value::String(version) => Some(version.clone()),
            Value::Object(map) => map.get("version").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    }

    /// `synced/total` coins when the wallet reports them.
    pub fn sync_label(&self) -> Option<String> {
        let sync = self.sync_status.as_ref()?.as_object()?;
        let synced = sync.get("synced_coins").map(value_as_u64)?;
        let total = sync.get("total_coins").map(value_as_u64)?;
        Some(format!("{synced}/{total} coins"))
    }

    pub fn active_fingerprint(&self) -> Option<u64> {
        self.active_key
            .as_ref()?
            .get("fingerprint")
            .map(value_as_u64)
            .filter(|fingerprint| *fingerprint != 0)
    }

    pub fn active_key_name(&self) -> Option<String> {
        self.active_key
            .as_ref()?
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WalletKey {
    #[serde(deserialize_with = "lenient_u64")]
    pub fingerprint: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct WalletKeys {
    #[serde(default)]
    pub keys: Vec<WalletKey>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TokenInfo {
    pub asset_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub balance: u64,
}

impl TokenInfo {
    pub fn label(&self) -> String {
        self.ticker
            .clone()
            .or_else(|| self.name.clone())
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| crate::format::short_id(&self.asset_id))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TokenList {
    #[serde(default)]
    pub cats: Vec<TokenInfo>,
}

/// Raw wallet-RPC reply of `send`-style calls.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct WalletCallReply {
    #[serde(default)]
    pub result: Option<Value>,
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ticker {
    #[serde(default)]
    pub base_currency: String,
    #[serde(default)]
    pub target_currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PriceFeed {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub xch_usd: Option<f64>,
    #[serde(default)]
    pub tickers: Vec<Ticker>,
}

impl PriceFeed {
    /// Native/USD price when the feed has a usable one.
    pub fn native_usd(&self) -> Option<f64> {
        self.xch_usd.filter(|price| *price > 0.0)
    }

    pub fn ticker_for(&self, symbol: &str) -> Option<&Ticker> {
        self.tickers
            .iter()
            .find(|ticker| ticker.base_currency.eq_ignore_ascii_case(symbol))
    }
}

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Mode {
    SellOnly,
    BuyOnly,
    #[default]
    TwoSided,
    Other(String),
}

impl From<String> for Mode {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "sell_only" => Self::SellOnly,
            "buy_only" => Self::BuyOnly,
            "two_sided" => Self::TwoSided,
            _ => Self::Other(raw),
        }
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.as_str().to_string()
    }
}

impl Mode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SellOnly => "sell_only",
            Self::BuyOnly => "buy_only",
            Self::TwoSided => "two_sided",
            Self::Other(raw) => raw,
        }
    }
}

fn zero() -> Number {
    Number::from(0_u64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rung {
    #[serde(default = "zero")]
    pub size_base_units: Number,
    #[serde(default)]
    pub target_count: u64,
    #[serde(default)]
    pub split_buffer_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combine_when_excess_factor: Option<Number>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Rung {
    pub fn new(size_base_units: u64, target_count: u64, split_buffer_count: u64) -> Self {
        Self {
            size_base_units: Number::from(size_base_units),
            target_count,
            split_buffer_count,
            combine_when_excess_factor: None,
            extra: Map::new(),
        }
    }

    pub fn size(&self) -> f64 {
        self.size_base_units.as_f64().unwrap_or(0.0)
    }

    /// Coins this rung needs on hand: the target plus its split headroom.
    pub fn coin_count(&self) -> u64 {
        self.target_count.saturating_add(self.split_buffer_count)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ladders {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell: Option<Vec<Rung>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy: Option<Vec<Rung>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A market entry from the markets file. Unknown keys survive a round trip so a
/// whole-list overwrite never drops configuration the dashboard does not model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    #[serde(alias = "market_id", default)]
    pub id: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub base_asset: String,
    #[serde(default)]
    pub base_symbol: String,
    #[serde(default)]
    pub quote_asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_address: Option<String>,
    #[serde(default)]
    pub pricing: Map<String, Value>,
    #[serde(default)]
    pub inventory: Map<String, Value>,
    #[serde(default)]
    pub ladders: Ladders,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Market {
    pub fn named(id: &str) -> Self {
        Self {
            id: id.to_string(),
            enabled: false,
            mode: Mode::default(),
            base_asset: String::new(),
            base_symbol: String::new(),
            quote_asset: "xch".to_string(),
            quote_asset_type: None,
            signer_key_id: None,
            receive_address: None,
            pricing: Map::new(),
            inventory: Map::new(),
            ladders: Ladders::default(),
            extra: Map::new(),
        }
    }

    /// Pair argument understood by the manager CLI, e.g. `byc:xch`.
    pub fn pair(&self) -> String {
        format!(
            "{}:{}",
            self.base_symbol.trim().to_ascii_lowercase(),
            self.quote_asset.trim().to_ascii_lowercase()
        )
    }

    pub fn quote_symbol(&self) -> String {
        if self.quote_is_native() {
            self.quote_asset.trim().to_ascii_uppercase()
        } else {
            crate::format::short_id(&self.quote_asset)
        }
    }

    pub fn display_pair(&self) -> String {
        format!("{}/{}", self.base_symbol, self.quote_symbol())
    }

    pub fn quote_is_native(&self) -> bool {
        is_native_asset(Some(&self.quote_asset))
    }

    pub fn pricing_number(&self, key: &str) -> Option<f64> {
        self.pricing
            .get(key)
            .and_then(value_as_f64)
            .filter(|value| *value > 0.0)
    }

    pub fn label(&self) -> &str {
        if self.id.is_empty() {
            &self.base_symbol
        } else {
            &self.id
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MarketList {
    #[serde(default)]
    pub markets: Vec<Market>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct WriteReply {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub path: Option<String>,
}

// ---------------------------------------------------------------------------
// Coins
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinSource {
    Sage,
    Cli,
}

impl CoinSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sage => "sage",
            Self::Cli => "cli",
        }
    }
}

/// Canonical coin record. `asset_id == None` is the native asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub coin_id: String,
    pub asset_id: Option<String>,
    pub amount: u64,
    pub spendable: bool,
    pub source: CoinSource,
    pub state: Option<String>,
}

/// Coin as reported by the wallet RPC.
#[derive(Debug, Clone, Deserialize)]
pub struct SageCoin {
    #[serde(default, alias = "id")]
    pub coin_id: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub amount: u64,
    #[serde(default)]
    pub spent_height: Option<Value>,
    #[serde(default)]
    pub offer_id: Option<Value>,
    #[serde(default)]
    pub spend_transaction_id: Option<Value>,
}

/// Coin as printed by the manager CLI inventory command.
#[derive(Debug, Clone, Deserialize)]
pub struct CliCoin {
    #[serde(default, alias = "id", alias = "name")]
    pub coin_id: String,
    #[serde(default, alias = "asset")]
    pub asset_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64", alias = "amount_mojos")]
    pub amount: u64,
    #[serde(default)]
    pub state: Option<String>,
}

fn is_set(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

impl Coin {
    /// Spendable iff not spent, not locked in an offer and not in a pending spend.
    pub fn from_sage(raw: SageCoin, asset_id: Option<&str>) -> Self {
        let spendable = !is_set(raw.spent_height.as_ref())
            && !is_set(raw.offer_id.as_ref())
            && !is_set(raw.spend_transaction_id.as_ref());
        let state = if is_set(raw.spent_height.as_ref()) {
            Some("spent")
        } else if is_set(raw.offer_id.as_ref()) {
            Some("in_offer")
        } else if is_set(raw.spend_transaction_id.as_ref()) {
            Some("pending")
        } else {
            None
        };
        Self {
            coin_id: raw.coin_id,
            asset_id: canonical_asset_id(asset_id),
            amount: raw.amount,
            spendable,
            source: CoinSource::Sage,
            state: state.map(str::to_string),
        }
    }

    /// A missing state counts as spendable.
    pub fn from_cli(raw: CliCoin) -> Self {
        let state = raw
            .state
            .map(|state| state.trim().to_ascii_lowercase())
            .filter(|state| !state.is_empty());
        let spendable = state
            .as_deref()
            .is_none_or(|state| matches!(state, "spendable" | "unspent" | "confirmed"));
        Self {
            coin_id: raw.coin_id,
            asset_id: canonical_asset_id(raw.asset_id.as_deref()),
            amount: raw.amount,
            spendable,
            source: CoinSource::Cli,
            state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoinQuery {
    pub asset_id: Option<String>,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoinPage {
    pub coins: Vec<Coin>,
    pub total: Option<u64>,
}

/// Raw wallet-RPC coin page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SageCoinPage {
    #[serde(default)]
    pub coins: Vec<SageCoin>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl SageCoinPage {
    pub fn normalize(self, asset_id: Option<&str>) -> CoinPage {
        CoinPage {
            coins: self
                .coins
                .into_iter()
                .map(|coin| Coin::from_sage(coin, asset_id))
                .collect(),
            total: self.total,
        }
    }
}

/// Extracts coins from the CLI inventory output, which is either a bare list or an
/// object holding one under `coins` or `items`.
pub fn coins_from_cli_output(parsed: &Value) -> Vec<Coin> {
    let list = match parsed {
        Value::Array(items) => Some(items),
        Value::Object(map) => map
            .get("coins")
            .or_else(|| map.get("items"))
            .and_then(Value::as_array),
        _ => None,
    };
    list.into_iter()
        .flatten()
        .filter_map(|item| serde_json::from_value::<CliCoin>(item.clone()).ok())
        .map(Coin::from_cli)
        .collect()
}

pub fn spendable_totals(coins: &[Coin]) -> (u64, u64) {
    coins
        .iter()
        .filter(|coin| coin.spendable)
        .fold((0_u64, 0_u64), |(mass, count), coin| {
            (mass.saturating_add(coin.amount), count + 1)
        })
}

// ---------------------------------------------------------------------------
// Offers, CLI envelope, config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffersQuery {
    pub limit: u32,
    pub events_limit: u32,
    pub market_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileRequest {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_id: Option<String>,
}

/// Envelope every manager CLI invocation is wrapped in.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CommandOutput {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub exit_code: Option<i64>,
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub parsed: Option<Value>,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub cmd: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CommandOutput {
    pub fn parsed(&self) -> Option<&Value> {
        self.parsed.as_ref().filter(|parsed| !parsed.is_null())
    }

    pub fn command_line(&self) -> String {
        self.cmd.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub config: Value,
}

impl ConfigDocument {
    /// Looks up a dotted path such as `sage_rpc.port`.
    pub fn lookup(&self, dotted: &str) -> Option<&Value> {
        dotted
            .split('.')
            .try_fold(&self.config, |node, part| node.get(part))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ConfigPaths {
    #[serde(default)]
    pub program_config: String,
    #[serde(default)]
    pub markets_config: String,
    #[serde(default)]
    pub manager_cmd: String,
    #[serde(default)]
    pub python: String,
}

/// Parses an operator-entered patch value as JSON, falling back to a plain string.
pub fn parse_patch_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn native_asset_detection() {
        assert!(is_native_asset(None));
        assert!(is_native_asset(Some("XCH")));
        assert!(is_native_asset(Some("txch")));
        assert!(!is_native_asset(Some("ae1536f5")));
        assert_eq!(canonical_asset_id(Some("xch")), None);
    }

    #[test]
    fn status_snapshot_tolerates_missing_fields() {
        let snapshot: StatusSnapshot = serde_json::from_value(json!({
            "running": true,
            "last_cycle_at": "garbage",
            "recent_events": [
                {"type": "cycle_start", "message": "a", "at": "2026-01-01T00:00:00+00:00"},
                {"type": "cycle_done", "message": "b", "at": null, "extra": 1}
            ]
        }))
        .expect("snapshot");
        assert!(snapshot.running);
        assert!(snapshot.last_cycle_at.is_none());
        let kinds: Vec<&str> = snapshot
            .events_newest_first()
            .map(|event| event.kind.as_str())
            .collect();
        assert_eq!(kinds, vec!["cycle_done", "cycle_start"]);
    }

    #[test]
    fn market_round_trip_preserves_unknown_keys() {
        let raw = json!({
            "id": "byc_xch",
            "enabled": true,
            "mode": "sell_only",
            "base_asset": "ae15",
            "base_symbol": "BYC",
            "quote_asset": "xch",
            "pricing": {"sell_usd_per_base": 1.01},
            "ladders": {"sell": [{"size_base_units": 10, "target_count": 3, "split_buffer_count": 1, "note": "x"}]},
            "cadence_seconds": 30
        });
        let market: Market = serde_json::from_value(raw.clone()).expect("market");
        assert_eq!(market.mode, Mode::SellOnly);
        assert_eq!(market.pair(), "byc:xch");
        assert_eq!(market.pricing_number("sell_usd_per_base"), Some(1.01));
        let back = serde_json::to_value(&market).expect("serialize");
        assert_eq!(back["cadence_seconds"], json!(30));
        assert_eq!(back["ladders"]["sell"][0]["note"], json!("x"));
        assert_eq!(back["ladders"]["sell"][0]["size_base_units"], json!(10));
        assert!(back.get("signer_key_id").is_none());
    }

    #[test]
    fn market_id_alias_is_accepted() {
        let market: Market =
            serde_json::from_value(json!({"market_id": "m9", "mode": "custom"})).expect("market");
        assert_eq!(market.id, "m9");
        assert_eq!(market.mode, Mode::Other("custom".to_string()));
    }

    #[test]
    fn sage_coins_are_spendable_only_when_unencumbered() {
        let page: SageCoinPage = serde_json::from_value(json!({
            "coins": [
                {"coin_id": "a", "amount": 5, "spent_height": null, "offer_id": null, "spend_transaction_id": null},
                {"coin_id": "b", "amount": "7", "offer_id": "o1"},
                {"coin_id": "c", "amount": 9, "spent_height": 100},
                {"coin_id": "d", "amount": 11, "spend_transaction_id": "t"}
            ],
            "total": 4
        }))
        .expect("page");
        let page = page.normalize(Some("xch"));
        let spendable: Vec<bool> = page.coins.iter().map(|coin| coin.spendable).collect();
        assert_eq!(spendable, vec![true, false, false, false]);
        assert_eq!(page.coins[1].amount, 7);
        assert_eq!(page.coins[1].state.as_deref(), Some("in_offer"));
        assert!(page.coins.iter().all(|coin| coin.asset_id.is_none()));
        assert_eq!(spendable_totals(&page.coins), (5, 1));
    }

    #[test]
    fn cli_coins_normalise_from_either_shape() {
        let coins = coins_from_cli_output(&json!({
            "items": [
                {"coin_id": "a", "asset": "xch", "amount": 3, "state": "CONFIRMED"},
                {"name": "b", "asset_id": "ae15", "amount": 4, "state": "pending"},
                {"id": "c", "amount": 5}
            ]
        }));
        assert_eq!(coins.len(), 3);
        assert!(coins[0].spendable && coins[0].asset_id.is_none());
        assert!(!coins[1].spendable);
        assert_eq!(coins[1].asset_id.as_deref(), Some("ae15"));
        assert!(coins[2].spendable);
        assert!(coins.iter().all(|coin| coin.source == CoinSource::Cli));
        assert_eq!(coins_from_cli_output(&json!([{"coin_id": "z", "amount": 1}])).len(), 1);
    }

    #[test]
    fn wallet_status_labels() {
        let status: WalletStatus = serde_json::from_value(json!({
            "ok": true,
            "connected": true,
            "version": {"version": "0.9.6"},
            "sync_status": {"synced_coins": 10, "total_coins": 12},
            "active_key": {"fingerprint": 123456, "name": "main"}
        }))
        .expect("status");
        assert_eq!(status.version_label().as_deref(), Some("0.9.6"));
        assert_eq!(status.sync_label().as_deref(), Some("10/12 coins"));
        assert_eq!(status.active_fingerprint(), Some(123_456));
        assert_eq!(status.active_key_name().as_deref(), Some("main"));
    }

    #[test]
    fn patch_values_fall_back_to_strings() {
        assert_eq!(parse_patch_value("9257"), json!(9257));
        assert_eq!(parse_patch_value("true"), json!(true));
        assert_eq!(parse_patch_value(" ~/.sage/cert "), json!("~/.sage/cert"));
    }

    #[test]
    fn config_lookup_walks_dotted_paths() {
        let document = ConfigDocument {
            path: None,
            config: json!({"sage_rpc": {"port": 9257}}),
        };
        assert_eq!(document.lookup("sage_rpc.port"), Some(&json!(9257)));
        assert!(document.lookup("sage_rpc.missing").is_none());
    }
}

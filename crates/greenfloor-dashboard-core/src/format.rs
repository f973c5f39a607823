use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

pub const EMPTY_PLACEHOLDER: &str = "—";

/// Renders an integer amount of minimal units in display units,
/// trimming trailing zeros of the fractional part.
pub fn format_mojos(amount: u64, precision: u32) -> String {
    if precision == 0 {
        return amount.to_string();
    }
    let scale = 10_u64.saturating_pow(precision);
    let whole = amount / scale;
    let fraction = amount % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{fraction:0width$}", width = precision as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

pub fn format_amount(amount: u64, precision: u32, symbol: &str) -> String {
    format!("{} {symbol}", format_mojos(amount, precision))
}

/// First and last few characters of a long hex identifier.
pub fn short_id(id: &str) -> String {
    let trimmed = id.trim().trim_start_matches("0x");
    if trimmed.chars().count() <= 14 {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(8).collect();
    let tail: String = trimmed
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{head}…{tail}")
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

pub fn format_timestamp(at: Option<&DateTime<Utc>>) -> String {
    at.map_or_else(
        || EMPTY_PLACEHOLDER.to_string(),
        |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_time_of_day(at: Option<&DateTime<Utc>>) -> String {
    at.map_or_else(
        || EMPTY_PLACEHOLDER.to_string(),
        |at| at.format("%H:%M:%S").to_string(),
    )
}

/// Serde adapter: an absent, null, or unparseable timestamp becomes `None`.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

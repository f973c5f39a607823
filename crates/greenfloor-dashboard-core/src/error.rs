use serde::Deserialize;
use serde_json::Value;

/// Failure of a backend round-trip.
///
/// `Network` and `Decode` are transport-level: controllers render an empty or
/// placeholder state (plus the raw body when one was captured). `Backend` is a
/// logical failure the backend reported and is always surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("failed to decode response: {message}")]
    Decode {
        message: String,
        raw: Option<String>,
    },
    #[error("{message}")]
    Backend { status: u16, message: String },
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Decode { .. })
    }

    /// Raw response text kept for the fallback render, if any.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Self::Decode { raw, .. } => raw.as_deref(),
            _ => None,
        }
    }

    /// Sentence shown to the operator.
    pub fn operator_message(&self) -> String {
        match self {
            Self::Backend { message, .. } => describe_backend_error(message),
            Self::Network(message) => format!("Backend unreachable: {message}"),
            Self::Decode { message, .. } => format!("Unexpected backend response: {message}"),
        }
    }
}

/// Maps backend error codes to readable sentences. Free-form messages pass through.
pub fn describe_backend_error(code: &str) -> String {
    match code.trim() {
        "sage_not_connected" => {
            "Sage wallet is not connected. Enable the Sage RPC server and retry.".to_string()
        }
        "no_enabled_markets" => "No markets are enabled. Enable a market first.".to_string(),
        "endpoint is required" => "Wallet RPC endpoint is required.".to_string(),
        "timeout" => "The backend command timed out.".to_string(),
        "" => "The backend reported a failure without a message.".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct FailureEnvelope {
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Classifies a raw HTTP reply and decodes it into `T`.
///
/// A body carrying `ok: false`, or any non-2xx status, is a backend failure;
/// an unparseable body is a decode failure that keeps the raw text.
pub fn decode_reply<T>(status: u16, raw: &str) -> Result<T, ApiError>
where
    T: for<'de> Deserialize<'de>,
{
    let envelope: Option<FailureEnvelope> = serde_json::from_str(raw).ok();
    let failed_flag = envelope.as_ref().and_then(|envelope| envelope.ok) == Some(false);

    if !(200..=299).contains(&status) || failed_flag {
        let message = envelope
            .as_ref()
            .and_then(|envelope| {
                envelope
                    .error
                    .as_ref()
                    .map(|error| match error {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .or_else(|| envelope.message.clone())
            })
            .unwrap_or_else(|| {
                if failed_flag {
                    String::new()
                } else {
                    format!("request failed with status {status}")
                }
            });
        return Err(ApiError::Backend { status, message });
    }

    serde_json::from_str(raw).map_err(|error| ApiError::Decode {
        message: error.to_string(),
        raw: Some(raw.to_string()),
    })
}

/// Like [`decode_reply`] but keeps `ok: false` bodies as data. Used for replies
/// whose failure flag is part of the payload (wallet status, CLI envelopes).
pub fn decode_document<T>(status: u16, raw: &str) -> Result<T, ApiError>
where
    T: for<'de> Deserialize<'de>,
{
    match serde_json::from_str(raw) {
        Ok(decoded) => Ok(decoded),
        Err(_) if !(200..=299).contains(&status) => decode_reply(status, raw),
        Err(error) => Err(ApiError::Decode {
            message: error.to_string(),
            raw: Some(raw.to_string()),
        }),
    }
}

/// Client-side precondition that blocks the market loop from starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StartBlocked {
    #[error("Sage wallet is not connected. Connect the wallet bridge before starting the loop.")]
    WalletDisconnected,
    #[error("No markets are enabled. Enable at least one market before starting the loop.")]
    NoEnabledMarkets,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Count {
        count: u32,
    }

    #[test]
    fn decode_reply_accepts_success_body() {
        let decoded: Count = decode_reply(200, r#"{"ok":true,"count":3}"#).expect("decoded");
        assert_eq!(decoded, Count { count: 3 });
    }

    #[test]
    fn ok_false_is_a_backend_failure_even_with_200() {
        let error = decode_reply::<Count>(200, r#"{"ok":false,"error":"sage_not_connected"}"#)
            .expect_err("must fail");
        assert_eq!(error, ApiError::backend(200, "sage_not_connected"));
        assert!(error.operator_message().contains("Sage wallet is not connected"));
    }

    #[test]
    fn non_2xx_without_body_reports_status() {
        let error = decode_reply::<Count>(502, "Bad Gateway").expect_err("must fail");
        assert_eq!(
            error,
            ApiError::backend(502, "request failed with status 502")
        );
    }

    #[test]
    fn unparseable_success_keeps_raw_text() {
        let error = decode_reply::<Count>(200, "not json at all").expect_err("must fail");
        assert!(error.is_transport());
        assert_eq!(error.raw_text(), Some("not json at all"));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Flagged {
        ok: bool,
    }

    #[test]
    fn decode_document_keeps_failure_flag_as_data() {
        let decoded: Flagged = decode_document(200, r#"{"ok":false}"#).expect("decoded");
        assert_eq!(decoded, Flagged { ok: false });
        let error = decode_document::<Flagged>(500, "boom").expect_err("must fail");
        assert_eq!(error, ApiError::backend(500, "request failed with status 500"));
    }

    #[test]
    fn structured_error_payload_is_stringified() {
        let error = decode_reply::<Count>(500, r#"{"ok":false,"error":{"code":7}}"#)
            .expect_err("must fail");
        assert_eq!(error, ApiError::backend(500, r#"{"code":7}"#));
    }
}

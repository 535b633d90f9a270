//! Request signing.
//!
//! Every private request carries four headers:
//! `X-API-KEY`, `X-TIMESTAMP`, `X-RECV-WINDOW`, `X-SIGN`, where the
//! signature is hex-encoded HMAC-SHA256 over the concatenation
//! `timestamp + api_key + recv_window + payload`. For GET requests the
//! payload is the canonical query string; for POST it is the JSON body.

use crate::error::{ExchangeError, ExchangeResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_API_KEY: &str = "X-API-KEY";
pub const HEADER_TIMESTAMP: &str = "X-TIMESTAMP";
pub const HEADER_RECV_WINDOW: &str = "X-RECV-WINDOW";
pub const HEADER_SIGN: &str = "X-SIGN";

/// API key pair. The secret is wiped from memory on drop.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    api_secret: Zeroizing<String>,
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: Zeroizing::new(api_secret.into()),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Computes request signatures over venue-aligned timestamps.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: ApiCredentials,
    recv_window_ms: u64,
}

/// Signed header set for one request.
#[derive(Debug)]
pub struct SignedHeaders {
    pub api_key: String,
    pub timestamp: String,
    pub recv_window: String,
    pub signature: String,
}

impl RequestSigner {
    pub fn new(credentials: ApiCredentials, recv_window_ms: u64) -> Self {
        Self {
            credentials,
            recv_window_ms,
        }
    }

    /// Sign a payload (query string for GET, JSON body for POST) at the
    /// given venue-aligned timestamp.
    pub fn sign(&self, timestamp_ms: i64, payload: &str) -> ExchangeResult<SignedHeaders> {
        let timestamp = timestamp_ms.to_string();
        let recv_window = self.recv_window_ms.to_string();
        let message = format!(
            "{timestamp}{}{recv_window}{payload}",
            self.credentials.api_key
        );

        let mut mac = HmacSha256::new_from_slice(self.credentials.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Signing(e.to_string()))?;
        mac.update(message.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(SignedHeaders {
            api_key: self.credentials.api_key.clone(),
            timestamp,
            recv_window,
            signature,
        })
    }
}

/// Canonical query string: keys sorted lexicographically, `k=v` joined
/// with `&`. Both sides must produce byte-identical text for the HMAC to
/// verify, so ordering is part of the contract.
pub fn canonical_query(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);
    sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> RequestSigner {
        RequestSigner::new(ApiCredentials::new("key123", "secret456"), 5000)
    }

    #[test]
    fn test_signature_is_deterministic() {
        let a = signer().sign(1_700_000_000_000, r#"{"symbol":"BTCUSDT"}"#).unwrap();
        let b = signer().sign(1_700_000_000_000, r#"{"symbol":"BTCUSDT"}"#).unwrap();
        assert_eq!(a.signature, b.signature);
        assert_eq!(a.signature.len(), 64);
        assert_eq!(a.timestamp, "1700000000000");
        assert_eq!(a.recv_window, "5000");
    }

    #[test]
    fn test_signature_covers_payload() {
        let a = signer().sign(1_700_000_000_000, "symbol=BTCUSDT").unwrap();
        let b = signer().sign(1_700_000_000_000, "symbol=ETHUSDT").unwrap();
        assert_ne!(a.signature, b.signature);
    }

    #[test]
    fn test_canonical_query_sorted() {
        let q = canonical_query(&[
            ("symbol", "BTCUSDT".to_string()),
            ("category", "linear".to_string()),
        ]);
        assert_eq!(q, "category=linear&symbol=BTCUSDT");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = ApiCredentials::new("key123", "secret456");
        let printed = format!("{creds:?}");
        assert!(!printed.contains("secret456"));
    }
}

use std::sync::Arc;

use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use super::{Protocol, ScoreMeta, ScoreOutcome, ScoringError, ScoringMode, ScoringOptions};
use crate::cache::TtlCache;
use crate::clock::Clock;

pub const MARKETPLACE_URL: &str = "https://api.apilayer.com/email_verification/check";
pub const LEGACY_HTTP_URL: &str = "http://apilayer.net/api/check";
pub const LEGACY_HTTPS_URL: &str = "https://apilayer.net/api/check";

const CLIENT_USER_AGENT: &str = concat!("mailrelay/", env!("CARGO_PKG_VERSION"));

/// Client du fournisseur de score (API compatible mailboxlayer).
///
/// Les réponses valides sont mises en cache par adresse exacte; les erreurs
/// de l'API et les échecs de transport ne le sont pas.
pub struct Scorer {
    client: reqwest::Client,
    api_key: Option<String>,
    enabled: bool,
    mode: ScoringMode,
    endpoint: String,
    cache: TtlCache<ScoreMeta>,
}

impl Scorer {
    pub fn new(options: &ScoringOptions, clock: Arc<dyn Clock>) -> Result<Self, ScoringError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.timeout())
            .build()
            .map_err(ScoringError::client_build)?;

        Ok(Self {
            client,
            api_key: options
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            enabled: options.enabled,
            mode: options.mode,
            endpoint: default_endpoint(options.mode, options.protocol).to_string(),
            cache: TtlCache::new(options.cache_ttl(), clock),
        })
    }

    /// Remplace l'URL de l'API (proxy, serveur de test).
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }

    pub async fn score(&self, email: &str) -> ScoreOutcome {
        let Some(api_key) = self.api_key.as_deref().filter(|_| self.enabled) else {
            return ScoreOutcome::Disabled;
        };
        if let Some(meta) = self.cache.get(email) {
            debug!(email, "score cache hit");
            return ScoreOutcome::Scored(meta);
        }

        let outcome = self.fetch(api_key, email).await;
        if let ScoreOutcome::Scored(meta) = &outcome {
            self.cache.insert(email, meta.clone());
        }
        outcome
    }

    async fn fetch(&self, api_key: &str, email: &str) -> ScoreOutcome {
        let request = self.client.get(&self.endpoint);
        let request = match self.mode {
            ScoringMode::Marketplace => request
                .header("apikey", api_key)
                .query(&[("email", email), ("smtp", "1"), ("format", "1")]),
            ScoringMode::Legacy => request.query(&[
                ("access_key", api_key),
                ("email", email),
                ("smtp", "1"),
                ("format", "1"),
            ]),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return transport_failure(&err),
        };
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return transport_failure(&err),
        };

        if !content_type.contains("application/json") {
            let mime = content_type
                .split(';')
                .next()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or("unknown");
            return unavailable(format!("bad_json_ct_{mime}_sc_{status}"));
        }

        let Ok(json) = serde_json::from_str::<Value>(&body) else {
            return unavailable(format!("bad_json_sc_{status}"));
        };

        if let Some(error) = json.get("error").filter(|e| is_truthy(e)) {
            let code = provider_error_code(error);
            debug!(email, code = %code, "scoring provider returned an error");
            return ScoreOutcome::ProviderError { code };
        }

        match serde_json::from_value::<ScoreMeta>(json) {
            Ok(mut meta) => {
                meta.did_you_mean = meta.did_you_mean.filter(|s| !s.is_empty());
                ScoreOutcome::Scored(meta)
            }
            Err(_) => unavailable(format!("bad_json_sc_{status}")),
        }
    }
}

fn default_endpoint(mode: ScoringMode, protocol: Protocol) -> &'static str {
    match (mode, protocol) {
        (ScoringMode::Marketplace, _) => MARKETPLACE_URL,
        (ScoringMode::Legacy, Protocol::Https) => LEGACY_HTTPS_URL,
        (ScoringMode::Legacy, Protocol::Http) => LEGACY_HTTP_URL,
    }
}

fn transport_failure(err: &reqwest::Error) -> ScoreOutcome {
    debug!(error = %err, "scoring request failed");
    if err.is_timeout() {
        unavailable("timeout".to_string())
    } else {
        unavailable("network_error".to_string())
    }
}

fn unavailable(tag: String) -> ScoreOutcome {
    ScoreOutcome::Unavailable { tag }
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// `error.code`, sinon `error.type`, sinon `api_error`.
pub(crate) fn provider_error_code(error: &Value) -> String {
    let pick = |key: &str| match error.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    };
    pick("code")
        .or_else(|| pick("type"))
        .unwrap_or_else(|| "api_error".to_string())
}

use std::time::Duration;

use serde::Deserialize;

/// Variante d'API de vérification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// `api.apilayer.com`, clé dans l'en-tête `apikey`.
    Marketplace,
    /// `apilayer.net`, clé dans le paramètre `access_key`.
    #[default]
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub mode: ScoringMode,
    /// Ignoré en mode marketplace (toujours HTTPS).
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub min_score: f64,
    #[serde(default = "default_true")]
    pub block_disposable: bool,
    #[serde(default)]
    pub block_role: bool,
    #[serde(default = "default_true")]
    pub accept_free: bool,
    #[serde(default)]
    pub block_catch_all: bool,
    /// Remplace la table des grands fournisseurs exemptés de `smtp_check`.
    #[serde(default)]
    pub smtp_exempt_domains: Option<Vec<String>>,
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_ms() -> u64 {
    7000
}

const fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            mode: ScoringMode::default(),
            protocol: Protocol::default(),
            timeout_ms: default_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            min_score: 0.0,
            block_disposable: true,
            block_role: false,
            accept_free: true,
            block_catch_all: false,
            smtp_exempt_domains: None,
        }
    }
}

impl ScoringOptions {
    /// Activé et muni d'une clé non vide.
    pub fn is_active(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

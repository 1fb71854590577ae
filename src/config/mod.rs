//! Configuration du relais: fichier JSON optionnel, puis variables
//! d'environnement.
//!
//! Chaque section garde ses valeurs par défaut documentées; un champ absent
//! du fichier ne change rien.

mod error;

pub use error::ConfigError;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::dispatch::SenderOptions;
use crate::dns::DnsOptions;
use crate::scoring::ScoringOptions;
use crate::tracking::OpenOptions;

pub const DEFAULT_SEND_DELAY_MS: u64 = 400;
pub const DEFAULT_FOLLOWUP_TEXT: &str =
    "You opened my message but have not replied yet. It has been an hour.";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchOptions {
    /// Pause entre deux envois d'un lot CSV.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,
}

const fn default_send_delay_ms() -> u64 {
    DEFAULT_SEND_DELAY_MS
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            send_delay_ms: default_send_delay_ms(),
        }
    }
}

impl BatchOptions {
    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FollowupOptions {
    #[serde(default = "default_followup_text")]
    pub text: String,
}

fn default_followup_text() -> String {
    DEFAULT_FOLLOWUP_TEXT.to_string()
}

impl Default for FollowupOptions {
    fn default() -> Self {
        Self {
            text: default_followup_text(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub blocklist_file: Option<PathBuf>,
    /// Par défaut `<data_dir>/tokens`.
    #[serde(default)]
    pub tokens_file: Option<PathBuf>,
    /// Journalise les lots webhook bruts dans `events.log`.
    #[serde(default)]
    pub debug_events: bool,
    #[serde(default)]
    pub dns: DnsOptions,
    #[serde(default)]
    pub scoring: ScoringOptions,
    #[serde(default)]
    pub opens: OpenOptions,
    #[serde(default)]
    pub sender: SenderOptions,
    #[serde(default)]
    pub batch: BatchOptions,
    #[serde(default)]
    pub followup: FollowupOptions,
}

fn default_data_dir() -> PathBuf {
    std::env::temp_dir().join("mailrelay-data")
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            blocklist_file: None,
            tokens_file: None,
            debug_events: false,
            dns: DnsOptions::default(),
            scoring: ScoringOptions::default(),
            opens: OpenOptions::default(),
            sender: SenderOptions::default(),
            batch: BatchOptions::default(),
            followup: FollowupOptions::default(),
        }
    }
}

impl RelayConfig {
    /// Fichier optionnel puis environnement du processus.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        let config = Self::from_json(&raw).map_err(|e| ConfigError::parse(path, e))?;
        debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Applique les variables d'environnement lues via `lookup`.
    ///
    /// Les valeurs vides sont ignorées; un nombre illisible garde la valeur
    /// courante.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = var("MAILBOXLAYER_API_KEY") {
            self.scoring.api_key = Some(v);
        }
        if let Some(v) = var("SENDGRID_API_KEY") {
            self.sender.api_key = Some(v);
        }
        if let Some(v) = var("FROM_EMAIL") {
            self.sender.from_email = Some(v);
        }
        if let Some(v) = var("FROM_NAME") {
            self.sender.from_name = v;
        }
        if let Some(v) = var("REPLY_TO") {
            self.sender.reply_to = Some(v);
        }
        if let Some(v) = var("REPLY_TO_NAME") {
            self.sender.reply_to_name = Some(v);
        }
        if let Some(v) = var("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("BLOCKLIST_FILE") {
            self.blocklist_file = Some(PathBuf::from(v));
        }
        if let Some(v) = var("OPEN_PROXY_MIN_SECONDS") {
            parse_into(&mut self.opens.proxy_min_seconds, "OPEN_PROXY_MIN_SECONDS", &v);
        }
        if let Some(v) = var("OPEN_MIN_OPENS_SOFT") {
            parse_into(&mut self.opens.min_opens_soft, "OPEN_MIN_OPENS_SOFT", &v);
        }
        if let Some(v) = var("OPEN_HARD_IGNORE_UA") {
            self.opens.hard_ignore_ua = v;
        }
        if let Some(v) = var("OPEN_SOFT_PROXY_UA") {
            self.opens.soft_proxy_ua = v;
        }
        if let Some(v) = var("PRIMARY_MODE") {
            self.sender.primary_mode = parse_bool(&v);
        }
        if let Some(v) = var("DEBUG_EVENTS") {
            self.debug_events = parse_bool(&v);
        }
        if let Some(v) = var("FOLLOWUP_TEXT") {
            self.followup.text = v;
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("db.json")
    }

    /// Réglages de relance modifiables à chaud.
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn tag_index_path(&self) -> PathBuf {
        self.data_dir.join("tags.csv")
    }

    pub fn opened_no_reply_path(&self) -> PathBuf {
        self.data_dir.join("opened_no_reply.txt")
    }

    pub fn counters_path(&self) -> PathBuf {
        self.data_dir.join("counters.json")
    }

    pub fn events_log_path(&self) -> PathBuf {
        self.data_dir.join("events.log")
    }

    pub fn tokens_path(&self) -> PathBuf {
        self.tokens_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("tokens"))
    }
}

/// `1`, `true`, `yes`, `on` (casse ignorée).
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_into<T: std::str::FromStr>(slot: &mut T, key: &str, value: &str) {
    match value.parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value, "ignoring non-numeric environment value"),
    }
}

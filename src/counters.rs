//! Compteurs journaliers (`sent`, `delivered`, `opens`), globaux et par jeton.
//!
//! Les incréments sont best effort: un échec d'écriture est journalisé et
//! n'interrompt jamais le traitement d'un événement.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Clock;
use crate::store::write_all_atomically;

pub const DEFAULT_SERIES_DAYS: u32 = 30;
pub const MAX_SERIES_DAYS: u32 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Sent,
    Delivered,
    Opens,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCounts {
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub delivered: u64,
    #[serde(default)]
    pub opens: u64,
}

impl DayCounts {
    pub fn get(&self, kind: CounterKind) -> u64 {
        match kind {
            CounterKind::Sent => self.sent,
            CounterKind::Delivered => self.delivered,
            CounterKind::Opens => self.opens,
        }
    }

    fn bump(&mut self, kind: CounterKind) {
        match kind {
            CounterKind::Sent => self.sent += 1,
            CounterKind::Delivered => self.delivered += 1,
            CounterKind::Opens => self.opens += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCounts {
    #[serde(default)]
    pub by_date: BTreeMap<String, DayCounts>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    #[serde(default)]
    pub by_date: BTreeMap<String, DayCounts>,
    #[serde(default)]
    pub by_token: BTreeMap<String, TokenCounts>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Point {
    pub date: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSet {
    pub sent: Vec<Point>,
    pub delivered: Vec<Point>,
    pub opens: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series {
    pub period: String,
    pub series: SeriesSet,
}

fn day_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

impl Counters {
    pub fn increment(&mut self, kind: CounterKind, at: DateTime<Utc>, token: Option<&str>) {
        let day = day_key(at);
        self.by_date.entry(day.clone()).or_default().bump(kind);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.by_token
                .entry(token.to_string())
                .or_default()
                .by_date
                .entry(day)
                .or_default()
                .bump(kind);
        }
    }

    /// Série sur `days` jours se terminant à `end` (inclus), complétée par des zéros.
    ///
    /// Un jeton absent de `known_tokens` (quand l'ensemble n'est pas vide)
    /// donne une série vide.
    pub fn series(
        &self,
        days: u32,
        end: NaiveDate,
        token: Option<&str>,
        known_tokens: &HashSet<String>,
    ) -> Series {
        let days = days.clamp(1, MAX_SERIES_DAYS);
        let empty = BTreeMap::new();
        let by_date = match token.map(str::trim).filter(|t| !t.is_empty()) {
            None => &self.by_date,
            Some(token) if !known_tokens.is_empty() && !known_tokens.contains(token) => &empty,
            Some(token) => self.by_token.get(token).map_or(&empty, |t| &t.by_date),
        };

        let start = end
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .unwrap_or(NaiveDate::MIN);
        let dates: Vec<String> = start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect();

        let points = |kind: CounterKind| -> Vec<Point> {
            dates
                .iter()
                .map(|date| Point {
                    date: date.clone(),
                    value: by_date.get(date).map_or(0, |c| c.get(kind)),
                })
                .collect()
        };

        Series {
            period: format!(
                "{}..{}",
                dates.first().map_or("", String::as_str),
                dates.last().map_or("", String::as_str)
            ),
            series: SeriesSet {
                sent: points(CounterKind::Sent),
                delivered: points(CounterKind::Delivered),
                opens: points(CounterKind::Opens),
            },
        }
    }
}

/// Destination des incréments.
pub trait CounterSink: Send + Sync {
    fn increment(&self, kind: CounterKind, at: DateTime<Utc>, token: Option<&str>);

    /// État courant, pour les séries.
    fn totals(&self) -> Counters;
}

/// `counters.json` dans le répertoire de données.
#[derive(Debug)]
pub struct CounterFile {
    path: PathBuf,
    lock: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl CounterFile {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fichier absent ou illisible: compteurs vides.
    pub fn load(&self) -> Counters {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %self.path.display(), error = %err, "counters file unreadable, starting empty");
                Counters::default()
            }),
            Err(_) => Counters::default(),
        }
    }

    fn save(&self, counters: &Counters) -> std::io::Result<()> {
        let bytes = serde_json::to_vec_pretty(counters)?;
        write_all_atomically(&self.path, &bytes)
    }
}

impl CounterSink for CounterFile {
    fn increment(&self, kind: CounterKind, at: DateTime<Utc>, token: Option<&str>) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut counters = self.load();
        counters.increment(kind, at, token);
        counters.updated_at = Some(self.clock.now());
        if let Err(err) = self.save(&counters) {
            warn!(path = %self.path.display(), error = %err, "counter update failed");
        }
    }

    fn totals(&self) -> Counters {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load()
    }
}

/// Compteurs en mémoire.
#[derive(Debug, Default)]
pub struct MemoryCounters {
    inner: Mutex<Counters>,
}

impl MemoryCounters {
    pub fn snapshot(&self) -> Counters {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CounterSink for MemoryCounters {
    fn increment(&self, kind: CounterKind, at: DateTime<Utc>, token: Option<&str>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .increment(kind, at, token);
    }

    fn totals(&self) -> Counters {
        self.snapshot()
    }
}

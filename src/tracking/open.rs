use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};

use super::{OpenOptions, TrackingError};
use crate::store::MessageRecord;

/// Décision prise pour un signal d'ouverture brut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenDecision {
    /// Scanner/robot: aucun état modifié.
    Ignored,
    /// Compté mais pas encore confirmé (probable préchargement par proxy).
    Deferred { age_secs: i64, open_count: u32 },
    AlreadyConfirmed { open_count: u32 },
    /// Première ouverture confirmée: l'appelant incrémente `opens`.
    Confirmed { age_secs: i64, open_count: u32 },
}

/// Distingue les vraies ouvertures des préchargements (proxy, scanners).
#[derive(Debug, Clone)]
pub struct OpenPolicy {
    hard_ignore: Regex,
    soft_proxy: Regex,
    proxy_min_seconds: i64,
    min_opens_soft: u32,
}

impl OpenPolicy {
    pub fn new(options: &OpenOptions) -> Result<Self, TrackingError> {
        let build = |name: &'static str, pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|err| TrackingError::pattern(name, err))
        };
        Ok(Self {
            hard_ignore: build("hard-ignore", &options.hard_ignore_ua)?,
            soft_proxy: build("soft-proxy", &options.soft_proxy_ua)?,
            proxy_min_seconds: options.proxy_min_seconds,
            min_opens_soft: options.min_opens_soft,
        })
    }

    pub fn is_hard_ignored(&self, user_agent: &str) -> bool {
        self.hard_ignore.is_match(user_agent)
    }

    pub fn is_soft_proxy(&self, user_agent: &str) -> bool {
        self.soft_proxy.is_match(user_agent)
    }

    /// Applique un signal d'ouverture à `record`.
    ///
    /// Hors `Ignored`, le compteur et `firstOpenAt`/`lastOpenAt` sont mis à
    /// jour. `openedAt` n'est posé qu'une fois, sur confirmation.
    pub fn classify(
        &self,
        record: &mut MessageRecord,
        at: DateTime<Utc>,
        user_agent: &str,
    ) -> OpenDecision {
        if self.is_hard_ignored(user_agent) {
            return OpenDecision::Ignored;
        }

        record.open_count += 1;
        record.first_open_at.get_or_insert(at);
        record.last_open_at = Some(at);
        let open_count = record.open_count;

        if record.opened_at.is_some() {
            return OpenDecision::AlreadyConfirmed { open_count };
        }

        let age_secs = record
            .sent_at
            .map_or(0, |sent| (at - sent).num_milliseconds().div_euclid(1000));
        let confirmed = !self.is_soft_proxy(user_agent)
            || age_secs >= self.proxy_min_seconds
            || open_count >= self.min_opens_soft;

        if !confirmed {
            return OpenDecision::Deferred {
                age_secs,
                open_count,
            };
        }

        record.opened_at = Some(at);
        record.opened_logged = true;
        OpenDecision::Confirmed {
            age_secs,
            open_count,
        }
    }
}

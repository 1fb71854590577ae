use std::collections::HashSet;
use std::fmt;

use phf::phf_set;
use serde::Serialize;

use super::{ScoreMeta, ScoringOptions};

/// Grands fournisseurs dont le `smtp_check` négatif n'est pas fiable.
pub static MAJOR_PROVIDERS: phf::Set<&'static str> = phf_set! {
    "gmail.com",
    "googlemail.com",
    "outlook.com",
    "hotmail.com",
    "live.com",
    "msn.com",
    "yahoo.com",
    "icloud.com",
    "me.com",
    "proton.me",
    "protonmail.com",
    "yandex.ru",
    "yandex.com",
    "mail.ru",
    "bk.ru",
    "inbox.ru",
    "list.ru",
};

/// Règle métier qui a rejeté une adresse scorée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleViolation {
    Disposable,
    Role,
    FreeMailBlocked,
    SmtpFalse,
    CatchAll,
    LowScore,
}

impl RuleViolation {
    pub fn code(self) -> &'static str {
        match self {
            Self::Disposable => "mailboxlayer_disposable",
            Self::Role => "mailboxlayer_role",
            Self::FreeMailBlocked => "mailboxlayer_free_mail_blocked",
            Self::SmtpFalse => "mailboxlayer_smtp_false",
            Self::CatchAll => "mailboxlayer_catch_all",
            Self::LowScore => "mailboxlayer_low_score",
        }
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Règles appliquées à un score, dans l'ordre; la première qui échoue gagne.
#[derive(Debug, Clone)]
pub struct ScoreRules {
    pub block_disposable: bool,
    pub block_role: bool,
    pub accept_free: bool,
    pub block_catch_all: bool,
    pub min_score: f64,
    exempt_domains: HashSet<String>,
}

impl Default for ScoreRules {
    fn default() -> Self {
        Self::from_options(&ScoringOptions::default())
    }
}

impl ScoreRules {
    pub fn from_options(options: &ScoringOptions) -> Self {
        let rules = Self {
            block_disposable: options.block_disposable,
            block_role: options.block_role,
            accept_free: options.accept_free,
            block_catch_all: options.block_catch_all,
            min_score: options.min_score,
            exempt_domains: MAJOR_PROVIDERS.iter().map(|d| d.to_string()).collect(),
        };
        match &options.smtp_exempt_domains {
            Some(domains) => rules.with_exempt_domains(domains.iter().map(String::as_str)),
            None => rules,
        }
    }

    /// Remplace la table d'exemption `smtp_check`.
    pub fn with_exempt_domains<'a>(mut self, domains: impl IntoIterator<Item = &'a str>) -> Self {
        self.exempt_domains = domains
            .into_iter()
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        self
    }

    pub fn is_exempt(&self, domain: &str) -> bool {
        self.exempt_domains.contains(&domain.to_ascii_lowercase())
    }

    pub fn evaluate(&self, domain: &str, meta: &ScoreMeta) -> Option<RuleViolation> {
        if self.block_disposable && meta.disposable == Some(true) {
            return Some(RuleViolation::Disposable);
        }
        if self.block_role && meta.role == Some(true) {
            return Some(RuleViolation::Role);
        }
        if !self.accept_free && meta.free == Some(true) {
            return Some(RuleViolation::FreeMailBlocked);
        }
        if meta.smtp_check == Some(false) && !self.is_exempt(domain) {
            return Some(RuleViolation::SmtpFalse);
        }
        if self.block_catch_all && meta.catch_all == Some(true) {
            return Some(RuleViolation::CatchAll);
        }
        match meta.score {
            Some(score) if score < self.min_score => Some(RuleViolation::LowScore),
            _ => None,
        }
    }
}

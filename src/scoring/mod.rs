//! Score de délivrabilité via une API tierce, et règles métier associées.

mod client;
mod error;
mod options;
mod rules;
mod types;

pub use client::{LEGACY_HTTP_URL, LEGACY_HTTPS_URL, MARKETPLACE_URL, Scorer};
pub use error::ScoringError;
pub use options::{Protocol, ScoringMode, ScoringOptions};
pub use rules::{MAJOR_PROVIDERS, RuleViolation, ScoreRules};
pub use types::{ScoreMeta, ScoreOutcome};

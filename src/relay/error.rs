use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::pipeline::Verdict;
use crate::scoring::ScoringError;
use crate::store::StoreError;
use crate::tracking::TrackingError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("recipient address and text or html are required")]
    MissingFields,
    #[error("{email} is on the block list")]
    Blocklisted { email: String },
    #[error("invalid_email {email}: {}", describe(.verdict))]
    Rejected { email: String, verdict: Verdict },
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl RelayError {
    /// Refus lié à l'adresse elle-même (pas une panne).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Blocklisted { .. } | Self::Rejected { .. })
    }
}

fn describe(verdict: &Verdict) -> String {
    let text = verdict
        .reason
        .as_ref()
        .map_or_else(|| "unknown reason".to_string(), |r| r.text());
    match verdict.meta.as_ref().and_then(|m| m.did_you_mean.as_deref()) {
        Some(hint) => format!("{text} (did you mean {hint}?)"),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Reason;
    use crate::scoring::{RuleViolation, ScoreMeta};

    #[test]
    fn rejection_message_carries_reason_text_and_hint() {
        let meta = ScoreMeta {
            did_you_mean: Some("bob@gmail.com".to_string()),
            ..ScoreMeta::default()
        };
        let err = RelayError::Rejected {
            email: "bob@gmial.com".to_string(),
            verdict: Verdict::reject(Reason::Rule(RuleViolation::Disposable), Some(meta)),
        };
        let message = err.to_string();
        assert!(message.starts_with("invalid_email bob@gmial.com: "), "{message}");
        assert!(message.ends_with("(did you mean bob@gmail.com?)"), "{message}");
        assert!(err.is_rejection());
        assert!(!RelayError::MissingFields.is_rejection());
    }
}

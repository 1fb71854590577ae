//! Pipeline de délivrabilité: syntaxe → résolution du domaine → score.
//!
//! [`Pipeline::validate`] ne modifie aucun état persistant; seuls les caches
//! du résolveur et du score sont alimentés.

mod reasons;
mod types;

pub use reasons::reason_text;
pub use types::{Reason, Verdict};

use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::dns::{DnsOptions, DomainResolver};
use crate::scoring::{ScoreOutcome, ScoreRules, Scorer, ScoringError, ScoringOptions};
use crate::validator::parse_address;

pub struct Pipeline {
    resolver: DomainResolver,
    scorer: Scorer,
    rules: ScoreRules,
}

impl Pipeline {
    pub fn new(resolver: DomainResolver, scorer: Scorer, rules: ScoreRules) -> Self {
        info!(
            scorer_active = scorer.is_active(),
            mode = ?scorer.mode(),
            endpoint = scorer.endpoint(),
            min_score = rules.min_score,
            "deliverability pipeline ready"
        );
        Self {
            resolver,
            scorer,
            rules,
        }
    }

    pub fn from_options(
        dns: &DnsOptions,
        scoring: &ScoringOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ScoringError> {
        let resolver = DomainResolver::from_options(dns, clock.clone());
        let scorer = Scorer::new(scoring, clock)?;
        Ok(Self::new(resolver, scorer, ScoreRules::from_options(scoring)))
    }

    pub async fn validate(&self, email: &str) -> Verdict {
        let email = email.trim();
        let Some(address) = parse_address(email) else {
            return Verdict::reject(Reason::BadSyntax, None);
        };
        if !self.resolver.resolvable(&address.ascii_domain).await {
            return Verdict::reject(Reason::BadDomain, None);
        }

        let verdict = match self.scorer.score(email).await {
            ScoreOutcome::Disabled => Verdict::accept(None),
            ScoreOutcome::Unavailable { tag } => Verdict::warn(Reason::ScorerUnavailable(tag)),
            ScoreOutcome::ProviderError { code } => Verdict::warn(Reason::ScorerError(code)),
            ScoreOutcome::Scored(meta) => match self.rules.evaluate(&address.ascii_domain, &meta) {
                Some(rule) => Verdict::reject(Reason::Rule(rule), Some(meta)),
                None => Verdict::accept(Some(meta)),
            },
        };
        debug!(email, ok = verdict.ok, reason = ?verdict.reason_code(), "address validated");
        verdict
    }
}

#[cfg(test)]
mod tests;

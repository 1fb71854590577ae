use std::borrow::Cow;

use serde::{Serialize, Serializer};

use super::reason_text;
use crate::scoring::{RuleViolation, ScoreMeta};

#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    BadSyntax,
    BadDomain,
    Rule(RuleViolation),
    /// Avertissement: le fournisseur de score n'a pas répondu.
    ScorerUnavailable(String),
    /// Avertissement: le fournisseur de score a renvoyé une erreur.
    ScorerError(String),
}

impl Reason {
    pub fn code(&self) -> Cow<'static, str> {
        match self {
            Self::BadSyntax => Cow::Borrowed("bad_syntax"),
            Self::BadDomain => Cow::Borrowed("bad_domain"),
            Self::Rule(rule) => Cow::Borrowed(rule.code()),
            Self::ScorerUnavailable(tag) => Cow::Owned(format!("mailboxlayer_unavailable_{tag}")),
            Self::ScorerError(code) => Cow::Owned(format!("mailboxlayer_error_{code}")),
        }
    }

    pub fn text(&self) -> String {
        reason_text(&self.code()).into_owned()
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::ScorerUnavailable(_) | Self::ScorerError(_))
    }
}

impl Serialize for Reason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

/// Résultat du pipeline pour une adresse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ScoreMeta>,
}

impl Verdict {
    pub fn accept(meta: Option<ScoreMeta>) -> Self {
        Self {
            ok: true,
            reason: None,
            meta,
        }
    }

    pub fn warn(reason: Reason) -> Self {
        Self {
            ok: true,
            reason: Some(reason),
            meta: None,
        }
    }

    pub fn reject(reason: Reason, meta: Option<ScoreMeta>) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
            meta,
        }
    }

    pub fn reason_code(&self) -> Option<Cow<'static, str>> {
        self.reason.as_ref().map(Reason::code)
    }

    /// Résumé court du score: `score=0.8, smtp=ok, disp=0, role=0`,
    /// `unavail_<tag>` ou `err_<code>`.
    pub fn scorer_summary(&self) -> Option<String> {
        match (&self.reason, &self.meta) {
            (Some(Reason::ScorerUnavailable(tag)), _) => Some(format!("unavail_{tag}")),
            (Some(Reason::ScorerError(code)), _) => Some(format!("err_{code}")),
            (_, Some(meta)) => {
                let score = meta
                    .score
                    .map_or_else(|| "n/a".to_string(), |s| s.to_string());
                let smtp = match meta.smtp_check {
                    Some(true) => "ok",
                    Some(false) => "fail",
                    None => "n/a",
                };
                Some(format!(
                    "score={score}, smtp={smtp}, disp={}, role={}",
                    u8::from(meta.disposable == Some(true)),
                    u8::from(meta.role == Some(true)),
                ))
            }
            _ => None,
        }
    }
}

use serde::{Deserialize, Serialize};

/// Métadonnées renvoyées par le fournisseur de score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch_all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_check: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did_you_mean: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    /// Fonction coupée ou sans clé: pas d'avis.
    Disabled,
    Scored(ScoreMeta),
    /// L'API a répondu avec un objet `error`.
    ProviderError { code: String },
    /// Transport ou décodage en échec (`timeout`, `network_error`, `bad_json_*`).
    Unavailable { tag: String },
}

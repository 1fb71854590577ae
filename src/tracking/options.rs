use serde::Deserialize;

pub const DEFAULT_HARD_IGNORE_UA: &str = "(Proofpoint|Barracuda|Mimecast|urlresolver|spider|crawler|facebookexternalhit|Slackbot|Twitterbot|Discordbot|python-requests|curl|wget)";
pub const DEFAULT_SOFT_PROXY_UA: &str = "(GoogleImageProxy|CFNetwork)";

/// Seuils de confirmation des ouvertures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpenOptions {
    /// Âge minimal (secondes depuis l'envoi) d'une ouverture via proxy.
    #[serde(default = "default_proxy_min_seconds")]
    pub proxy_min_seconds: i64,
    /// Nombre d'ouvertures à partir duquel un proxy compte quand même.
    #[serde(default = "default_min_opens_soft")]
    pub min_opens_soft: u32,
    #[serde(default = "default_hard_ignore_ua")]
    pub hard_ignore_ua: String,
    #[serde(default = "default_soft_proxy_ua")]
    pub soft_proxy_ua: String,
}

const fn default_proxy_min_seconds() -> i64 {
    20
}

const fn default_min_opens_soft() -> u32 {
    2
}

fn default_hard_ignore_ua() -> String {
    DEFAULT_HARD_IGNORE_UA.to_string()
}

fn default_soft_proxy_ua() -> String {
    DEFAULT_SOFT_PROXY_UA.to_string()
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            proxy_min_seconds: default_proxy_min_seconds(),
            min_opens_soft: default_min_opens_soft(),
            hard_ignore_ua: default_hard_ignore_ua(),
            soft_proxy_ua: default_soft_proxy_ua(),
        }
    }
}

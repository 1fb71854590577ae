use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("invalid {name} user-agent pattern: {source}")]
    InvalidPattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
}

impl TrackingError {
    pub(crate) fn pattern(name: &'static str, source: regex::Error) -> Self {
        Self::InvalidPattern { name, source }
    }
}

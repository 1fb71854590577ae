use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("failed to build scoring HTTP client: {source}")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

impl ScoringError {
    pub(crate) fn client_build(source: reqwest::Error) -> Self {
        Self::ClientBuild { source }
    }
}

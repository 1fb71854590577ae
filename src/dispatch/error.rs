use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("mail provider API key is not configured")]
    MissingApiKey,
    #[error("sender address is not configured")]
    MissingSender,
    #[error("failed to build mail provider HTTP client: {source}")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },
    #[error("mail provider request failed: {source}")]
    Request {
        #[source]
        source: reqwest::Error,
    },
    #[error("mail provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl DispatchError {
    pub(crate) fn client_build(source: reqwest::Error) -> Self {
        Self::ClientBuild { source }
    }

    pub(crate) fn request(source: reqwest::Error) -> Self {
        Self::Request { source }
    }
}

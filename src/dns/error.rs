use std::time::Duration;

use thiserror::Error;

use super::RecordKind;

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
    #[error("{kind} lookup for {domain} failed: {source}")]
    Lookup {
        kind: RecordKind,
        domain: String,
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
    #[error("could not run `{program}`: {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {status}")]
    ToolStatus {
        program: String,
        status: std::process::ExitStatus,
    },
    #[error("{kind} lookup for {domain} timed out after {timeout:?}")]
    ToolTimeout {
        kind: RecordKind,
        domain: String,
        timeout: Duration,
    },
}

impl DnsError {
    pub(crate) fn resolver_init(source: trust_dns_resolver::error::ResolveError) -> Self {
        Self::ResolverInit { source }
    }

    pub(crate) fn lookup(
        kind: RecordKind,
        domain: &str,
        source: trust_dns_resolver::error::ResolveError,
    ) -> Self {
        Self::Lookup {
            kind,
            domain: domain.to_string(),
            source,
        }
    }

    pub(crate) fn tool_spawn(program: &str, source: std::io::Error) -> Self {
        Self::ToolSpawn {
            program: program.to_string(),
            source,
        }
    }

    pub(crate) fn tool_status(program: &str, status: std::process::ExitStatus) -> Self {
        Self::ToolStatus {
            program: program.to_string(),
            status,
        }
    }

    pub(crate) fn tool_timeout(kind: RecordKind, domain: &str, timeout: Duration) -> Self {
        Self::ToolTimeout {
            kind,
            domain: domain.to_string(),
            timeout,
        }
    }
}

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};

use super::{DnsError, RecordKind};

/// Source d'enregistrements DNS. Une réponse vide n'est pas une erreur.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    async fn lookup(&self, kind: RecordKind, domain: &str) -> Result<Vec<String>, DnsError>;
}

/// `dig +short <KIND> <domain>` avec un délai maximal.
#[derive(Debug, Clone)]
pub struct DigTool {
    program: String,
    timeout: Duration,
}

impl DigTool {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RecordLookup for DigTool {
    async fn lookup(&self, kind: RecordKind, domain: &str) -> Result<Vec<String>, DnsError> {
        let mut command = Command::new(&self.program);
        command
            .arg("+short")
            .arg(kind.as_str())
            .arg(domain)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| DnsError::tool_timeout(kind, domain, self.timeout))?
            .map_err(|source| DnsError::tool_spawn(&self.program, source))?;

        if !output.status.success() {
            return Err(DnsError::tool_status(&self.program, output.status));
        }

        Ok(parse_short_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Lignes non vides, hors commentaires `;;` émis par dig.
pub(crate) fn parse_short_output(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .map(str::to_string)
        .collect()
}

/// Résolveur trust-dns configuré depuis le système.
pub struct LibraryLookup {
    resolver: TokioAsyncResolver,
}

impl LibraryLookup {
    pub fn from_system_conf() -> Result<Self, DnsError> {
        let resolver =
            TokioAsyncResolver::tokio_from_system_conf().map_err(DnsError::resolver_init)?;
        Ok(Self { resolver })
    }
}

#[async_trait]
impl RecordLookup for LibraryLookup {
    async fn lookup(&self, kind: RecordKind, domain: &str) -> Result<Vec<String>, DnsError> {
        let result: Result<Vec<String>, ResolveError> = match kind {
            RecordKind::Mx => self.resolver.mx_lookup(domain).await.map(|lookup| {
                lookup
                    .iter()
                    .map(|mx| normalize_exchange(mx.exchange().to_utf8()))
                    .collect()
            }),
            other => self
                .resolver
                .lookup(domain, other.record_type())
                .await
                .map(|lookup| lookup.iter().map(|rdata| rdata.to_string()).collect()),
        };
        match result {
            Ok(records) => Ok(records),
            Err(err) if is_empty_answer(&err) => Ok(Vec::new()),
            Err(err) => Err(DnsError::lookup(kind, domain, err)),
        }
    }
}

fn is_empty_answer(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

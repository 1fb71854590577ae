use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta};

use super::lookup::{normalize_exchange, parse_short_output};
use super::{DigTool, DnsError, DomainResolver, RecordKind, RecordLookup};
use crate::cache::TtlCache;
use crate::clock::{Clock, ManualClock};

type Answers = HashMap<(RecordKind, String), Vec<String>>;

/// Source DNS scriptée; compte les appels.
#[derive(Default)]
pub(crate) struct StubLookup {
    answers: Answers,
    failing: bool,
    calls: AtomicUsize,
}

impl StubLookup {
    pub(crate) fn with(mut self, kind: RecordKind, domain: &str, records: &[&str]) -> Self {
        self.answers.insert(
            (kind, domain.to_string()),
            records.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordLookup for StubLookup {
    async fn lookup(&self, kind: RecordKind, domain: &str) -> Result<Vec<String>, DnsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(DnsError::tool_timeout(kind, domain, Duration::from_millis(1)));
        }
        Ok(self
            .answers
            .get(&(kind, domain.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

pub(crate) fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    ))
}

pub(crate) fn resolver_with(
    tool: Option<Arc<StubLookup>>,
    library: Option<Arc<StubLookup>>,
    clock: Arc<dyn Clock>,
) -> DomainResolver {
    DomainResolver::new(
        tool.map(|t| t as Arc<dyn RecordLookup>),
        library.map(|l| l as Arc<dyn RecordLookup>),
        TtlCache::new(Duration::from_secs(300), clock),
    )
}

#[tokio::test]
async fn mx_from_tool_is_enough() {
    let tool = Arc::new(StubLookup::default().with(RecordKind::Mx, "example.com", &["10 mx.example.com."]));
    let library = Arc::new(StubLookup::default());
    let resolver = resolver_with(Some(tool.clone()), Some(library.clone()), manual_clock());

    assert!(resolver.resolvable("Example.com.").await);
    assert_eq!(tool.calls(), 1);
    assert_eq!(library.calls(), 0);
}

#[tokio::test]
async fn falls_back_to_a_then_library() {
    let tool = Arc::new(StubLookup::default().with(RecordKind::A, "a-only.test", &["192.0.2.1"]));
    let resolver = resolver_with(Some(tool.clone()), None, manual_clock());
    assert!(resolver.resolvable("a-only.test").await);
    assert_eq!(tool.calls(), 2);

    let tool = Arc::new(StubLookup::failing());
    let library = Arc::new(StubLookup::default().with(RecordKind::Any, "lib.test", &["v=spf1 -all"]));
    let resolver = resolver_with(Some(tool.clone()), Some(library.clone()), manual_clock());
    assert!(resolver.resolvable("lib.test").await);
    assert_eq!(tool.calls(), 3);
    assert_eq!(library.calls(), 2);
}

#[tokio::test]
async fn negative_result_cached_until_ttl() {
    let clock = manual_clock();
    let tool = Arc::new(StubLookup::default());
    let resolver = resolver_with(Some(tool.clone()), None, clock.clone());

    assert!(!resolver.resolvable("nowhere.invalid").await);
    assert_eq!(tool.calls(), 3);

    clock.advance(TimeDelta::seconds(120));
    assert!(!resolver.resolvable("nowhere.invalid").await);
    assert_eq!(tool.calls(), 3, "second call within TTL must hit the cache");

    clock.advance(TimeDelta::seconds(181));
    assert!(!resolver.resolvable("nowhere.invalid").await);
    assert_eq!(tool.calls(), 6);
}

#[tokio::test]
async fn empty_domain_is_not_cached() {
    let tool = Arc::new(StubLookup::default());
    let resolver = resolver_with(Some(tool.clone()), None, manual_clock());
    assert!(!resolver.resolvable("  ...").await);
    assert_eq!(tool.calls(), 0);
    assert_eq!(resolver.cached_entries(), 0);
}

#[test]
fn short_output_skips_blank_and_comment_lines() {
    let out = parse_short_output("\n;; connection timed out\n10 mx.example.com.\n  \n");
    assert_eq!(out, vec!["10 mx.example.com.".to_string()]);
}

#[test]
fn normalize_exchange_trims_dot_and_lowercases() {
    let out = normalize_exchange("Mail.EXAMPLE.com.".to_string());
    assert_eq!(out, "mail.example.com");
}

#[cfg(unix)]
#[tokio::test]
async fn failing_tool_reports_exit_status() {
    let tool = DigTool::new("false", Duration::from_secs(2));
    let err = tool
        .lookup(RecordKind::Mx, "example.com")
        .await
        .expect_err("`false` exits non-zero");
    assert!(matches!(&err, DnsError::ToolStatus { program, .. } if program == "false"));
    assert!(err.to_string().starts_with("`false` exited with"));
}

#[tokio::test]
async fn missing_tool_reports_spawn_error() {
    let tool = DigTool::new("mailrelay-no-such-dig", Duration::from_secs(2));
    let err = tool.lookup(RecordKind::A, "example.com").await.unwrap_err();
    assert!(matches!(err, DnsError::ToolSpawn { .. }));
}

#[tokio::test]
#[ignore = "requires network access"]
async fn system_resolver_finds_gmail() {
    let resolver = DomainResolver::from_options(&super::DnsOptions::default(), manual_clock());
    assert!(resolver.resolvable("gmail.com").await);
}

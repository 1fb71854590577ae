use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::dns::RecordKind;
use crate::dns::tests::{StubLookup, manual_clock, resolver_with};
use crate::scoring::{RuleViolation, ScoringMode};

fn resolving(domains: &[&str]) -> Arc<StubLookup> {
    let stub = domains.iter().fold(StubLookup::default(), |stub, d| {
        stub.with(RecordKind::Mx, d, &["10 mx.test."])
    });
    Arc::new(stub)
}

fn keyed() -> ScoringOptions {
    ScoringOptions {
        api_key: Some("k".to_string()),
        mode: ScoringMode::Legacy,
        timeout_ms: 300,
        ..ScoringOptions::default()
    }
}

async fn pipeline_with(server: Option<&MockServer>, tool: Arc<StubLookup>) -> Pipeline {
    let clock = manual_clock();
    let options = if server.is_some() { keyed() } else { ScoringOptions::default() };
    let mut scorer = Scorer::new(&options, clock.clone()).expect("client builds");
    if let Some(server) = server {
        scorer = scorer.with_endpoint(format!("{}/api/check", server.uri()));
    }
    Pipeline::new(
        resolver_with(Some(tool), None, clock),
        scorer,
        ScoreRules::from_options(&options),
    )
}

async fn mount_score(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn malformed_address_is_bad_syntax() {
    let tool = resolving(&["example.com"]);
    let pipeline = pipeline_with(None, tool.clone()).await;
    for bad in ["", "no-at-sign", "a b@example.com", "x@y"] {
        let verdict = pipeline.validate(bad).await;
        assert!(!verdict.ok);
        assert_eq!(verdict.reason, Some(Reason::BadSyntax));
    }
    assert_eq!(tool.calls(), 0, "syntax failures never reach DNS");
}

#[tokio::test]
async fn unresolvable_domain_is_bad_domain_and_cached() {
    let tool = resolving(&[]);
    let pipeline = pipeline_with(None, tool.clone()).await;

    let verdict = pipeline.validate("bob@nowhere.invalid").await;
    assert_eq!(verdict, Verdict::reject(Reason::BadDomain, None));
    let calls = tool.calls();

    pipeline.validate("alice@nowhere.invalid").await;
    assert_eq!(tool.calls(), calls);
}

#[tokio::test]
async fn disabled_scorer_accepts_resolvable_domain() {
    let pipeline = pipeline_with(None, resolving(&["example.com"])).await;
    assert_eq!(pipeline.validate("bob@example.com").await, Verdict::accept(None));
}

#[tokio::test]
async fn disposable_rejected_with_meta() {
    let server = MockServer::start().await;
    mount_score(
        &server,
        json!({"score": 0.32, "disposable": true, "smtp_check": true, "role": false, "free": false}),
    )
    .await;
    let pipeline = pipeline_with(Some(&server), resolving(&["tempmail.test"])).await;

    let verdict = pipeline.validate("x@tempmail.test").await;
    assert!(!verdict.ok);
    assert_eq!(verdict.reason, Some(Reason::Rule(RuleViolation::Disposable)));
    assert_eq!(verdict.meta.as_ref().and_then(|m| m.score), Some(0.32));
    insta::assert_snapshot!(
        serde_json::to_string(&verdict).unwrap(),
        @r#"{"ok":false,"reason":"mailboxlayer_disposable","meta":{"score":0.32,"disposable":true,"role":false,"free":false,"smtp_check":true}}"#
    );
}

#[tokio::test]
async fn smtp_false_at_major_provider_is_ok() {
    let server = MockServer::start().await;
    mount_score(
        &server,
        json!({"score": 0.64, "disposable": false, "smtp_check": false, "role": false, "free": true}),
    )
    .await;
    let pipeline = pipeline_with(Some(&server), resolving(&["gmail.com", "corp.test"])).await;

    let verdict = pipeline.validate("someone@gmail.com").await;
    assert!(verdict.ok);
    assert_eq!(verdict.reason, None);
    assert!(verdict.meta.is_some());

    let verdict = pipeline.validate("someone@corp.test").await;
    assert_eq!(verdict.reason, Some(Reason::Rule(RuleViolation::SmtpFalse)));
}

#[tokio::test]
async fn scorer_timeout_accepts_with_warning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"score": 0.9}))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let pipeline = pipeline_with(Some(&server), resolving(&["example.com"])).await;

    let verdict = pipeline.validate("bob@example.com").await;
    assert!(verdict.ok);
    let code = verdict.reason_code().expect("warning reason");
    assert!(code.starts_with("mailboxlayer_unavailable_"), "{code}");
    assert_eq!(verdict.scorer_summary().as_deref(), Some("unavail_timeout"));
}

#[tokio::test]
async fn provider_error_accepts_with_error_code() {
    let server = MockServer::start().await;
    mount_score(&server, json!({"error": {"type": "invalid_access_key"}})).await;
    let pipeline = pipeline_with(Some(&server), resolving(&["example.com"])).await;

    let verdict = pipeline.validate("bob@example.com").await;
    assert!(verdict.ok);
    assert_eq!(verdict.reason_code().as_deref(), Some("mailboxlayer_error_invalid_access_key"));
}

#[test]
fn scorer_summary_formats_meta() {
    let verdict = Verdict::accept(Some(crate::scoring::ScoreMeta {
        score: Some(0.8),
        smtp_check: Some(true),
        disposable: Some(false),
        role: Some(true),
        ..Default::default()
    }));
    assert_eq!(
        verdict.scorer_summary().as_deref(),
        Some("score=0.8, smtp=ok, disp=0, role=1")
    );
}

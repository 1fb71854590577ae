use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Value, json};

use super::events::find_message;
use super::*;
use crate::activity::ActivityLog;
use crate::clock::ManualClock;
use crate::counters::MemoryCounters;
use crate::store::{DeliveryStatus, MessageRecord, Store};

const SENT: i64 = 1_700_000_000;

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(SENT + secs, 0).unwrap()
}

fn store() -> Store {
    let mut a = MessageRecord::new("id-a", "T0001", "bob@example.com", at(0));
    a.sg_message_id = Some("sg-a".to_string());
    a.token = Some("spring".to_string());
    let b = MessageRecord::new("id-b", "T0002", "Bob@Example.com", at(10));
    let c = MessageRecord::new("id-c", "T0003", "amy@example.com", at(20));
    Store {
        messages: vec![a, b, c],
        ..Store::default()
    }
}

fn processor() -> (EventProcessor, Arc<MemoryCounters>) {
    let clock = Arc::new(ManualClock::new(at(3600)));
    let counters = Arc::new(MemoryCounters::default());
    let processor = EventProcessor::new(
        OpenPolicy::new(&OpenOptions::default()).unwrap(),
        counters.clone(),
        ActivityLog::disabled(clock.clone()),
        clock,
    );
    (processor, counters)
}

fn event(kind: &str, extra: Value) -> Value {
    let mut base = json!({"event": kind, "email": "bob@example.com"});
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}

#[test]
fn lookup_order_prefers_custom_args() {
    let s = store();
    let parse = |v: Value| serde_json::from_value::<ProviderEvent>(v).unwrap();

    let by_id = parse(event("open", json!({"custom_args": {"app_id": "id-c", "app_tag": "T0001"}})));
    assert_eq!(find_message(&s.messages, &by_id), Some(2));

    let by_tag = parse(event("open", json!({"app_tag": "T0001"})));
    assert_eq!(find_message(&s.messages, &by_tag), Some(0));

    let by_sg = parse(event("open", json!({"sg_message_id": "sg-a", "email": "amy@example.com"})));
    assert_eq!(find_message(&s.messages, &by_sg), Some(0));

    let by_recency = parse(event("open", json!({"sg_message_id": "unknown"})));
    assert_eq!(find_message(&s.messages, &by_recency), Some(1));

    let nobody = parse(json!({"event": "open", "email": ""}));
    assert_eq!(find_message(&s.messages, &nobody), None);
}

#[test]
fn processed_and_delivered_are_counted_once() {
    let (processor, counters) = processor();
    let mut s = store();
    let batch = vec![
        event("processed", json!({"sg_message_id": "sg-a", "timestamp": SENT + 1})),
        event("processed", json!({"sg_message_id": "sg-a", "timestamp": SENT + 2})),
        event("delivered", json!({"sg_message_id": "sg-a", "timestamp": SENT + 5})),
        event("delivered", json!({"sg_message_id": "sg-a", "timestamp": SENT + 6})),
    ];
    let summary = processor.apply(&mut s, &batch);
    assert!(summary.changed);
    assert_eq!(summary.matched, 4);

    let m = &s.messages[0];
    assert_eq!(m.sent_at, Some(at(1)));
    assert_eq!(m.sent_status.as_deref(), Some("processed"));
    assert_eq!(m.delivered_at, Some(at(5)));
    assert_eq!(m.delivery_status, Some(DeliveryStatus::Delivered));

    let snapshot = counters.snapshot();
    let day = at(0).format("%Y-%m-%d").to_string();
    assert_eq!(snapshot.by_date[&day].sent, 1);
    assert_eq!(snapshot.by_date[&day].delivered, 1);
    assert_eq!(snapshot.by_token["spring"].by_date[&day].sent, 1);
}

#[test]
fn failure_events_record_status_and_reason() {
    let (processor, _) = processor();
    let mut s = store();
    let batch = vec![event(
        "bounce",
        json!({"app_id": "id-c", "reason": "550 5.1.1 user unknown", "timestamp": "1700000100"}),
    )];
    processor.apply(&mut s, &batch);
    let m = &s.messages[2];
    assert_eq!(m.delivery_status, Some(DeliveryStatus::Bounce));
    assert_eq!(m.delivery_reason.as_deref(), Some("550 5.1.1 user unknown"));
    assert_eq!(m.delivery_updated_at, Some(at(100)));

    let batch = vec![event("deferred", json!({"app_id": "id-c", "smtp-id": "<x@y>"}))];
    processor.apply(&mut s, &batch);
    assert_eq!(s.messages[2].delivery_status, Some(DeliveryStatus::Deferred));
    assert_eq!(s.messages[2].delivery_reason.as_deref(), Some("<x@y>"));
    assert_eq!(s.messages[2].delivery_updated_at, Some(at(3600)));
}

#[test]
fn open_flow_defers_proxy_then_confirms_once() {
    let (processor, counters) = processor();
    let mut s = store();
    s.messages[0].sent_at = Some(at(0));
    let proxy = "Mozilla/5.0 (via ggpht.com GoogleImageProxy)";

    let summary = processor.apply(
        &mut s,
        &[event("open", json!({"app_id": "id-a", "useragent": proxy, "timestamp": SENT + 5}))],
    );
    assert_eq!(summary.opens_deferred, 1);
    assert!(summary.changed);
    assert_eq!(s.messages[0].opened_at, None);

    let summary = processor.apply(
        &mut s,
        &[
            event("open", json!({"app_id": "id-a", "useragent": "Barracuda scanner", "timestamp": SENT + 6})),
            event("open", json!({"app_id": "id-a", "useragent": proxy, "timestamp": SENT + 30})),
            event("open", json!({"app_id": "id-a", "useragent": "Thunderbird", "timestamp": SENT + 90})),
        ],
    );
    assert_eq!(summary.opens_ignored, 1);
    assert_eq!(summary.opens_confirmed, 1);

    let m = &s.messages[0];
    assert_eq!(m.open_count, 3);
    assert_eq!(m.opened_at, Some(at(30)));
    assert_eq!(m.first_open_at, Some(at(5)));
    assert_eq!(m.last_open_at, Some(at(90)));
    let day = at(0).format("%Y-%m-%d").to_string();
    assert_eq!(counters.snapshot().by_date[&day].opens, 1);
}

#[test]
fn malformed_and_unmatched_events_are_skipped() {
    let (processor, _) = processor();
    let mut s = store();
    let batch = vec![
        json!("not an object"),
        json!({"event": "open", "timestamp": {"bad": true}, "email": "bob@example.com"}),
        json!({"event": "open", "email": "stranger@example.com"}),
        json!({"event": "click", "app_id": "id-a"}),
    ];
    let summary = processor.apply(&mut s, &batch);
    assert_eq!(summary.received, 4);
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.unmatched, 1);
    assert_eq!(summary.matched, 2);
    assert_eq!(s.messages[1].open_count, 1);
    assert!(summary.changed);
}

#[test]
fn debug_log_receives_raw_batch() {
    let dir = tempfile::tempdir().unwrap();
    let (processor, _) = processor();
    let processor = processor.with_debug_log(dir.path().join("events.log"));
    let mut s = store();
    processor.apply(&mut s, &[event("click", json!({}))]);
    let log = std::fs::read_to_string(dir.path().join("events.log")).unwrap();
    assert!(log.starts_with("[{"));
    assert_eq!(log.lines().count(), 1);
}

#[test]
fn second_open_after_hours_is_already_confirmed() {
    let (processor, _) = processor();
    let mut s = store();
    s.messages[2].sent_at = Some(at(0));
    s.messages[2].opened_at = Some(at(50));
    processor.apply(
        &mut s,
        &[event("open", json!({"app_id": "id-c", "timestamp": SENT + 7200}))],
    );
    assert_eq!(s.messages[2].opened_at, Some(at(50)));
    assert_eq!(s.messages[2].last_open_at, Some(at(0) + TimeDelta::hours(2)));
}

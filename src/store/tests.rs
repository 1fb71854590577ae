use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::*;

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

fn store_with_tags(tags: &[&str]) -> Store {
    Store {
        messages: tags
            .iter()
            .enumerate()
            .map(|(i, tag)| MessageRecord::new(format!("id-{i}"), *tag, "a@example.com", at(i as i64)))
            .collect(),
        ..Store::default()
    }
}

#[test]
fn tag_format_and_parse() {
    assert_eq!(format_tag(7), "T0007");
    assert_eq!(format_tag(12345), "T12345");
    assert_eq!(parse_tag("T0042"), Some(42));
    assert_eq!(parse_tag("X0042"), None);
    assert_eq!(parse_tag("T"), None);
}

#[test]
fn stale_next_tag_is_ignored() {
    let mut store = store_with_tags(&["T0001", "T0002", "T0003", "T0004", "T0005", "T0006", "T0007"]);
    store.meta.next_tag = Some(3);
    assert_eq!(store.allocate_tag(), "T0008");
    assert_eq!(store.allocate_tag(), "T0009");
    assert_eq!(store.meta.next_tag, Some(10));
}

#[test]
fn ahead_next_tag_is_kept() {
    let mut store = store_with_tags(&["T0002", "legacy", "T0001"]);
    store.meta.next_tag = Some(20);
    assert!(!store.refresh_next_tag());
    assert_eq!(store.allocate_tag(), "T0020");

    let mut empty = Store::default();
    assert_eq!(empty.allocate_tag(), "T0001");
}

#[test]
fn legacy_record_without_new_fields_loads() {
    let raw = r#"{
      "messages": [{
        "id": "m1", "tag": "T0001", "to": "bob@example.com",
        "subject": "Hi", "text": "Body",
        "createdAt": "2024-03-01T10:00:00.000Z",
        "sgMessageId": null, "openedAt": null
      }],
      "subscribers": [12345],
      "meta": { "nextTag": 2 }
    }"#;
    let store: Store = serde_json::from_str(raw).expect("legacy store parses");
    let m = &store.messages[0];
    assert!(!m.sent_logged && !m.delivered_logged && !m.opened_logged);
    assert_eq!(m.open_count, 0);
    assert_eq!(m.delivery_status, None);
    assert_eq!(store.subscribers.len(), 1);
}

#[test]
fn record_uses_camel_case_keys() {
    let mut record = MessageRecord::new("m1", "T0001", "bob@example.com", at(0));
    record.sg_message_id = Some("abc".to_string());
    record.delivery_status = Some(DeliveryStatus::Bounce);
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["sgMessageId"], "abc");
    assert_eq!(value["deliveryStatus"], "bounce");
    assert_eq!(value["openCount"], 0);
    assert!(value.get("createdAt").is_some());
}

#[test]
fn json_file_store_roundtrip_and_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("db.json"));
    assert_eq!(store.read().unwrap(), Store::default());

    let data = store_with_tags(&["T0001"]);
    store.write(&data).unwrap();
    assert_eq!(store.read().unwrap(), data);
    assert!(!dir.path().join("db.json.tmp").exists());
}

#[test]
fn json_file_store_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(&path, "{ nope").unwrap();
    let err = JsonFileStore::new(&path).read().expect_err("corrupt store");
    assert!(matches!(err, StoreError::Parse { .. }));
}

#[tokio::test]
async fn ledger_open_recomputes_next_tag() {
    let mut data = store_with_tags(&["T0004"]);
    data.meta.next_tag = Some(1);
    let backend = Arc::new(MemoryStore::new(data));
    let ledger = Ledger::open(backend.clone()).await.unwrap();
    assert_eq!(backend.read().unwrap().meta.next_tag, Some(5));
    assert_eq!(ledger.reserve_tag().await.unwrap(), "T0005");
}

#[tokio::test]
async fn concurrent_reservations_are_unique() {
    let ledger = Arc::new(Ledger::new(Arc::new(MemoryStore::default())));
    let mut handles = Vec::new();
    for _ in 0..32 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move { ledger.reserve_tag().await.unwrap() }));
    }
    let mut tags = Vec::new();
    for handle in handles {
        tags.push(handle.await.unwrap());
    }
    tags.sort();
    tags.dedup();
    assert_eq!(tags.len(), 32);
    assert_eq!(tags.last().map(String::as_str), Some("T0032"));
}

#[tokio::test]
async fn unchanged_update_skips_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let ledger = Ledger::new(Arc::new(JsonFileStore::new(&path)));
    let count = ledger
        .update(|store| Outcome::Unchanged(store.messages.len()))
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert!(!path.exists());
}

#[test]
fn tag_index_writes_header_once() {
    let dir = tempfile::tempdir().unwrap();
    let index = TagIndex::new(dir.path().join("tags.csv"));
    let mut record = MessageRecord::new("m1", "T0001", "bob@example.com", at(0));
    record.subject = "Hello, world".to_string();
    index.append(&record);
    index.append(&MessageRecord::new("m2", "T0002", "amy@example.com", at(60)));

    let content = std::fs::read_to_string(index.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "tag,id,to,subject,createdAt");
    assert!(lines[1].starts_with("T0001,m1,bob@example.com,\"Hello, world\","));
}

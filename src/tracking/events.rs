use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{OpenDecision, OpenPolicy, ProviderEvent};
use crate::activity::{self, ActivityLog};
use crate::clock::Clock;
use crate::counters::{CounterKind, CounterSink};
use crate::store::{DeliveryStatus, MessageRecord, Store};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub received: usize,
    pub malformed: usize,
    pub unmatched: usize,
    pub matched: usize,
    pub opens_confirmed: usize,
    pub opens_deferred: usize,
    pub opens_ignored: usize,
    /// Au moins un envoi modifié: le stockage doit être réécrit.
    pub changed: bool,
}

/// Applique un lot d'événements fournisseur aux envois stockés.
pub struct EventProcessor {
    policy: OpenPolicy,
    counters: Arc<dyn CounterSink>,
    activity: ActivityLog,
    clock: Arc<dyn Clock>,
    debug_log: Option<PathBuf>,
}

impl EventProcessor {
    pub fn new(
        policy: OpenPolicy,
        counters: Arc<dyn CounterSink>,
        activity: ActivityLog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            policy,
            counters,
            activity,
            clock,
            debug_log: None,
        }
    }

    /// Trace brute des lots et des décisions d'ouverture dans `path`.
    pub fn with_debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_log = Some(path.into());
        self
    }

    pub fn apply(&self, store: &mut Store, events: &[Value]) -> BatchSummary {
        let mut summary = BatchSummary {
            received: events.len(),
            ..BatchSummary::default()
        };
        if events.is_empty() {
            return summary;
        }
        if let Some(path) = &self.debug_log {
            let line = format!("{}\n", Value::Array(events.to_vec()));
            if let Err(err) = activity::append(path, &line) {
                warn!(path = %path.display(), error = %err, "event debug log append failed");
            }
        }

        for raw in events {
            let event: ProviderEvent = match serde_json::from_value(raw.clone()) {
                Ok(event) => event,
                Err(err) => {
                    debug!(error = %err, "skipping malformed provider event");
                    summary.malformed += 1;
                    continue;
                }
            };
            let Some(index) = find_message(&store.messages, &event) else {
                debug!(event = %event.event, email = ?event.recipient(), "no message for provider event");
                if self.debug_log.is_some() {
                    self.activity.record(
                        "unknown",
                        &format!("EVENT {} email={}", event.event, event.recipient().unwrap_or_default()),
                    );
                }
                summary.unmatched += 1;
                continue;
            };
            summary.matched += 1;
            if self.apply_one(&mut store.messages[index], &event, &mut summary) {
                summary.changed = true;
            }
        }
        summary
    }

    fn apply_one(
        &self,
        record: &mut MessageRecord,
        event: &ProviderEvent,
        summary: &mut BatchSummary,
    ) -> bool {
        let at = event.occurred_at().unwrap_or_else(|| self.clock.now());
        let token = record.token.clone();

        match event.event.as_str() {
            "processed" if !record.sent_logged => {
                record.sent_logged = true;
                record.sent_at = Some(at);
                record.sent_status = Some(event.event.clone());
                self.activity
                    .record(&record.id, &format!("PROVIDER_PROCESSED to={}", record.to));
                self.counters.increment(CounterKind::Sent, at, token.as_deref());
                true
            }
            "delivered" if !record.delivered_logged => {
                record.delivered_logged = true;
                record.delivered_at = Some(at);
                record.delivery_status = Some(DeliveryStatus::Delivered);
                record.delivery_updated_at = Some(at);
                self.counters
                    .increment(CounterKind::Delivered, at, token.as_deref());
                self.activity
                    .record(&record.id, &format!("DELIVERED_CONFIRM to={}", record.to));
                true
            }
            "open" => self.apply_open(record, event, at, summary),
            other => {
                let Some(status) = DeliveryStatus::from_failure_event(other) else {
                    return false;
                };
                let reason = event.failure_reason();
                record.delivery_status = Some(status);
                record.delivery_updated_at = Some(at);
                if let Some(reason) = reason {
                    record.delivery_reason = Some(reason.to_string());
                }
                let line = match reason {
                    Some(reason) => format!("FAIL provider: {} ({reason})", status.as_str()),
                    None => format!("FAIL provider: {}", status.as_str()),
                };
                self.activity.record(&record.id, &line);
                true
            }
        }
    }

    fn apply_open(
        &self,
        record: &mut MessageRecord,
        event: &ProviderEvent,
        at: chrono::DateTime<chrono::Utc>,
        summary: &mut BatchSummary,
    ) -> bool {
        let ua = event.user_agent();
        let ua_short: String = ua.chars().take(120).collect();
        match self.policy.classify(record, at, ua) {
            OpenDecision::Ignored => {
                summary.opens_ignored += 1;
                if self.debug_log.is_some() {
                    self.activity
                        .record(&record.id, &format!("OPEN_IGNORE_HARD_UA ua=\"{ua_short}\""));
                }
                false
            }
            OpenDecision::AlreadyConfirmed { .. } => true,
            OpenDecision::Deferred {
                age_secs,
                open_count,
            } => {
                summary.opens_deferred += 1;
                if self.debug_log.is_some() {
                    self.activity.record(
                        &record.id,
                        &format!("OPEN_DEFER ua=\"{ua_short}\" age={age_secs}s count={open_count}"),
                    );
                }
                true
            }
            OpenDecision::Confirmed {
                age_secs,
                open_count,
            } => {
                summary.opens_confirmed += 1;
                self.activity.record(
                    &record.id,
                    &format!("OPEN_CONFIRMED ua=\"{ua_short}\" age={age_secs}s count={open_count}"),
                );
                self.counters
                    .increment(CounterKind::Opens, at, record.token.as_deref());
                true
            }
        }
    }
}

/// `app_id` → `app_tag` → id fournisseur → envoi le plus récent à l'adresse.
pub(crate) fn find_message(messages: &[MessageRecord], event: &ProviderEvent) -> Option<usize> {
    if let Some(index) = event
        .app_id()
        .and_then(|id| messages.iter().position(|m| m.id == id))
    {
        return Some(index);
    }
    if let Some(index) = event
        .app_tag()
        .and_then(|tag| messages.iter().position(|m| m.tag == tag))
    {
        return Some(index);
    }
    if let Some(index) = event.provider_message_id().and_then(|id| {
        messages
            .iter()
            .position(|m| m.sg_message_id.as_deref() == Some(id))
    }) {
        return Some(index);
    }
    let email = event.recipient()?;
    messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.to.to_lowercase() == email)
        .max_by_key(|(_, m)| m.created_at)
        .map(|(i, _)| i)
}

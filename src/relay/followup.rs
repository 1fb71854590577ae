use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Relay, RelayError};
use crate::dispatch::OutboundMail;
use crate::store::{MessageRecord, Outcome, write_all_atomically};

const DEFAULT_DELAY_MINUTES: f64 = 60.0;

/// Réglages lus à chaque passage dans `<data_dir>/config.json`.
///
/// Chaque champ est lu isolément: une valeur invalide retombe sur son défaut
/// sans toucher aux autres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupSettings {
    #[serde(default, deserialize_with = "lenient_flag")]
    pub enable_followup: bool,
    #[serde(default = "default_delay_minutes", deserialize_with = "lenient_minutes")]
    pub followup_delay_minutes: f64,
    #[serde(default = "default_delay_minutes", deserialize_with = "lenient_minutes")]
    pub record_no_reply_delay_minutes: f64,
}

const fn default_delay_minutes() -> f64 {
    DEFAULT_DELAY_MINUTES
}

/// Vrai pour `true`, un nombre non nul ou une chaîne non vide.
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    })
}

/// Nombre (éventuellement fractionnaire) ou chaîne numérique; `null` ou toute
/// autre forme donnent le défaut.
fn lenient_minutes<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let minutes = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(minutes
        .filter(|m| m.is_finite())
        .unwrap_or(DEFAULT_DELAY_MINUTES))
}

fn minutes_to_delta(minutes: f64) -> TimeDelta {
    // `as` sature sur i64; au-delà de la plage de TimeDelta on plafonne.
    let millis = (minutes.max(0.0) * 60_000.0) as i64;
    TimeDelta::try_milliseconds(millis).unwrap_or(TimeDelta::MAX)
}

impl Default for FollowupSettings {
    fn default() -> Self {
        Self {
            enable_followup: false,
            followup_delay_minutes: DEFAULT_DELAY_MINUTES,
            record_no_reply_delay_minutes: DEFAULT_DELAY_MINUTES,
        }
    }
}

impl FollowupSettings {
    /// Fichier absent ou illisible: valeurs par défaut (relances coupées).
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "followup settings unreadable, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn followup_delay(&self) -> TimeDelta {
        minutes_to_delta(self.followup_delay_minutes)
    }

    pub fn no_reply_delay(&self) -> TimeDelta {
        minutes_to_delta(self.record_no_reply_delay_minutes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FollowupReport {
    pub enabled: bool,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// Lignes écrites dans `opened_no_reply.txt`.
    pub opened_no_reply: usize,
}

fn is_due(message: &MessageRecord, now: DateTime<Utc>, delay: TimeDelta) -> bool {
    message.followup_sent_at.is_none()
        && message.opened_at.is_some()
        && message.replied_at.is_none()
        && now - message.created_at >= delay
}

/// Lignes `to:text` des envois ouverts depuis au moins `delay` et sans réponse.
pub fn opened_no_reply_lines(
    messages: &[MessageRecord],
    now: DateTime<Utc>,
    delay: TimeDelta,
) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.replied_at.is_none())
        .filter(|m| m.opened_at.is_some_and(|opened| now - opened >= delay))
        .map(|m| format!("{}:{}", m.to, m.text))
        .collect()
}

impl Relay {
    pub(crate) fn settings(&self) -> FollowupSettings {
        self.files
            .as_ref()
            .map(|files| FollowupSettings::load(&files.settings))
            .unwrap_or_default()
    }

    pub(crate) fn write_opened_no_reply(&self, lines: &[String]) {
        let Some(files) = &self.files else { return };
        let path = &files.opened_no_reply;
        if let Err(err) = write_all_atomically(path, lines.join("\n").as_bytes()) {
            warn!(path = %path.display(), error = %err, "opened-no-reply report not written");
        }
    }

    /// Un passage du planificateur: rapport « ouvert sans réponse », puis
    /// relance `Re: <sujet>` des envois éligibles quand elle est activée.
    pub async fn run_followups(&self) -> Result<FollowupReport, RelayError> {
        let settings = self.settings();
        let now = self.clock.now();
        let snapshot = self.ledger.snapshot().await?;

        let lines = opened_no_reply_lines(&snapshot.messages, now, settings.no_reply_delay());
        self.write_opened_no_reply(&lines);
        let mut report = FollowupReport {
            enabled: settings.enable_followup,
            opened_no_reply: lines.len(),
            ..FollowupReport::default()
        };
        if !settings.enable_followup {
            return Ok(report);
        }

        let delay = settings.followup_delay();
        let due: Vec<&MessageRecord> = snapshot
            .messages
            .iter()
            .filter(|m| is_due(m, now, delay))
            .collect();
        report.due = due.len();

        for message in due {
            let mail = OutboundMail {
                to: message.to.clone(),
                subject: format!("Re: {}", message.subject),
                text: self.followup_text.clone(),
                html: None,
                custom_args: BTreeMap::from([
                    ("app_id".to_string(), message.id.clone()),
                    ("app_tag".to_string(), message.tag.clone()),
                ]),
            };
            if let Err(err) = self.dispatcher.send(&mail).await {
                warn!(tag = %message.tag, error = %err, "followup not sent");
                report.failed += 1;
                continue;
            }
            let sent_at = self.clock.now();
            let id = message.id.clone();
            self.ledger
                .update(move |store| match store.position_by_id(&id) {
                    Some(index) if store.messages[index].followup_sent_at.is_none() => {
                        store.messages[index].followup_sent_at = Some(sent_at);
                        Outcome::Changed(())
                    }
                    _ => Outcome::Unchanged(()),
                })
                .await?;
            self.activity.record(&message.id, "FOLLOWUP_SENT");
            info!(tag = %message.tag, to = %message.to, "followup sent");
            report.sent += 1;
        }
        debug!(due = report.due, sent = report.sent, "followup pass finished");
        Ok(report)
    }
}

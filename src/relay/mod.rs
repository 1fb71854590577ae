//! Service d'envoi: liste de blocage → pipeline → fournisseur → stockage.
//!
//! Les mêmes points d'entrée servent l'API, les lots CSV, les relances et
//! les webhooks du fournisseur.

mod batch;
mod error;
mod followup;
mod upload;

pub use batch::{AbortHandle, BatchItem, BatchReport, ItemOutcome, ItemStatus};
pub use error::RelayError;
pub use followup::{FollowupReport, FollowupSettings, opened_no_reply_lines};
pub use upload::{CsvError, ParsedUpload, decode_upload, parse_upload};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::activity::ActivityLog;
use crate::clock::{Clock, SystemClock};
use crate::config::RelayConfig;
use crate::counters::{CounterFile, CounterSink, DEFAULT_SERIES_DAYS, Series};
use crate::dispatch::{MailDispatcher, OutboundMail, SendGridClient};
use crate::lists::{Blocklist, TokenSet};
use crate::pipeline::Pipeline;
use crate::store::{JsonFileStore, Ledger, MessageRecord, Outcome, TagIndex};
use crate::tracking::{
    BatchSummary, EventProcessor, InboundReply, MatchedBy, OpenPolicy, record_reply,
};

const LOGGED_TEXT_CHARS: usize = 500;

/// Demande d'envoi; `text` ou `html` doit être renseigné.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendRequest {
    pub to: String,
    pub subject: Option<String>,
    pub text: String,
    pub html: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    pub id: String,
    pub tag: String,
    pub to: String,
    pub provider_message_id: Option<String>,
    /// Résumé du score (`score=..`, `unavail_<tag>`, `err_<code>`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scorer: Option<String>,
    /// Jeton absent de la liste connue: l'envoi part quand même.
    pub unknown_token: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundOutcome {
    pub id: String,
    pub tag: String,
    pub matched_by: MatchedBy,
    pub newly_recorded: bool,
}

/// Fichiers annexes du répertoire de données.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    pub tag_index: PathBuf,
    pub settings: PathBuf,
    pub opened_no_reply: PathBuf,
    pub events_log: Option<PathBuf>,
}

impl DataFiles {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            tag_index: config.tag_index_path(),
            settings: config.settings_path(),
            opened_no_reply: config.opened_no_reply_path(),
            events_log: config.debug_events.then(|| config.events_log_path()),
        }
    }
}

/// Composants du service, injectables pour les tests.
pub struct RelayParts {
    pub pipeline: Pipeline,
    pub dispatcher: Arc<dyn MailDispatcher>,
    pub ledger: Ledger,
    pub counters: Arc<dyn CounterSink>,
    pub policy: OpenPolicy,
    pub activity: ActivityLog,
    pub blocklist: Blocklist,
    pub tokens: TokenSet,
    pub clock: Arc<dyn Clock>,
    pub default_subject: String,
    pub followup_text: String,
}

pub struct Relay {
    pipeline: Pipeline,
    dispatcher: Arc<dyn MailDispatcher>,
    ledger: Ledger,
    counters: Arc<dyn CounterSink>,
    events: EventProcessor,
    activity: ActivityLog,
    blocklist: Blocklist,
    tokens: TokenSet,
    clock: Arc<dyn Clock>,
    default_subject: String,
    followup_text: String,
    files: Option<DataFiles>,
}

impl Relay {
    pub fn new(parts: RelayParts) -> Self {
        let events = EventProcessor::new(
            parts.policy,
            parts.counters.clone(),
            parts.activity.clone(),
            parts.clock.clone(),
        );
        Self {
            pipeline: parts.pipeline,
            dispatcher: parts.dispatcher,
            ledger: parts.ledger,
            counters: parts.counters,
            events,
            activity: parts.activity,
            blocklist: parts.blocklist,
            tokens: parts.tokens,
            clock: parts.clock,
            default_subject: parts.default_subject,
            followup_text: parts.followup_text,
            files: None,
        }
    }

    /// Service complet sur le répertoire de données de `config`.
    pub async fn open(config: &RelayConfig) -> Result<Self, RelayError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let pipeline = Pipeline::from_options(&config.dns, &config.scoring, clock.clone())?;
        let dispatcher = Arc::new(SendGridClient::new(config.sender.clone())?);
        let ledger = Ledger::open(Arc::new(JsonFileStore::new(config.store_path()))).await?;
        let parts = RelayParts {
            pipeline,
            dispatcher,
            ledger,
            counters: Arc::new(CounterFile::new(config.counters_path(), clock.clone())),
            policy: OpenPolicy::new(&config.opens)?,
            activity: ActivityLog::new(&config.data_dir, clock.clone()),
            blocklist: Blocklist::load(config.blocklist_file.as_deref(), &config.data_dir),
            tokens: TokenSet::load(&config.tokens_path()),
            clock,
            default_subject: config.sender.default_subject.clone(),
            followup_text: config.followup.text.clone(),
        };
        info!(data_dir = %config.data_dir.display(), "relay ready");
        Ok(Self::new(parts).with_files(DataFiles::from_config(config)))
    }

    pub fn with_files(mut self, files: DataFiles) -> Self {
        if let Some(path) = &files.events_log {
            self.events = self.events.with_debug_log(path);
        }
        self.files = Some(files);
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    pub fn tokens(&self) -> &TokenSet {
        &self.tokens
    }

    pub async fn send(&self, request: SendRequest) -> Result<SendReceipt, RelayError> {
        let to = request.to.trim().to_string();
        let text = request.text.trim().to_string();
        let html = request.html.filter(|h| !h.trim().is_empty());
        if to.is_empty() || (text.is_empty() && html.is_none()) {
            return Err(RelayError::MissingFields);
        }
        let token = request
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let unknown_token = token.as_deref().is_some_and(|t| !self.tokens.is_known(t));
        if unknown_token {
            warn!(token = ?token, "unknown campaign token, sending anyway");
        }
        let subject = request
            .subject
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.default_subject.clone());

        if self.blocklist.contains(&to) {
            return Err(RelayError::Blocklisted { email: to });
        }
        let verdict = self.pipeline.validate(&to).await;
        if !verdict.ok {
            debug!(to = %to, reason = ?verdict.reason_code(), "address rejected");
            return Err(RelayError::Rejected { email: to, verdict });
        }
        let scorer = verdict.scorer_summary();

        let id = Uuid::new_v4().to_string();
        let tag = self.ledger.reserve_tag().await?;
        let mut custom_args = BTreeMap::from([
            ("app_id".to_string(), id.clone()),
            ("app_tag".to_string(), tag.clone()),
        ]);
        if let Some(token) = &token {
            custom_args.insert("app_token".to_string(), token.clone());
        }
        let mail = OutboundMail {
            to: to.clone(),
            subject: subject.clone(),
            text: text.clone(),
            html,
            custom_args,
        };
        let receipt = match self.dispatcher.send(&mail).await {
            Ok(receipt) => receipt,
            Err(err) => {
                self.activity
                    .record(&id, &format!("SEND_FAILED tag={tag} to={to}: {err}"));
                return Err(err.into());
            }
        };

        let mut record = MessageRecord::new(&id, &tag, &to, self.clock.now());
        record.token = token;
        record.subject = subject.clone();
        record.text = text.clone();
        record.sg_message_id = receipt.provider_message_id.clone();
        let index_row = record.clone();
        self.ledger
            .update(move |store| {
                store.messages.push(record);
                Outcome::Changed(())
            })
            .await?;

        if let Some(files) = &self.files {
            TagIndex::new(&files.tag_index).append(&index_row);
        }
        let logged: String = text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(LOGGED_TEXT_CHARS)
            .collect();
        let scorer_note = scorer
            .as_deref()
            .map(|s| format!(" [MBL: {s}]"))
            .unwrap_or_default();
        self.activity.record(
            &id,
            &format!("REQUEST to={to} subject={subject} text={logged}{scorer_note}"),
        );
        info!(tag = %tag, to = %to, "message sent");

        Ok(SendReceipt {
            id,
            tag,
            to,
            provider_message_id: receipt.provider_message_id,
            scorer,
            unknown_token,
        })
    }

    /// Applique un lot webhook; le stockage n'est réécrit que si un envoi a changé.
    pub async fn apply_events(&self, events: &[Value]) -> Result<BatchSummary, RelayError> {
        let settings = self.settings();
        let now = self.clock.now();
        let (summary, report) = self
            .ledger
            .update(|store| {
                let summary = self.events.apply(store, events);
                if summary.changed {
                    let report = opened_no_reply_lines(&store.messages, now, settings.no_reply_delay());
                    Outcome::Changed((summary, Some(report)))
                } else {
                    Outcome::Unchanged((summary, None))
                }
            })
            .await?;
        if let Some(lines) = report {
            self.write_opened_no_reply(&lines);
        }
        debug!(
            received = summary.received,
            matched = summary.matched,
            changed = summary.changed,
            "provider events applied"
        );
        Ok(summary)
    }

    /// Rattache une réponse entrante; `None` si aucun envoi ne correspond.
    pub async fn apply_inbound(&self, payload: &Value) -> Result<Option<InboundOutcome>, RelayError> {
        let reply = InboundReply::from_payload(payload);
        let settings = self.settings();
        let now = self.clock.now();
        let result = self
            .ledger
            .update(|store| {
                let Some(found) = record_reply(&mut store.messages, &reply, now) else {
                    return Outcome::Unchanged(None);
                };
                let record = &store.messages[found.index];
                let outcome = InboundOutcome {
                    id: record.id.clone(),
                    tag: record.tag.clone(),
                    matched_by: found.matched_by,
                    newly_recorded: found.newly_recorded,
                };
                if found.newly_recorded {
                    let report = opened_no_reply_lines(&store.messages, now, settings.no_reply_delay());
                    Outcome::Changed(Some((outcome, Some(report))))
                } else {
                    Outcome::Unchanged(Some((outcome, None)))
                }
            })
            .await?;

        let Some((outcome, report)) = result else {
            debug!(from = ?reply.from, to = ?reply.to, "inbound reply matched no message");
            return Ok(None);
        };
        if let Some(lines) = report {
            self.write_opened_no_reply(&lines);
            self.activity.record(&outcome.id, "REPLY received");
            info!(tag = %outcome.tag, matched_by = ?outcome.matched_by, "reply recorded");
        }
        Ok(Some(outcome))
    }

    /// Série journalière sur `days` jours (30 par défaut) se terminant aujourd'hui.
    pub fn series(&self, days: Option<u32>, token: Option<&str>) -> Series {
        self.counters.totals().series(
            days.unwrap_or(DEFAULT_SERIES_DAYS),
            self.clock.now().date_naive(),
            token,
            self.tokens.as_set(),
        )
    }
}

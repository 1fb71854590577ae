use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::{Relay, RelayError, SendRequest};

/// Drapeau d'arrêt partagé, consulté avant chaque envoi du lot.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Une ligne à envoyer, issue d'un fichier CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    pub email: String,
    pub subject: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Sent { tag: String },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub email: String,
    #[serde(flatten)]
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pre_blocked: usize,
    pub pre_duplicate: usize,
    pub aborted: bool,
    pub unknown_token: bool,
    pub items: Vec<ItemOutcome>,
}

impl Relay {
    /// Lot séquentiel: dédoublonnage et liste de blocage d'abord, puis pour
    /// chaque adresse validation et envoi. `delay` sépare les tentatives
    /// d'envoi, réussies ou non.
    pub async fn run_batch(
        &self,
        items: Vec<BatchItem>,
        token: Option<&str>,
        delay: Duration,
        abort: &AbortHandle,
    ) -> BatchReport {
        let mut report = BatchReport {
            unknown_token: token.is_some_and(|t| !self.tokens.is_known(t)),
            ..BatchReport::default()
        };

        let mut seen = HashSet::new();
        let mut pending = Vec::with_capacity(items.len());
        for item in items {
            let key = item.email.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            if self.blocklist.contains(&key) {
                report.pre_blocked += 1;
                continue;
            }
            if !seen.insert(key) {
                report.pre_duplicate += 1;
                continue;
            }
            pending.push(item);
        }
        info!(
            pending = pending.len(),
            pre_blocked = report.pre_blocked,
            pre_duplicate = report.pre_duplicate,
            "batch started"
        );

        for item in pending {
            if abort.is_aborted() {
                report.aborted = true;
                break;
            }
            let request = SendRequest {
                to: item.email.clone(),
                subject: item.subject,
                text: item.text,
                html: None,
                token: token.map(str::to_string),
            };
            let status = match self.send(request).await {
                Ok(receipt) => {
                    report.sent += 1;
                    ItemStatus::Sent { tag: receipt.tag }
                }
                Err(err @ (RelayError::Rejected { .. } | RelayError::Blocklisted { .. })) => {
                    report.skipped += 1;
                    ItemStatus::Skipped {
                        reason: err.to_string(),
                    }
                }
                Err(err) => {
                    warn!(to = %item.email, error = %err, "batch item failed");
                    report.failed += 1;
                    ItemStatus::Failed {
                        error: err.to_string(),
                    }
                }
            };
            // Pas de pause après un refus: rien n'est parti chez le fournisseur.
            let attempted = !matches!(status, ItemStatus::Skipped { .. });
            report.items.push(ItemOutcome {
                email: item.email,
                status,
            });
            if attempted && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        info!(
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            aborted = report.aborted,
            "batch finished"
        );
        report
    }
}

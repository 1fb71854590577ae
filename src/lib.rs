//! mailrelay_lib: relais de campagnes e-mail. Validation de délivrabilité,
//! envoi via le fournisseur, suivi des ouvertures et des réponses.
#![forbid(unsafe_code)]

pub mod activity;
pub mod cache;
pub mod clock;
pub mod config;
pub mod counters;
pub mod dispatch;
pub mod dns;
pub mod lists;
pub mod pipeline;
pub mod relay;
pub mod scoring;
pub mod store;
pub mod tracking;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, RelayConfig};
pub use dispatch::{DispatchError, MailDispatcher, OutboundMail, SendGridClient};
pub use dns::{DnsError, DomainResolver};
pub use pipeline::{Pipeline, Reason, Verdict, reason_text};
pub use relay::{
    AbortHandle, BatchItem, BatchReport, Relay, RelayError, SendReceipt, SendRequest, parse_upload,
};
pub use scoring::{ScoreMeta, ScoreOutcome, Scorer};
pub use store::{Ledger, MessageRecord, Store, StoreError};
pub use tracking::{BatchSummary, OpenDecision, OpenPolicy};
pub use validator::{check_syntax, is_valid_syntax, parse_address};

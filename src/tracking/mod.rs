//! Suivi du cycle de vie des envois: événements fournisseur, ouvertures,
//! réponses entrantes.

mod error;
mod events;
mod open;
mod options;
mod reply;
mod types;

pub use error::TrackingError;
pub use events::{BatchSummary, EventProcessor};
pub use open::{OpenDecision, OpenPolicy};
pub use options::{DEFAULT_HARD_IGNORE_UA, DEFAULT_SOFT_PROXY_UA, OpenOptions};
pub use reply::{InboundReply, MatchedBy, ReplyMatch, record_reply};
pub use types::{EventArgs, ProviderEvent};

#[cfg(test)]
mod tests;

//! Persistance des envois et attribution des tags.
//!
//! Toute lecture-modification-écriture passe par [`Ledger::update`].

mod error;
mod json;
mod ledger;
mod memory;
mod record;
mod tag;

pub use error::StoreError;
pub use json::JsonFileStore;
pub use ledger::{Ledger, Outcome};
pub use memory::MemoryStore;
pub use record::{DeliveryStatus, MessageRecord};
pub use tag::{TagIndex, format_tag, parse_tag};

pub(crate) use json::write_all_atomically;

use serde::{Deserialize, Serialize};

pub trait MessageStore: Send + Sync {
    fn read(&self) -> Result<Store, StoreError>;
    fn write(&self, store: &Store) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
    /// Abonnés du canal opérateur, conservés tels quels.
    #[serde(default)]
    pub subscribers: Vec<serde_json::Value>,
    #[serde(default)]
    pub meta: StoreMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMeta {
    #[serde(default)]
    pub next_tag: Option<u64>,
}

impl Store {
    pub fn position_by_id(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    pub fn find(&self, id_or_tag: &str) -> Option<&MessageRecord> {
        self.messages
            .iter()
            .find(|m| m.id == id_or_tag || m.tag.eq_ignore_ascii_case(id_or_tag))
    }
}

#[cfg(test)]
mod tests;

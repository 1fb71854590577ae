use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::{MessageStore, Store, StoreError};

/// Résultat d'une mutation: indique s'il faut réécrire le stockage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    Changed(T),
    Unchanged(T),
}

/// Section critique autour du stockage: lecture, mutation et écriture
/// se font sous le même verrou.
pub struct Ledger {
    store: Arc<dyn MessageStore>,
    lock: Mutex<()>,
}

impl Ledger {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Ouvre le stockage et recale `meta.nextTag` sur les tags existants.
    pub async fn open(store: Arc<dyn MessageStore>) -> Result<Self, StoreError> {
        let ledger = Self::new(store);
        let next = ledger
            .update(|store| {
                if store.refresh_next_tag() {
                    Outcome::Changed(store.meta.next_tag)
                } else {
                    Outcome::Unchanged(store.meta.next_tag)
                }
            })
            .await?;
        debug!(next_tag = ?next, "message store opened");
        Ok(ledger)
    }

    pub async fn snapshot(&self) -> Result<Store, StoreError> {
        let _guard = self.lock.lock().await;
        self.store.read()
    }

    pub async fn update<T, F>(&self, mutate: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Store) -> Outcome<T>,
    {
        let _guard = self.lock.lock().await;
        let mut store = self.store.read()?;
        match mutate(&mut store) {
            Outcome::Changed(value) => {
                self.store.write(&store)?;
                Ok(value)
            }
            Outcome::Unchanged(value) => Ok(value),
        }
    }

    pub async fn reserve_tag(&self) -> Result<String, StoreError> {
        self.update(|store| Outcome::Changed(store.allocate_tag()))
            .await
    }
}

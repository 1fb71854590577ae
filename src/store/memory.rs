use std::sync::{Mutex, PoisonError};

use super::{MessageStore, Store, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Store>,
}

impl MemoryStore {
    pub fn new(store: Store) -> Self {
        Self {
            inner: Mutex::new(store),
        }
    }
}

impl MessageStore for MemoryStore {
    fn read(&self) -> Result<Store, StoreError> {
        Ok(self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn write(&self, store: &Store) -> Result<(), StoreError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = store.clone();
        Ok(())
    }
}

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{MessageStore, Store, StoreError};

/// Stockage dans un fichier JSON unique, réécrit atomiquement.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageStore for JsonFileStore {
    fn read(&self) -> Result<Store, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Store::default()),
            Err(err) => return Err(StoreError::read(&self.path, err)),
        };
        if raw.trim().is_empty() {
            return Ok(Store::default());
        }
        serde_json::from_str(&raw).map_err(|err| StoreError::parse(&self.path, err))
    }

    fn write(&self, store: &Store) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(store).map_err(StoreError::encode)?;
        write_all_atomically(&self.path, &bytes).map_err(|err| StoreError::write(&self.path, err))
    }
}

/// Écrit dans `<path>.tmp`, synchronise, puis renomme.
pub(crate) fn write_all_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

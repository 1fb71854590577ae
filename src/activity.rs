//! Journal d'activité par message: `logs/<id>.log` et `activity.log`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::SecondsFormat;
use tracing::warn;

use crate::clock::Clock;

#[derive(Debug, Clone)]
pub struct ActivityLog {
    dir: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl ActivityLog {
    pub fn new(data_dir: &Path, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: Some(data_dir.to_path_buf()),
            clock,
        }
    }

    /// Ne journalise rien.
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self { dir: None, clock }
    }

    /// Ajoute `<horodatage> [<id>] <line>` aux deux journaux; best effort.
    pub fn record(&self, id: &str, line: &str) {
        let Some(dir) = &self.dir else { return };
        if id.is_empty() {
            return;
        }
        let row = format!(
            "{} [{}] {}\n",
            self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true),
            id,
            line
        );
        let per_id = dir.join("logs").join(format!("{id}.log"));
        for path in [per_id, dir.join("activity.log")] {
            if let Err(err) = append(&path, &row) {
                warn!(path = %path.display(), error = %err, "activity log append failed");
            }
        }
    }
}

/// Ajout en fin de fichier, répertoires parents créés au besoin.
pub(crate) fn append(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::DateTime;

    #[test]
    fn writes_per_id_and_combined_logs() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap()));
        let log = ActivityLog::new(dir.path(), clock);
        log.record("m1", "SENT to=bob@example.com");
        log.record("m2", "DELIVERED");

        let per_id = std::fs::read_to_string(dir.path().join("logs/m1.log")).unwrap();
        assert_eq!(per_id, "2023-11-14T22:13:20.000Z [m1] SENT to=bob@example.com\n");
        let combined = std::fs::read_to_string(dir.path().join("activity.log")).unwrap();
        assert_eq!(combined.lines().count(), 2);
    }

    #[test]
    fn disabled_log_is_silent() {
        let clock = Arc::new(crate::clock::SystemClock);
        ActivityLog::disabled(clock).record("m1", "ignored");
    }
}

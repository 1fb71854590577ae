use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::{MessageRecord, Store};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^T(\d+)$").expect("static regex"));

/// `T` + numéro sur au moins 4 chiffres.
pub fn format_tag(n: u64) -> String {
    format!("T{n:04}")
}

pub fn parse_tag(tag: &str) -> Option<u64> {
    TAG_RE
        .captures(tag)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl Store {
    pub fn max_tag(&self) -> u64 {
        self.messages
            .iter()
            .filter_map(|m| parse_tag(&m.tag))
            .max()
            .unwrap_or(0)
    }

    /// Prochain numéro: `meta.nextTag` s'il dépasse le max connu, sinon max + 1.
    pub fn next_tag_number(&self) -> u64 {
        let max = self.max_tag();
        match self.meta.next_tag {
            Some(next) if next > max => next,
            _ => max + 1,
        }
    }

    /// Recalcule `meta.nextTag`; renvoie `true` s'il a changé.
    pub fn refresh_next_tag(&mut self) -> bool {
        let next = self.next_tag_number();
        let changed = self.meta.next_tag != Some(next);
        self.meta.next_tag = Some(next);
        changed
    }

    /// Réserve un tag; il ne sera jamais réattribué.
    pub fn allocate_tag(&mut self) -> String {
        let n = self.next_tag_number();
        self.meta.next_tag = Some(n + 1);
        format_tag(n)
    }
}

/// Index CSV `tag,id,to,subject,createdAt`, alimenté à chaque envoi.
#[derive(Debug, Clone)]
pub struct TagIndex {
    path: PathBuf,
}

impl TagIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best effort: un échec est journalisé, jamais propagé.
    pub fn append(&self, record: &MessageRecord) {
        if let Err(err) = self.try_append(record) {
            warn!(path = %self.path.display(), error = %err, "tag index append failed");
        }
    }

    fn try_append(&self, record: &MessageRecord) -> Result<(), csv::Error> {
        let is_new = std::fs::metadata(&self.path).map_or(true, |m| m.len() == 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(["tag", "id", "to", "subject", "createdAt"])?;
        }
        let created_at = record.created_at.to_rfc3339();
        writer.write_record([
            record.tag.as_str(),
            record.id.as_str(),
            record.to.as_str(),
            record.subject.as_str(),
            created_at.as_str(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

//! Liste de blocage et jeux de jetons de campagne.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("static regex")
});

pub const DATA_DIR_BLOCKLISTS: &[&str] = &["do_not_send.txt", "do_not_send.csv"];

/// Adresses à ne jamais contacter, en minuscules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blocklist {
    entries: HashSet<String>,
}

impl Blocklist {
    /// Extrait toutes les adresses d'un texte libre (txt, csv...).
    pub fn from_text(text: &str) -> Self {
        let mut list = Self::default();
        list.extend_from_text(text);
        list
    }

    /// Fichier configuré + `do_not_send.{txt,csv}` du répertoire de données.
    /// Les fichiers absents sont ignorés.
    pub fn load(configured: Option<&Path>, data_dir: &Path) -> Self {
        let mut list = Self::default();
        let files = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(DATA_DIR_BLOCKLISTS.iter().map(|name| data_dir.join(name)));
        for path in files {
            match std::fs::read(&path) {
                Ok(bytes) => list.extend_from_text(&String::from_utf8_lossy(&bytes)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(path = %path.display(), error = %err, "blocklist unreadable"),
            }
        }
        debug!(entries = list.len(), "blocklist loaded");
        list
    }

    fn extend_from_text(&mut self, text: &str) {
        self.entries
            .extend(EMAIL_RE.find_iter(text).map(|m| m.as_str().to_lowercase()));
    }

    pub fn contains(&self, email: &str) -> bool {
        self.entries.contains(&email.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Jetons de campagne connus, un par ligne. Un jeton inconnu n'est qu'un
/// avertissement pour l'appelant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    tokens: HashSet<String>,
}

impl TokenSet {
    pub fn from_text(text: &str) -> Self {
        Self {
            tokens: text
                .lines()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_text(&text),
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %err, "token file unreadable");
                }
                Self::default()
            }
        }
    }

    /// Un ensemble vide accepte tout jeton.
    pub fn is_known(&self, token: &str) -> bool {
        self.tokens.is_empty() || self.tokens.contains(token.trim())
    }

    pub fn as_set(&self) -> &HashSet<String> {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

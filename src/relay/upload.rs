//! Lecture des fichiers CSV de campagne (`emails` + `analysis`).

use std::borrow::Cow;
use std::sync::LazyLock;

use encoding_rs::{UTF_8, WINDOWS_1251};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::BatchItem;

const EMAIL_COLUMNS: &[&str] = &["emails", "Emails", "EMAILS"];
const ANALYSIS_COLUMNS: &[&str] = &["analysis", "Analysis", "ANALYSIS"];

static SUBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*Subject:\s*(.+)\s*$").expect("static regex"));
static SUBJECT_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*Subject:.*(\r?\n)?").expect("static regex"));
static FENCE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^```[a-zA-Z0-9]*\s*").expect("static regex"));
static FENCE_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\s*```$").expect("static regex"));
static EMAIL_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;, \t\r\n]+").expect("static regex"));

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to read CSV header: {source}")]
    Header {
        #[source]
        source: csv::Error,
    },
    #[error("CSV needs `emails` and `analysis` columns")]
    MissingColumns,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUpload {
    pub items: Vec<BatchItem>,
    /// Lignes illisibles, ignorées.
    pub errors: Vec<String>,
}

fn cyrillic_count(text: &str) -> usize {
    text.chars()
        .filter(|c| matches!(c, 'А'..='я' | 'Ё' | 'ё'))
        .count()
}

/// UTF-8 par défaut; Windows-1251 s'il donne plus de lettres cyrilliques
/// alors que l'UTF-8 contient des caractères de remplacement ou aucune.
pub fn decode_upload(bytes: &[u8]) -> String {
    let (utf8, _, _) = UTF_8.decode(bytes);
    let cyrillic = cyrillic_count(&utf8);
    if utf8.contains('\u{FFFD}') || cyrillic == 0 {
        let (legacy, _, _) = WINDOWS_1251.decode(bytes);
        if cyrillic_count(&legacy) > cyrillic {
            debug!("CSV decoded as windows-1251");
            return legacy.into_owned();
        }
    }
    utf8.into_owned()
}

fn delimiter_for(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

fn column_indices(headers: &csv::StringRecord, names: &[&str]) -> Vec<usize> {
    names
        .iter()
        .filter_map(|name| headers.iter().position(|h| h.trim() == *name))
        .collect()
}

fn first_value<'r>(row: &'r csv::StringRecord, indices: &[usize]) -> &'r str {
    indices
        .iter()
        .filter_map(|&i| row.get(i))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

/// `{"1": "...", "2": "..."}`: sortie de modèle inexploitable.
fn is_numeric_key_json(text: &str) -> bool {
    let text = text.trim();
    if !(text.starts_with('{') && text.ends_with('}')) {
        return false;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => {
            !map.is_empty() && map.keys().all(|k| k.chars().all(|c| c.is_ascii_digit()) && !k.is_empty())
        }
        _ => false,
    }
}

fn json_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Sujet et corps d'une cellule `analysis`.
fn split_analysis(analysis: &str) -> (Option<String>, String) {
    let mut subject = SUBJECT_RE
        .captures(analysis)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string());
    let mut body: Cow<'_, str> = if subject.is_some() {
        Cow::Owned(SUBJECT_LINE_RE.replace(analysis, "").trim().to_string())
    } else {
        Cow::Borrowed(analysis)
    };

    if analysis.trim_start().starts_with('{') {
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(analysis) {
            if let Some(text) = json_text(obj.get("body")).or_else(|| json_text(obj.get("text"))) {
                body = Cow::Owned(text);
            }
            if subject.is_none() {
                subject = json_text(obj.get("subject"));
            }
        }
    }

    let body = FENCE_OPEN_RE.replace(&body, "");
    let body = FENCE_CLOSE_RE.replace(&body, "");
    (subject, body.trim().to_string())
}

/// Une entrée par adresse; les lignes sans adresse ou sans texte sont ignorées.
pub fn parse_upload(bytes: &[u8]) -> Result<ParsedUpload, CsvError> {
    let text = decode_upload(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(&text))
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| CsvError::Header { source })?
        .clone();
    let emails_at = column_indices(&headers, EMAIL_COLUMNS);
    let analysis_at = column_indices(&headers, ANALYSIS_COLUMNS);
    if emails_at.is_empty() || analysis_at.is_empty() {
        return Err(CsvError::MissingColumns);
    }

    let mut parsed = ParsedUpload::default();
    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                parsed.errors.push(err.to_string());
                continue;
            }
        };
        let emails = first_value(&row, &emails_at);
        let analysis = first_value(&row, &analysis_at);
        if emails.is_empty() || analysis.is_empty() || is_numeric_key_json(analysis) {
            continue;
        }
        let (subject, body) = split_analysis(analysis);
        parsed.items.extend(
            EMAIL_SPLIT_RE
                .split(emails)
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(|email| BatchItem {
                    email: email.to_string(),
                    subject: subject.clone(),
                    text: body.clone(),
                }),
        );
    }
    debug!(items = parsed.items.len(), errors = parsed.errors.len(), "CSV parsed");
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolon_file_with_subject_line_and_several_addresses() {
        let csv = "emails;analysis\n\
                   \"a@example.com, b@example.com\";\"Subject: Hello there\nHi Bob\"\n";
        let parsed = parse_upload(csv.as_bytes()).unwrap();
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].email, "a@example.com");
        assert_eq!(parsed.items[1].email, "b@example.com");
        assert_eq!(parsed.items[0].subject.as_deref(), Some("Hello there"));
        assert_eq!(parsed.items[0].text, "Hi Bob");
    }

    #[test]
    fn json_analysis_and_code_fences() {
        let csv = "Emails,Analysis\n\
                   x@example.com,\"{\"\"subject\"\":\"\"Offer\"\",\"\"body\"\":\"\"Line\"\"}\"\n\
                   y@example.com,\"```text\nFenced body\n```\"\n";
        let parsed = parse_upload(csv.as_bytes()).unwrap();
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].subject.as_deref(), Some("Offer"));
        assert_eq!(parsed.items[0].text, "Line");
        assert_eq!(parsed.items[1].subject, None);
        assert_eq!(parsed.items[1].text, "Fenced body");
    }

    #[test]
    fn skips_numeric_key_json_and_empty_cells() {
        let csv = "emails,analysis\n\
                   a@example.com,\"{\"\"1\"\":\"\"s\"\",\"\"2\"\":\"\"b\"\"}\"\n\
                   ,text without address\n\
                   b@example.com,\n\
                   c@example.com,kept\n";
        let parsed = parse_upload(csv.as_bytes()).unwrap();
        let emails: Vec<_> = parsed.items.iter().map(|i| i.email.as_str()).collect();
        assert_eq!(emails, ["c@example.com"]);
    }

    #[test]
    fn missing_columns_is_an_error() {
        let err = parse_upload(b"mail,text\na@example.com,hi\n").unwrap_err();
        assert!(matches!(err, CsvError::MissingColumns));
    }

    #[test]
    fn windows_1251_bytes_are_recognised() {
        let (bytes, _, _) = WINDOWS_1251.encode("emails,analysis\na@example.com,Привет\n");
        let parsed = parse_upload(&bytes).unwrap();
        assert_eq!(parsed.items[0].text, "Привет");
        assert_eq!(decode_upload("plain ascii".as_bytes()), "plain ascii");
        assert_eq!(decode_upload("Привет".as_bytes()), "Привет");
    }
}

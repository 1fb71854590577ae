use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxReport {
    pub ok: bool,
    pub reasons: Vec<String>,
}

/// Adresse découpée au premier '@', domaine converti en ASCII (IDNA).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedAddress {
    pub local: String,
    pub domain: String,
    pub ascii_domain: String,
}

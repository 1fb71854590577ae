use std::sync::LazyLock;

use regex::Regex;

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[\s\S]*?</style>").expect("static regex"));
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[\s\S]*?</script>").expect("static regex"));
static BLOCK_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(p|div|h\d|li|br)>").expect("static regex"));
static LI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<li>").expect("static regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static regex"));
static SPACE_NL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+\n").expect("static regex"));
static MULTI_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("static regex"));

/// Échappe le texte pour HTML; les sauts de ligne deviennent `<br>`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            other => out.push(other),
        }
    }
    out
}

/// Version texte d'un corps HTML (partie text/plain).
pub fn strip_html_to_text(html: &str) -> String {
    let text = STYLE_RE.replace_all(html, " ");
    let text = SCRIPT_RE.replace_all(&text, " ");
    let text = BLOCK_END_RE.replace_all(&text, "\n");
    let text = LI_RE.replace_all(&text, "• ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = SPACE_NL_RE.replace_all(&text, "\n");
    let text = MULTI_SPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Parties text/plain et text/html d'un message.
///
/// Un HTML fourni est repris tel quel (texte dérivé s'il manque); sinon le
/// texte échappé est enveloppé dans `<div>` (mode primaire) ou `<p>`.
pub fn compose_body(text: &str, html: Option<&str>, primary_mode: bool) -> (String, String) {
    match html.filter(|h| !h.trim().is_empty()) {
        Some(html) => {
            let text = if text.trim().is_empty() {
                strip_html_to_text(html)
            } else {
                text.to_string()
            };
            (text, html.to_string())
        }
        None => {
            let escaped = escape_html(text);
            let html = if primary_mode {
                format!("<div>{escaped}</div>")
            } else {
                format!("<p>{escaped}</p>")
            };
            (text.to_string(), html)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_newlines() {
        assert_eq!(
            escape_html("a < b & \"c\"\n'd'"),
            "a &lt; b &amp; &quot;c&quot;<br>&#39;d&#39;"
        );
    }

    #[test]
    fn strips_markup() {
        let html = "<style>p{color:red}</style><h1>Hello</h1><p>First  line</p><ul><li>one</li></ul><script>x()</script>";
        assert_eq!(strip_html_to_text(html), "Hello\n First line\n • one");
    }

    #[test]
    fn compose_prefers_given_html() {
        let (text, html) = compose_body("", Some("<p>Hi</p>"), false);
        assert_eq!(text, "Hi");
        assert_eq!(html, "<p>Hi</p>");

        let (_, html) = compose_body("Hi\nthere", None, true);
        assert_eq!(html, "<div>Hi<br>there</div>");
        let (_, html) = compose_body("Hi", Some("   "), false);
        assert_eq!(html, "<p>Hi</p>");
    }
}

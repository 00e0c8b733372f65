use serde_json::Value;
use url::Url;

// ── Text ──────────────────────────────────────────────────────────────────────

/// Collapse every whitespace run to one space and trim both ends.
/// "  Rio \n de   Janeiro " → "Rio de Janeiro"
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scalar JSON value as endpoint text. `null` is the empty string;
/// arrays and objects have no text form.
pub fn json_scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(normalize_text(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

// ── Links ─────────────────────────────────────────────────────────────────────

fn path_of(href: &str) -> String {
    match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

/// Segment slug and benefit id from a detail link.
/// ".../beneficios/bolsa-familia/123456?ordenarPor=mes" → ("bolsa-familia", "123456")
pub fn parse_detail_link(href: &str) -> Option<(String, String)> {
    let path = path_of(href);
    let mut parts = path.split('/').filter(|p| !p.is_empty());
    parts.find(|p| *p == "beneficios")?;

    let slug = parts.next()?;
    let id: String = parts.next()?.chars().take_while(|c| c.is_ascii_digit()).collect();
    if id.is_empty() {
        return None;
    }
    Some((slug.to_string(), id))
}

/// Numeric subject id from a subject page URL.
/// "/busca/pessoa-fisica/1234567-joao-silva" → "1234567"
pub fn subject_id_from_url(url: &str) -> Option<String> {
    let path = path_of(url);
    let mut parts = path.split('/').filter(|p| !p.is_empty());
    parts.find(|p| *p == "pessoa-fisica")?;

    let (id, _) = parts.next()?.split_once('-')?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(id.to_string())
}

/// Resolve a possibly-relative href against the page it came from.
pub fn absolute_url(base: &Url, href: &str) -> String {
    base.join(href.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.trim().to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

use regex::Regex;

use crate::error::{HarvestError, Result};

/// Translate a `*`/`?` wildcard file pattern (`VNXZ32.*0000.zip`) into an
/// anchored regex.
pub fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            other => translated.push_str(&regex::escape(&other.to_string())),
        }
    }
    translated.push('$');
    Regex::new(&translated)
        .map_err(|err| HarvestError::Config(format!("bad file pattern '{pattern}': {err}")))
}

/// Compile the capture regex that pulls the sortable identifier out of a
/// remote file name.
pub fn ident_regex(pattern: &str) -> Result<Regex> {
    let regex = Regex::new(pattern)
        .map_err(|err| HarvestError::Config(format!("bad ident pattern '{pattern}': {err}")))?;
    if regex.captures_len() < 2 {
        return Err(HarvestError::Config(format!(
            "ident pattern '{pattern}' needs one capture group"
        )));
    }
    Ok(regex)
}

/// Identifier for a file name: the capture if the name matches, otherwise
/// the whole name, which still sorts consistently within one feed.
pub fn extract_ident(regex: &Regex, name: &str) -> String {
    regex
        .captures(name)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| name.to_string())
}

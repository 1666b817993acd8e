//! Strict grammar check for flat-format text.

use once_cell::sync::Lazy;
use regex::Regex;

static SECTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[[\w\-\s]+\]$").expect("valid regex"));
static ENTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w\-\s]+=[^=]*$").expect("valid regex"));

/// Whether `text` is well-formed under the strict grammar.
///
/// Every non-blank, non-comment line must be a `[section]` header or a
/// `key=value` entry inside an open section, and at least one section must
/// be present. Values may not contain `=` under this grammar even though the
/// lenient parser accepts them.
pub fn validate(text: &str) -> bool {
    let mut sections = 0usize;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if SECTION_RE.is_match(line) {
            sections += 1;
        } else if sections == 0 || !ENTRY_RE.is_match(line) {
            tracing::debug!(line, "Flat document failed validation");
            return false;
        }
    }

    sections > 0
}

use std::collections::HashSet;
use std::ops::Range;

use regex::Regex;

/// Prefix grammar used when no project prefixes are configured.
const GENERIC_PREFIX: &str = "[A-Za-z][A-Za-z0-9]*";

/// `HYPERLINK(<url>, "<display>")`. The url may be a quoted literal or a bare
/// reference; only the display argument is captured.
const FORMULA_PATTERN: &str =
    r#"(?i)HYPERLINK\s*\(\s*(?:"(?:[^"]|"")*"|[^",;()]+)\s*[,;]\s*"((?:[^"]|"")*)"\s*\)"#;

/// Error type for building a key parser
#[derive(Debug, thiserror::Error)]
pub enum KeyPatternError {
    #[error("invalid issue key prefix \"{0}\": use letters and digits, starting with a letter")]
    InvalidPrefix(String),
    #[error("could not compile issue key pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Extracts canonical `PREFIX-NUMBER` issue keys from free text and cells.
#[derive(Debug, Clone)]
pub struct TicketKeyParser {
    bare: Regex,
    formula: Regex,
}

impl TicketKeyParser {
    /// Build a parser for the given project prefixes. An empty list accepts
    /// any alphanumeric prefix starting with a letter.
    pub fn new(prefixes: &[String]) -> Result<Self, KeyPatternError> {
        let prefix_alt = if prefixes.is_empty() {
            GENERIC_PREFIX.to_string()
        } else {
            let mut alts = Vec::with_capacity(prefixes.len());
            for prefix in prefixes {
                let p = prefix.trim();
                let valid = p.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                    && p.chars().all(|c| c.is_ascii_alphanumeric());
                if !valid {
                    return Err(KeyPatternError::InvalidPrefix(prefix.clone()));
                }
                alts.push(regex::escape(p));
            }
            alts.join("|")
        };
        Ok(TicketKeyParser {
            bare: Regex::new(&format!(r"(?i)(?:{})-[0-9]+", prefix_alt))?,
            formula: Regex::new(FORMULA_PATTERN)?,
        })
    }

    /// All distinct keys in `text`, uppercased, in order of first appearance.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut found: Vec<(usize, String)> = Vec::new();
        let mut masked: Vec<Range<usize>> = Vec::new();

        for caps in self.formula.captures_iter(text) {
            let (Some(whole), Some(display)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            masked.push(whole.range());
            if let Some(key) = self.whole_key(display.as_str()) {
                found.push((display.start(), key));
            }
        }

        for m in self.bare.find_iter(text) {
            if masked.iter().any(|r| r.contains(&m.start())) {
                continue;
            }
            if !is_delimited(text, m.range()) {
                continue;
            }
            found.push((m.start(), m.as_str().to_ascii_uppercase()));
        }

        found.sort_by_key(|(pos, _)| *pos);
        let mut seen = HashSet::new();
        found
            .into_iter()
            .filter_map(|(_, key)| seen.insert(key.clone()).then_some(key))
            .collect()
    }

    /// The key held by a single sheet cell: either the whole (trimmed) cell is
    /// a key, or the cell is a hyperlink formula whose display text is a key.
    /// Anything else, including keys mentioned inside longer text, is `None`.
    pub fn parse_cell(&self, cell: &str) -> Option<String> {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }
        if let Some(key) = self.whole_key(cell) {
            return Some(key);
        }
        if !cell.starts_with('=') {
            return None;
        }
        self.formula
            .captures_iter(cell)
            .filter_map(|caps| caps.get(1))
            .find_map(|display| self.whole_key(display.as_str()))
    }

    /// `Some(KEY)` when the trimmed text is exactly one key.
    pub fn whole_key(&self, text: &str) -> Option<String> {
        let text = text.trim();
        let m = self.bare.find(text)?;
        (m.start() == 0 && m.end() == text.len()).then(|| text.to_ascii_uppercase())
    }
}

/// A bare match counts only when not glued to surrounding alphanumerics.
fn is_delimited(text: &str, range: Range<usize>) -> bool {
    let before = text[..range.start].chars().next_back();
    let after = text[range.end..].chars().next();
    !before.is_some_and(|c| c.is_ascii_alphanumeric())
        && !after.is_some_and(|c| c.is_ascii_alphanumeric())
}

/// The formula cell written for a new issue row.
pub fn hyperlink_formula(base_url: &str, key: &str) -> String {
    format!(
        "=HYPERLINK(\"{}{}\",\"{}\")",
        base_url.replace('"', "\"\""),
        key,
        key
    )
}

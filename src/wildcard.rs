use crate::error::{LedgerAnalyticsError, Result};
use regex::Regex;

/// A department-code pattern where `*` stands for any run of characters
/// (including none) and every other character is literal.
///
/// Matching is anchored at both ends and case-sensitive.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&wildcard_to_regex(pattern)).map_err(|e| {
            LedgerAnalyticsError::InvalidPattern {
                pattern: pattern.to_string(),
                details: e.to_string(),
            }
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, code: &str) -> bool {
        self.regex.is_match(code)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for WildcardPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Escapes everything except `*`, which becomes `.*`, and anchors the result.
fn wildcard_to_regex(pattern: &str) -> String {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    format!("(?s)^{}$", body)
}

/// One-shot convenience for callers that do not keep the compiled form.
pub fn wildcard_match(pattern: &str, code: &str) -> Result<bool> {
    Ok(WildcardPattern::new(pattern)?.matches(code))
}

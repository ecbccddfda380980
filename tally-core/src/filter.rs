//! Filters connect transactions to categories.
//!
//! The set of filter kinds is closed: a manual filter pins one transaction
//! by identity, a text filter matches transaction content by wildcard or
//! regex pattern. Pattern validity is checked when a filter is created or
//! loaded, never during assignment.

use once_cell::unsync::OnceCell;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LedgerError, Result};
use crate::transaction::SourceTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Manual,
    Text,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Manual => write!(f, "manual"),
            FilterKind::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Wildcard,
    Regexp,
}

/// Content patterns of a text filter.
///
/// The contra-account pattern is tested against both the contra-account
/// identifier and its display name. An empty pattern matches any value;
/// a filter with both patterns empty matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPatterns {
    pub contra_account: String,
    pub description: String,
}

/// Pins a single transaction by its identity hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualFilter {
    pub id: u32,
    pub transaction_hash: u64,
}

/// Matches transaction content case-insensitively, either with a wildcard
/// pattern (`*` matches any sequence) or a regex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFilter {
    pub id: u32,
    /// Shown in place of the contra-account pattern when non-empty.
    pub display_name: String,
    pub match_kind: MatchKind,
    pub patterns: MatchPatterns,
    #[serde(skip)]
    matchers: OnceCell<Option<Matchers>>,
}

#[derive(Debug, Clone)]
struct Matchers {
    contra_account: Regex,
    description: Regex,
}

impl PartialEq for TextFilter {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.display_name == other.display_name
            && self.match_kind == other.match_kind
            && self.patterns == other.patterns
    }
}

impl TextFilter {
    /// Creates a text filter, rejecting invalid patterns up front.
    pub fn new(
        id: u32,
        display_name: impl Into<String>,
        match_kind: MatchKind,
        patterns: MatchPatterns,
    ) -> Result<Self> {
        let filter = Self {
            id,
            display_name: display_name.into(),
            match_kind,
            patterns,
            matchers: OnceCell::new(),
        };
        filter.validate()?;
        Ok(filter)
    }

    /// Compiles the patterns if that has not happened yet. Needed after
    /// deserialization, which skips the compiled matchers.
    pub fn validate(&self) -> Result<()> {
        self.matchers().map(|_| ())
    }

    fn matchers(&self) -> Result<Option<&Matchers>> {
        self.matchers
            .get_or_try_init(|| compile_matchers(self.match_kind, &self.patterns))
            .map(Option::as_ref)
    }

    /// True if this filter matches the transaction. A filter whose stored
    /// pattern fails to compile matches nothing; `validate` surfaces such
    /// patterns where they can be reported.
    pub fn matches(&self, transaction: &SourceTransaction) -> bool {
        let Ok(Some(matchers)) = self.matchers() else {
            return false;
        };

        let contra_matched = matchers
            .contra_account
            .is_match(transaction.contra_account().unwrap_or(""))
            || matchers
                .contra_account
                .is_match(transaction.contra_account_name().unwrap_or(""));

        contra_matched && matchers.description.is_match(transaction.description())
    }
}

fn compile_matchers(match_kind: MatchKind, patterns: &MatchPatterns) -> Result<Option<Matchers>> {
    if patterns.contra_account.is_empty() && patterns.description.is_empty() {
        return Ok(None);
    }
    Ok(Some(Matchers {
        contra_account: compile_pattern(match_kind, &patterns.contra_account)?,
        description: compile_pattern(match_kind, &patterns.description)?,
    }))
}

fn compile_pattern(match_kind: MatchKind, pattern: &str) -> Result<Regex> {
    let translated = match match_kind {
        MatchKind::Wildcard => wildcard_to_regex(pattern),
        MatchKind::Regexp => pattern.to_string(),
    };
    RegexBuilder::new(&translated)
        .case_insensitive(true)
        .build()
        .map_err(|err| LedgerError::Validation(format!("invalid pattern \"{pattern}\": {err}")))
}

/// Translates a wildcard pattern into a regex pattern: every regex
/// metacharacter is escaped and `*` becomes "any sequence".
pub fn wildcard_to_regex(pattern: &str) -> String {
    pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*")
}

/// A category's rule for matching transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Filter {
    Manual(ManualFilter),
    Text(TextFilter),
}

impl Filter {
    pub fn id(&self) -> u32 {
        match self {
            Filter::Manual(filter) => filter.id,
            Filter::Text(filter) => filter.id,
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Manual(_) => FilterKind::Manual,
            Filter::Text(_) => FilterKind::Text,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Filter::Manual(_) => Ok(()),
            Filter::Text(filter) => filter.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::DECIMAL;
    use chrono::{TimeZone, Utc};

    fn transaction(
        contra_account: Option<&str>,
        contra_name: Option<&str>,
        description: &str,
    ) -> SourceTransaction {
        SourceTransaction::new(
            Utc.with_ymd_and_hms(2021, 11, 2, 0, 0, 0).unwrap(),
            -20 * DECIMAL,
            "NL00MAIN1234567890",
            contra_account.map(String::from),
            contra_name.map(String::from),
            description,
        )
    }

    fn text_filter(match_kind: MatchKind, contra: &str, description: &str) -> TextFilter {
        TextFilter::new(
            1,
            "",
            match_kind,
            MatchPatterns {
                contra_account: contra.to_string(),
                description: description.to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn translates_wildcard_patterns_into_regex_patterns() {
        let wildcard_patterns = [
            "Hello*World",
            "Hi. 1+2 = 3.",
            "Is that true!?",
            "(${result}) [1|2]",
            "^\\|",
            "",
        ];
        let regex_patterns = [
            "Hello.*World",
            r"Hi\. 1\+2 = 3\.",
            r"Is that true!\?",
            r"\(\$\{result\}\) \[1\|2\]",
            r"\^\\\|",
            "",
        ];

        let translated: Vec<String> = wildcard_patterns
            .iter()
            .map(|pattern| wildcard_to_regex(pattern))
            .collect();
        assert_eq!(translated, regex_patterns);
    }

    #[test]
    fn wildcard_filter_matches_case_insensitively() {
        let filter = text_filter(MatchKind::Wildcard, "", "invoice*laptop");
        assert!(filter.matches(&transaction(None, None, "Invoice 934830293, LAPTOP model VT94")));
        assert!(!filter.matches(&transaction(None, None, "Tire sale")));
    }

    #[test]
    fn wildcard_pattern_treats_metacharacters_literally() {
        let filter = text_filter(MatchKind::Wildcard, "", "1+2 = 3");
        assert!(filter.matches(&transaction(None, None, "sum: 1+2 = 3")));
        assert!(!filter.matches(&transaction(None, None, "112 = 3")));
    }

    #[test]
    fn regexp_filter_uses_the_pattern_directly() {
        let filter = text_filter(MatchKind::Regexp, "", r"invoice \d+");
        assert!(filter.matches(&transaction(None, None, "Invoice 934830293")));
        assert!(!filter.matches(&transaction(None, None, "Invoice pending")));
    }

    #[test]
    fn contra_pattern_matches_account_or_display_name() {
        let filter = text_filter(MatchKind::Wildcard, "Robot*", "");
        assert!(filter.matches(&transaction(
            Some("NL23ABNA9349042743"),
            Some("Robot Computer Shop"),
            "Invoice",
        )));
        let filter_by_account = text_filter(MatchKind::Wildcard, "NL23ABNA*", "");
        assert!(filter_by_account.matches(&transaction(
            Some("NL23ABNA9349042743"),
            Some("Robot Computer Shop"),
            "Invoice",
        )));
        assert!(!filter.matches(&transaction(None, None, "Invoice")));
    }

    #[test]
    fn both_configured_patterns_must_match() {
        let filter = text_filter(MatchKind::Wildcard, "Robot*", "invoice*");
        assert!(filter.matches(&transaction(None, Some("Robot Computer Shop"), "Invoice 1")));
        assert!(!filter.matches(&transaction(None, Some("Robot Computer Shop"), "Refund 1")));
        assert!(!filter.matches(&transaction(None, Some("Tire Repairs"), "Invoice 1")));
    }

    #[test]
    fn filter_with_empty_patterns_matches_nothing() {
        let filter = text_filter(MatchKind::Wildcard, "", "");
        assert!(!filter.matches(&transaction(None, None, "")));
        assert!(!filter.matches(&transaction(Some("NL"), Some("Shop"), "anything")));
    }

    #[test]
    fn invalid_regexp_is_rejected_at_construction() {
        let result = TextFilter::new(
            1,
            "",
            MatchKind::Regexp,
            MatchPatterns {
                contra_account: String::new(),
                description: "([".to_string(),
            },
        );
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn filters_round_trip_through_their_storage_format() {
        let manual = Filter::Manual(ManualFilter {
            id: 0x3528,
            transaction_hash: 0x9302323,
        });
        let json = serde_json::to_string(&manual).unwrap();
        assert!(json.contains(r#""type":"manual""#));
        assert_eq!(serde_json::from_str::<Filter>(&json).unwrap(), manual);

        let text = Filter::Text(text_filter(MatchKind::Wildcard, "Robot*", ""));
        let json = serde_json::to_string(&text).unwrap();
        assert!(json.contains(r#""type":"text""#));
        let restored: Filter = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, text);
        // Matchers are rebuilt on demand after deserialization.
        assert!(restored.validate().is_ok());
    }
}

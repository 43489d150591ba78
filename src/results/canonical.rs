//! Canonical patent identifier form used for deduplication
//!
//! `WO 2011/51540 A1`, `wo2011051540` and `WO-2011-051540` all collapse to
//! `WO2011051540`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// WO publication written with separators between year and serial
static SEPARATED_WO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*WO[\s\-/]*(\d{4})\s*[/\-\s]\s*(\d{1,6})(\D.*)?$")
        .expect("SEPARATED_WO: hardcoded regex is valid")
});

/// Country code, number, one kind letter and an optional kind digit
static KIND_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]{2}\d+)[A-Z]\d?$").expect("KIND_CODE: hardcoded regex is valid")
});

static WO_PUBLICATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^WO\d{10}$").expect("WO_PUBLICATION: hardcoded regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalIdentifier(String);

impl CanonicalIdentifier {
    /// Normalize a raw identifier
    ///
    /// Returns `None` when nothing alphanumeric is left.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let padded = SEPARATED_WO.captures(raw).map(|caps| {
            let suffix = caps.get(3).map_or("", |m| m.as_str());
            format!("WO{}{:0>6}{suffix}", &caps[1], &caps[2])
        });
        let source = padded.as_deref().unwrap_or(raw);

        let compact: String = source
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if compact.is_empty() {
            return None;
        }

        let canonical = match KIND_CODE.captures(&compact) {
            Some(caps) => caps[1].to_string(),
            None => compact,
        };

        Some(Self(canonical))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading two-letter country (or `WO`) prefix
    #[must_use]
    pub fn country_code(&self) -> Option<&str> {
        let prefix = self.0.get(..2)?;
        prefix
            .chars()
            .all(|c| c.is_ascii_alphabetic())
            .then_some(prefix)
    }

    /// `WO` followed by a 4 digit year and 6 digit serial
    #[must_use]
    pub fn is_wo_publication(&self) -> bool {
        WO_PUBLICATION.is_match(&self.0)
    }
}

impl fmt::Display for CanonicalIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(raw: &str) -> String {
        CanonicalIdentifier::parse(raw)
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_wo_variants_collapse() {
        assert_eq!(canon("WO 2011/51540"), "WO2011051540");
        assert_eq!(canon("wo2011051540"), "WO2011051540");
        assert_eq!(canon("WO-2011-051540"), "WO2011051540");
        assert_eq!(canon("WO2011051540A1"), "WO2011051540");
        assert_eq!(canon("WO 2011/051540 A1"), "WO2011051540");
        // Kind code glued to a short serial
        assert_eq!(canon("WO 2011/51540A1"), "WO2011051540");
        assert_eq!(canon("WO 2019/123A1"), canon("WO 2019/123"));
        assert_eq!(canon("WO 2019/123"), "WO2019000123");
    }

    #[test]
    fn test_kind_code_removed() {
        assert_eq!(canon("US 7,654,321 B2"), "US7654321");
        assert_eq!(canon("br112012008823-b8"), "BR112012008823");
        assert_eq!(canon("EP1234567A"), "EP1234567");
    }

    #[test]
    fn test_other_shapes_left_alone() {
        assert_eq!(canon("BR PI0712345"), "BRPI0712345");
        assert_eq!(canon("  "), "");
        assert_eq!(canon("50-78-2"), "50782");
    }

    #[test]
    fn test_country_and_wo_shape() {
        let id = CanonicalIdentifier::parse("BR 11 2012 008823").unwrap();
        assert_eq!(id.country_code(), Some("BR"));
        assert!(!id.is_wo_publication());

        let wo = CanonicalIdentifier::parse("WO 2019/123").unwrap();
        assert_eq!(wo.as_str(), "WO2019000123");
        assert!(wo.is_wo_publication());

        assert_eq!(CanonicalIdentifier::parse("12345").unwrap().country_code(), None);
    }
}

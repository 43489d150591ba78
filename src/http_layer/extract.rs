//! Block detection and identifier extraction for HTTP responses

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

/// WO publication in free text, with optional separators
static WO_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"WO[\s-]?(\d{4})[\s/]?(\d{6})").expect("WO_IN_TEXT: hardcoded regex is valid")
});

/// Phrases served by anti-bot interstitials
const BLOCK_INDICATORS: &[&str] = &[
    "unusual traffic",
    "automated requests",
    "captcha",
    "recaptcha",
    "access denied",
    "are you a robot",
];

/// HTML pages shorter than this are interstitials, not result pages
const MIN_RESULT_PAGE_BYTES: usize = 500;

/// Shortest and longest chemical synonym kept
const SYNONYM_LEN: std::ops::Range<usize> = 3..200;

/// Reason a page looks like a block, if it does
#[must_use]
pub fn detect_block(body: &str) -> Option<String> {
    let lower = body.to_lowercase();
    if let Some(indicator) = BLOCK_INDICATORS.iter().find(|i| lower.contains(*i)) {
        return Some(format!("page contains \"{indicator}\""));
    }
    if body.len() < MIN_RESULT_PAGE_BYTES {
        return Some(format!("page too short ({} bytes)", body.len()));
    }
    None
}

/// WO numbers mentioned in a search results page, first occurrence order
#[must_use]
pub fn wo_numbers_from_html(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    WO_IN_TEXT
        .captures_iter(body)
        .map(|caps| format!("WO{}{}", &caps[1], &caps[2]))
        .filter(|wo| seen.insert(wo.clone()))
        .collect()
}

/// National-phase filings of the first family record
///
/// Application numbers missing their country prefix get it added.
pub fn national_phase_from_json(body: &str) -> Result<Vec<String>> {
    let data: Value = serde_json::from_str(body).context("patent family response is not JSON")?;

    let Some(first) = data
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
    else {
        return Ok(Vec::new());
    };

    let entries = first
        .get("nationalPhase")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    Ok(entries
        .iter()
        .filter_map(|entry| {
            let country = entry.get("country")?.as_str()?.trim();
            let number = entry.get("applicationNumber")?.as_str()?.trim();
            if number.is_empty() {
                return None;
            }
            if number.to_ascii_uppercase().starts_with(&country.to_ascii_uppercase()) {
                Some(number.to_string())
            } else {
                Some(format!("{country}{number}"))
            }
        })
        .collect())
}

/// BR publication numbers from the patent office crawler response
pub fn office_titles_from_json(body: &str) -> Result<Vec<String>> {
    let data: Value = serde_json::from_str(body).context("patent office response is not JSON")?;

    let records = data
        .get("data")
        .and_then(Value::as_array)
        .context("patent office response has no 'data' array")?;

    Ok(records
        .iter()
        .filter_map(|record| record.get("title")?.as_str())
        .filter(|title| title.starts_with("BR"))
        .map(|title| title.trim().replace(' ', "-"))
        .collect())
}

/// Synonyms of the first compound in a PubChem synonyms response
pub fn synonyms_from_json(body: &str) -> Result<Vec<String>> {
    let data: Value = serde_json::from_str(body).context("PubChem response is not JSON")?;

    let synonyms = data
        .pointer("/InformationList/Information/0/Synonym")
        .and_then(Value::as_array)
        .context("PubChem response has no synonym list")?;

    Ok(synonyms
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| SYNONYM_LEN.contains(&s.len()))
        .map(str::to_string)
        .collect())
}

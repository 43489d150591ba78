//! Molecule lookup parsing and query construction

use regex::Regex;
use std::sync::LazyLock;

use super::types::{MoleculeInfo, OrchestratorSettings};

/// Development code such as `BAY-1841788`, `ODM 201` or `MK3475A`
static DEV_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z]{2,5}[-\s]?\d{3,7}[A-Z]?$").expect("DEV_CODE: hardcoded regex is valid")
});

static CAS_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2,7}-\d{2}-\d$").expect("CAS_NUMBER: hardcoded regex is valid")
});

/// Pull development codes and the CAS number out of chemical synonyms
#[must_use]
pub fn molecule_info_from_synonyms(synonyms: &[&str], max_dev_codes: usize) -> MoleculeInfo {
    let dev_codes = synonyms
        .iter()
        .map(|s| s.trim())
        .filter(|s| DEV_CODE.is_match(s))
        .filter(|s| !s.to_ascii_uppercase().starts_with("CID"))
        .take(max_dev_codes)
        .map(str::to_string)
        .collect();

    let cas_number = synonyms
        .iter()
        .map(|s| s.trim())
        .find(|s| CAS_NUMBER.is_match(s))
        .map(str::to_string);

    MoleculeInfo {
        synonyms_found: synonyms.len(),
        dev_codes,
        cas_number,
        status: None,
    }
}

/// Queries sent to the patent search engine to discover WO publications
#[must_use]
pub fn wo_discovery_queries(
    molecule: &str,
    info: &MoleculeInfo,
    settings: &OrchestratorSettings,
) -> Vec<String> {
    let mut queries: Vec<String> = settings
        .wo_years
        .iter()
        .map(|year| format!("{molecule} patent WO{year}"))
        .collect();

    queries.extend(
        settings
            .companies
            .iter()
            .take(settings.max_company_queries)
            .map(|company| format!("{molecule} {company} patent")),
    );

    queries.extend(
        info.dev_codes
            .iter()
            .take(settings.max_dev_code_queries)
            .map(|code| format!("{code} patent WO")),
    );

    if let Some(cas) = &info.cas_number {
        queries.push(format!("{cas} patent WO"));
    }

    queries
}

/// Queries sent directly to a national patent office
#[must_use]
pub fn office_queries(molecule: &str, brand: Option<&str>, info: &MoleculeInfo) -> Vec<String> {
    let mut queries = vec![molecule.to_string()];
    if let Some(brand) = brand.map(str::trim).filter(|b| !b.is_empty()) {
        queries.push(brand.to_string());
    }
    if let Some(code) = info.dev_codes.first() {
        queries.push(code.clone());
    }
    queries
}

//! Request, settings and report types of the patent search pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::crawl_engine::cleanup::CleanupResult;
use crate::crawl_engine::crawl_types::{LayerKind, SearchStatus, TargetSource};
use crate::crawl_engine::manager::MultiSearchOutcome;
use crate::crawl_engine::metrics::MetricsSnapshot;

/// One molecule to search patents for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatentSearchRequest {
    pub molecule: String,
    pub brand: Option<String>,
    /// Two-letter country codes; defaults to `["BR"]`
    pub target_countries: Vec<String>,
}

impl PatentSearchRequest {
    #[must_use]
    pub fn new(molecule: impl Into<String>) -> Self {
        Self {
            molecule: molecule.into(),
            brand: None,
            target_countries: vec!["BR".to_string()],
        }
    }

    #[must_use]
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Replace the target countries; an empty list keeps the default
    #[must_use]
    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let countries: Vec<String> = countries
            .into_iter()
            .map(|c| c.into().trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        if !countries.is_empty() {
            self.target_countries = countries;
        }
        self
    }
}

/// Static knobs of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Publication years used to build WO discovery queries
    pub wo_years: Vec<String>,
    /// Applicant names used to build WO discovery queries
    pub companies: Vec<String>,
    pub max_company_queries: usize,
    pub max_dev_code_queries: usize,
    /// Development codes kept from the chemical lookup
    pub max_dev_codes: usize,
    pub max_results_per_query: usize,
    /// National office searched directly for a country code
    pub country_offices: BTreeMap<String, TargetSource>,
    /// Release every layer when the run ends
    pub cleanup_after_run: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            wo_years: ["2016", "2018", "2019", "2020", "2021", "2022", "2023"]
                .map(String::from)
                .to_vec(),
            companies: ["Orion", "Bayer", "Pfizer", "Roche", "Novartis", "Merck"]
                .map(String::from)
                .to_vec(),
            max_company_queries: 3,
            max_dev_code_queries: 5,
            max_dev_codes: 20,
            max_results_per_query: crate::utils::DEFAULT_MAX_RESULTS,
            country_offices: BTreeMap::from([("BR".to_string(), TargetSource::Inpi)]),
            cleanup_after_run: true,
        }
    }
}

/// What the chemical lookup yielded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoleculeInfo {
    pub synonyms_found: usize,
    pub dev_codes: Vec<String>,
    pub cas_number: Option<String>,
    pub status: Option<SearchStatus>,
}

/// Per-phase counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub queries: usize,
    pub searched: usize,
    pub failed_queries: Vec<String>,
    pub layer_usage: BTreeMap<LayerKind, usize>,
    /// Identifiers kept after filtering
    pub found: usize,
}

impl PhaseSummary {
    pub(crate) fn absorb(&mut self, outcome: &MultiSearchOutcome) {
        self.searched += outcome.searched;
        self.failed_queries.extend(outcome.failed_queries.iter().cloned());
        for (kind, count) in &outcome.layer_usage {
            *self.layer_usage.entry(*kind).or_default() += count;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatentOrigin {
    /// National phase of a discovered WO publication
    WoFamily,
    /// Direct hit in a national patent office
    Office,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatentRecord {
    /// Canonical identifier
    pub number: String,
    /// Spelling as returned by the source
    pub raw: String,
    pub origin: PatentOrigin,
    /// WO publication the record was derived from
    pub source_wo: Option<String>,
    pub layer: LayerKind,
    pub target: TargetSource,
}

/// Full outcome of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PatentSearchReport {
    pub run_id: Uuid,
    pub molecule: String,
    pub brand: Option<String>,
    pub target_countries: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub molecule_info: MoleculeInfo,
    pub wo_numbers: Vec<String>,
    pub wo_discovery: PhaseSummary,
    pub family_conversion: PhaseSummary,
    pub office_search: PhaseSummary,
    pub patents: Vec<PatentRecord>,
    pub counts_by_origin: BTreeMap<PatentOrigin, usize>,
    pub metrics: MetricsSnapshot,
    pub cancelled: bool,
    pub cleanup: Option<CleanupResult>,
}

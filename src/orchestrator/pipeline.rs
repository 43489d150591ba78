//! End-to-end patent search on top of `CrawlerManager`
//!
//! Phases run in order, each feeding the next:
//! 1. chemical lookup for development codes and the CAS number
//! 2. WO discovery on the patent search engine
//! 3. WO to national filing conversion through the family register
//! 4. direct search of the national offices
//! 5. merge, family-derived filings first
//!
//! A failed lookup degrades to empty molecule info; later phases keep going
//! with whatever earlier phases produced.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::queries::{molecule_info_from_synonyms, office_queries, wo_discovery_queries};
use super::types::{
    MoleculeInfo, OrchestratorSettings, PatentOrigin, PatentRecord, PatentSearchReport,
    PatentSearchRequest, PhaseSummary,
};
use crate::crawl_engine::cancel::CancelToken;
use crate::crawl_engine::crawl_types::{SearchStatus, TargetSource};
use crate::crawl_engine::errors::{ManagerError, ManagerResult};
use crate::crawl_engine::manager::CrawlerManager;
use crate::results::{CanonicalIdentifier, ResultDeduplicator, ResultEntry, SearchResult};

pub struct SearchOrchestrator {
    manager: Arc<CrawlerManager>,
    settings: OrchestratorSettings,
}

/// Intermediate state threaded through the phases
#[derive(Default)]
struct RunState {
    molecule_info: MoleculeInfo,
    wo_numbers: Vec<String>,
    wo_discovery: PhaseSummary,
    family_conversion: PhaseSummary,
    office_search: PhaseSummary,
    family_batches: Vec<SearchResult>,
    office_batches: Vec<SearchResult>,
}

impl SearchOrchestrator {
    #[must_use]
    pub fn new(manager: Arc<CrawlerManager>, settings: OrchestratorSettings) -> Self {
        Self { manager, settings }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<CrawlerManager> {
        &self.manager
    }

    #[must_use]
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub async fn run(&self, request: PatentSearchRequest) -> ManagerResult<PatentSearchReport> {
        self.run_with_cancel(request, &CancelToken::new()).await
    }

    /// Run the pipeline, stopping early when `cancel` fires
    ///
    /// Layers are released at the end of every run when
    /// `cleanup_after_run` is set, including cancelled and failed runs.
    pub async fn run_with_cancel(
        &self,
        request: PatentSearchRequest,
        cancel: &CancelToken,
    ) -> ManagerResult<PatentSearchReport> {
        let molecule = request.molecule.trim().to_string();
        if molecule.is_empty() {
            return Err(ManagerError::InvalidQuery("molecule name is blank".into()));
        }
        let countries: Vec<String> = if request.target_countries.is_empty() {
            vec!["BR".to_string()]
        } else {
            request
                .target_countries
                .iter()
                .map(|c| c.trim().to_ascii_uppercase())
                .collect()
        };

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(%run_id, %molecule, brand = ?request.brand, ?countries, "Patent search started");

        let mut state = RunState::default();
        let phases = self
            .run_phases(&molecule, request.brand.as_deref(), &countries, cancel, &mut state)
            .await;

        let cleanup = if self.settings.cleanup_after_run {
            Some(self.manager.cleanup_all().await)
        } else {
            None
        };
        phases?;

        let merged =
            ResultDeduplicator::merge(state.family_batches.into_iter().chain(state.office_batches));
        let patents: Vec<PatentRecord> = merged.into_iter().map(patent_record).collect();

        let mut counts_by_origin = BTreeMap::new();
        for record in &patents {
            *counts_by_origin.entry(record.origin).or_insert(0usize) += 1;
        }

        let cancelled = cancel.is_cancelled();
        let elapsed = clock.elapsed();
        let metrics = self.manager.metrics_snapshot();
        for (kind, layer) in &metrics.layers {
            debug!(
                layer = %kind,
                attempts = layer.total_requests,
                success_rate = layer.success_rate(),
                avg_latency_ms = layer.avg_latency_ms,
                "Layer summary"
            );
        }
        info!(
            %run_id,
            wo_numbers = state.wo_numbers.len(),
            patents = patents.len(),
            success_rate = metrics.success_rate(),
            open_layers = ?metrics.open_layers,
            cancelled,
            ?elapsed,
            "Patent search finished"
        );

        Ok(PatentSearchReport {
            run_id,
            molecule,
            brand: request.brand,
            target_countries: countries,
            started_at,
            finished_at: Utc::now(),
            elapsed_secs: elapsed.as_secs_f64(),
            molecule_info: state.molecule_info,
            wo_numbers: state.wo_numbers,
            wo_discovery: state.wo_discovery,
            family_conversion: state.family_conversion,
            office_search: state.office_search,
            patents,
            counts_by_origin,
            metrics,
            cancelled,
            cleanup,
        })
    }

    async fn run_phases(
        &self,
        molecule: &str,
        brand: Option<&str>,
        countries: &[String],
        cancel: &CancelToken,
        state: &mut RunState,
    ) -> ManagerResult<()> {
        state.molecule_info = self.lookup_molecule(molecule, cancel).await;
        if cancel.is_cancelled() {
            return Ok(());
        }

        self.discover_wo_numbers(molecule, cancel, state).await?;
        if cancel.is_cancelled() {
            return Ok(());
        }

        self.convert_wo_numbers(countries, cancel, state).await?;
        if cancel.is_cancelled() {
            return Ok(());
        }

        self.search_offices(molecule, brand, countries, cancel, state).await
    }

    async fn lookup_molecule(&self, molecule: &str, cancel: &CancelToken) -> MoleculeInfo {
        let outcome = match self
            .manager
            .search_with_cancel(molecule, TargetSource::PubChem, usize::MAX, cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%molecule, "Molecule lookup unavailable: {e}");
                return MoleculeInfo::default();
            }
        };

        let mut info = molecule_info_from_synonyms(&outcome.result.raw_values(), self.settings.max_dev_codes);
        info.status = Some(outcome.status);
        info!(
            synonyms = info.synonyms_found,
            dev_codes = info.dev_codes.len(),
            cas = ?info.cas_number,
            "Molecule lookup done"
        );
        info
    }

    async fn discover_wo_numbers(
        &self,
        molecule: &str,
        cancel: &CancelToken,
        state: &mut RunState,
    ) -> ManagerResult<()> {
        let queries = wo_discovery_queries(molecule, &state.molecule_info, &self.settings);
        state.wo_discovery.queries = queries.len();

        let outcome = self
            .manager
            .search_multi_with_cancel(
                queries.as_slice(),
                TargetSource::GooglePatents,
                self.settings.max_results_per_query,
                cancel,
            )
            .await?;
        state.wo_discovery.absorb(&outcome);

        state.wo_numbers = outcome
            .result
            .iter()
            .filter(|entry| entry.id.is_wo_publication())
            .map(|entry| entry.id.to_string())
            .collect();
        state.wo_discovery.found = state.wo_numbers.len();

        info!(wo_numbers = state.wo_numbers.len(), "WO discovery done");
        Ok(())
    }

    async fn convert_wo_numbers(
        &self,
        countries: &[String],
        cancel: &CancelToken,
        state: &mut RunState,
    ) -> ManagerResult<()> {
        state.family_conversion.queries = state.wo_numbers.len();

        for wo in &state.wo_numbers {
            if cancel.is_cancelled() {
                break;
            }
            let outcome = self
                .manager
                .search_with_cancel(
                    wo,
                    TargetSource::PatentFamily,
                    self.settings.max_results_per_query,
                    cancel,
                )
                .await?;

            match outcome.layer_used {
                Some(kind) => {
                    state.family_conversion.searched += 1;
                    *state.family_conversion.layer_usage.entry(kind).or_default() += 1;
                }
                None if outcome.status == SearchStatus::AllLayersFailed => {
                    state.family_conversion.searched += 1;
                    state.family_conversion.failed_queries.push(wo.clone());
                }
                None => {}
            }

            let national = outcome
                .result
                .filtered(|entry| has_country(&entry.id, countries));
            state.family_conversion.found += national.len();
            if !national.is_empty() {
                state.family_batches.push(national);
            }
        }

        info!(
            converted = state.family_conversion.searched,
            filings = state.family_conversion.found,
            "WO conversion done"
        );
        Ok(())
    }

    async fn search_offices(
        &self,
        molecule: &str,
        brand: Option<&str>,
        countries: &[String],
        cancel: &CancelToken,
        state: &mut RunState,
    ) -> ManagerResult<()> {
        let queries = office_queries(molecule, brand, &state.molecule_info);

        for country in countries {
            if cancel.is_cancelled() {
                break;
            }
            let Some(office) = self.settings.country_offices.get(country).copied() else {
                info!(%country, "No patent office configured, skipping direct search");
                continue;
            };

            state.office_search.queries += queries.len();
            let outcome = self
                .manager
                .search_multi_with_cancel(queries.as_slice(), office, self.settings.max_results_per_query, cancel)
                .await?;
            state.office_search.absorb(&outcome);

            let filings = outcome
                .result
                .filtered(|entry| entry.id.country_code() == Some(country.as_str()));
            state.office_search.found += filings.len();
            if !filings.is_empty() {
                state.office_batches.push(filings);
            }
        }

        info!(filings = state.office_search.found, "Office search done");
        Ok(())
    }
}

fn has_country(id: &CanonicalIdentifier, countries: &[String]) -> bool {
    id.country_code()
        .is_some_and(|code| countries.iter().any(|c| c == code))
}

fn patent_record(entry: ResultEntry) -> PatentRecord {
    let origin = if entry.provenance.target == TargetSource::PatentFamily {
        PatentOrigin::WoFamily
    } else {
        PatentOrigin::Office
    };
    let source_wo = (origin == PatentOrigin::WoFamily).then(|| entry.provenance.query.clone());

    PatentRecord {
        number: entry.id.to_string(),
        raw: entry.raw,
        origin,
        source_wo,
        layer: entry.provenance.layer,
        target: entry.provenance.target,
    }
}

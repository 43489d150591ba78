//! Request URLs of the HTTP layer, one base per target source

use anyhow::{Context, Result};
use url::Url;

use crate::crawl_engine::crawl_types::TargetSource;

const GOOGLE_PATENTS_URL: &str = "https://patents.google.com/";
const WIPO_SEARCH_URL: &str = "https://patentscope.wipo.int/search/en/search.jsf";
const WIPO_REST_URL: &str = "https://patentscope.wipo.int/search/rest/patents";
const INPI_URL: &str = "https://crawler3-production.up.railway.app/api/data/inpi/patents";
const PUBCHEM_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

/// Base URLs per source
///
/// Overridable so tests can point every source at a local mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpEndpoints {
    pub google_patents: Url,
    pub wipo_search: Url,
    pub patent_family: Url,
    pub inpi: Url,
    pub pubchem: Url,
}

impl Default for HttpEndpoints {
    fn default() -> Self {
        Self::from_strs(
            GOOGLE_PATENTS_URL,
            WIPO_SEARCH_URL,
            WIPO_REST_URL,
            INPI_URL,
            PUBCHEM_URL,
        )
        .expect("built-in endpoints: hardcoded URLs are valid")
    }
}

impl HttpEndpoints {
    fn from_strs(google: &str, wipo: &str, family: &str, inpi: &str, pubchem: &str) -> Result<Self> {
        Ok(Self {
            google_patents: Url::parse(google).context("google patents endpoint")?,
            wipo_search: Url::parse(wipo).context("wipo search endpoint")?,
            patent_family: Url::parse(family).context("patent family endpoint")?,
            inpi: Url::parse(inpi).context("inpi endpoint")?,
            pubchem: Url::parse(pubchem).context("pubchem endpoint")?,
        })
    }

    /// Every source under one host, with the real path layout
    pub fn with_base(base: &str) -> Result<Self> {
        let base = base.trim_end_matches('/');
        Self::from_strs(
            &format!("{base}/"),
            &format!("{base}/search/en/search.jsf"),
            &format!("{base}/search/rest/patents"),
            &format!("{base}/api/data/inpi/patents"),
            &format!("{base}/rest/pug"),
        )
    }

    /// Full request URL for `query` on `target`
    pub fn request_url(&self, target: TargetSource, query: &str) -> Result<Url> {
        let url = match target {
            TargetSource::GooglePatents => with_params(&self.google_patents, &[("q", query)]),
            TargetSource::Wipo => with_params(&self.wipo_search, &[("query", query)]),
            TargetSource::PatentFamily => {
                let wo: String = query
                    .trim_start_matches(|c: char| matches!(c, 'W' | 'w' | 'O' | 'o'))
                    .chars()
                    .filter(|c| !c.is_whitespace() && *c != '-')
                    .collect();
                with_params(
                    &self.patent_family,
                    &[("query", wo.as_str()), ("offset", "0"), ("limit", "10")],
                )
            }
            TargetSource::Inpi => with_params(&self.inpi, &[("medicine", query)]),
            TargetSource::PubChem => {
                let base = self.pubchem.as_str().trim_end_matches('/');
                let raw = format!(
                    "{base}/compound/name/{}/synonyms/JSON",
                    urlencoding::encode(query)
                );
                Url::parse(&raw).with_context(|| format!("invalid PubChem URL {raw}"))?
            }
        };
        Ok(url)
    }
}

fn with_params(base: &Url, params: &[(&str, &str)]) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().extend_pairs(params);
    url
}

//! Lightweight HTTP acquisition layer
//!
//! Plain `reqwest` client against every target source. Fast, with no
//! JavaScript and no stealth beyond a desktop user agent; HTML sources that
//! answer with an interstitial are reported as blocked.

pub mod endpoints;
pub mod extract;

pub use endpoints::HttpEndpoints;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use tracing::debug;

use crate::config::LayerProfile;
use crate::crawl_engine::crawl_types::{LayerKind, TargetSource};
use crate::crawl_engine::errors::{LayerError, LayerResult};
use crate::crawl_engine::layer::Layer;
use crate::utils::{CHROME_USER_AGENT, HTTP_CALL_TIMEOUT};

pub struct HttpLayer {
    endpoints: HttpEndpoints,
    client: Option<Client>,
    call_timeout: Duration,
}

impl Default for HttpLayer {
    fn default() -> Self {
        Self::new(HttpEndpoints::default())
    }
}

impl HttpLayer {
    #[must_use]
    pub fn new(endpoints: HttpEndpoints) -> Self {
        Self {
            endpoints,
            client: None,
            call_timeout: HTTP_CALL_TIMEOUT,
        }
    }

    async fn fetch(&self, target: TargetSource, query: &str) -> LayerResult<Vec<String>> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| LayerError::Init("HTTP client not initialized".into()))?;

        let url = self
            .endpoints
            .request_url(target, query)
            .map_err(|e| LayerError::Protocol(format!("{e:#}")))?;
        debug!(%target, %url, "HTTP layer request");

        let response = client.get(url).send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(LayerError::RateLimited { retry_after });
        }
        if status == StatusCode::FORBIDDEN || status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(LayerError::Blocked(format!("{target} answered {status}")));
        }
        if status == StatusCode::NOT_FOUND && target == TargetSource::PubChem {
            // PubChem answers 404 for names it does not know
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(LayerError::Protocol(format!("{target} answered {status}")));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        parse_body(target, &body)
    }

    fn transport_error(&self, error: reqwest::Error) -> LayerError {
        if error.is_timeout() {
            LayerError::Timeout(self.call_timeout)
        } else {
            LayerError::Protocol(error.to_string())
        }
    }
}

fn parse_body(target: TargetSource, body: &str) -> LayerResult<Vec<String>> {
    let parsed = match target {
        TargetSource::GooglePatents | TargetSource::Wipo => {
            if let Some(reason) = extract::detect_block(body) {
                return Err(LayerError::Blocked(reason));
            }
            Ok(extract::wo_numbers_from_html(body))
        }
        TargetSource::PatentFamily => extract::national_phase_from_json(body),
        TargetSource::Inpi => extract::office_titles_from_json(body),
        TargetSource::PubChem => extract::synonyms_from_json(body),
    };
    parsed.map_err(|e| LayerError::Protocol(format!("{e:#}")))
}

impl Layer for HttpLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Http
    }

    fn initialize<'a>(&'a mut self, profile: &'a LayerProfile) -> BoxFuture<'a, LayerResult<()>> {
        Box::pin(async move {
            let client = Client::builder()
                .user_agent(CHROME_USER_AGENT)
                .timeout(profile.call_timeout)
                .build()
                .map_err(|e| LayerError::Init(format!("failed to build HTTP client: {e}")))?;
            self.client = Some(client);
            self.call_timeout = profile.call_timeout;
            Ok(())
        })
    }

    fn search<'a>(
        &'a mut self,
        target: TargetSource,
        query: &'a str,
        _max_results: usize,
    ) -> BoxFuture<'a, LayerResult<Vec<String>>> {
        Box::pin(self.fetch(target, query))
    }

    fn cleanup<'a>(&'a mut self) -> BoxFuture<'a, LayerResult<()>> {
        Box::pin(async move {
            self.client = None;
            Ok(())
        })
    }
}

//! `HttpLayer` against a local mock server

use mockito::{Matcher, Server, ServerGuard};
use std::time::Duration;

use kodegen_tools_patentscout::{
    CrawlerManager, HttpEndpoints, HttpLayer, Layer, LayerError, LayerKind, LayerProfile,
    LayerStrategyTable, SearchStatus, TargetSource,
};

mod common;

async fn live_layer(server: &ServerGuard) -> HttpLayer {
    let endpoints = HttpEndpoints::with_base(&server.url()).unwrap();
    let mut layer = HttpLayer::new(endpoints);
    layer
        .initialize(&LayerProfile::for_kind(LayerKind::Http))
        .await
        .unwrap();
    layer
}

fn results_page(hits: &str) -> String {
    format!(
        "<html><head><title>Results</title></head><body>{hits}{}</body></html>",
        "<div class=\"result\"></div>".repeat(30)
    )
}

#[tokio::test]
async fn test_google_results_page() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("q".into(), "darolutamide patent WO2019".into()))
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(results_page("<a>WO2019123456A1</a> <a>WO 2020/654321</a> <a>WO2019123456</a>"))
        .create_async()
        .await;

    let mut layer = live_layer(&server).await;
    let ids = layer
        .search(TargetSource::GooglePatents, "darolutamide patent WO2019", 10)
        .await
        .unwrap();

    assert_eq!(ids, vec!["WO2019123456", "WO2020654321"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_interstitial_reported_as_block() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(results_page("Our systems have detected unusual traffic from your computer network"))
        .create_async()
        .await;

    let mut layer = live_layer(&server).await;
    let err = layer
        .search(TargetSource::GooglePatents, "insulin", 10)
        .await
        .unwrap_err();
    assert!(err.is_block(), "{err:?}");

    // Tiny pages are interstitials too
    server
        .mock("GET", "/search/en/search.jsf")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>wait</html>")
        .create_async()
        .await;
    let err = layer.search(TargetSource::Wipo, "insulin", 10).await.unwrap_err();
    assert!(matches!(err, LayerError::Blocked(_)));
}

#[tokio::test]
async fn test_status_codes_mapped() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("q".into(), "slow down".into()))
        .with_status(429)
        .with_header("retry-after", "7")
        .create_async()
        .await;
    server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("q".into(), "forbidden".into()))
        .with_status(403)
        .create_async()
        .await;
    server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("q".into(), "broken".into()))
        .with_status(500)
        .create_async()
        .await;

    let mut layer = live_layer(&server).await;

    let rate_limited = layer
        .search(TargetSource::GooglePatents, "slow down", 10)
        .await
        .unwrap_err();
    assert_eq!(
        rate_limited,
        LayerError::RateLimited {
            retry_after: Some(Duration::from_secs(7))
        }
    );

    let blocked = layer
        .search(TargetSource::GooglePatents, "forbidden", 10)
        .await
        .unwrap_err();
    assert!(matches!(blocked, LayerError::Blocked(_)));

    let protocol = layer
        .search(TargetSource::GooglePatents, "broken", 10)
        .await
        .unwrap_err();
    assert!(matches!(protocol, LayerError::Protocol(_)));
    assert!(protocol.is_retryable());
}

#[tokio::test]
async fn test_json_sources() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/pug/compound/name/darolutamide/synonyms/JSON")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"InformationList":{"Information":[{"CID":67171867,"Synonym":["darolutamide","ODM-201","1297538-32-9"]}]}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/rest/pug/compound/name/unknownium/synonyms/JSON")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/search/rest/patents")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), "2011051540".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"results":[{"nationalPhase":[{"country":"BR","applicationNumber":"112012008823"}]}]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/data/inpi/patents")
        .match_query(Matcher::UrlEncoded("medicine".into(), "darolutamide".into()))
        .with_status(200)
        .with_body(r#"{"data":[{"title":"BR 10 2015 001111"},{"title":"PI0712345"}]}"#)
        .create_async()
        .await;

    let mut layer = live_layer(&server).await;

    assert_eq!(
        layer.search(TargetSource::PubChem, "darolutamide", 10).await.unwrap(),
        vec!["darolutamide", "ODM-201", "1297538-32-9"]
    );
    assert!(layer.search(TargetSource::PubChem, "unknownium", 10).await.unwrap().is_empty());
    assert_eq!(
        layer.search(TargetSource::PatentFamily, "WO2011051540", 10).await.unwrap(),
        vec!["BR112012008823"]
    );
    assert_eq!(
        layer.search(TargetSource::Inpi, "darolutamide", 10).await.unwrap(),
        vec!["BR-10-2015-001111"]
    );
}

#[tokio::test]
async fn test_search_before_initialize_fails() {
    let server = Server::new_async().await;
    let mut layer = HttpLayer::new(HttpEndpoints::with_base(&server.url()).unwrap());
    let err = layer.search(TargetSource::Wipo, "insulin", 10).await.unwrap_err();
    assert!(matches!(err, LayerError::Init(_)));

    layer
        .initialize(&LayerProfile::for_kind(LayerKind::Http))
        .await
        .unwrap();
    layer.cleanup().await.unwrap();
    // Idempotent
    layer.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_manager_over_http_layer() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/data/inpi/patents")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"data":[{"title":"BR 10 2015 001111"},{"title":"BR 11 2020 001234"}]}"#)
        .create_async()
        .await;

    let strategy = LayerStrategyTable::default()
        .restrict_to(&[LayerKind::Http])
        .unwrap();
    let layer = HttpLayer::new(HttpEndpoints::with_base(&server.url()).unwrap());
    let manager = CrawlerManager::new(
        common::test_config().build().unwrap(),
        strategy,
        vec![Box::new(layer)],
    )
    .unwrap();

    let outcome = manager.search("darolutamide", TargetSource::Inpi).await.unwrap();
    assert_eq!(outcome.status, SearchStatus::Found);
    assert_eq!(outcome.result.ids(), vec!["BR102015001111", "BR112020001234"]);
    assert_eq!(outcome.result.entries()[0].raw, "BR-10-2015-001111");

    assert!(manager.cleanup_all().await.is_success());
}

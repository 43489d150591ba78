//! Batch queries through `CrawlerManager::search_multi`

use std::collections::HashSet;
use std::time::Duration;

use kodegen_tools_patentscout::{
    CancelToken, LayerKind, ManagerError, SearchStatus, TargetSource,
};

mod common;
use common::{Reply, manager_with, strategy, test_config};

#[tokio::test(start_paused = true)]
async fn test_overlapping_queries_deduplicated() {
    let (manager, probes) = manager_with(
        test_config(),
        strategy(TargetSource::GooglePatents, &[LayerKind::Http]),
        &[LayerKind::Http],
    );
    probes[0].respond_with(|_, query| match query {
        "q1" => Reply::ids(&["WO2019000001", "WO2019000002"]),
        "q2" => Reply::ids(&["WO 2019/000002", "WO2019000003"]),
        _ => Reply::ids(&["wo2019000003a1", "WO2019000001"]),
    });

    let outcome = manager
        .search_multi(&["q1", "q2", "q3"], TargetSource::GooglePatents, 10)
        .await
        .unwrap();

    let ids: HashSet<&str> = outcome.result.ids().into_iter().collect();
    assert_eq!(outcome.result.len(), 3);
    assert_eq!(
        ids,
        HashSet::from(["WO2019000001", "WO2019000002", "WO2019000003"])
    );
    assert_eq!(outcome.searched, 3);
    assert!(outcome.failed_queries.is_empty());
    assert!(!outcome.cancelled);

    // Histogram counts successful searches, not submitted queries
    assert_eq!(outcome.layer_usage.values().sum::<usize>(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_histogram_ignores_failed_queries() {
    let order = [LayerKind::Browser, LayerKind::Http];
    let (manager, probes) = manager_with(
        test_config().max_attempts(1).max_concurrent_queries(1),
        strategy(TargetSource::Wipo, &order),
        &order,
    );
    probes[0].respond_with(|_, query| {
        if query == "bay" {
            Reply::ids(&["WO2020111111"])
        } else {
            Reply::protocol()
        }
    });
    probes[1].respond_with(|_, query| {
        if query == "odm" {
            Reply::ids(&["WO2020222222"])
        } else {
            Reply::protocol()
        }
    });

    let outcome = manager
        .search_multi(&["bay", "odm", "nothing"], TargetSource::Wipo, 10)
        .await
        .unwrap();

    assert_eq!(outcome.searched, 3);
    assert_eq!(outcome.failed_queries, vec!["nothing".to_string()]);
    assert_eq!(outcome.layer_usage.get(&LayerKind::Browser), Some(&1));
    assert_eq!(outcome.layer_usage.get(&LayerKind::Http), Some(&1));
    assert_eq!(outcome.result.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_blank_queries_skipped() {
    let (manager, probes) = manager_with(
        test_config(),
        strategy(TargetSource::Inpi, &[LayerKind::Http]),
        &[LayerKind::Http],
    );
    probes[0].respond_with(|_, _| Reply::ids(&["BR102019000001"]));

    let queries = vec![String::new(), "   ".to_string(), "darolutamide".to_string()];
    let outcome = manager
        .search_multi(&queries, TargetSource::Inpi, 10)
        .await
        .unwrap();

    assert_eq!(outcome.searched, 1);
    assert!(outcome.failed_queries.is_empty());
    assert_eq!(probes[0].calls(), 1);

    let empty: [&str; 0] = [];
    let nothing = manager.search_multi(&empty, TargetSource::Inpi, 10).await.unwrap();
    assert_eq!(nothing.searched, 0);
    assert!(nothing.result.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_target_rejected() {
    let (manager, _) = manager_with(
        test_config(),
        strategy(TargetSource::Inpi, &[LayerKind::Http]),
        &[LayerKind::Http],
    );

    let result = manager
        .search_multi(&["insulin"], TargetSource::PubChem, 10)
        .await;
    assert_eq!(result.err(), Some(ManagerError::InvalidTarget(TargetSource::PubChem)));
}

#[tokio::test(start_paused = true)]
async fn test_one_layer_serves_one_query_at_a_time() {
    let (manager, probes) = manager_with(
        test_config().max_concurrent_queries(3),
        strategy(TargetSource::GooglePatents, &[LayerKind::Browser]),
        &[LayerKind::Browser],
    );
    probes[0].respond_with(|_, query| {
        Reply::Slow(Duration::from_secs(2), vec![format!("WO20190000{query}")])
    });

    let outcome = manager
        .search_multi(&["01", "02", "03", "04"], TargetSource::GooglePatents, 10)
        .await
        .unwrap();

    assert_eq!(outcome.searched, 4);
    assert_eq!(outcome.result.len(), 4);
    assert_eq!(probes[0].max_active(), 1);
    assert_eq!(probes[0].inits(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_batch_and_releases_layers() {
    let (manager, probes) = manager_with(
        test_config().max_concurrent_queries(1),
        strategy(TargetSource::GooglePatents, &[LayerKind::Browser]),
        &[LayerKind::Browser],
    );
    probes[0].respond_with(|_, _| Reply::Slow(Duration::from_secs(10), vec!["WO2019123456".into()]));

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let outcome = manager
        .search_multi_with_cancel(&["a", "b", "c", "d"], TargetSource::GooglePatents, 10, &cancel)
        .await
        .unwrap();

    assert!(outcome.cancelled);
    // The in-flight call finishes, nothing new starts
    assert_eq!(outcome.searched, 1);
    assert_eq!(probes[0].calls(), 1);
    assert_eq!(probes[0].cleanups(), 1);

    let state = manager.layer_state(LayerKind::Browser).await.unwrap();
    assert_eq!(state.session_started_at, None);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_batch_releases_layers() {
    let (manager, probes) = manager_with(
        test_config().max_concurrent_queries(1),
        strategy(TargetSource::GooglePatents, &[LayerKind::Browser]),
        &[LayerKind::Browser],
    );
    probes[0].respond_with(|_, _| Reply::Slow(Duration::from_secs(10), vec!["WO2019123456".into()]));

    let abandoned = tokio::time::timeout(
        Duration::from_secs(15),
        manager.search_multi(&["a", "b", "c"], TargetSource::GooglePatents, 10),
    )
    .await;
    assert!(abandoned.is_err());

    // Cleanup runs on a spawned task
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(probes[0].cleanups(), 1);

    let state = manager.layer_state(LayerKind::Browser).await.unwrap();
    assert_eq!(state.session_started_at, None);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start() {
    let (manager, probes) = manager_with(
        test_config(),
        strategy(TargetSource::Wipo, &[LayerKind::Http]),
        &[LayerKind::Http],
    );
    let cancel = CancelToken::new();
    cancel.cancel();

    let single = manager
        .search_with_cancel("insulin", TargetSource::Wipo, 10, &cancel)
        .await
        .unwrap();
    assert_eq!(single.status, SearchStatus::Cancelled);

    let batch = manager
        .search_multi_with_cancel(&["insulin", "glargine"], TargetSource::Wipo, 10, &cancel)
        .await
        .unwrap();
    assert!(batch.cancelled);
    assert_eq!(batch.searched, 0);
    assert!(batch.failed_queries.is_empty());
    assert_eq!(probes[0].calls(), 0);
}

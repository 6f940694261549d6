mod common;

use std::sync::Arc;
use std::time::Duration;

use cloudinfo_core::provider::{Attributes, InstanceType, PriceModel, ProviderErrorKind};
use cloudinfo_core::{CloudInfoEvent, RenewScope, StoreKey};
use common::{data_snapshot, engine, ScriptedProvider};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test(start_paused = true)]
async fn test_timing_out_provider_is_isolated() {
    let amazon = ScriptedProvider::new("amazon");
    let google = ScriptedProvider::new("google");
    google.set_delay(Duration::from_secs(60));
    let engine = engine(&[amazon.clone(), google.clone()], TIMEOUT);

    let loaded = engine.bootstrap().await;
    assert_eq!(loaded.len(), 2);

    let report = engine.driver().run_pass(RenewScope::All).await.unwrap();
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);

    let cloud_info = engine.cloud_info();
    let attributes = cloud_info
        .attributes("amazon", "compute", "region-1", "m.large")
        .await
        .unwrap();
    assert_eq!(attributes.cpu(), Some(4.0));

    let status = cloud_info
        .refresh_status("google", "compute")
        .await
        .unwrap()
        .unwrap();
    let error = status.last_error.unwrap();
    assert_eq!(error.kind, ProviderErrorKind::Timeout);
    assert!(status.last_success.is_none());

    let err = cloud_info.regions("google", "compute").await.unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test(start_paused = true)]
async fn test_cold_key_is_fetched_once_for_concurrent_callers() {
    let provider = ScriptedProvider::new("azure");
    provider.set_delay(Duration::from_millis(200));
    let engine = engine(&[provider.clone()], TIMEOUT);
    let cloud_info = engine.cloud_info().clone();

    let callers: Vec<_> = (0..20)
        .map(|_| {
            let cloud_info = cloud_info.clone();
            tokio::spawn(async move {
                cloud_info
                    .instance_types("azure", "compute", "region-1")
                    .await
            })
        })
        .collect();

    for caller in callers {
        let types = caller.await.unwrap().unwrap();
        assert_eq!(types[0].name, "m.large");
    }
    assert_eq!(provider.calls("list_instance_types"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hit_does_not_wait_for_running_refresh() {
    let provider = ScriptedProvider::new("amazon");
    let engine = Arc::new(engine(&[provider.clone()], Duration::from_secs(3600)));
    engine.bootstrap().await;
    engine.driver().run_pass(RenewScope::All).await.unwrap();

    provider.set_delay(Duration::from_secs(600));
    let background = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.driver().run_pass(RenewScope::All).await })
    };
    // Sleeping lets paused time advance past the rate limiter refill.
    while provider.calls("list_regions") < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let calls_before = provider.data_calls();
    let regions = tokio::time::timeout(
        Duration::from_millis(1),
        engine.cloud_info().regions("amazon", "compute"),
    )
    .await
    .expect("a hit must not wait on the refresh")
    .unwrap();
    assert_eq!(regions[0].id, "region-1");
    assert_eq!(provider.data_calls(), calls_before);

    background.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_value() {
    let provider = ScriptedProvider::new("google");
    let engine = engine(&[provider.clone()], TIMEOUT);
    engine.bootstrap().await;
    engine.driver().run_pass(RenewScope::All).await.unwrap();

    let key = StoreKey::price("google", "compute", "region-1", None, "m.large", PriceModel::OnDemand);
    let before = engine.store().get(&key).await.unwrap().unwrap();

    provider.set_failing(true);
    let report = engine.driver().run_pass(RenewScope::All).await.unwrap();
    assert_eq!(report.failed(), 1);

    let after = engine.store().get(&key).await.unwrap().unwrap();
    assert_eq!(after, before);

    let status = engine
        .cloud_info()
        .refresh_status("google", "compute")
        .await
        .unwrap()
        .unwrap();
    assert!(status.last_success.is_some());
    assert_eq!(status.consecutive_failures, 1);
    assert_eq!(
        status.last_error.map(|e| e.kind),
        Some(ProviderErrorKind::Network)
    );
}

#[tokio::test]
async fn test_unchanged_upstream_leaves_values_unchanged() {
    let provider = ScriptedProvider::new("amazon");
    let engine = engine(&[provider], TIMEOUT);
    engine.bootstrap().await;

    engine.driver().run_pass(RenewScope::All).await.unwrap();
    let first = data_snapshot(engine.store()).await;
    engine.driver().run_pass(RenewScope::All).await.unwrap();
    let second = data_snapshot(engine.store()).await;

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_scrape_picks_up_upstream_changes() {
    let provider = ScriptedProvider::new("amazon");
    let engine = engine(&[provider.clone()], TIMEOUT);
    engine.bootstrap().await;
    engine.driver().run_pass(RenewScope::All).await.unwrap();

    provider.set_instance_types(vec![InstanceType::new(
        "m.large",
        Attributes::new().with("cpu", "8").with("memory", "32"),
    )]);
    engine.driver().run_pass(RenewScope::All).await.unwrap();

    let attributes = engine
        .cloud_info()
        .attributes("amazon", "compute", "region-1", "m.large")
        .await
        .unwrap();
    assert_eq!(attributes.cpu(), Some(8.0));
}

#[tokio::test]
async fn test_late_subscriber_sees_only_later_events() {
    let provider = ScriptedProvider::new("azure");
    let engine = engine(&[provider], TIMEOUT);
    engine.bootstrap().await;
    engine.driver().run_pass(RenewScope::All).await.unwrap();

    let mut late = engine.events().subscribe();
    let report = engine.driver().run_pass(RenewScope::All).await.unwrap();

    match late.recv().await.unwrap() {
        CloudInfoEvent::ServiceRefreshed { pass_id, .. } => assert_eq!(pass_id, report.pass_id),
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(matches!(
        late.recv().await.unwrap(),
        CloudInfoEvent::ScrapeCompleted { pass_id, .. } if pass_id == report.pass_id
    ));
    assert!(late.try_recv().is_none());
}

#[tokio::test]
async fn test_cold_fill_is_served_until_next_scrape() {
    let provider = ScriptedProvider::new("google");
    let engine = engine(&[provider.clone()], TIMEOUT);
    engine.bootstrap().await;

    let cloud_info = engine.cloud_info();
    let price = cloud_info
        .price("google", "compute", "region-1", Some("region-1a"), "m.large", PriceModel::Spot)
        .await
        .unwrap();
    assert_eq!(provider.calls("get_price"), 1);

    engine.driver().run_pass(RenewScope::All).await.unwrap();
    let scraped_calls = provider.calls("get_price");

    let again = cloud_info
        .price("google", "compute", "region-1", Some("region-1a"), "m.large", PriceModel::Spot)
        .await
        .unwrap();
    assert_eq!(again, price);
    assert_eq!(provider.calls("get_price"), scraped_calls);
}

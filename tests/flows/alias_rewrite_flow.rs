//! Alias resolution and post-resolution answer rewriting flows.

#[path = "../common/fixtures.rs"]
mod fixtures;

use fixtures::StoreFixture;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[tokio::test]
async fn exact_alias_returns_target() {
    let store = StoreFixture::new().await;
    store
        .add_mapping("domain_alias", "intel.com", "keweon.center")
        .await;
    let engine = store.engine().await;

    assert_eq!(
        engine.alias("intel.com").await.as_deref(),
        Some("keweon.center")
    );

    engine.shutdown().await;
}

#[tokio::test]
async fn parent_alias_preserves_leading_label() {
    let store = StoreFixture::new().await;
    store
        .add_mapping("domain_alias", "intel.com", "keweon.center")
        .await;
    let engine = store.engine().await;

    assert_eq!(
        engine.alias("www.intel.com").await.as_deref(),
        Some("www.keweon.center")
    );
    // Only the first label is split off; deeper prefixes stay intact on
    // the parent side and miss here.
    assert_eq!(engine.alias("a.b.intel.com").await, None);

    engine.shutdown().await;
}

#[tokio::test]
async fn exact_alias_wins_over_parent() {
    let store = StoreFixture::new().await;
    store
        .add_mapping("domain_alias", "intel.com", "keweon.center")
        .await;
    store
        .add_mapping("domain_alias", "www.intel.com", "direct.example")
        .await;
    let engine = store.engine().await;

    assert_eq!(
        engine.alias("www.intel.com").await.as_deref(),
        Some("direct.example")
    );

    engine.shutdown().await;
}

#[tokio::test]
async fn alias_misses_cleanly() {
    let store = StoreFixture::new().await;
    store
        .add_mapping("domain_alias", "intel.com", "keweon.center")
        .await;
    let engine = store.engine().await;

    assert_eq!(engine.alias("amd.com").await, None);
    assert_eq!(engine.alias("localhost").await, None);
    assert_eq!(engine.alias("Www.INTEL.com").await.as_deref(), Some("www.keweon.center"));

    engine.shutdown().await;
}

#[tokio::test]
async fn rewrite_v4_substitutes_configured_address() {
    let store = StoreFixture::new().await;
    store
        .add_mapping("ip_rewrite_v4", "93.184.216.34", "10.0.0.42")
        .await;
    let engine = store.engine().await;

    assert_eq!(
        engine.rewrite_v4("93.184.216.34".parse().unwrap()).await,
        Some(Ipv4Addr::new(10, 0, 0, 42))
    );
    assert_eq!(engine.rewrite_v4(Ipv4Addr::new(8, 8, 8, 8)).await, None);

    engine.shutdown().await;
}

#[tokio::test]
async fn rewrite_v6_substitutes_configured_address() {
    let store = StoreFixture::new().await;
    store
        .add_mapping("ip_rewrite_v6", "2001:db8::1", "fd00::42")
        .await;
    let engine = store.engine().await;

    assert_eq!(
        engine.rewrite_v6("2001:db8::1".parse().unwrap()).await,
        Some("fd00::42".parse::<Ipv6Addr>().unwrap())
    );

    engine.shutdown().await;
}

#[tokio::test]
async fn rewrite_answers_mutates_in_place() {
    let store = StoreFixture::new().await;
    store
        .add_mapping("ip_rewrite_v4", "93.184.216.34", "10.0.0.42")
        .await;
    store
        .add_mapping("ip_rewrite_v6", "2001:db8::1", "fd00::42")
        .await;
    let engine = store.engine().await;

    let mut answers: Vec<IpAddr> = vec![
        "93.184.216.34".parse().unwrap(),
        "8.8.8.8".parse().unwrap(),
        "2001:db8::1".parse().unwrap(),
    ];
    let rewritten = engine.rewrite_answers(&mut answers).await;

    assert_eq!(rewritten, 2);
    assert_eq!(answers[0], "10.0.0.42".parse::<IpAddr>().unwrap());
    assert_eq!(answers[1], "8.8.8.8".parse::<IpAddr>().unwrap());
    assert_eq!(answers[2], "fd00::42".parse::<IpAddr>().unwrap());

    engine.shutdown().await;
}

#[tokio::test]
async fn rewriting_to_the_same_address_is_a_no_op() {
    let store = StoreFixture::new().await;
    store
        .add_mapping("ip_rewrite_v4", "10.0.0.42", "10.0.0.42")
        .await;
    let engine = store.engine().await;

    let mut answers: Vec<IpAddr> = vec!["10.0.0.42".parse().unwrap()];
    assert_eq!(engine.rewrite_answers(&mut answers).await, 0);
    assert_eq!(answers[0], "10.0.0.42".parse::<IpAddr>().unwrap());

    engine.shutdown().await;
}

#[tokio::test]
async fn unparseable_rewrite_target_keeps_original() {
    let store = StoreFixture::new().await;
    store
        .add_mapping("ip_rewrite_v4", "93.184.216.34", "not-an-address")
        .await;
    let engine = store.engine().await;

    let mut answers: Vec<IpAddr> = vec!["93.184.216.34".parse().unwrap()];
    assert_eq!(engine.rewrite_answers(&mut answers).await, 0);
    assert_eq!(answers[0], "93.184.216.34".parse::<IpAddr>().unwrap());

    engine.shutdown().await;
}

#[tokio::test]
async fn optional_tables_absent_disables_features_cleanly() {
    let store = StoreFixture::without_optional_tables().await;
    store.add("block_exact", "ads.example.com").await;
    let engine = store.engine().await;

    // Classification still works; alias and rewrite short-circuit.
    assert_eq!(
        engine.classify("ads.example.com").await,
        sievedns_domain::RoutingDecision::Terminate
    );
    assert_eq!(engine.alias("www.intel.com").await, None);
    assert_eq!(engine.rewrite_v4(Ipv4Addr::new(1, 2, 3, 4)).await, None);
    assert_eq!(engine.rewrite_v6("2001:db8::1".parse().unwrap()).await, None);

    engine.shutdown().await;
}

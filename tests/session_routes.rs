//! Integration tests for route-table and subnet operations.

#[path = "common/fixtures.rs"]
mod fixtures;

use fixtures::{REGION, VPC_ID, route_table, subnet, vpc};
use mezha::test_support::{FakeCloudApi, sample_config};
use mezha::{CaptureTarget, SessionError, SnapshotValue, VpcSession};

async fn connected_session(api: &FakeCloudApi) -> VpcSession<FakeCloudApi> {
    VpcSession::connect(
        api.clone(),
        sample_config(),
        REGION,
        VPC_ID,
        vec![String::from("i-1")],
    )
    .await
    .unwrap_or_else(|err| panic!("session should connect: {err}"))
}

#[tokio::test]
async fn end_to_end_lookup_hits_and_failed_delete_stays_local() {
    let api = FakeCloudApi::new();
    api.seed_vpc(vpc());
    api.seed_route_tables(vec![route_table("rtb-1", "10.0.0.0/16")]);
    api.seed_subnets(vec![subnet("subnet-1", "10.0.1.0/24")]);
    let mut session = connected_session(&api).await;

    let table_id = session
        .route_table_by_destination("10.0.0.0/16")
        .map(|table| table.id.clone())
        .unwrap_or_else(|| panic!("seeded destination should resolve"));
    assert_eq!(table_id, "rtb-1");

    let error = session
        .delete_route("10.0.1.0/16", None)
        .await
        .expect_err("unrouted destination should fail");
    assert!(
        matches!(error, SessionError::RouteNotFound { .. }),
        "unexpected error: {error:?}"
    );
    assert_eq!(api.delete_route_calls(), 0, "no delete may reach the provider");
}

#[tokio::test]
async fn lookup_misses_return_none_not_an_error() {
    let api = FakeCloudApi::new();
    api.seed_vpc(vpc());
    api.seed_route_tables(vec![route_table("rtb-1", "10.0.0.0/16")]);
    let session = connected_session(&api).await;

    assert!(session.route_table_by_destination("172.16.0.0/12").is_none());
}

#[tokio::test]
async fn delete_route_snapshots_then_refreshes_the_cache() {
    let api = FakeCloudApi::new();
    api.seed_vpc(vpc());
    api.seed_route_tables(vec![route_table("rtb-1", "10.0.0.0/16")]);
    let mut session = connected_session(&api).await;

    session
        .delete_route("10.0.0.0/16", None)
        .await
        .unwrap_or_else(|err| panic!("delete should succeed: {err}"));

    assert_eq!(api.delete_route_calls(), 1);
    assert!(
        session.route_table_by_destination("10.0.0.0/16").is_none(),
        "cache should reflect the refreshed provider state"
    );

    let history = session.snapshots().history(CaptureTarget::RouteTables);
    assert_eq!(history.len(), 1);
    let Some(entry) = history.first() else {
        panic!("snapshot history should hold one entry");
    };
    let SnapshotValue::RouteTables(captured) = entry.data() else {
        panic!("capture should hold route tables");
    };
    let routed = captured
        .get("rtb-1")
        .is_some_and(|table| {
            table
                .routes
                .iter()
                .any(|route| route.destination == "10.0.0.0/16")
        });
    assert!(routed, "snapshot must capture the pre-delete table");
}

#[tokio::test]
async fn fetch_subnets_replaces_cache_and_keeps_prior_capture() {
    let api = FakeCloudApi::new();
    api.seed_vpc(vpc());
    api.seed_subnets(vec![subnet("subnet-1", "10.0.1.0/24")]);
    let mut session = connected_session(&api).await;

    api.seed_subnets(vec![
        subnet("subnet-2", "10.0.2.0/24"),
        subnet("subnet-3", "10.0.3.0/24"),
    ]);
    let refreshed = session
        .fetch_subnets(None)
        .await
        .unwrap_or_else(|err| panic!("fetch should succeed: {err}"));
    assert_eq!(refreshed.len(), 2);
    assert!(refreshed.contains_key("subnet-2"));

    let history = session.snapshots().history(CaptureTarget::Subnets);
    assert_eq!(history.len(), 1);
    let Some(entry) = history.first() else {
        panic!("snapshot history should hold one entry");
    };
    let SnapshotValue::Subnets(captured) = entry.data() else {
        panic!("capture should hold subnets");
    };
    assert!(captured.contains_key("subnet-1"));
    assert!(!captured.contains_key("subnet-2"));
}

#[tokio::test]
async fn dry_run_override_is_forwarded_verbatim() {
    let api = FakeCloudApi::new();
    api.seed_vpc(vpc());
    api.seed_subnets(vec![subnet("subnet-1", "10.0.1.0/24")]);
    let mut session = connected_session(&api).await;

    session
        .fetch_subnets(Some(true))
        .await
        .unwrap_or_else(|err| panic!("fetch should succeed: {err}"));

    let forwarded = api.calls().iter().any(|call| {
        matches!(
            call,
            mezha::test_support::RecordedCall::ListSubnets { dry_run: true, .. }
        )
    });
    assert!(forwarded, "override must reach the provider call");
}

#[tokio::test]
async fn connect_rejects_invalid_configuration() {
    let api = FakeCloudApi::new();
    api.seed_vpc(vpc());
    let config = mezha::MezhaConfig {
        api_base_url: String::from("  "),
        ..sample_config()
    };

    let result = VpcSession::connect(api, config, REGION, VPC_ID, Vec::new()).await;
    assert!(
        matches!(result, Err(SessionError::Config(_))),
        "blank base URL must abort construction"
    );
}

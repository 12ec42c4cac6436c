#![allow(clippy::unwrap_used)]
// End-to-end workflow tests against a mocked Mist cloud.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use mistly_core::{
    ClientConfig, DesiredState, HaltCause, Outcome, ResourceKind, RetryPolicy, RunSummary,
    WorkflowContext,
};

// ── Helpers ─────────────────────────────────────────────────────────

const ORG: &str = "o1";
const SITE_ID: &str = "site-1";
const MAC: &str = "aabbccddeeff";

fn config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(ORG, "master-key".to_string().into()).unwrap();
    config.api_url = format!("{}/api/v1/", server.uri()).parse().unwrap();
    config
}

async fn open(server: &MockServer) -> WorkflowContext {
    WorkflowContext::open(&config(server), CancellationToken::new())
        .await
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        })
}

fn api(suffix: &str) -> String {
    format!("/api/v1/{suffix}")
}

/// Lab-A: two WLANs, one device with 2.4 and 5 GHz radio settings.
fn lab_a() -> DesiredState {
    serde_json::from_value(json!({
        "site": {
            "name": "Lab-A", "address": "1 Main St", "timezone": "America/New_York",
            "country_code": "US", "lat": 40.7, "lng": -74.0
        },
        "wlans": [
            { "ssid": "Lab-A-24", "band": "24", "security": { "type": "open" } },
            { "ssid": "Lab-A-5", "band": "5", "security": { "type": "psk", "psk": "correcthorse" } }
        ],
        "devices": [{
            "mac": "aa:bb:cc:dd:ee:ff", "name": "survey-ap", "claim_code": "ABCDEF123",
            "radio": {
                "band_24": { "channel": 6, "power": 10 },
                "band_5": { "channel": 36, "power": 15, "bandwidth": 40 }
            }
        }]
    }))
    .unwrap()
}

fn site_only() -> DesiredState {
    let mut state = lab_a();
    state.wlans.clear();
    state.devices.clear();
    state
}

async fn mount_get(server: &MockServer, suffix: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(api(suffix)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_write(server: &MockServer, verb: &str, suffix: &str, status: u16, body: Value) {
    Mock::given(method(verb))
        .and(path(api(suffix)))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_existing_site(server: &MockServer) {
    mount_get(
        server,
        &format!("orgs/{ORG}/sites"),
        json!([{ "id": SITE_ID, "name": "Lab-A" }]),
    )
    .await;
    mount_write(server, "PUT", &format!("sites/{SITE_ID}/setting"), 200, json!({})).await;
}

async fn requests(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap()
}

/// `METHOD /path` for every non-GET request, in arrival order.
async fn writes(server: &MockServer) -> Vec<String> {
    requests(server)
        .await
        .iter()
        .filter(|r| r.method.as_str() != "GET")
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect()
}

fn outcome_of<'a>(summary: &'a RunSummary, kind: ResourceKind, key: &str) -> &'a Outcome {
    &summary
        .results
        .iter()
        .find(|r| r.kind == kind && r.key == key)
        .unwrap_or_else(|| panic!("no {kind} result for {key}"))
        .outcome
}

// ── End to end ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_fresh_site_is_provisioned_in_dependency_order() {
    let server = MockServer::start().await;

    mount_get(&server, &format!("orgs/{ORG}/sites"), json!([])).await;
    mount_write(
        &server,
        "POST",
        &format!("orgs/{ORG}/sites"),
        200,
        json!({ "id": SITE_ID, "name": "Lab-A" }),
    )
    .await;
    mount_write(&server, "PUT", &format!("sites/{SITE_ID}/setting"), 200, json!({})).await;
    mount_get(&server, &format!("sites/{SITE_ID}/wlans"), json!([])).await;
    for (ssid, id) in [("Lab-A-24", "w-24"), ("Lab-A-5", "w-5")] {
        Mock::given(method("POST"))
            .and(path(api(&format!("sites/{SITE_ID}/wlans"))))
            .and(body_partial_json(json!({ "ssid": ssid })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id, "ssid": ssid })))
            .mount(&server)
            .await;
    }
    mount_get(&server, &format!("installer/orgs/{ORG}/devices"), json!([])).await;
    mount_write(
        &server,
        "POST",
        &format!("orgs/{ORG}/inventory"),
        200,
        json!({ "added": ["ABCDEF123"], "inventory_added": [{ "mac": MAC }] }),
    )
    .await;
    mount_write(&server, "PUT", &format!("installer/orgs/{ORG}/devices/{MAC}"), 200, json!({})).await;

    // Not in the site until assigned.
    Mock::given(method("GET"))
        .and(path(api(&format!("sites/{SITE_ID}/devices"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_get(
        &server,
        &format!("sites/{SITE_ID}/devices"),
        json!([{ "id": "dev-1", "mac": MAC }]),
    )
    .await;
    mount_write(&server, "PUT", &format!("sites/{SITE_ID}/devices/dev-1"), 200, json!({})).await;

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &lab_a()).await;
    ctx.close().await.unwrap();

    assert_eq!(
        writes(&server).await,
        vec![
            "POST /api/v1/orgs/o1/sites",
            "PUT /api/v1/sites/site-1/setting",
            "POST /api/v1/sites/site-1/wlans",
            "POST /api/v1/sites/site-1/wlans",
            "POST /api/v1/orgs/o1/inventory",
            "PUT /api/v1/installer/orgs/o1/devices/aabbccddeeff",
            "PUT /api/v1/sites/site-1/devices/dev-1",
            "PUT /api/v1/sites/site-1/devices/dev-1",
        ]
    );

    // Payload order follows declaration order.
    let bodies: Vec<Value> = requests(&server)
        .await
        .iter()
        .filter(|r| r.method.as_str() != "GET")
        .map(|r| r.body_json().unwrap())
        .collect();
    assert_eq!(bodies[2]["ssid"], "Lab-A-24");
    assert_eq!(bodies[3]["ssid"], "Lab-A-5");
    assert_eq!(bodies[4], json!(["ABCDEF123"]));
    assert_eq!(bodies[5], json!({ "name": "survey-ap", "site_id": SITE_ID }));
    assert_eq!(
        bodies[6],
        json!({ "radio_config": { "band_24": { "channel": 6, "power": 10 } } })
    );
    assert_eq!(
        bodies[7],
        json!({ "radio_config": { "band_5": { "channel": 36, "power": 15, "bandwidth": 40 } } })
    );

    let counts = summary.counts();
    assert_eq!(counts.created, 6);
    assert_eq!(counts.configured, 2);
    assert_eq!(counts.failed, 0);
    assert!(summary.is_success());
    assert_eq!(site_remote_id(&summary), Some(SITE_ID.to_string()));
}

fn site_remote_id(summary: &RunSummary) -> Option<String> {
    summary
        .results
        .iter()
        .find(|r| r.kind == ResourceKind::Site)
        .and_then(|r| r.remote_id.as_ref())
        .map(ToString::to_string)
}

#[tokio::test]
async fn test_second_run_creates_nothing() {
    let server = MockServer::start().await;

    mount_existing_site(&server).await;
    mount_get(
        &server,
        &format!("sites/{SITE_ID}/wlans"),
        json!([{ "id": "w-5", "ssid": "Lab-A-5" }, { "id": "w-24", "ssid": "Lab-A-24" }]),
    )
    .await;
    mount_get(
        &server,
        &format!("installer/orgs/{ORG}/devices"),
        json!([{ "mac": "AA-BB-CC-DD-EE-FF", "id": "inv-1" }]),
    )
    .await;
    mount_get(
        &server,
        &format!("sites/{SITE_ID}/devices"),
        json!([{ "id": "dev-1", "mac": MAC }]),
    )
    .await;
    mount_write(&server, "PUT", &format!("sites/{SITE_ID}/devices/dev-1"), 200, json!({})).await;

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &lab_a()).await;

    // Only the unconditional configuration pushes write.
    assert_eq!(
        writes(&server).await,
        vec![
            "PUT /api/v1/sites/site-1/setting",
            "PUT /api/v1/sites/site-1/devices/dev-1",
            "PUT /api/v1/sites/site-1/devices/dev-1",
        ]
    );

    let counts = summary.counts();
    assert_eq!(counts.created, 0);
    assert_eq!(counts.already_existed, 5);
    assert_eq!(counts.configured, 3);
    assert!(summary.is_success());
}

// ── Containment ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_site_failure_halts_everything_downstream() {
    let server = MockServer::start().await;

    mount_get(&server, &format!("orgs/{ORG}/sites"), json!([])).await;
    mount_write(
        &server,
        "POST",
        &format!("orgs/{ORG}/sites"),
        500,
        json!({ "detail": "internal error" }),
    )
    .await;

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &lab_a()).await;

    let paths: Vec<String> = requests(&server)
        .await
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect();
    assert_eq!(
        paths,
        vec!["GET /api/v1/orgs/o1/sites", "POST /api/v1/orgs/o1/sites"]
    );

    assert_eq!(summary.results.len(), 1);
    assert!(summary.results[0].outcome.is_failure());
    assert!(summary.halted.as_ref().unwrap().reason.contains("internal error"));
    assert_eq!(summary.halted.as_ref().unwrap().cause, HaltCause::Failure);
    assert!(!summary.is_success());
}

#[tokio::test]
async fn test_site_lookup_failure_halts_without_create() {
    let server = MockServer::start().await;

    mount_write(&server, "GET", &format!("orgs/{ORG}/sites"), 503, json!({ "detail": "down" })).await;

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &lab_a()).await;

    assert!(writes(&server).await.is_empty());
    assert!(summary.halted.is_some());
}

#[tokio::test]
async fn test_rejected_token_mid_run_halts_as_authentication() {
    let server = MockServer::start().await;

    mount_existing_site(&server).await;
    mount_write(
        &server,
        "GET",
        &format!("sites/{SITE_ID}/wlans"),
        401,
        json!({ "detail": "token expired" }),
    )
    .await;

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &lab_a()).await;

    let halt = summary.halted.as_ref().unwrap();
    assert_eq!(halt.cause, HaltCause::Authentication);
    assert!(halt.reason.contains("token expired"));
    // Nothing after the first WLAN is attempted.
    assert_eq!(writes(&server).await, vec!["PUT /api/v1/sites/site-1/setting"]);
    assert!(outcome_of(&summary, ResourceKind::Wlan, "Lab-A-24").is_failure());
}

#[tokio::test]
async fn test_failed_wlan_does_not_block_sibling() {
    let server = MockServer::start().await;

    mount_existing_site(&server).await;
    mount_get(&server, &format!("sites/{SITE_ID}/wlans"), json!([])).await;
    Mock::given(method("POST"))
        .and(path(api(&format!("sites/{SITE_ID}/wlans"))))
        .and(body_partial_json(json!({ "ssid": "Lab-A-24" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "detail": "bad band" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api(&format!("sites/{SITE_ID}/wlans"))))
        .and(body_partial_json(json!({ "ssid": "Lab-A-5" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "w-5" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut state = lab_a();
    state.devices.clear();

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &state).await;

    assert!(matches!(
        outcome_of(&summary, ResourceKind::Wlan, "Lab-A-24"),
        Outcome::Failed { reason } if reason.contains("bad band")
    ));
    assert_eq!(
        outcome_of(&summary, ResourceKind::Wlan, "Lab-A-5"),
        &Outcome::Created
    );
    assert!(summary.halted.is_none());
    assert!(!summary.is_success());
}

#[tokio::test]
async fn test_site_setting_failure_is_reported_and_run_continues() {
    let server = MockServer::start().await;

    mount_get(
        &server,
        &format!("orgs/{ORG}/sites"),
        json!([{ "id": SITE_ID, "name": "Lab-A" }]),
    )
    .await;
    mount_write(
        &server,
        "PUT",
        &format!("sites/{SITE_ID}/setting"),
        403,
        json!({ "detail": "forbidden" }),
    )
    .await;
    mount_get(
        &server,
        &format!("sites/{SITE_ID}/wlans"),
        json!([{ "id": "w-24", "ssid": "Lab-A-24" }, { "id": "w-5", "ssid": "Lab-A-5" }]),
    )
    .await;

    let mut state = lab_a();
    state.devices.clear();

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &state).await;

    assert!(outcome_of(&summary, ResourceKind::SiteSetting, "Lab-A").is_failure());
    assert_eq!(
        outcome_of(&summary, ResourceKind::Wlan, "Lab-A-5"),
        &Outcome::AlreadyExisted
    );
    // 4xx is not transient: exactly one attempt.
    assert_eq!(writes(&server).await.len(), 1);
}

// ── Claim outcomes ──────────────────────────────────────────────────

async fn mount_unclaimed_device(server: &MockServer, claim_body: Value) {
    mount_existing_site(server).await;
    mount_get(server, &format!("installer/orgs/{ORG}/devices"), json!([])).await;
    mount_write(server, "POST", &format!("orgs/{ORG}/inventory"), 200, claim_body).await;
}

fn single_device() -> DesiredState {
    let mut state = lab_a();
    state.wlans.clear();
    state
}

#[tokio::test]
async fn test_rejected_claim_skips_assignment_for_that_device_only() {
    let server = MockServer::start().await;

    // ap-2 is already claimed and only needs assigning.
    mount_existing_site(&server).await;
    mount_get(
        &server,
        &format!("installer/orgs/{ORG}/devices"),
        json!([{ "mac": "112233445566" }]),
    )
    .await;
    mount_write(
        &server,
        "POST",
        &format!("orgs/{ORG}/inventory"),
        200,
        json!({ "error": ["ABCDEF123"], "reason": ["invalid claim code"] }),
    )
    .await;
    mount_get(&server, &format!("sites/{SITE_ID}/devices"), json!([])).await;
    mount_write(
        &server,
        "PUT",
        &format!("installer/orgs/{ORG}/devices/112233445566"),
        200,
        json!({}),
    )
    .await;

    let state: DesiredState = serde_json::from_value(json!({
        "site": { "name": "Lab-A", "timezone": "UTC", "country_code": "US", "lat": 0.0, "lng": 0.0 },
        "devices": [
            { "mac": "aa:bb:cc:dd:ee:ff", "name": "ap-1", "claim_code": "ABCDEF123" },
            { "mac": "11:22:33:44:55:66", "name": "ap-2", "claim_code": "ZZZ" }
        ]
    }))
    .unwrap();

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &state).await;

    assert!(matches!(
        outcome_of(&summary, ResourceKind::DeviceClaim, "aa:bb:cc:dd:ee:ff"),
        Outcome::Failed { reason } if reason.contains("invalid claim code")
    ));
    assert_eq!(
        outcome_of(&summary, ResourceKind::DeviceAssignment, "11:22:33:44:55:66"),
        &Outcome::Created
    );
    assert!(
        !summary
            .results
            .iter()
            .any(|r| r.kind == ResourceKind::DeviceAssignment && r.key == "aa:bb:cc:dd:ee:ff")
    );
    assert_eq!(
        writes(&server).await,
        vec![
            "PUT /api/v1/sites/site-1/setting",
            "POST /api/v1/orgs/o1/inventory",
            "PUT /api/v1/installer/orgs/o1/devices/112233445566",
        ]
    );
}

#[tokio::test]
async fn test_duplicate_claim_still_assigns() {
    let server = MockServer::start().await;
    mount_unclaimed_device(&server, json!({ "duplicated": ["ABCDEF123"] })).await;
    mount_get(&server, &format!("sites/{SITE_ID}/devices"), json!([])).await;
    Mock::given(method("PUT"))
        .and(path(api(&format!("installer/orgs/{ORG}/devices/{MAC}"))))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut state = single_device();
    state.devices[0].radio = mistly_core::RadioSpec::default();

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &state).await;

    assert_eq!(
        outcome_of(&summary, ResourceKind::DeviceClaim, "aa:bb:cc:dd:ee:ff"),
        &Outcome::AlreadyExisted
    );
    assert_eq!(
        outcome_of(&summary, ResourceKind::DeviceAssignment, "aa:bb:cc:dd:ee:ff"),
        &Outcome::Created
    );
    assert!(summary.is_success());
}

#[tokio::test]
async fn test_ambiguous_claim_is_never_guessed() {
    let server = MockServer::start().await;
    mount_unclaimed_device(&server, json!({ "added": [], "error": [] })).await;

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &single_device()).await;

    assert!(matches!(
        outcome_of(&summary, ResourceKind::DeviceClaim, "aa:bb:cc:dd:ee:ff"),
        Outcome::Failed { reason } if reason.contains("Ambiguous claim outcome")
    ));
    assert!(
        !writes(&server)
            .await
            .iter()
            .any(|w| w.contains("/installer/"))
    );
    assert!(summary.halted.is_none());
}

#[tokio::test]
async fn test_device_missing_after_assignment_skips_radio() {
    let server = MockServer::start().await;
    mount_unclaimed_device(&server, json!({ "inventory_added": [{ "mac": MAC }] })).await;
    mount_get(&server, &format!("sites/{SITE_ID}/devices"), json!([])).await;
    mount_write(&server, "PUT", &format!("installer/orgs/{ORG}/devices/{MAC}"), 200, json!({})).await;

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &single_device()).await;

    assert!(matches!(
        outcome_of(&summary, ResourceKind::RadioConfig, "aa:bb:cc:dd:ee:ff"),
        Outcome::Failed { reason } if reason.contains("not visible")
    ));
    assert!(
        !writes(&server)
            .await
            .iter()
            .any(|w| w.contains("/devices/dev"))
    );
}

// ── Retry ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transient_setting_failure_is_retried() {
    let server = MockServer::start().await;

    mount_get(
        &server,
        &format!("orgs/{ORG}/sites"),
        json!([{ "id": SITE_ID, "name": "Lab-A" }]),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path(api(&format!("sites/{SITE_ID}/setting"))))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(api(&format!("sites/{SITE_ID}/setting"))))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_write(&server, "PUT", &format!("sites/{SITE_ID}/setting"), 200, json!({})).await;

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &site_only()).await;

    assert_eq!(
        outcome_of(&summary, ResourceKind::SiteSetting, "Lab-A"),
        &Outcome::Configured
    );
    assert_eq!(writes(&server).await.len(), 3);
}

#[tokio::test]
async fn test_retry_gives_up_after_three_attempts() {
    let server = MockServer::start().await;

    mount_get(
        &server,
        &format!("orgs/{ORG}/sites"),
        json!([{ "id": SITE_ID, "name": "Lab-A" }]),
    )
    .await;
    mount_write(&server, "PUT", &format!("sites/{SITE_ID}/setting"), 502, json!({})).await;

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &site_only()).await;

    assert!(outcome_of(&summary, ResourceKind::SiteSetting, "Lab-A").is_failure());
    assert_eq!(writes(&server).await.len(), 3);
    assert!(summary.halted.is_none());
}

#[tokio::test]
async fn test_create_calls_are_not_retried() {
    let server = MockServer::start().await;

    mount_existing_site(&server).await;
    mount_get(&server, &format!("sites/{SITE_ID}/wlans"), json!([])).await;
    mount_write(&server, "POST", &format!("sites/{SITE_ID}/wlans"), 503, json!({})).await;

    let mut state = lab_a();
    state.wlans.truncate(1);
    state.devices.clear();

    let mut ctx = open(&server).await;
    let summary = mistly_core::provision(&mut ctx, &state).await;

    assert!(outcome_of(&summary, ResourceKind::Wlan, "Lab-A-24").is_failure());
    let posts = writes(&server)
        .await
        .into_iter()
        .filter(|w| w.starts_with("POST"))
        .count();
    assert_eq!(posts, 1);
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancelled_run_issues_no_calls() {
    let server = MockServer::start().await;
    mount_existing_site(&server).await;

    let cancel = CancellationToken::new();
    let mut ctx = WorkflowContext::open(&config(&server), cancel.clone())
        .await
        .unwrap();
    cancel.cancel();

    let summary = mistly_core::provision(&mut ctx, &lab_a()).await;

    assert!(requests(&server).await.is_empty());
    assert_eq!(summary.halted.as_ref().unwrap().cause, HaltCause::Cancelled);
}

#[tokio::test]
async fn test_site_list_ignoring_pages_still_resolves_absent() {
    let server = MockServer::start().await;

    let unrelated: Vec<Value> = (0..100)
        .map(|i| json!({ "id": format!("other-{i}"), "name": format!("Branch-{i}") }))
        .collect();
    Mock::given(method("GET"))
        .and(path(api(&format!("orgs/{ORG}/sites"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(unrelated)))
        .expect(2)
        .mount(&server)
        .await;
    mount_write(
        &server,
        "POST",
        &format!("orgs/{ORG}/sites"),
        200,
        json!({ "id": SITE_ID, "name": "Lab-A" }),
    )
    .await;
    mount_write(&server, "PUT", &format!("sites/{SITE_ID}/setting"), 200, json!({})).await;

    let mut ctx = open(&server).await;
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        mistly_core::provision(&mut ctx, &site_only()),
    )
    .await
    .unwrap();

    assert_eq!(
        outcome_of(&summary, ResourceKind::Site, "Lab-A"),
        &Outcome::Created
    );
    assert!(summary.is_success());
}

// ── Plan mode ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_plan_issues_only_reads() {
    let server = MockServer::start().await;

    mount_get(
        &server,
        &format!("orgs/{ORG}/sites"),
        json!([{ "id": SITE_ID, "name": "Lab-A" }]),
    )
    .await;
    mount_get(
        &server,
        &format!("sites/{SITE_ID}/wlans"),
        json!([{ "id": "w-24", "ssid": "Lab-A-24" }]),
    )
    .await;
    mount_get(&server, &format!("installer/orgs/{ORG}/devices"), json!([])).await;
    mount_get(&server, &format!("sites/{SITE_ID}/devices"), json!([])).await;

    let mut ctx = open(&server).await;
    let summary = mistly_core::plan(&mut ctx, &lab_a()).await;

    assert!(
        requests(&server)
            .await
            .iter()
            .all(|r| r.method.as_str() == "GET")
    );
    assert_eq!(
        outcome_of(&summary, ResourceKind::Site, "Lab-A"),
        &Outcome::AlreadyExisted
    );
    assert_eq!(
        outcome_of(&summary, ResourceKind::Wlan, "Lab-A-24"),
        &Outcome::AlreadyExisted
    );
    assert_eq!(
        outcome_of(&summary, ResourceKind::Wlan, "Lab-A-5"),
        &Outcome::WouldCreate
    );
    assert_eq!(
        outcome_of(&summary, ResourceKind::DeviceClaim, "aa:bb:cc:dd:ee:ff"),
        &Outcome::WouldCreate
    );
    assert_eq!(summary.counts().would_create, 3);
    assert!(summary.is_success());
}

#[tokio::test]
async fn test_plan_without_site_skips_site_scoped_reads() {
    let server = MockServer::start().await;

    mount_get(&server, &format!("orgs/{ORG}/sites"), json!([])).await;
    mount_get(&server, &format!("installer/orgs/{ORG}/devices"), json!([])).await;

    let mut ctx = open(&server).await;
    let summary = mistly_core::plan(&mut ctx, &lab_a()).await;

    let paths: Vec<String> = requests(&server)
        .await
        .iter()
        .map(|r| r.url.path().to_owned())
        .collect();
    assert_eq!(
        paths,
        vec!["/api/v1/orgs/o1/sites", "/api/v1/installer/orgs/o1/devices"]
    );
    assert_eq!(summary.counts().would_create, 5);
}

// ── Session and progress ────────────────────────────────────────────

#[tokio::test]
async fn test_ephemeral_token_is_minted_used_and_revoked() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api("self/apitokens")))
        .and(header("Authorization", "Token master-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "t-1", "key": "temp" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api(&format!("orgs/{ORG}/sites"))))
        .and(header("Authorization", "Token temp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(api("self/apitokens/t-1")))
        .and(header("Authorization", "Token master-key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.ephemeral_token = true;
    let mut ctx = WorkflowContext::open(&config, CancellationToken::new())
        .await
        .unwrap();

    let mut state = site_only();
    state.devices.clear();
    let summary = mistly_core::plan(&mut ctx, &state).await;
    ctx.close().await.unwrap();

    assert_eq!(summary.counts().would_create, 1);
    server.verify().await;
}

#[tokio::test]
async fn test_ephemeral_token_minted_during_cancel_is_still_revoked() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(api("self/apitokens")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "t-2", "key": "temp" }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(api("self/apitokens/t-2")))
        .and(header("Authorization", "Token master-key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.ephemeral_token = true;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let mut ctx = WorkflowContext::open(&config, cancel).await.unwrap();
    let summary = mistly_core::provision(&mut ctx, &site_only()).await;
    ctx.close().await.unwrap();

    assert_eq!(summary.halted.as_ref().unwrap().cause, HaltCause::Cancelled);
    server.verify().await;
}

#[tokio::test]
async fn test_open_after_cancel_mints_nothing() {
    let server = MockServer::start().await;

    let mut config = config(&server);
    config.ephemeral_token = true;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = WorkflowContext::open(&config, cancel).await;

    assert!(matches!(result, Err(mistly_core::CoreError::Cancelled)));
    assert!(requests(&server).await.is_empty());
}

#[tokio::test]
async fn test_progress_sink_sees_every_result() {
    let server = MockServer::start().await;
    mount_existing_site(&server).await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut ctx = open(&server).await.with_progress(tx);
    let summary = mistly_core::provision(&mut ctx, &site_only()).await;
    drop(ctx);

    let mut seen = Vec::new();
    while let Some(result) = rx.recv().await {
        seen.push(result);
    }
    assert_eq!(seen, summary.results);
    assert_eq!(seen.len(), 2);
}

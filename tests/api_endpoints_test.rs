mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::{json, Value};
use stakeledger::api::{self, AppState, Clock};
use stakeledger::config::{Config, RewardSettlementMode};
use stakeledger::{AssetId, RewardRate, Timestamp};
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    clock: Clock,
    harness: Harness,
}

fn test_config() -> Config {
    Config {
        port: 0,
        database_path: ":memory:".to_string(),
        price_feed_url: "http://example.invalid".to_string(),
        admin_address: owner(),
        max_staleness_secs: MAX_STALENESS_SECS,
        reward_rate: RewardRate::new(1, 4),
        reward_decimals: 3,
        reward_settlement: RewardSettlementMode::Mint,
    }
}

async fn setup_test_app() -> TestApp {
    let harness = setup().await;
    harness.set_price(ETH_FEED, 200, 2, 0);
    let clock = Clock::manual(Timestamp::new(0));
    let state = AppState::new(
        harness.ledger.clone(),
        harness.registry.clone(),
        harness.admin.clone(),
        test_config(),
    )
    .with_clock(clock.clone());

    TestApp {
        app: api::create_router(state),
        clock,
        harness,
    }
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let req = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let req = match body {
        Some(b) => req.body(axum::body::Body::from(b.to_string())).unwrap(),
        None => req.body(axum::body::Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn native() -> String {
    AssetId::native().to_string()
}

async fn register_eth(app: &axum::Router) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/v1/admin/assets",
        Some(json!({
            "caller": owner().to_string(),
            "assetId": native(),
            "decimals": 18,
            "symbol": "ETH",
            "oracle": ETH_FEED,
        })),
    )
    .await
}

#[tokio::test]
async fn test_health_and_ready() {
    let t = setup_test_app().await;
    let (status, body) = send(&t.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&t.app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["paused"], false);
}

#[tokio::test]
async fn test_asset_registration_endpoints() {
    let t = setup_test_app().await;

    let (status, body) = register_eth(&t.app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "native");
    assert_eq!(body["decimals"], 18);

    let (status, body) = register_eth(&t.app).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_registered");

    let (status, body) = send(&t.app, "GET", "/v1/assets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assets"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &t.app,
        "GET",
        "/v1/assets/0x326c977e6efc84e512bb9c30f76e30c160ed06fb",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "unknown_asset");

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/admin/assets",
        Some(json!({
            "caller": alice().to_string(),
            "assetId": usdc().to_string(),
            "decimals": 6,
            "symbol": "USDC",
            "oracle": USDC_FEED,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "not_authorized");

    let (status, body) = send(
        &t.app,
        "POST",
        &format!("/v1/admin/assets/{}/disabled", native()),
        Some(json!({"caller": owner().to_string(), "disabled": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["disabled"], true);
}

#[tokio::test]
async fn test_stake_claim_flow_over_http() {
    let t = setup_test_app().await;
    register_eth(&t.app).await;
    t.harness.fund(&alice(), &AssetId::native(), 100 * ONE_ETH);

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/deposit",
        Some(json!({
            "caller": alice().to_string(),
            "asset": native(),
            "amount": (100 * ONE_ETH).to_string(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amountDisplay"], "100");
    assert_eq!(body["position"]["status"], "open");
    assert_eq!(body["position"]["priceDisplay"], "2");

    t.clock.advance(100);

    let uri = format!("/v1/rewards?user={}&asset={}", alice(), native());
    let (status, body) = send(&t.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reward"], "2000");
    assert_eq!(body["rewardDisplay"], "2");

    let uri = format!("/v1/positions?user={}&asset={}", alice(), native());
    let (status, body) = send(&t.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["principal"], (100 * ONE_ETH).to_string());
    assert_eq!(body["usdValue"], "200");
    assert_eq!(body["reward"], "2000");

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/claim",
        Some(json!({"caller": alice().to_string(), "asset": native()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], "2000");
    assert_eq!(body["position"]["accruedReward"], "0");

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/claim",
        Some(json!({"caller": alice().to_string(), "asset": native()})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "nothing_to_claim");

    let uri = format!("/v1/rewards/settled?user={}", alice());
    let (status, body) = send(&t.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSettled"], "2000");
    assert_eq!(body["balance"], "2000");
    assert_eq!(body["entries"][0]["settlementCount"], 1);

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/withdraw",
        Some(json!({
            "caller": alice().to_string(),
            "asset": native(),
            "amount": (100 * ONE_ETH).to_string(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["position"]["status"], "closed");

    let uri = format!("/v1/events?user={}&fromSeq=2", alice());
    let (status, body) = send(&t.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["reward_claimed", "withdrawn"]);
}

#[tokio::test]
async fn test_error_mapping_over_http() {
    let t = setup_test_app().await;
    register_eth(&t.app).await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/withdraw",
        Some(json!({"caller": alice().to_string(), "asset": native(), "amount": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "insufficient_position");

    let (status, _) = send(
        &t.app,
        "POST",
        "/v1/deposit",
        Some(json!({"caller": "bob", "asset": native(), "amount": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        "POST",
        "/v1/deposit",
        Some(json!({"caller": alice().to_string(), "asset": native(), "amount": "-5"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    t.clock.advance(MAX_STALENESS_SECS as i64 + 1);
    let (status, body) = send(&t.app, "GET", &format!("/v1/prices/{}", native()), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "oracle_unavailable");

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/admin/pause",
        Some(json!({"caller": owner().to_string()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paused"], true);

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/deposit",
        Some(json!({"caller": alice().to_string(), "asset": native(), "amount": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "paused");
}

#[tokio::test]
async fn test_price_and_ownership_endpoints() {
    let t = setup_test_app().await;
    register_eth(&t.app).await;

    let (status, body) = send(&t.app, "GET", &format!("/v1/prices/{}", native()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], "200");
    assert_eq!(body["scale"], 2);
    assert_eq!(body["priceDisplay"], "2");

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/admin/owner",
        Some(json!({"caller": owner().to_string(), "newOwner": bob().to_string()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"], bob().to_string());

    let (status, body) = send(&t.app, "GET", "/v1/admin", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"], bob().to_string());
    assert_eq!(body["paused"], false);
}

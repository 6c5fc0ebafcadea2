use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use sportspot_server::config::Config;
use sportspot_server::ledger::{LedgerSeed, MemoryLedger, SharedLedger};
use sportspot_server::routes::create_routes;
use sportspot_server::state::{AppState, SharedState};

const OWNER: &str = "0x00000000000000000000000000000000000000a1";
const PLAYER: &str = "0x00000000000000000000000000000000000000b2";
const BROKE: &str = "0x00000000000000000000000000000000000000c3";

fn config(production: bool) -> Config {
    Config::from_lookup(|key| match key {
        "CORS_ALLOWED_ORIGINS" => Some("http://localhost:5173".to_string()),
        "RUST_ENV" if production => Some("production".to_string()),
        _ => None,
    })
    .unwrap()
}

fn seeded_state(calendar_idle: Duration) -> SharedState {
    let seed: LedgerSeed = serde_json::from_value(json!({
        "venues": [{
            "name": "Eastside Tennis Club",
            "sport_type": "Tennis",
            "hourly_rate": "10000000000000000",
            "latitude": "37.7749295",
            "longitude": "-122.4194155",
            "owner": OWNER
        }],
        "balances": { PLAYER: "1000000000000000000" }
    }))
    .unwrap();

    let ledger: SharedLedger = Arc::new(MemoryLedger::from_seed(seed));
    Arc::new(AppState::new(ledger, chrono_tz::UTC, calendar_idle))
}

fn seeded_app() -> Router {
    let state = seeded_state(Duration::from_secs(1800));
    create_routes(state, &config(false))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn open_calendar(app: &Router, account: Option<&str>) -> (String, Value) {
    let (status, body) = send(
        app,
        Method::POST,
        "/calendars",
        Some(json!({ "venue_id": 1, "account": account })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    (id, body["data"].clone())
}

fn slot_timestamp(view: &Value, label: &str) -> i64 {
    view["slots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|slot| slot["label"] == label)
        .unwrap()["timestamp"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = seeded_app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let app = seeded_app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let headers = response.headers();

    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(
        headers["content-security-policy"],
        "default-src 'none'; frame-ancestors 'none'"
    );
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert!(headers.contains_key("permissions-policy"));
    assert!(!headers.contains_key("strict-transport-security"));

    let app = create_routes(seeded_state(Duration::from_secs(1800)), &config(true));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.headers().contains_key("strict-transport-security"));
}

#[tokio::test]
async fn test_venue_listing_filters() {
    let app = seeded_app();

    let names = |body: &Value| -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["name"].as_str().unwrap().to_string())
            .collect()
    };

    let (status, body) = send(&app, Method::GET, "/venues?sport_type=Football", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(names(&body).is_empty());

    let (_, body) = send(&app, Method::GET, "/venues?sport_type=tEnNiS", None).await;
    assert_eq!(names(&body), vec!["Eastside Tennis Club"]);

    let (_, body) = send(&app, Method::GET, "/venues?search=eastside", None).await;
    assert_eq!(names(&body).len(), 1);

    let (_, body) = send(
        &app,
        Method::GET,
        "/venues?min_rate=10000000000000000&max_rate=20000000000000000",
        None,
    )
    .await;
    assert_eq!(names(&body).len(), 1);

    let (_, body) = send(&app, Method::GET, "/venues?min_rate=20000000000000000", None).await;
    assert!(names(&body).is_empty());
}

#[tokio::test]
async fn test_account_balance() {
    let app = seeded_app();

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/accounts/{}/balance", PLAYER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["account"], PLAYER);
    assert_eq!(body["data"]["balance"], "1000000000000000000");
    assert_eq!(body["data"]["balance_display"], "1.00000");

    let (status, body) = send(&app, Method::GET, "/accounts/nobody/balance", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_idle_calendars_are_evicted_on_open() {
    let state = seeded_state(Duration::from_millis(1));
    let app = create_routes(state.clone(), &config(false));

    for _ in 0..50 {
        open_calendar(&app, None).await;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    let (id, _) = open_calendar(&app, None).await;

    assert_eq!(state.calendar_count(), 1);
    let (status, _) = send(&app, Method::GET, &format!("/calendars/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_venue_listing_and_details() {
    let app = seeded_app();

    let (status, body) = send(&app, Method::GET, "/venues", None).await;
    assert_eq!(status, StatusCode::OK);
    let venues = body["data"].as_array().unwrap();
    assert_eq!(venues.len(), 1);
    assert_eq!(venues[0]["name"], "Eastside Tennis Club");
    assert_eq!(venues[0]["hourly_rate"], "10000000000000000");
    assert_eq!(venues[0]["hourly_rate_display"], "0.01000");

    let (status, body) = send(&app, Method::GET, "/venues/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_register_venue() {
    let app = seeded_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/venues",
        Some(json!({
            "account": OWNER,
            "name": "Quayside Courts",
            "sport_type": "Basketball",
            "hourly_rate": "25000000000000000",
            "latitude": "55.9533",
            "longitude": "-3.1883"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["venue_id"], 2);

    let (status, body) = send(&app, Method::GET, "/venues/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["owner"], OWNER);

    let (status, body) = send(
        &app,
        Method::POST,
        "/venues",
        Some(json!({
            "account": OWNER,
            "name": "",
            "sport_type": "Basketball",
            "hourly_rate": "1",
            "latitude": "0",
            "longitude": "0"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_calendar_grid_and_booking_flow() {
    let app = seeded_app();
    let (id, view) = open_calendar(&app, Some(PLAYER)).await;

    assert_eq!(view["slots"].as_array().unwrap().len(), 16);
    assert_eq!(view["balance"], "1000000000000000000");
    assert_eq!(view["availability_loaded"], true);
    assert_eq!(view["booking"]["state"], "idle");

    let (status, view) = send(
        &app,
        Method::PUT,
        &format!("/calendars/{}/duration", id),
        Some(json!({ "hours": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["data"]["total_price"], "30000000000000000");
    assert_eq!(view["data"]["total_price_display"], "0.03000");

    let start = slot_timestamp(&view["data"], "18:00");
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/calendars/{}/slot", id),
        Some(json!({ "timestamp": start })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, &format!("/calendars/{}/book", id), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["booking_id"], 1);
    let calendar = &body["data"]["calendar"];
    assert_eq!(calendar["selected"], Value::Null);
    assert_eq!(calendar["balance"], "970000000000000000");
    assert_eq!(calendar["balance_display"], "0.97000");
    let taken: Vec<&str> = calendar["slots"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|slot| slot["free"] == false)
        .map(|slot| slot["label"].as_str().unwrap())
        .collect();
    assert_eq!(taken, vec!["18:00", "19:00", "20:00"]);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/accounts/{}/bookings", PLAYER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["time_slot"], start);
    assert_eq!(body["data"][0]["duration"], 3);
    assert_eq!(body["data"][0]["venue"]["name"], "Eastside Tennis Club");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/accounts/{}/withdraw", OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount"], "30000000000000000");

    let (status, _) = send(
        &app,
        Method::POST,
        "/bookings/1/cancel",
        Some(json!({ "account": OWNER })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/bookings/1/cancel",
        Some(json!({ "account": PLAYER })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::POST, &format!("/calendars/{}/refresh", id), None).await;
    assert!(body["data"]["slots"]
        .as_array()
        .unwrap()
        .iter()
        .all(|slot| slot["free"] == true));
}

#[tokio::test]
async fn test_booking_requires_connected_account() {
    let app = seeded_app();
    let (id, view) = open_calendar(&app, None).await;

    let start = slot_timestamp(&view, "10:00");
    send(
        &app,
        Method::PUT,
        &format!("/calendars/{}/slot", id),
        Some(json!({ "timestamp": start })),
    )
    .await;

    let (status, body) = send(&app, Method::POST, &format!("/calendars/{}/book", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/calendars/{}/account", id),
        Some(json!({ "account": PLAYER })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["account"], PLAYER);

    let (status, _) = send(&app, Method::POST, &format!("/calendars/{}/book", id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_failed_booking_reports_ledger_reason() {
    let app = seeded_app();
    let (id, view) = open_calendar(&app, Some(BROKE)).await;

    let start = slot_timestamp(&view, "07:00");
    send(
        &app,
        Method::PUT,
        &format!("/calendars/{}/slot", id),
        Some(json!({ "timestamp": start })),
    )
    .await;

    let (status, body) = send(&app, Method::POST, &format!("/calendars/{}/book", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "BOOKING_SUBMISSION_ERROR");
    assert_eq!(body["error"]["message"], "insufficient funds");

    let (_, body) = send(&app, Method::GET, &format!("/calendars/{}", id), None).await;
    assert_eq!(body["data"]["selected"], start);
    assert_eq!(body["data"]["last_error"], "insufficient funds");
}

#[tokio::test]
async fn test_calendar_rejects_bad_input() {
    let app = seeded_app();
    let (id, _) = open_calendar(&app, None).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/calendars/{}/date", id),
        Some(json!({ "date": "1999-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/calendars/{}/duration", id),
        Some(json!({ "hours": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/calendars/{}/slot", id),
        Some(json!({ "timestamp": 12345 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::DELETE, &format!("/calendars/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, &format!("/calendars/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

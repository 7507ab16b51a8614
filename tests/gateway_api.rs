//! HTTP surface tests driven through the router without a socket.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use tradesim::clock::ManualClock;
use tradesim::config::AppConfig;
use tradesim::gateway::{build_router, state::AppState};
use tradesim::otp::MemoryOutbox;
use tradesim::services::Services;
use tradesim::store::MemoryStore;
use tradesim::user_auth::StaticOAuthProvider;

const CONFIG: &str = r#"
log_level: info
log_dir: ./logs
log_file: test.log
use_json: false
rotation: never
auth:
  jwt_secret: gateway-test-secret
  token_ttl_minutes: 60
  session_ttl_days: 7
"#;

struct TestApp {
    router: Router,
    services: Services,
    outbox: Arc<MemoryOutbox>,
}

fn app() -> TestApp {
    let config = AppConfig::from_yaml(CONFIG).unwrap();
    let outbox = Arc::new(MemoryOutbox::new());
    let services = Services::build(
        &config,
        Arc::new(MemoryStore::new()),
        outbox.clone(),
        Arc::new(StaticOAuthProvider::new()),
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        )),
    );
    let router = build_router(Arc::new(AppState::new(services.clone())));
    TestApp {
        router,
        services,
        outbox,
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Full OTP registration over HTTP; returns the bearer token
async fn register(app: &TestApp, email: &str) -> String {
    let (status, _) = send(
        app,
        post_json("/api/v1/auth/send-otp", json!({ "email": email }), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let code = app.outbox.last_code(email).unwrap();
    let (status, body) = send(
        app,
        post_json(
            "/api/v1/auth/verify-otp",
            json!({ "email": email, "code": code }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["verification_token"].as_str().unwrap().to_string();

    let (status, body) = send(
        app,
        post_json(
            "/api/v1/auth/register",
            json!({
                "email": email,
                "name": "Gateway User",
                "password": "password123",
                "verification_token": token,
            }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["code"], 0);
    body["data"]["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_storage_backend() {
    let app = app();
    let (status, body) = send(&app, get("/api/v1/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["storage"], "memory");
}

#[tokio::test]
async fn protected_route_without_credentials_is_401() {
    let app = app();
    let (status, body) = send(&app, get("/api/v1/wallet", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2001);

    let (status, body) = send(&app, get("/api/v1/wallet", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2002);
}

#[tokio::test]
async fn register_login_and_read_wallet() {
    let app = app();
    let token = register(&app, "http@example.com").await;

    let (status, body) = send(&app, get("/api/v1/wallet", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["virtual_balance"], "10000");
    assert_eq!(body["data"]["task_balance"], "10000");
    assert_eq!(body["data"]["total_balance"], "20000");

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            json!({ "email": "http@example.com", "password": "password123" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token_type"], "bearer");
    assert_eq!(body["data"]["daily_bonus"], "100");

    let (status, body) = send(&app, get("/api/v1/transactions", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn wrong_password_is_401() {
    let app = app();
    register(&app, "pw@example.com").await;
    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            json!({ "email": "pw@example.com", "password": "not-the-password" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2002);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = app();
    let token = register(&app, "boss@example.com").await;
    let strategy = json!({
        "name": "Momentum Alpha",
        "category": "risky",
        "monthly_return": "4.5",
        "capital_required": "1000",
    });

    let (status, body) = send(
        &app,
        post_json("/api/v1/admin/strategies", strategy.clone(), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2003);

    // Role is read from the account record, so the same token now passes
    let account = app
        .services
        .ledger
        .find_by_email("boss@example.com")
        .await
        .unwrap()
        .unwrap();
    let mut fields = serde_json::Map::new();
    fields.insert("role".into(), json!("admin"));
    app.services
        .ledger
        .update_profile(account.id, fields)
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        post_json("/api/v1/admin/strategies", strategy, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let strategy_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get("/api/v1/strategies", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], strategy_id.as_str());
}

#[tokio::test]
async fn open_position_below_minimum_is_rejected() {
    let app = app();
    let token = register(&app, "investor@example.com").await;
    let strategy = app
        .services
        .strategies
        .create(tradesim::strategy::NewStrategy {
            name: "Steady".into(),
            description: String::new(),
            logic_description: String::new(),
            category: tradesim::strategy::RiskCategory::Guaranteed,
            monthly_return: "2".parse().unwrap(),
            capital_required: "500".parse().unwrap(),
        })
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/user-strategies",
            json!({ "strategy_id": strategy.id, "amount": "100" }),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1003);

    let (status, _) = send(
        &app,
        post_json(
            "/api/v1/user-strategies",
            json!({ "strategy_id": strategy.id, "amount": "500" }),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&app, get("/api/v1/user-strategies", Some(&token))).await;
    assert_eq!(body["data"][0]["strategy_name"], "Steady");
    assert_eq!(body["data"][0]["invested_amount"], "500");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = app();
    let (status, body) = send(&app, get("/api-docs/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/auth/register"].is_object());
}

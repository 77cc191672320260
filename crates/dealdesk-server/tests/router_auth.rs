//! Router-level tests: envelope shape, auth gating and error mapping.
//! These run against a lazily-connected pool; no route under test
//! touches the database before failing auth or validation.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use dealdesk_config::{SchedulerConfig, ServerConfig};
use dealdesk_engine::{Engine, TracingSink};
use dealdesk_server::{router, AppState};

const SECRET: &str = "0123456789abcdef0123456789abcdef";

fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: "postgres://localhost/dealdesk_test".into(),
        host: "127.0.0.1".into(),
        port: 0,
        cors_origins: vec![],
        body_limit_bytes: 1024 * 1024,
        request_timeout_secs: 5,
        jwt_secret: SECRET.into(),
        log_level: "error".into(),
        currency: "EGP".into(),
        scheduler: SchedulerConfig::default(),
    }
}

fn test_app() -> axum::Router {
    let config = test_config();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    let engine = Engine::new(pool.clone(), Arc::new(TracingSink), config.currency.clone());
    router(AppState::new(engine, config, pool))
}

fn token(role: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    #[derive(serde::Serialize)]
    struct Claims<'a> {
        sub: uuid::Uuid,
        role: &'a str,
        exp: i64,
    }
    encode(
        &Header::default(),
        &Claims {
            sub: uuid::Uuid::new_v4(),
            role,
            exp: chrono::Utc::now().timestamp() + 3600,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_needs_no_auth() {
    let response = test_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let response = test_app()
        .oneshot(
            Request::post("/api/calculate")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("bearer token"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn forged_token_is_unauthorized() {
    use jsonwebtoken::{encode, EncodingKey, Header};
    #[derive(serde::Serialize)]
    struct Claims {
        sub: uuid::Uuid,
        role: String,
        exp: i64,
    }
    let forged = encode(
        &Header::default(),
        &Claims {
            sub: uuid::Uuid::new_v4(),
            role: "admin".into(),
            exp: chrono::Utc::now().timestamp() + 3600,
        },
        &EncodingKey::from_secret(b"some-other-secret-entirely"),
    )
    .unwrap();

    let response = test_app()
        .oneshot(
            Request::post("/api/calculate")
                .header("authorization", format!("Bearer {forged}"))
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_queue_is_invalid_input() {
    let response = test_app()
        .oneshot(
            Request::get("/api/payment-plans/queue/ceo")
                .header("authorization", format!("Bearer {}", token("admin")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["error"]["details"][0]["field"]
        .as_str()
        .unwrap()
        .contains("stage"));
}

#[tokio::test]
async fn calculate_requires_pricing_source() {
    // authenticated, but neither stdPlan nor unitId supplied
    let payload = serde_json::json!({
        "inputs": {
            "dpType": "percentage",
            "downPaymentValue": 20,
            "planDurationYears": 4,
            "installmentFrequency": "quarterly",
        }
    });
    let response = test_app()
        .oneshot(
            Request::post("/api/calculate")
                .header("authorization", format!("Bearer {}", token("financial_manager")))
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["details"][0]["field"], "stdPlan");
}

//! Score and save backend
//!
//! axum router over a SQLite pool. All JSON is camelCase; validation errors
//! come back as `{"errors": {field: [message]}}` with status 400.

pub mod db;
pub mod error;
pub mod saves;
pub mod scores;
pub mod validation;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tracing::debug;

use crate::config::ServerConfig;
use crate::metrics::Metrics;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Connect to the configured database and create the schema
    pub async fn connect(config: &ServerConfig) -> Result<Self, sqlx::Error> {
        let pool = db::connect(&config.database_url, config.db_max_connections).await?;
        db::migrate(&pool).await?;
        Ok(Self {
            pool,
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Fresh in-memory database
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        Self::connect(&ServerConfig {
            database_url: "sqlite::memory:".to_string(),
            ..ServerConfig::default()
        })
        .await
    }
}

/// Count requests by outcome and record latency
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Metrics::incr(&state.metrics.validation_failures)
        }
        StatusCode::NOT_FOUND => Metrics::incr(&state.metrics.not_found),
        StatusCode::INTERNAL_SERVER_ERROR => Metrics::incr(&state.metrics.db_errors),
        _ => {}
    }

    let success = !(status.is_client_error() || status.is_server_error());
    state.metrics.record_request(start.elapsed(), success);
    debug!("{} {} -> {} in {:?}", method, path, status.as_u16(), start.elapsed());
    response
}

async fn health() -> &'static str {
    "OK"
}

async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

async fn metrics_json(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.metrics.to_json(),
    )
}

/// Build the full router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/scores", post(scores::create).get(scores::list))
        .route("/api/scores/top/:n", get(scores::top))
        .route(
            "/api/scores/:id",
            get(scores::get_by_id).put(scores::update).delete(scores::delete),
        )
        .route("/api/highscore", get(scores::highscore))
        .route("/api/saves", post(saves::upsert))
        .route(
            "/api/saves/:player_name",
            get(saves::get_by_name)
                .post(saves::upsert_named)
                .delete(saves::delete),
        )
        .route("/health", get(health))
        .route("/metrics", get(metrics_prometheus))
        .route("/metrics/json", get(metrics_json))
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Method;
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    async fn app() -> (Router, AppState) {
        let state = AppState::in_memory().await.unwrap();
        (router(state.clone()), state)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Response) {
        let builder = axum::http::Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        (response.status(), response)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        if bytes.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, response) = call(app, method, uri, body).await;
        (status, json_body(response).await)
    }

    fn score(name: &str, score: i64, kills: i64, max_combo: i64) -> Value {
        json!({
            "playerName": name,
            "score": score,
            "kills": kills,
            "maxCombo": max_combo,
            "durationSec": 60,
            "validHits": kills + 1,
            "missClicks": 1,
            "punishmentHits": 0
        })
    }

    async fn post_score(app: &Router, body: Value) -> Value {
        let (status, body) = send(app, Method::POST, "/api/scores", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "body: {}", body);
        body
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app().await;
        let (status, response) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_create_score() {
        let (app, _) = app().await;
        let (status, response) = call(
            &app,
            Method::POST,
            "/api/scores",
            Some(score("  Biken  ", 1200, 9, 6)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let body = json_body(response).await;
        assert_eq!(body["playerName"], "Biken");
        assert_eq!(body["kills"], 9);
        // 10 valid / (10 + 1 miss)
        let accuracy = body["accuracy"].as_f64().unwrap();
        assert!((accuracy - 10.0 / 11.0).abs() < 1e-9);
        assert_eq!(location, format!("/api/scores/{}", body["id"]));

        let (status, fetched) = send(&app, Method::GET, &location, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, body);
    }

    #[tokio::test]
    async fn test_create_score_validation() {
        let (app, state) = app().await;

        let (status, body) = send(&app, Method::POST, "/api/scores", Some(score("   ", 10, 1, 1))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["playerName"].is_array());

        let mut negative = score("Biken", 10, 1, 1);
        negative["missClicks"] = json!(-1);
        let (status, body) = send(&app, Method::POST, "/api/scores", Some(negative)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["values"].is_array());

        let mut zero_duration = score("Biken", 10, 1, 1);
        zero_duration["durationSec"] = json!(0);
        let (status, _) = send(&app, Method::POST, "/api/scores", Some(zero_duration)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut armored = score("Biken", 10, 5, 1);
        armored["validHits"] = json!(4);
        let (status, body) = send(&app, Method::POST, "/api/scores", Some(armored)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["validHits"].is_array());

        let (status, _) = send(&app, Method::GET, "/api/highscore", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.metrics.validation_failures.load(Ordering::Relaxed), 4);
        assert_eq!(state.metrics.scores_created.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_top_ranking_and_clamp() {
        let (app, _) = app().await;
        post_score(&app, score("A", 100, 5, 2)).await;
        post_score(&app, score("B", 100, 7, 1)).await;
        post_score(&app, score("C", 50, 9, 9)).await;
        post_score(&app, score("D", 100, 7, 3)).await;

        let (status, top) = send(&app, Method::GET, "/api/scores/top/10", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = top
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["playerName"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["D", "B", "A", "C"]);
        assert_eq!(top[0]["rank"], 1);
        assert_eq!(top[3]["rank"], 4);

        let (_, top) = send(&app, Method::GET, "/api/scores/top/0", None).await;
        assert_eq!(top.as_array().unwrap().len(), 1);

        let (status, best) = send(&app, Method::GET, "/api/highscore", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(best["playerName"], "D");
        assert_eq!(best["rank"], 1);
    }

    #[tokio::test]
    async fn test_ties_broken_by_newest() {
        let (app, _) = app().await;
        let first = post_score(&app, score("First", 100, 5, 2)).await;
        let second = post_score(&app, score("Second", 100, 5, 2)).await;
        assert!(second["id"].as_i64() > first["id"].as_i64());

        let (_, best) = send(&app, Method::GET, "/api/highscore", None).await;
        assert_eq!(best["playerName"], "Second");
    }

    #[tokio::test]
    async fn test_list_filter_page_sort() {
        let (app, _) = app().await;
        post_score(&app, score("Biken", 300, 3, 3)).await;
        post_score(&app, score("bikenator", 200, 8, 2)).await;
        post_score(&app, score("Rina", 900, 1, 1)).await;

        let (status, page) = send(&app, Method::GET, "/api/scores?player=bik&pageSize=1&page=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["totalItems"], 2);
        assert_eq!(page["totalPages"], 2);
        assert_eq!(page["page"], 2);
        assert_eq!(page["pageSize"], 1);
        assert_eq!(page["items"][0]["playerName"], "bikenator");

        let (_, page) = send(&app, Method::GET, "/api/scores?sort=kills,bogus", None).await;
        let kills: Vec<i64> = page["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["kills"].as_i64().unwrap())
            .collect();
        assert_eq!(kills, vec![1, 3, 8]);

        let (_, page) = send(&app, Method::GET, "/api/scores?pageSize=500&page=0", None).await;
        assert_eq!(page["pageSize"], 100);
        assert_eq!(page["page"], 1);
        assert_eq!(page["items"][0]["playerName"], "Rina");

        let (_, page) = send(&app, Method::GET, "/api/scores?from=2100-01-01T00:00:00Z", None).await;
        assert_eq!(page["totalItems"], 0);
        assert_eq!(page["totalPages"], 0);
    }

    #[tokio::test]
    async fn test_list_date_range() {
        let (app, _) = app().await;
        let created = post_score(&app, score("Biken", 300, 3, 3)).await;
        let at = created["createdAt"].as_str().unwrap().to_string();

        let uri = format!("/api/scores?from={}&to={}", at, at);
        let (status, page) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["totalItems"], 1);

        let (_, page) = send(&app, Method::GET, "/api/scores?from=2020-01-01T00:00:00Z", None).await;
        assert_eq!(page["totalItems"], 1);

        let (_, page) = send(&app, Method::GET, "/api/scores?to=2020-01-01T00:00:00Z", None).await;
        assert_eq!(page["totalItems"], 0);

        let (status, _) = send(&app, Method::GET, "/api/scores?from=yesterday", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_and_delete_score() {
        let (app, _) = app().await;
        let created = post_score(&app, score("Biken", 300, 3, 3)).await;
        let uri = format!("/api/scores/{}", created["id"]);

        let mut changed = score("Biken", 450, 4, 4);
        changed["missClicks"] = json!(0);
        let (status, updated) = send(&app, Method::PUT, &uri, Some(changed)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["createdAt"], created["createdAt"]);
        assert_eq!(updated["score"], 450);
        assert_eq!(updated["accuracy"], 1.0);

        let (status, _) = send(&app, Method::PUT, &uri, Some(score("", 1, 0, 0))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::PUT, &uri, Some(score("Biken", 1, 0, 0))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_save_upsert_and_clamp() {
        let (app, state) = app().await;

        let (status, _) = send(&app, Method::GET, "/api/saves/Biken", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, first) = send(
            &app,
            Method::POST,
            "/api/saves",
            Some(json!({
                "playerName": "Biken",
                "score": 150,
                "kills": 2,
                "hearts": 2,
                "phaseIndex": 1,
                "timeLeftSec": 0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["score"], 150);
        assert_eq!(first["phaseIndex"], 1);

        let (status, second) = send(
            &app,
            Method::POST,
            "/api/saves/Biken",
            Some(json!({ "playerName": "ignored", "score": -5, "hearts": 1, "phaseIndex": 9 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["id"], first["id"]);
        assert_eq!(second["playerName"], "Biken");
        assert_eq!(second["score"], 0);
        assert_eq!(second["phaseIndex"], 2);
        assert_eq!(second["createdAt"], first["createdAt"]);

        let (status, loaded) = send(&app, Method::GET, "/api/saves/Biken", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loaded, second);
        assert_eq!(state.metrics.saves_upserted.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_save_name_rules_and_delete() {
        let (app, _) = app().await;

        let (status, body) = send(&app, Method::POST, "/api/saves", Some(json!({ "playerName": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["playerName"].is_array());

        let long = "x".repeat(21);
        let (status, _) = send(&app, Method::GET, &format!("/api/saves/{}", long), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, Method::DELETE, &format!("/api/saves/{}", long), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        send(&app, Method::POST, "/api/saves", Some(json!({ "playerName": "Rina", "hearts": 3 }))).await;
        let (status, _) = send(&app, Method::DELETE, "/api/saves/Rina", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, "/api/saves/Rina", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_endpoints() {
        let (app, _) = app().await;
        post_score(&app, score("Biken", 300, 3, 3)).await;

        let (status, response) = call(&app, Method::GET, "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("pukul_tikus_scores_created_total 1"));

        let (status, json) = send(&app, Method::GET, "/metrics/json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["scores"]["created"], 1);
        assert!(json["requests"]["total"].as_u64().unwrap() >= 2);
    }
}

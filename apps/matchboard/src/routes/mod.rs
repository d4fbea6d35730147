pub mod health;
pub mod matches;
pub mod pipeline;
pub mod session;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Ranking
        .route("/api/v1/matches/rank", post(matches::handle_rank))
        .route("/api/v1/matches/stats", post(matches::handle_stats))
        // Pipeline board
        .route("/api/v1/pipeline", get(pipeline::handle_list))
        .route("/api/v1/pipeline/entries", post(pipeline::handle_track))
        .route(
            "/api/v1/pipeline/entries/:id",
            delete(pipeline::handle_delete),
        )
        .route(
            "/api/v1/pipeline/entries/:id/stage",
            patch(pipeline::handle_move),
        )
        .route(
            "/api/v1/pipeline/bulk-stage",
            post(pipeline::handle_bulk_move),
        )
        // Session view state
        .route("/api/v1/session", delete(session::handle_purge_all))
        .route(
            "/api/v1/session/:key",
            get(session::handle_read)
                .put(session::handle_write)
                .delete(session::handle_purge),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::funnel::LocalStageBackend;
    use crate::session::MemoryStore;

    fn app() -> Router {
        let state = AppState::new(
            Config::default(),
            Arc::new(LocalStageBackend),
            Arc::new(MemoryStore::new()),
        );
        build_router(state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // Extractor rejections come back as plain text.
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "matchboard");
        assert_eq!(body["session"]["pendingWrites"], 0);
    }

    #[tokio::test]
    async fn test_rank_returns_page_and_stats() {
        let request = json!({
            "records": [
                { "subjectId": "J1", "rawScore": { "kind": "percent0to100", "value": 92.0 },
                  "attributes": { "remote": true } },
                { "subjectId": "J2", "rawScore": { "kind": "fraction0to1", "value": 0.56 },
                  "attributes": { "remote": true } },
                { "subjectId": "J3", "rawScore": { "kind": "percent0to100", "value": 40.0 },
                  "attributes": { "remote": false } }
            ],
            "filters": { "minScore": 0.5, "booleanFilters": { "remote": true } },
            "sort": { "field": "score", "direction": "desc" },
            "page": { "pageSize": 10, "pageIndex": 0 }
        });
        let (status, body) = send(&app(), Method::POST, "/api/v1/matches/rank", Some(request)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalMatched"], 2);
        assert_eq!(body["items"][0]["subjectId"], "J1");
        assert_eq!(body["items"][1]["subjectId"], "J2");
        assert_eq!(body["stats"]["averagePercent"], 74);
    }

    #[tokio::test]
    async fn test_rank_rejects_zero_page_size() {
        let request = json!({ "records": [], "page": { "pageSize": 0, "pageIndex": 0 } });
        let (status, body) = send(&app(), Method::POST, "/api/v1/matches/rank", Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_pipeline_track_move_and_delete() {
        let app = app();
        let entry = json!({
            "id": "p1",
            "subjectId": "J1",
            "stage": "saved",
            "matchScoreAtSaveTime": 0.9,
            "savedAt": "2026-01-05T10:00:00Z"
        });
        let (status, _) = send(&app, Method::POST, "/api/v1/pipeline/entries", Some(entry)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/api/v1/pipeline/entries/p1/stage",
            Some(json!({ "stage": "interview" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["from"], "saved");
        assert_eq!(body["to"], "interview");

        let (status, body) = send(&app, Method::GET, "/api/v1/pipeline?stage=interview", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["entries"][0]["id"], "p1");
        assert_eq!(body["entries"][0]["stage"], "interview");
        assert_eq!(body["counts"]["interview"], 1);
        assert_eq!(body["counts"]["saved"], 0);

        let (status, _) = send(&app, Method::DELETE, "/api/v1/pipeline/entries/p1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/api/v1/pipeline/entries/p1/stage",
            Some(json!({ "stage": "offer" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_bulk_stage_reports_unknown_ids() {
        let app = app();
        let entry = json!({
            "id": "p1",
            "subjectId": "J1",
            "stage": "saved",
            "matchScoreAtSaveTime": 0.7,
            "savedAt": "2026-01-05T10:00:00Z"
        });
        send(&app, Method::POST, "/api/v1/pipeline/entries", Some(entry)).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/pipeline/bulk-stage",
            Some(json!({ "ids": ["p1", "ghost"], "stage": "interview" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["succeeded"], json!(["p1"]));
        assert_eq!(body["failed"]["ghost"]["code"], "NOT_FOUND");
        assert_eq!(body["superseded"], json!([]));

        let (status, body) = send(&app, Method::GET, "/api/v1/pipeline", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"][0]["stage"], "interview");
        assert_eq!(body["counts"]["interview"], 1);
    }

    #[tokio::test]
    async fn test_unknown_stage_is_rejected_before_reaching_the_store() {
        let app = app();
        let entry = json!({
            "id": "p1",
            "subjectId": "J1",
            "stage": "saved",
            "matchScoreAtSaveTime": 0.7,
            "savedAt": "2026-01-05T10:00:00Z"
        });
        send(&app, Method::POST, "/api/v1/pipeline/entries", Some(entry)).await;

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/api/v1/pipeline/entries/p1/stage",
            Some(json!({ "stage": "applied" })),
        )
        .await;
        assert!(status.is_client_error());

        let (_, body) = send(&app, Method::GET, "/api/v1/pipeline", None).await;
        assert_eq!(body["entries"][0]["stage"], "saved");
    }

    #[tokio::test]
    async fn test_session_write_read_purge() {
        let app = app();
        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/v1/session/jobs-list",
            Some(json!({ "scrollOffset": 120.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, body) = send(&app, Method::GET, "/api/v1/session/jobs-list", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payload"]["scrollOffset"], 120.0);
        assert_eq!(body["staleness"], "fresh");

        let (status, _) = send(&app, Method::DELETE, "/api/v1/session", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::GET, "/api/v1/session/jobs-list", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

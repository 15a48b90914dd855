use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{messages, tasks, transactions, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(users::router())
        .merge(tasks::router())
        .merge(transactions::router())
        .merge(messages::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = millis(latency);
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn call_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = call(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn register(app: &Router, name: &str) -> Value {
        let (status, user) = call_json(
            app,
            Method::POST,
            "/users/",
            Some(json!({"username": name, "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        user
    }

    #[test]
    fn latency_millis_saturates() {
        use std::time::Duration;
        assert_eq!(millis(Duration::from_micros(2_500)), 2);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn register_and_login() {
        let app = build_app(AppState::fake());
        let user = register(&app, "asha").await;
        assert_eq!(user["karma_points"], 500);
        assert!(user.get("password").is_none());

        let (status, body) = call(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "asha", "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Username already registered");

        let (status, _) = call_json(
            &app,
            Method::POST,
            "/users/login",
            Some(json!({"username": "asha", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::POST,
            "/users/login",
            Some(json!({"username": "asha", "password": "bad"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Invalid username or password");
    }

    #[tokio::test]
    async fn full_trade_over_http() {
        let app = build_app(AppState::fake());
        let a = register(&app, "a").await;
        let b = register(&app, "b").await;

        let (status, task) = call_json(
            &app,
            Method::POST,
            "/tasks/",
            Some(json!({"description": "fix bike", "karma_cost": 100, "username": "a", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(task["chosen_by_id"].is_null());
        let task_id = task["id"].as_i64().unwrap();

        let (status, body) = call(
            &app,
            Method::POST,
            "/tasks/complete",
            Some(json!({"task_id": task_id, "username": "a", "password": "pw", "reputation_rating": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Task has not been chosen yet");

        let (status, chosen) = call_json(
            &app,
            Method::POST,
            "/tasks/choose",
            Some(json!({"task_id": task_id, "username": "b", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(chosen["chosen_by_id"], b["id"]);

        let (status, body) = call(
            &app,
            Method::POST,
            "/tasks/choose",
            Some(json!({"task_id": task_id, "username": "a", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Task already chosen");

        let (status, body) = call(
            &app,
            Method::POST,
            "/tasks/complete",
            Some(json!({"task_id": task_id, "username": "b", "password": "pw", "reputation_rating": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Only the task owner can mark it as complete");

        let (status, done) = call_json(
            &app,
            Method::POST,
            "/tasks/complete",
            Some(json!({"task_id": task_id, "username": "a", "password": "pw", "reputation_rating": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["id"], task_id);

        let (_, tasks) = call_json(&app, Method::GET, "/tasks/all", None).await;
        assert_eq!(tasks, json!([]));

        let (status, b_now) = call_json(
            &app,
            Method::POST,
            "/users/login",
            Some(json!({"username": "b", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(b_now["karma_points"], 600);
        assert_eq!(b_now["reputation"], 5.0);

        let (status, history) =
            call_json(&app, Method::POST, "/transactions/history?username=a", None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = history.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["user_id"], a["id"]);
        assert_eq!(rows[0]["chosen_by_id"], b["id"]);
        assert_eq!(rows[0]["karma_points"], 100);
        assert!(rows[0]["timestamp"].as_str().unwrap().ends_with("+05:30"));

        let (status, same) =
            call_json(&app, Method::GET, "/transactions/history?username=b", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(same.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_entities_are_404() {
        let app = build_app(AppState::fake());
        register(&app, "a").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/tasks/choose",
            Some(json!({"task_id": 404, "username": "a", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, b"Task not found");

        let (status, body) =
            call(&app, Method::POST, "/transactions/history?username=ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, b"User not found");
    }

    #[tokio::test]
    async fn insufficient_karma_is_400() {
        let app = build_app(AppState::fake());
        register(&app, "a").await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/tasks/",
            Some(json!({"description": "moon", "karma_cost": 501, "username": "a", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Insufficient karma points");

        let (status, body) = call(
            &app,
            Method::POST,
            "/tasks/",
            Some(json!({"description": "x", "karma_cost": i32::MIN, "username": "a", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Karma balance out of range");
    }

    #[tokio::test]
    async fn messaging_over_http() {
        let app = build_app(AppState::fake());
        let a = register(&app, "a").await;
        let b = register(&app, "b").await;
        let (a_id, b_id) = (a["id"].as_i64().unwrap(), b["id"].as_i64().unwrap());

        let (status, sent) = call_json(
            &app,
            Method::POST,
            "/messages/",
            Some(json!({"sender_id": a_id, "receiver_id": b_id, "content": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sent["content"], "hi");

        let (status, _) = call(
            &app,
            Method::POST,
            "/messages/",
            Some(json!({"sender_id": a_id, "receiver_id": 999, "content": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, thread) =
            call_json(&app, Method::GET, &format!("/messages/{b_id}/{a_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(thread.as_array().unwrap().len(), 1);

        let (status, inbox) = call_json(&app, Method::GET, &format!("/messages/{b_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(inbox[0]["sender_id"], a_id);
    }
}

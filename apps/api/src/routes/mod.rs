pub mod health;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_cookies::CookieManagerLayer;

use crate::analysis::handlers as analysis;
use crate::auth::handlers as auth;
use crate::auth::middleware::require_user;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/register", post(auth::handle_register))
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/logout", post(auth::handle_logout));

    // Everything under /api/v1 requires a session
    let protected = Router::new()
        .route("/api/v1/me", get(auth::handle_me))
        .route("/api/v1/me/password", put(auth::handle_change_password))
        .route("/api/v1/analyses", post(analysis::handle_analyze))
        .route("/api/v1/history", get(analysis::handle_history))
        .route(
            "/api/v1/history/:id",
            delete(analysis::handle_delete_history_entry),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    public
        .merge(protected)
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::analysis::pipeline::tests::{BrokenHistory, CannedModel, NoNetwork, ARTICLE};
    use crate::analysis::pipeline::Analyzer;
    use crate::auth::password::TEST_COST;
    use crate::auth::SessionKeys;
    use crate::config::Config;
    use crate::storage::{HistoryStore, MemoryStore};

    const REPLY: &str = "Credibility Score: 8/10\n\
        Verdict: Reliable\n\
        Tone: Measured and factual.\n\
        Bias: No clear bias.\n\
        Sources: Cites the official report.\n\
        Fact-Checking: Figures match the report.\n\
        Red Flags: None\n\
        Summary: The health authority reports shorter waiting times.";

    fn app(reply: &str) -> Router {
        let store = Arc::new(MemoryStore::new());
        app_with_history(reply, store.clone(), store)
    }

    fn app_with_history(
        reply: &str,
        history: Arc<dyn HistoryStore>,
        users: Arc<MemoryStore>,
    ) -> Router {
        let mut config = Config::from_lookup(|key| match key {
            "HF_TOKEN" => Some("hf_test".into()),
            "JWT_SECRET" => Some("router-test-secret".into()),
            "STORAGE_BACKEND" => Some("memory".into()),
            _ => None,
        })
        .unwrap();
        config.bcrypt_cost = TEST_COST;

        let analyzer = Analyzer::new(
            Arc::new(CannedModel::replying(reply)),
            Arc::new(NoNetwork),
            history.clone(),
            config.max_article_chars,
        );
        build_router(AppState {
            analyzer: Arc::new(analyzer),
            history,
            users,
            sessions: SessionKeys::new(&config.jwt_secret, config.session_ttl_hours),
            config,
        })
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(app: &Router, username: &str) -> String {
        let (status, _) = send(
            app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": username,
                "password": "hunter2hunter2",
                "confirm_password": "hunter2hunter2"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": username, "password": "hunter2hunter2" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(REPLY);
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_api_requires_session() {
        let app = app(REPLY);
        let (status, body) = send(&app, Method::GET, "/api/v1/history", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) =
            send(&app, Method::GET, "/api/v1/history", Some("forged.token.value"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let app = app(REPLY);
        login(&app, "alice").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": "alice",
                "password": "another-password",
                "confirm_password": "another-password"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "USERNAME_TAKEN");
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let app = app(REPLY);
        login(&app, "alice").await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "not-the-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_analyze_then_history_then_delete() {
        let app = app(REPLY);
        let token = login(&app, "alice").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/analyses",
            Some(&token),
            Some(json!({ "text": ARTICLE })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["score"], 8);
        assert_eq!(body["score_band"], "reliable");
        assert_eq!(body["verdict_class"], "reliable");
        assert_eq!(body["complete"], true);
        assert_eq!(body["history_saved"], true);
        let entry_id = body["history_entry_id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, Method::GET, "/api/v1/history", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], entry_id.as_str());
        assert_eq!(items[0]["source_preview"], "Pasted Text");

        let uri = format!("/api/v1/history/{entry_id}");
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_history_is_private() {
        let app = app(REPLY);
        let alice = login(&app, "alice").await;
        let bob = login(&app, "bob").await;

        send(
            &app,
            Method::POST,
            "/api/v1/analyses",
            Some(&alice),
            Some(json!({ "text": ARTICLE })),
        )
        .await;

        let (_, body) = send(&app, Method::GET, "/api/v1/history", Some(&bob), None).await;
        assert!(body["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_input_errors() {
        let app = app(REPLY);
        let token = login(&app, "alice").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/analyses",
            Some(&token),
            Some(json!({ "text": "Hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "EMPTY_INPUT");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/analyses",
            Some(&token),
            Some(json!({ "text": ARTICLE, "url": "https://example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/analyses",
            Some(&token),
            Some(json!({ "url": "ftp://example.com/file" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_URL");
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_unprocessable() {
        let app = app("I cannot assess this article.");
        let token = login(&app, "alice").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/analyses",
            Some(&token),
            Some(json!({ "text": ARTICLE })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "SCORE_NOT_FOUND");

        let (_, body) = send(&app, Method::GET, "/api/v1/history", Some(&token), None).await;
        assert!(body["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_history_store() {
        let app = app_with_history(REPLY, Arc::new(BrokenHistory), Arc::new(MemoryStore::new()));
        let token = login(&app, "alice").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/analyses",
            Some(&token),
            Some(json!({ "text": ARTICLE })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["score"], 8);
        assert_eq!(body["history_saved"], false);
        assert!(body["warning"].is_string());

        let (status, body) = send(&app, Method::GET, "/api/v1/history", Some(&token), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "PERSISTENCE_ERROR");

        let uri = format!("/api/v1/history/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "PERSISTENCE_ERROR");
    }

    #[tokio::test]
    async fn test_me_and_password_change() {
        let app = app(REPLY);
        let token = login(&app, "alice").await;

        let (status, body) = send(&app, Method::GET, "/api/v1/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert!(body.get("password_hash").is_none());

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/v1/me/password",
            Some(&token),
            Some(json!({
                "current_password": "wrong-password",
                "new_password": "brand-new-pass",
                "confirm_password": "brand-new-pass"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/v1/me/password",
            Some(&token),
            Some(json!({
                "current_password": "hunter2hunter2",
                "new_password": "brand-new-pass",
                "confirm_password": "brand-new-pass"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let fresh = body["token"].as_str().unwrap().to_string();
        assert_ne!(fresh, token);

        // Sessions from before the change stop working at once
        let (status, _) = send(&app, Method::GET, "/api/v1/history", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, Method::GET, "/api/v1/history", Some(&fresh), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "brand-new-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

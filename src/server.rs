//! HTTP surface: one suggestion route plus a greeting.

use crate::suggest::{Product, TagSuggester};
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub const TAGS_ROUTE: &str = "/api/user/tags";

#[derive(Clone)]
struct AppState {
    suggester: Arc<TagSuggester>,
}

/// Body of every non-200 answer.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn index() -> &'static str {
    "Hello from taggenie!"
}

async fn suggest_tags(
    State(state): State<AppState>,
    payload: Result<Json<Product>, JsonRejection>,
) -> Response {
    let product = match payload {
        Ok(Json(product)) => product,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    // Run on its own task so a panic turns into a 500 instead of a dropped
    // connection.
    let suggester = Arc::clone(&state.suggester);
    match tokio::spawn(async move { suggester.suggest(&product).await }).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => {
            error!(error = %err, "Suggestion task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate tags")
        }
    }
}

/// CORS for the browser front end. A configured origin is allowed with
/// credentials; without one any origin may call.
pub fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let Some(origin) = origin else {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    };
    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("Invalid CORS origin: {}", origin))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

pub fn router(suggester: Arc<TagSuggester>, cors: CorsLayer) -> Router {
    Router::new()
        .route(TAGS_ROUTE, post(suggest_tags))
        .route("/", get(index))
        .with_state(AppState { suggester })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn serve(addr: SocketAddr, app: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Server is running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggest::llm::remote::tests::{reply, suggester, ScriptedTransport};
    use crate::suggest::{SuggestionResult, SuggestionSource};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn local_app() -> Router {
        router(
            Arc::new(TagSuggester::local_only()),
            cors_layer(None).unwrap(),
        )
    }

    fn post_tags(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(TAGS_ROUTE)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_local_suggestion_route() {
        let response = local_app()
            .oneshot(post_tags(r#"{"title": "Gaming Laptop", "description": "Fast"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let result: SuggestionResult = body_json(response).await;
        assert_eq!(result.source, SuggestionSource::Local);
        assert_eq!(&result.tags[..3], &["electronics", "technology", "gadget"]);
        assert_eq!(result.keywords[0], "buy Gaming Laptop online");
    }

    #[tokio::test]
    async fn test_missing_fields_default_to_empty() {
        let response = local_app().oneshot(post_tags("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let result: SuggestionResult = body_json(response).await;
        assert_eq!(result.tags, vec!["product", "sale", "online"]);
    }

    #[tokio::test]
    async fn test_remote_result_is_returned_with_source() {
        let transport = ScriptedTransport::new(vec![reply(
            "{\"tags\": [\"laptop\"], \"keywords\": [\"gaming laptop deals\"]}",
        )]);
        let app = router(
            Arc::new(TagSuggester::new(suggester(transport))),
            cors_layer(None).unwrap(),
        );
        let response = app
            .oneshot(post_tags(r#"{"title": "Gaming Laptop"}"#))
            .await
            .unwrap();
        let value: serde_json::Value = body_json(response).await;
        assert_eq!(value["source"], "openrouter-ai");
        assert_eq!(value["tags"], serde_json::json!(["laptop"]));
    }

    #[tokio::test]
    async fn test_malformed_body_is_error_json() {
        let response = local_app().oneshot(post_tags("{ nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = body_json(response).await;
        assert!(!body.error.is_empty());
    }

    #[tokio::test]
    async fn test_index_greets() {
        let response = local_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_configured_origin_is_echoed() {
        let app = router(
            Arc::new(TagSuggester::local_only()),
            cors_layer(Some("https://shop.example")).unwrap(),
        );
        let request = Request::builder()
            .uri("/")
            .header("origin", "https://shop.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "https://shop.example"
        );
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-credentials")
                .unwrap(),
            "true"
        );
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        assert!(cors_layer(Some("bad\norigin")).is_err());
    }
}

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::cookies::CookieJar;
use crate::error::{ResolveError, Result};
use crate::http::{RetryPolicy, RetryingClient};
use crate::resolver::ShareResolver;
use crate::types::ResolvedFile;

const USAGE: &str = "/api?url=YOUR_TERABOX_SHARE_URL";

/// Shared, read-only state for the request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/api", get(api_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home() -> Json<serde_json::Value> {
    Json(json!({
        "status": "Running",
        "service": "share-resolver",
        "endpoints": {
            "/api": "GET with ?url=TERABOX_SHARE_URL parameter",
            "/health": "Service health check"
        }
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "share-resolver"
    }))
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    url: Option<String>,
}

async fn api_handler(State(state): State<AppState>, Query(query): Query<ApiQuery>) -> Response {
    let started = Instant::now();

    let Some(url) = query.url else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "message": "URL parameter is required",
                "usage": USAGE
            })),
        )
            .into_response();
    };

    info!(%url, "processing share url");
    match resolve_share(&state.config, &url).await {
        Ok(files) => {
            let file_count = files.len();
            let processing_time = format!("{:.2} seconds", started.elapsed().as_secs_f64());
            (
                StatusCode::OK,
                Json(json!({
                    "status": "success",
                    "url": url,
                    "files": files,
                    "processing_time": processing_time,
                    "file_count": file_count
                })),
            )
                .into_response()
        }
        Err(err) => {
            error!(%url, error = %err, "share resolution failed");
            (
                error_status(&err),
                Json(json!({
                    "status": "error",
                    "message": err.to_string(),
                    "url": url
                })),
            )
                .into_response()
        }
    }
}

/// One full resolution, with credentials reloaded from disk
///
/// Cookies are re-read on every request so the file can be rotated
/// without restarting the service.
async fn resolve_share(config: &Config, url: &str) -> Result<Vec<ResolvedFile>> {
    let jar = CookieJar::load(&config.cookies_file)?;
    if jar.is_empty() {
        return Err(ResolveError::Config {
            message: "No cookies found. Please provide valid cookies.".to_string(),
        });
    }

    let client = RetryingClient::new(
        Some(jar.header_value()),
        config.request_timeout,
        RetryPolicy {
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        },
    )?;
    let resolver = ShareResolver::new(client, config.listing_api_base.clone());
    resolver.resolve(url).await
}

fn error_status(err: &ResolveError) -> StatusCode {
    match err {
        ResolveError::NoFiles => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(error_status(&ResolveError::NoFiles), StatusCode::NOT_FOUND);
        assert_eq!(
            error_status(&ResolveError::AllFilesFailed),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_status(&ResolveError::Config {
                message: "x".to_string()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_status(&ResolveError::Scrape { what: "tokens" }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

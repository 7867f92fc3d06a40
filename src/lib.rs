pub mod communities;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod members;
pub mod messages;
pub mod res;
pub mod store;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRef, FromRequest, Request},
    http::{HeaderName, Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{config::Config, error::ApiError, messages::Message};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<Config>,
    pub tx: broadcast::Sender<Message>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config) -> AppState {
        let tx = broadcast::channel(config.broadcast_capacity.max(1)).0;
        AppState {
            db_pool,
            config: Arc::new(config),
            tx,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(communities::router())
        .merge(members::router())
        .merge(messages::router())
        .method_not_allowed_fallback(method_not_allowed);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .fallback(not_found)
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(identity::MSME_ID),
            HeaderName::from_static(identity::MSME_NAME),
            HeaderName::from_static(identity::MSME_EMAIL),
        ])
}

async fn method_not_allowed(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    ApiError::MethodNotAllowed.into_response()
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "ok": false, "error": "Not found" })),
    )
        .into_response()
}

/// JSON request body where an empty body reads as `{}`.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await?;
        let raw: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(raw)
            .map(JsonBody)
            .map_err(|err| ApiError::validation(format!("Invalid JSON body: {err}")))
    }
}

/// Treats empty strings like missing fields.
pub fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Current UTC time as ISO 8601 with millisecond precision, e.g.
/// `2025-03-01T09:30:00.125Z`. Fixed width so text order is time order.
pub fn now() -> String {
    time::OffsetDateTime::now_utc()
        .format(time::macros::format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .unwrap_or_default()
}

mod list;
mod send;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::AppState;

pub const DEFAULT_LIMIT: usize = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/community-messages-create", post(send::send_message))
        .route("/community-messages-list", get(list::list_messages))
        .route("/community-messages-stream", get(ws::message_stream))
}

/// A post in a community. Author name and email are copied at post time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub community_id: String,
    pub msme_id: String,
    #[serde(default)]
    pub msme_name: String,
    #[serde(default)]
    pub msme_email: String,
    pub body: String,
    pub created_at: String,
}

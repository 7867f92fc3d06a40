use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::{
    AppState,
    communities::{self, find_community},
    config::Config,
    error::{ApiError, ApiResult},
    present,
};

use super::{DEFAULT_LIMIT, Message};

#[derive(Debug, Deserialize)]
pub(crate) struct ListMessagesQuery {
    community_id: Option<String>,
    limit: Option<String>,
}

fn parse_limit(raw: Option<String>, max: usize) -> ApiResult<usize> {
    let Some(raw) = present(raw) else {
        return Ok(DEFAULT_LIMIT.min(max));
    };
    match raw.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit.min(max)),
        _ => Err(ApiError::validation("Limit must be a positive integer")),
    }
}

/// The latest `limit` messages of a community, oldest first.
#[debug_handler(state = AppState)]
pub(crate) async fn list_messages(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    query: Result<Query<ListMessagesQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(ListMessagesQuery {
        community_id,
        limit,
    }) = query?;
    let Some(community_id) = present(community_id) else {
        return Err(ApiError::validation("Community ID is required"));
    };
    let limit = parse_limit(limit, config.max_message_limit)?;

    if find_community(&db_pool, &community_id).await?.is_none() {
        return Err(communities::not_found());
    }

    let messages: Vec<Message> = sqlx::query_as(
        "SELECT * FROM (\
            SELECT *, rowid AS seq FROM community_messages WHERE community_id=? \
            ORDER BY created_at DESC, rowid DESC LIMIT ?\
        ) ORDER BY created_at, seq",
    )
    .bind(&community_id)
    .bind(limit as i64)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(json!({ "ok": true, "messages": messages })))
}

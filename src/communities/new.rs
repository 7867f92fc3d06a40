use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::{
    AppState, JsonBody,
    config::Config,
    error::{ApiError, ApiResult},
    identity::Caller,
    new_id, now, present, res,
};

use super::{Community, CommunityStatus};

#[derive(Debug, Deserialize)]
pub(crate) struct NewCommunityBody {
    name: Option<String>,
    category: Option<String>,
    description: Option<String>,
    creator_msme_id: Option<String>,
    is_public: Option<Value>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_community(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    caller: Caller,
    JsonBody(body): JsonBody<NewCommunityBody>,
) -> ApiResult<Response> {
    let name = body.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::validation("Community name is required"));
    }

    let Some(category) = present(body.category) else {
        return Err(ApiError::validation("Category is required"));
    };
    if config.strict_categories && !res::is_known_category(&category) {
        return Err(ApiError::validation("Unknown category"));
    }

    let Some(creator_msme_id) = caller.actor(body.creator_msme_id)? else {
        return Err(ApiError::Unauthorized(
            "You must be logged in to create a community".to_owned(),
        ));
    };

    let created_at = now();
    let community = Community {
        id: new_id(),
        name: name.to_owned(),
        category,
        description: body.description.unwrap_or_default(),
        creator_msme_id,
        is_public: !matches!(body.is_public, Some(Value::Bool(false))),
        status: CommunityStatus::Active,
        updated_at: created_at.clone(),
        created_at,
        suspended_by: None,
        suspended_at: None,
    };

    sqlx::query(
        "INSERT INTO communities (id,name,category,description,creator_msme_id,is_public,status,created_at,updated_at) VALUES (?,?,?,?,?,?,?,?,?)",
    )
    .bind(&community.id)
    .bind(&community.name)
    .bind(&community.category)
    .bind(&community.description)
    .bind(&community.creator_msme_id)
    .bind(community.is_public)
    .bind(community.status)
    .bind(&community.created_at)
    .bind(&community.updated_at)
    .execute(&db_pool)
    .await?;

    tracing::debug!(community_id = %community.id, creator = %community.creator_msme_id, "community created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "community": community })),
    )
        .into_response())
}

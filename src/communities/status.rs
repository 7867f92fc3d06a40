use std::sync::Arc;

use axum::{Json, debug_handler, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::{
    AppState, JsonBody,
    config::Config,
    db,
    error::{ApiError, ApiResult},
    identity::Caller,
    now, present,
};

use super::{CommunityStatus, Transition, find_community, not_found};

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateStatusBody {
    community_id: Option<String>,
    status: Option<String>,
    admin_user_id: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_status(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    caller: Caller,
    JsonBody(body): JsonBody<UpdateStatusBody>,
) -> ApiResult<Json<Value>> {
    let Some(community_id) = present(body.community_id) else {
        return Err(ApiError::validation("Community ID is required"));
    };
    let status: CommunityStatus = body.status.as_deref().unwrap_or_default().parse()?;

    let admin_user_id = caller.actor(body.admin_user_id)?;
    if !config.is_admin(admin_user_id.as_deref()) {
        return Err(ApiError::forbidden(
            "Only administrators can change community status",
        ));
    }

    let mut tx = db::begin_write(&db_pool).await?;
    let mut community = find_community(&mut *tx, &community_id)
        .await?
        .ok_or_else(not_found)?;

    let transition = community.status.transition(status);
    let at = now();
    match transition {
        Transition::Suspend => {
            community.suspended_by = admin_user_id.clone();
            community.suspended_at = Some(at.clone());
        }
        Transition::Reactivate => community.suspended_at = None,
        Transition::Unchanged => {}
    }
    community.status = status;
    community.updated_at = at;

    sqlx::query(
        "UPDATE communities SET status=?, updated_at=?, suspended_by=?, suspended_at=? WHERE id=?",
    )
    .bind(community.status)
    .bind(&community.updated_at)
    .bind(&community.suspended_by)
    .bind(&community.suspended_at)
    .bind(&community.id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::debug!(
        community_id = %community.id,
        ?transition,
        admin = admin_user_id.as_deref().unwrap_or("-"),
        "community status updated"
    );

    Ok(Json(json!({ "ok": true, "community": community })))
}

use axum::{Json, extract::State};
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::{
    JsonBody, db,
    error::{ApiError, ApiResult},
    identity::Caller,
    now, present,
};

use super::{MemberStatus, active_membership, join::MembershipBody};

pub(crate) async fn leave(
    State(db_pool): State<SqlitePool>,
    caller: Caller,
    JsonBody(body): JsonBody<MembershipBody>,
) -> ApiResult<Json<Value>> {
    let msme_id = caller.actor(body.msme_id)?;
    let (Some(community_id), Some(msme_id)) = (present(body.community_id), msme_id) else {
        return Err(ApiError::validation("Community ID and MSME ID are required"));
    };

    let mut tx = db::begin_write(&db_pool).await?;
    let Some(mut membership) = active_membership(&mut *tx, &community_id, &msme_id).await? else {
        return Err(ApiError::not_found("You are not a member of this community"));
    };

    membership.status = MemberStatus::Left;
    membership.left_at = Some(now());
    sqlx::query("UPDATE community_members SET status=?, left_at=? WHERE id=?")
        .bind(membership.status)
        .bind(&membership.left_at)
        .bind(&membership.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::debug!(%community_id, %msme_id, "left community");

    Ok(Json(json!({
        "ok": true,
        "message": "Successfully left community",
        "membership": membership,
    })))
}

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::{
    communities::{self, find_community},
    error::{ApiError, ApiResult},
    identity::Caller,
    present,
};

use super::{Membership, active_membership};

#[derive(Debug, Deserialize)]
pub(crate) struct CheckQuery {
    community_id: Option<String>,
    msme_id: Option<String>,
}

pub(crate) async fn check_membership(
    State(db_pool): State<SqlitePool>,
    caller: Caller,
    query: Result<Query<CheckQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(CheckQuery {
        community_id,
        msme_id,
    }) = query?;
    let msme_id = caller.actor(msme_id)?;
    let (Some(community_id), Some(msme_id)) = (present(community_id), msme_id) else {
        return Err(ApiError::validation("Community ID and MSME ID are required"));
    };

    let membership = active_membership(&db_pool, &community_id, &msme_id).await?;

    Ok(Json(json!({
        "ok": true,
        "is_member": membership.is_some(),
        "role": membership.map(|m| m.role),
    })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListMembersQuery {
    community_id: Option<String>,
}

pub(crate) async fn list_members(
    State(db_pool): State<SqlitePool>,
    query: Result<Query<ListMembersQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(ListMembersQuery { community_id }) = query?;
    let Some(community_id) = present(community_id) else {
        return Err(ApiError::validation("Community ID is required"));
    };

    if find_community(&db_pool, &community_id).await?.is_none() {
        return Err(communities::not_found());
    }

    let members: Vec<Membership> = sqlx::query_as(
        "SELECT * FROM community_members WHERE community_id=? AND status='active' ORDER BY joined_at, rowid",
    )
    .bind(&community_id)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(json!({ "ok": true, "members": members })))
}

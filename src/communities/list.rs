use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::{ApiError, ApiResult},
    present,
};

use super::{CommunitySummary, not_found};

const SUMMARY_SELECT: &str = "SELECT c.*, \
    (SELECT COUNT(*) FROM community_members m WHERE m.community_id = c.id AND m.status = 'active') AS member_count \
    FROM communities c WHERE 1 = 1";

#[derive(Debug, Deserialize)]
pub(crate) struct ListCommunitiesQuery {
    category: Option<String>,
    search: Option<String>,
    user_id: Option<String>,
    include_suspended: Option<String>,
}

pub(crate) async fn list_communities(
    State(db_pool): State<SqlitePool>,
    query: Result<Query<ListCommunitiesQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(ListCommunitiesQuery {
        category,
        search,
        user_id,
        include_suspended,
    }) = query?;

    let mut qb = QueryBuilder::<Sqlite>::new(SUMMARY_SELECT);
    if include_suspended.as_deref() != Some("true") {
        qb.push(" AND c.status = 'active'");
    }
    if let Some(category) = present(category) {
        qb.push(" AND c.category = ").push_bind(category);
    }
    if let Some(user_id) = present(user_id) {
        qb.push(
            " AND EXISTS (SELECT 1 FROM community_members m WHERE m.community_id = c.id AND m.status = 'active' AND m.msme_id = ",
        )
        .push_bind(user_id)
        .push(")");
    }
    qb.push(" ORDER BY c.created_at DESC, c.rowid DESC");

    let mut communities: Vec<CommunitySummary> = qb.build_query_as().fetch_all(&db_pool).await?;

    // sqlite's lower() only folds ASCII
    if let Some(search) = present(search).map(|s| s.to_lowercase()) {
        communities.retain(|CommunitySummary { community, .. }| {
            community.name.to_lowercase().contains(&search)
                || community.description.to_lowercase().contains(&search)
        });
    }

    Ok(Json(json!({ "ok": true, "communities": communities })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetCommunityQuery {
    community_id: Option<String>,
    include_suspended: Option<String>,
}

pub(crate) async fn get_community(
    State(db_pool): State<SqlitePool>,
    query: Result<Query<GetCommunityQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(GetCommunityQuery {
        community_id,
        include_suspended,
    }) = query?;
    let Some(community_id) = present(community_id) else {
        return Err(ApiError::validation("Community ID is required"));
    };

    let mut qb = QueryBuilder::<Sqlite>::new(SUMMARY_SELECT);
    qb.push(" AND c.id = ").push_bind(community_id);
    if include_suspended.as_deref() != Some("true") {
        qb.push(" AND c.status = 'active'");
    }

    let community: CommunitySummary = qb
        .build_query_as()
        .fetch_optional(&db_pool)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(json!({ "ok": true, "community": community })))
}

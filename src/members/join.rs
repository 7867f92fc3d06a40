use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::{
    JsonBody,
    communities::{self, CommunityStatus, find_community},
    db,
    error::{ApiError, ApiResult},
    identity::Caller,
    new_id, now, present,
};

use super::{MemberStatus, Membership, Role};

#[derive(Debug, Deserialize)]
pub(crate) struct MembershipBody {
    pub(crate) community_id: Option<String>,
    pub(crate) msme_id: Option<String>,
}

pub(crate) async fn join(
    State(db_pool): State<SqlitePool>,
    caller: Caller,
    JsonBody(body): JsonBody<MembershipBody>,
) -> ApiResult<Json<Value>> {
    let msme_id = caller.actor(body.msme_id)?;
    let (Some(community_id), Some(msme_id)) = (present(body.community_id), msme_id) else {
        return Err(ApiError::validation("Community ID and MSME ID are required"));
    };

    let mut tx = db::begin_write(&db_pool).await?;
    let community = find_community(&mut *tx, &community_id)
        .await?
        .ok_or_else(communities::not_found)?;
    if community.status != CommunityStatus::Active {
        return Err(ApiError::forbidden("This community has been suspended"));
    }

    // an active record wins, otherwise the latest one left behind
    let existing: Option<Membership> = sqlx::query_as(
        "SELECT * FROM community_members WHERE community_id=? AND msme_id=? ORDER BY status='active' DESC, joined_at DESC, rowid DESC LIMIT 1",
    )
    .bind(&community_id)
    .bind(&msme_id)
    .fetch_optional(&mut *tx)
    .await?;

    let membership = match existing {
        Some(m) if m.status == MemberStatus::Active => {
            return Err(already_member());
        }
        Some(mut m) => {
            m.status = MemberStatus::Active;
            m.joined_at = now();
            m.left_at = None;
            sqlx::query("UPDATE community_members SET status=?, joined_at=?, left_at=NULL WHERE id=?")
                .bind(m.status)
                .bind(&m.joined_at)
                .bind(&m.id)
                .execute(&mut *tx)
                .await
                .map_err(conflict_on_race)?;
            m
        }
        None => {
            let m = Membership {
                id: new_id(),
                role: Role::for_joiner(&community.creator_msme_id, &msme_id),
                community_id,
                msme_id,
                status: MemberStatus::Active,
                joined_at: now(),
                left_at: None,
            };
            sqlx::query(
                "INSERT INTO community_members (id,community_id,msme_id,role,status,joined_at) VALUES (?,?,?,?,?,?)",
            )
            .bind(&m.id)
            .bind(&m.community_id)
            .bind(&m.msme_id)
            .bind(m.role)
            .bind(m.status)
            .bind(&m.joined_at)
            .execute(&mut *tx)
            .await
            .map_err(conflict_on_race)?;
            m
        }
    };
    tx.commit().await?;

    tracing::debug!(
        community_id = %membership.community_id,
        msme_id = %membership.msme_id,
        role = ?membership.role,
        "joined community"
    );

    Ok(Json(json!({
        "ok": true,
        "message": "Successfully joined community",
        "membership": membership,
    })))
}

fn already_member() -> ApiError {
    ApiError::Conflict("You are already a member of this community".to_owned())
}

/// A concurrent join got its row in first.
fn conflict_on_race(err: sqlx::Error) -> ApiError {
    let err = ApiError::from(err);
    if err.is_unique_violation() {
        already_member()
    } else {
        err
    }
}

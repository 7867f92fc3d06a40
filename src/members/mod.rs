mod join;
mod leave;
mod list;

use axum::{
    Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/community-members-join", post(join::join))
        .route("/community-members-leave", post(leave::leave))
        .route("/community-members-check", get(list::check_membership))
        .route("/community-members-list", get(list::list_members))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Member,
}

impl Role {
    /// The community's creator owns it; everyone else is a member.
    pub fn for_joiner(creator_msme_id: &str, msme_id: &str) -> Role {
        if creator_msme_id == msme_id {
            Role::Owner
        } else {
            Role::Member
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Left,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: String,
    pub community_id: String,
    pub msme_id: String,
    pub role: Role,
    pub status: MemberStatus,
    pub joined_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_at: Option<String>,
}

pub(crate) async fn active_membership<'e, E>(
    executor: E,
    community_id: &str,
    msme_id: &str,
) -> Result<Option<Membership>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as(
        "SELECT * FROM community_members WHERE community_id=? AND msme_id=? AND status='active' ORDER BY joined_at DESC, rowid DESC LIMIT 1",
    )
    .bind(community_id)
    .bind(msme_id)
    .fetch_optional(executor)
    .await
}

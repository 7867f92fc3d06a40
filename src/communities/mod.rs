mod categories;
mod list;
mod new;
mod status;

use std::{fmt, str::FromStr};

use axum::{
    Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

use crate::{AppState, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/communities-create", post(new::create_community))
        .route("/communities-get", get(list::list_communities))
        .route("/community-get", get(list::get_community))
        .route("/communities-update-status", post(status::update_status))
        .route("/community-categories", get(categories::categories))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CommunityStatus {
    Active,
    Suspended,
}

/// What an UpdateStatus call does to a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Suspend,
    Reactivate,
    Unchanged,
}

impl CommunityStatus {
    pub fn transition(self, to: CommunityStatus) -> Transition {
        use CommunityStatus::*;
        match (self, to) {
            (Active, Suspended) => Transition::Suspend,
            (Suspended, Active) => Transition::Reactivate,
            (Active, Active) | (Suspended, Suspended) => Transition::Unchanged,
        }
    }
}

impl FromStr for CommunityStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CommunityStatus::Active),
            "suspended" => Ok(CommunityStatus::Suspended),
            _ => Err(ApiError::validation(
                r#"Status must be "active" or "suspended""#,
            )),
        }
    }
}

impl fmt::Display for CommunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            CommunityStatus::Active => "active",
            CommunityStatus::Suspended => "suspended",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Community {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub creator_msme_id: String,
    #[serde(default = "default_public")]
    pub is_public: bool,
    pub status: CommunityStatus,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended_by: Option<String>,
    #[serde(default)]
    pub suspended_at: Option<String>,
}

fn default_public() -> bool {
    true
}

/// A community as listed, with its active member count.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommunitySummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub community: Community,
    pub member_count: i64,
}

pub(crate) async fn find_community<'e, E>(
    executor: E,
    community_id: &str,
) -> Result<Option<Community>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as("SELECT * FROM communities WHERE id = ?")
        .bind(community_id)
        .fetch_optional(executor)
        .await
}

pub(crate) fn not_found() -> ApiError {
    ApiError::not_found("Community not found")
}

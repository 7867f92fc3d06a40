use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::{
    AppState, JsonBody,
    communities::{self, CommunityStatus, find_community},
    config::Config,
    db,
    error::{ApiError, ApiResult},
    identity::Caller,
    members::active_membership,
    new_id, now, present,
};

use super::Message;

#[derive(Debug, Deserialize)]
pub(crate) struct SendMessageBody {
    community_id: Option<String>,
    msme_id: Option<String>,
    body: Option<String>,
    msme_name: Option<String>,
    msme_email: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_message(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(tx): State<broadcast::Sender<Message>>,
    caller: Caller,
    JsonBody(body): JsonBody<SendMessageBody>,
) -> ApiResult<Response> {
    let msme_id = caller.actor(body.msme_id)?;
    let text = body.body.as_deref().map(str::trim).unwrap_or_default();
    let (Some(community_id), Some(msme_id), false) =
        (present(body.community_id), msme_id, text.is_empty())
    else {
        return Err(ApiError::validation(
            "Community ID, MSME ID, and message body are required",
        ));
    };
    if text.chars().count() > config.max_message_len {
        return Err(ApiError::validation("Message is too long"));
    }

    let mut db_tx = db::begin_write(&db_pool).await?;
    let community = find_community(&mut *db_tx, &community_id)
        .await?
        .ok_or_else(communities::not_found)?;
    if community.status != CommunityStatus::Active {
        return Err(ApiError::forbidden(
            "This community has been suspended. You cannot send messages.",
        ));
    }
    if active_membership(&mut *db_tx, &community_id, &msme_id)
        .await?
        .is_none()
    {
        return Err(ApiError::forbidden(
            "You must be a member of this community to send messages",
        ));
    }

    let message = Message {
        id: new_id(),
        community_id,
        msme_id,
        msme_name: present(body.msme_name)
            .or(caller.msme_name)
            .unwrap_or_else(|| "Unknown".to_owned()),
        msme_email: present(body.msme_email)
            .or(caller.msme_email)
            .unwrap_or_default(),
        body: text.to_owned(),
        created_at: now(),
    };

    sqlx::query(
        "INSERT INTO community_messages (id,community_id,msme_id,msme_name,msme_email,body,created_at) VALUES (?,?,?,?,?,?,?)",
    )
    .bind(&message.id)
    .bind(&message.community_id)
    .bind(&message.msme_id)
    .bind(&message.msme_name)
    .bind(&message.msme_email)
    .bind(&message.body)
    .bind(&message.created_at)
    .execute(&mut *db_tx)
    .await?;
    db_tx.commit().await?;

    tracing::debug!(community_id = %message.community_id, msme_id = %message.msme_id, "message posted");

    // no subscribers is fine
    let _ = tx.send(message.clone());

    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "message": message })),
    )
        .into_response())
}

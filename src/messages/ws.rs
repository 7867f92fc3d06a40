use axum::{
    debug_handler,
    extract::{
        Query, State, WebSocketUpgrade,
        rejection::QueryRejection,
        ws::{self, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    AppState,
    communities::{self, find_community},
    error::{ApiError, ApiResult},
    present,
};

use super::Message;

#[derive(Debug, Deserialize)]
pub(crate) struct StreamQuery {
    community_id: Option<String>,
}

/// Pushes each new message of one community to a websocket as JSON text.
#[debug_handler(state = AppState)]
pub(crate) async fn message_stream(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Message>>,
    query: Result<Query<StreamQuery>, QueryRejection>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> ApiResult<Response> {
    let Query(StreamQuery { community_id }) = query?;
    let Some(community_id) = present(community_id) else {
        return Err(ApiError::validation("Community ID is required"));
    };
    if find_community(&db_pool, &community_id).await?.is_none() {
        return Err(communities::not_found());
    }
    let ws = ws.map_err(|err| ApiError::validation(err.body_text()))?;

    let rx = tx.subscribe();
    Ok(ws.on_upgrade(move |socket| forward(socket, rx, community_id)))
}

async fn forward(socket: WebSocket, mut rx: broadcast::Receiver<Message>, community_id: String) {
    let (mut sender, mut receiver) = socket.split();

    let mut push_task = tokio::spawn(async move {
        loop {
            let message = match rx.recv().await {
                Ok(message) => message,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "message stream lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if message.community_id != community_id {
                continue;
            }
            let Ok(text) = serde_json::to_string(&message) else {
                continue;
            };
            if sender.send(ws::Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // inbound frames are ignored; the stream ends when the client goes away
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = receiver.next().await {
            if matches!(frame, ws::Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut push_task => recv_task.abort(),
        _ = &mut recv_task => push_task.abort(),
    };
}

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::auth::AuthSession;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SessionQuery {
    pub token: String,
}

/// Pushes the caller's session state, then every sign-in or sign-out of the
/// same user, so open views can follow logins made in other tabs.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .auth
        .current(&query.token)
        .ok_or_else(|| AppError::Unauthorized("session expired, please log in again".to_string()))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, session)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, session: AuthSession) {
    let (mut sender, mut receiver) = socket.split();
    let uid = session.uid.clone();
    let changes = BroadcastStream::new(state.auth.subscribe());

    info!(uid = %uid, "session listener connected");

    let send_task = tokio::spawn(async move {
        let current = json!({ "event": "current", "session": session }).to_string();
        if sender.send(Message::Text(current)).await.is_err() {
            return;
        }

        let changes = changes.filter_map(|change| {
            let uid = uid.clone();
            async move { change.ok().filter(|c| c.uid() == uid) }
        });
        let mut changes = std::pin::pin!(changes);

        while let Some(change) = changes.next().await {
            let json = match serde_json::to_string(&change) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize session change for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("session listener disconnected");
}

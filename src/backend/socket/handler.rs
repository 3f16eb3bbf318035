/**
 * Socket Upgrade Handler
 *
 * `GET /socket` checks the origin, decodes the auth token (when one is sent)
 * and runs the socket middlewares before upgrading. After the upgrade one task
 * drains the session's channel into the socket and another parses incoming
 * frames. Every frame is dispatched on its own task, so a slow handler does
 * not hold up later events from the same client. Handlers that need ordering
 * must coordinate through their own state.
 */

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header::ORIGIN, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::auth::decode_auth_token;
use crate::backend::error::BackendError;
use crate::backend::middleware::cookie::auth_token;
use crate::backend::server::state::AppState;
use crate::backend::socket::server::{Handshake, SocketServer};
use crate::backend::store::Document;
use crate::shared::SocketFrame;

/// Browsers always send `Origin`; other clients may omit it
pub fn origin_allowed(headers: &HeaderMap, allowed: &str) -> bool {
    match headers.get(ORIGIN).and_then(|v| v.to_str().ok()) {
        Some(origin) => allowed == "*" || origin.trim_end_matches('/') == allowed.trim_end_matches('/'),
        None => true,
    }
}

pub async fn socket_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, BackendError> {
    if !origin_allowed(&headers, &state.settings.origin) {
        warn!("Socket origin rejected");
        return Err(BackendError::handler(StatusCode::FORBIDDEN, "Origin not allowed"));
    }

    let user = match auth_token(&headers, state.settings.environment) {
        Some(token) => decode_auth_token(&state.store, &state.settings.secret, &token).await,
        None => None,
    };

    let handshake = Handshake { headers, user };
    if let Err(reason) = state.socket.authorize(&handshake) {
        warn!("Socket connection refused: {}", reason);
        return Err(BackendError::unauthorized());
    }

    let server = state.socket.clone();
    Ok(ws
        .on_upgrade(move |socket| handle_connection(socket, server, handshake.user))
        .into_response())
}

async fn handle_connection(socket: WebSocket, server: SocketServer, user: Option<Document>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<SocketFrame>();
    let session = server.connect(tx, user);
    let session_id = session.id().to_string();
    info!(session = %session_id, "Socket connected");

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match frame.to_text() {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode socket frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let events = Arc::new(server.events());
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => match SocketFrame::parse(text.as_str()) {
                    Ok(frame) => {
                        let events = events.clone();
                        let session = session.clone();
                        tokio::spawn(async move {
                            events.dispatch(frame, session).await;
                        });
                    }
                    Err(e) => debug!(session = %session.id(), "Ignoring malformed frame: {}", e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    server.disconnect(&session_id);
    info!(session = %session_id, "Socket disconnected");
}

//! Websocket transport adapter
//!
//! Each connection gets a fresh ConnId, an outbound channel registered with
//! the hub, and a writer task draining that channel into the socket. The
//! read loop feeds parsed commands to the dispatcher; either half closing
//! tears the connection down.

use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use session::protocol::ClientCommand;
use tracing::debug;
use types::ids::{ConnId, GameCode};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn = ConnId::new();
    let mut rx = state.hub.register(conn);
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    debug!(%conn, "connection accepted");
    let mut joined: Option<GameCode> = None;

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientCommand>(&text) {
                Ok(cmd) => state.dispatcher.handle(conn, &mut joined, cmd).await,
                Err(err) => debug!(%conn, %err, "unparseable frame, dropped"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.dispatcher.disconnect(conn, joined).await;
    writer.abort();
    debug!(%conn, "connection closed");
}

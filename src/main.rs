mod config;
mod lobby;
mod room;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tower_http::services::ServeDir;

use crate::lobby::{Lobby, OutboundTx};
use crate::types::{ClientMsg, ServerMsg};

#[derive(Clone)]
struct AppState {
    lobby: Arc<Mutex<Lobby>>,
    conns: Arc<DashMap<String, OutboundTx>>,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut receiver) = socket.split();

    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!("WebSocket connected: {}", conn_id);

    // Outbound messages are queued here and drained by the writer task, so
    // lobby handlers never await socket delivery.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMsg>();
    state.conns.insert(conn_id.clone(), tx);

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if sink.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else { continue };

        let client_msg: ClientMsg = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Invalid message from {}: {}", conn_id, e);
                continue;
            }
        };

        state.lobby.lock().await.handle(&conn_id, client_msg);
    }

    tracing::info!("WebSocket disconnected: {}", conn_id);
    state.lobby.lock().await.disconnect(&conn_id);
    writer.abort();
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    config::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .expect("Invalid PORT");

    let credentials = config::load_credentials();
    tracing::info!("Loaded {} credentials", credentials.len());

    let conns: Arc<DashMap<String, OutboundTx>> = Arc::new(DashMap::new());
    let lobby = Arc::new(Mutex::new(Lobby::new(credentials, conns.clone())));

    let state = AppState { lobby, conns };

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new("static"))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind");

    tracing::info!("Matchpoint server running on port {}", port);

    axum::serve(listener, app).await.unwrap();
}

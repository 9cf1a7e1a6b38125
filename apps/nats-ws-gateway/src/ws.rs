use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use gw_registry::ClientHandle;
use gw_session::SessionHandler;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn websocket_handler(State(state): State<AppState>, ConnectInfo(addr): ConnectInfo<SocketAddr>, ws: WebSocketUpgrade) -> impl IntoResponse {
	ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: AppState) {
	let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(64);
	let client = ClientHandle::new(addr, outbound_tx);

	let handler = Arc::new(SessionHandler::new(state.registry.clone(), state.bus.clone(), state.heartbeat.clone(), state.heartbeat_event_name.clone(), client.clone()));

	tracing::info!(client = %client, "connection accepted");

	let (mut sink, mut stream) = socket.split();

	// A single writer per connection so frames reach the client in the
	// order they were produced, whether they originate from fan-out or
	// from an error reply to the client's own frame.
	let mut send_task = tokio::spawn(async move {
		while let Some(frame) = outbound_rx.recv().await {
			if sink.send(Message::Text(frame)).await.is_err() {
				break;
			}
		}
	});

	let recv_handler = handler.clone();
	let recv_label = client.label();
	let mut recv_task = tokio::spawn(async move {
		while let Some(message) = stream.next().await {
			let message = match message {
				Ok(message) => message,
				Err(err) => {
					tracing::debug!(client = recv_label.as_str(), error = %err, "read error, closing connection");
					break;
				}
			};

			match message {
				Message::Text(text) => {
					if let Some(error_frame) = recv_handler.handle_frame(&text).await {
						if recv_handler.client().enqueue(error_frame.to_json()).await.is_err() {
							break;
						}
					}
				}
				Message::Close(_) => break,
				Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
			}
		}
	});

	tokio::select! {
		_ = &mut send_task => recv_task.abort(),
		_ = &mut recv_task => send_task.abort(),
	}

	handler.disconnect().await;
	tracing::info!(client = %client, "connection closed");
}

#![allow(dead_code)]

use futures_util::{stream::SplitStream, SinkExt, StreamExt};
use live_update::{ClientEvent, ConnectionState, ConnectionStats, LiveUpdateClient};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

/// Upper bound for anything that is expected to happen
pub const WAIT: Duration = Duration::from_secs(5);

enum ServerAction {
	Text(String),
	Binary(Vec<u8>),
	/// Reports whether the client answered the close frame
	Close(Option<oneshot::Sender<bool>>),
}

/// In-process live endpoint. Each accepted WebSocket shows up as a [`ServerConnection`].
pub struct TestServer {
	addr: SocketAddr,
	connections: mpsc::UnboundedReceiver<ServerConnection>,
}

impl TestServer {
	pub async fn start() -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let (tx, connections) = mpsc::unbounded_channel();

		tokio::spawn(async move {
			while let Ok((stream, _)) = listener.accept().await {
				let tx = tx.clone();
				tokio::spawn(async move {
					let Ok(ws) = accept_async(stream).await else {
						return;
					};
					let (texts_tx, texts) = mpsc::unbounded_channel();
					let (actions, actions_rx) = mpsc::unbounded_channel();
					if tx.send(ServerConnection { texts, actions }).is_ok() {
						serve(ws, texts_tx, actions_rx).await;
					}
				});
			}
		});

		Self { addr, connections }
	}

	pub fn url(&self) -> String {
		format!("ws://{}/ws/live", self.addr)
	}

	pub async fn next_connection(&mut self, within: Duration) -> Option<ServerConnection> {
		timeout(within, self.connections.recv()).await.ok().flatten()
	}
}

async fn serve(ws: WebSocketStream<TcpStream>, texts: mpsc::UnboundedSender<String>, mut actions: mpsc::UnboundedReceiver<ServerAction>) {
	let (mut sink, mut stream) = ws.split();

	loop {
		tokio::select! {
			action = actions.recv() => match action {
				Some(ServerAction::Text(text)) => {
					if sink.send(Message::Text(text.into())).await.is_err() {
						break;
					}
				}
				Some(ServerAction::Binary(payload)) => {
					if sink.send(Message::Binary(payload.into())).await.is_err() {
						break;
					}
				}
				Some(ServerAction::Close(ack)) => {
					let _ = sink.send(Message::Close(None)).await;
					let answered = matches!(timeout(WAIT, close_reply(&mut stream)).await, Ok(true));
					if let Some(ack) = ack {
						let _ = ack.send(answered);
					}
					break;
				}
				None => {
					let _ = sink.send(Message::Close(None)).await;
					break;
				}
			},
			frame = stream.next() => match frame {
				Some(Ok(Message::Text(text))) => {
					let _ = texts.send(text.as_str().to_string());
				}
				Some(Ok(Message::Close(_)) | Err(_)) | None => break,
				Some(Ok(_)) => {}
			},
		}
	}
}

async fn close_reply(stream: &mut SplitStream<WebSocketStream<TcpStream>>) -> bool {
	loop {
		match stream.next().await {
			Some(Ok(Message::Close(_))) => return true,
			Some(Ok(_)) => {}
			Some(Err(_)) | None => return false,
		}
	}
}

/// Server side of one accepted connection. Dropping it closes the connection.
pub struct ServerConnection {
	texts: mpsc::UnboundedReceiver<String>,
	actions: mpsc::UnboundedSender<ServerAction>,
}

impl ServerConnection {
	pub fn send_text(&self, text: &str) {
		let _ = self.actions.send(ServerAction::Text(text.to_string()));
	}

	pub fn send_binary(&self, payload: Vec<u8>) {
		let _ = self.actions.send(ServerAction::Binary(payload));
	}

	pub fn close(self) {
		let _ = self.actions.send(ServerAction::Close(None));
	}

	/// Close from the server side and wait for the client's close reply
	pub async fn close_and_confirm(self) -> bool {
		let (ack, answered) = oneshot::channel();
		let _ = self.actions.send(ServerAction::Close(Some(ack)));
		answered.await.unwrap_or(false)
	}

	/// Resolves once the client has closed or dropped this connection
	pub async fn closed_by_client(&mut self, within: Duration) -> bool {
		let deadline = Instant::now() + within;
		loop {
			match tokio::time::timeout_at(deadline, self.texts.recv()).await {
				Ok(Some(_)) => {}
				Ok(None) => return true,
				Err(_) => return false,
			}
		}
	}

	pub async fn next_text(&mut self, within: Duration) -> Option<String> {
		timeout(within, self.texts.recv()).await.ok().flatten()
	}

	/// Every text frame the client sends during `window`
	pub async fn collect_texts(&mut self, window: Duration) -> Vec<String> {
		let deadline = Instant::now() + window;
		let mut texts = Vec::new();
		while let Ok(Some(text)) = tokio::time::timeout_at(deadline, self.texts.recv()).await {
			texts.push(text);
		}
		texts
	}
}

/// Accepts TCP but never answers the WebSocket handshake, so opens stay in flight
pub struct SilentServer {
	addr: SocketAddr,
}

impl SilentServer {
	pub async fn start() -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		tokio::spawn(async move {
			let mut held = Vec::new();
			while let Ok((stream, _)) = listener.accept().await {
				held.push(stream);
			}
		});

		Self { addr }
	}

	pub fn url(&self) -> String {
		format!("ws://{}/ws/live", self.addr)
	}
}

/// Completes the handshake, then never reads again, so the client's writes back up
pub struct StalledServer {
	addr: SocketAddr,
}

impl StalledServer {
	pub async fn start() -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		tokio::spawn(async move {
			let mut held = Vec::new();
			while let Ok((stream, _)) = listener.accept().await {
				if let Ok(ws) = accept_async(stream).await {
					held.push(ws);
				}
			}
		});

		Self { addr }
	}

	pub fn url(&self) -> String {
		format!("ws://{}/ws/live", self.addr)
	}
}

/// URL of a port nothing listens on
pub async fn closed_port_url() -> String {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);
	format!("ws://{addr}/ws/live")
}

pub async fn next_event(events: &mut mpsc::UnboundedReceiver<ClientEvent>) -> Option<ClientEvent> {
	timeout(WAIT, events.recv()).await.ok().flatten()
}

/// Events that arrive during `window`
pub async fn drain_events(events: &mut mpsc::UnboundedReceiver<ClientEvent>, window: Duration) -> Vec<ClientEvent> {
	let deadline = Instant::now() + window;
	let mut seen = Vec::new();
	while let Ok(Some(event)) = tokio::time::timeout_at(deadline, events.recv()).await {
		seen.push(event);
	}
	seen
}

pub async fn wait_for_state<F>(client: &LiveUpdateClient, predicate: F) -> bool
where
	F: FnMut(&ConnectionState) -> bool,
{
	let mut states = client.state_changes();
	let reached = matches!(timeout(WAIT, states.wait_for(predicate)).await, Ok(Ok(_)));
	reached
}

pub async fn wait_for_stats<F>(client: &LiveUpdateClient, predicate: F) -> bool
where
	F: Fn(&ConnectionStats) -> bool,
{
	let deadline = Instant::now() + WAIT;
	loop {
		if predicate(&client.stats().await.unwrap()) {
			return true;
		}
		if Instant::now() >= deadline {
			return false;
		}
		sleep(Duration::from_millis(20)).await;
	}
}

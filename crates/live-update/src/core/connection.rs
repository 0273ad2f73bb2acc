use super::{ClientCommand, ConnectionState, ConnectionStats, HeartbeatTimer, LiveUpdateHandler, ReconnectTimer, StateTransition, SubscriptionSet};
use crate::config::LiveUpdateConfig;
use crate::messages::LiveMessage;
use futures_util::{future::BoxFuture, sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::{
	net::TcpStream,
	sync::{mpsc, watch},
	time::Instant,
};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, instrument, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingOpen = BoxFuture<'static, Result<WsStream, ConnectionError>>;

/// Longest slice of a rejected payload that ends up in the logs
const LOGGED_PAYLOAD_CHARS: usize = 200;

/// Connection-specific error types
#[derive(Error, Debug)]
pub enum ConnectionError {
	#[error("Failed to connect to WebSocket: {0}")]
	WebSocketConnection(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("Connection timeout after {timeout_ms}ms")]
	Timeout { timeout_ms: u128 },
}

/// Owns the transport, both timers and the handler. All state changes happen on this task.
pub(crate) struct ConnectionActor<H: LiveUpdateHandler> {
	config: Arc<LiveUpdateConfig>,
	state: ConnectionState,
	state_tx: watch::Sender<ConnectionState>,
	transport: Option<WsStream>,
	pending_open: Option<PendingOpen>,
	reconnect: ReconnectTimer,
	heartbeat: HeartbeatTimer,
	subscriptions: SubscriptionSet,
	handler: H,
	commands: mpsc::Receiver<ClientCommand>,
	last_message: Option<LiveMessage>,
	last_activity: Instant,
	/// The in-flight open was started by the reconnect timer
	retrying: bool,
	stats: ConnectionStats,
}

impl<H: LiveUpdateHandler> ConnectionActor<H> {
	pub(crate) fn new(config: Arc<LiveUpdateConfig>, handler: H, commands: mpsc::Receiver<ClientCommand>, state_tx: watch::Sender<ConnectionState>) -> Self {
		Self {
			config,
			state: ConnectionState::Disconnected,
			state_tx,
			transport: None,
			pending_open: None,
			reconnect: ReconnectTimer::default(),
			heartbeat: HeartbeatTimer::default(),
			subscriptions: SubscriptionSet::default(),
			handler,
			commands,
			last_message: None,
			last_activity: Instant::now(),
			retrying: false,
			stats: ConnectionStats::default(),
		}
	}

	/// Run the actor event loop until shutdown or until every handle is dropped
	#[instrument(name = "live_update", skip(self), fields(url = %self.config.url))]
	pub(crate) async fn run(mut self) {
		debug!("connection task started");

		loop {
			tokio::select! {
				biased;

				command = self.commands.recv() => match command {
					Some(ClientCommand::Shutdown { reply }) => {
						self.disconnect().await;
						let _ = reply.send(());
						break;
					}
					Some(command) => self.handle_command(command).await,
					None => {
						debug!("all client handles dropped");
						self.disconnect().await;
						break;
					}
				},
				opened = poll_open(&mut self.pending_open) => self.on_open_result(opened).await,
				frame = next_frame(&mut self.transport) => self.on_frame(frame).await,
				() = self.heartbeat.tick() => self.on_heartbeat().await,
				() = self.reconnect.elapsed() => self.on_reconnect_timer(),
			}
		}

		debug!("connection task stopped");
	}

	async fn handle_command(&mut self, command: ClientCommand) {
		match command {
			ClientCommand::Connect => self.start_connecting(false),
			ClientCommand::Disconnect { reply } => {
				self.disconnect().await;
				let _ = reply.send(());
			}
			ClientCommand::Subscribe { topic } => self.subscribe(topic).await,
			ClientCommand::Unsubscribe { topic } => self.unsubscribe(topic).await,
			ClientCommand::Send { message } => {
				self.send_if_open(&message).await;
			}
			ClientCommand::GetState { reply } => {
				let _ = reply.send(self.state);
			}
			ClientCommand::GetLastMessage { reply } => {
				let _ = reply.send(self.last_message.clone());
			}
			ClientCommand::GetStats { reply } => {
				let _ = reply.send(self.stats);
			}
			// Handled by the run loop
			ClientCommand::Shutdown { reply } => {
				let _ = reply.send(());
			}
		}
	}

	fn apply(&mut self, transition: StateTransition) -> bool {
		match self.state.next(transition) {
			Ok(next) => {
				trace!(from = self.state.name(), to = next.name(), "state transition");
				self.state = next;
				self.state_tx.send_replace(next);
				true
			}
			Err(e) => {
				error!(error = %e, "rejected state transition");
				false
			}
		}
	}

	/// Suppressed while a transport is open or being opened
	fn start_connecting(&mut self, retrying: bool) {
		if self.transport.is_some() || self.pending_open.is_some() {
			debug!(state = self.state.name(), "connect ignored, connection already open or opening");
			return;
		}

		self.reconnect.cancel();
		if !self.apply(StateTransition::StartConnecting) {
			return;
		}

		info!(retrying, "opening live-update connection");
		self.retrying = retrying;
		self.pending_open = Some(open_transport(self.config.url.clone(), self.config.connect_timeout));
	}

	async fn on_open_result(&mut self, result: Result<WsStream, ConnectionError>) {
		self.pending_open = None;

		match result {
			Ok(stream) => {
				if !self.apply(StateTransition::ConnectionEstablished) {
					return;
				}
				self.transport = Some(stream);

				self.last_activity = Instant::now();
				self.heartbeat.start(self.config.heartbeat_interval);
				self.stats.connects += 1;
				info!("live-update connection established");
				self.handler.on_connect();

				if self.config.resubscribe_on_reconnect && !self.subscriptions.is_empty() {
					self.replay_subscriptions().await;
				}
			}
			Err(e) => {
				self.stats.open_failures += 1;
				if self.retrying {
					warn!(error = %e, attempt = self.stats.reconnect_attempts, "reconnect failed, auto-reconnect stopped until connect() is called");
				} else {
					error!(error = %e, "failed to open live-update connection");
				}
				self.apply(StateTransition::ConnectionFailed);
			}
		}
	}

	async fn replay_subscriptions(&mut self) {
		debug!(count = self.subscriptions.len(), "re-issuing subscriptions");

		let topics = self.subscriptions.topics().to_vec();
		for topic in topics {
			self.send_if_open(&LiveMessage::subscribe(topic)).await;
		}
	}

	async fn on_frame(&mut self, frame: Option<Result<TungsteniteMessage, tokio_tungstenite::tungstenite::Error>>) {
		match frame {
			Some(Ok(TungsteniteMessage::Text(text))) => {
				self.last_activity = Instant::now();
				self.dispatch(text.as_str());
			}
			Some(Ok(TungsteniteMessage::Binary(payload))) => {
				self.last_activity = Instant::now();
				self.stats.malformed_dropped += 1;
				warn!(len = payload.len(), "dropping binary frame, expected JSON text");
			}
			Some(Ok(TungsteniteMessage::Ping(_) | TungsteniteMessage::Pong(_))) => {
				self.last_activity = Instant::now();
			}
			Some(Ok(TungsteniteMessage::Close(close_frame))) => {
				info!(?close_frame, "close frame received");
				// flushes the queued close reply so the peer sees a completed handshake
				if let Some(stream) = self.transport.take() {
					close_transport(stream, self.config.close_timeout).await;
				}
				self.on_transport_closed();
			}
			Some(Ok(TungsteniteMessage::Frame(_))) => {}
			Some(Err(e)) => {
				// tungstenite ends the stream after an error, so this is the close as well
				error!(error = %e, "live-update transport error");
				self.on_transport_closed();
			}
			None => {
				info!("live-update stream ended");
				self.on_transport_closed();
			}
		}
	}

	fn dispatch(&mut self, text: &str) {
		match LiveMessage::parse(text) {
			Ok(message) => {
				self.stats.messages_received += 1;
				trace!(kind = %message.kind, topic = ?message.topic, "message received");
				self.last_message = Some(message.clone());
				self.handler.on_message(message);
			}
			Err(e) => {
				self.stats.malformed_dropped += 1;
				let payload: String = text.chars().take(LOGGED_PAYLOAD_CHARS).collect();
				warn!(error = %e, %payload, "dropping malformed live-update payload");
			}
		}
	}

	fn on_transport_closed(&mut self) {
		self.transport = None;
		self.heartbeat.stop();
		let uptime_ms = self.state.uptime().map(|uptime| uptime.as_millis());

		let reconnect_after = self.config.auto_reconnect.then_some(self.config.reconnect_interval);
		if !self.apply(StateTransition::ConnectionClosed { reconnect_after }) {
			return;
		}

		if let Some(delay) = reconnect_after {
			self.reconnect.schedule(delay);
			info!(delay_ms = delay.as_millis(), ?uptime_ms, "connection closed, reconnect scheduled");
		} else {
			info!(?uptime_ms, "connection closed, auto-reconnect disabled");
		}

		self.handler.on_disconnect();
	}

	async fn on_heartbeat(&mut self) {
		if !self.state.is_connected() {
			return;
		}

		if let Some(idle_timeout) = self.config.idle_timeout {
			if self.last_activity.elapsed() > idle_timeout {
				warn!(idle_ms = self.last_activity.elapsed().as_millis(), "connection appears dead, closing");
				if let Some(stream) = self.transport.take() {
					close_transport(stream, self.config.close_timeout).await;
				}
				self.on_transport_closed();
				return;
			}
		}

		if self.send_if_open(&LiveMessage::ping()).await {
			self.stats.heartbeats_sent += 1;
			trace!("heartbeat sent");
		}
	}

	fn on_reconnect_timer(&mut self) {
		if !self.state.is_reconnect_pending() {
			return;
		}

		self.stats.reconnect_attempts += 1;
		debug!(attempt = self.stats.reconnect_attempts, "reconnect timer elapsed");
		self.start_connecting(true);
	}

	async fn subscribe(&mut self, topic: String) {
		let sent = self.send_if_open(&LiveMessage::subscribe(topic.as_str())).await;
		if sent && self.config.resubscribe_on_reconnect {
			self.subscriptions.insert(&topic);
		}
	}

	async fn unsubscribe(&mut self, topic: String) {
		self.send_if_open(&LiveMessage::unsubscribe(topic.as_str())).await;
		if self.config.resubscribe_on_reconnect {
			self.subscriptions.remove(&topic);
		}
	}

	/// Writes one text frame if the transport is open. Dropped silently otherwise.
	///
	/// A write that fails or outlasts `send_timeout` closes the transport.
	async fn send_if_open(&mut self, message: &LiveMessage) -> bool {
		let Some(stream) = self.transport.as_mut() else {
			trace!(kind = %message.kind, "connection not open, dropping outbound message");
			return false;
		};

		let text = match message.to_text() {
			Ok(text) => text,
			Err(e) => {
				error!(error = %e, kind = %message.kind, "failed to encode outbound message");
				return false;
			}
		};

		let send_timeout = self.config.send_timeout;
		let sent = tokio::time::timeout(send_timeout, stream.send(TungsteniteMessage::Text(text.into()))).await;
		match sent {
			Ok(Ok(())) => {
				self.stats.messages_sent += 1;
				true
			}
			Ok(Err(e)) => {
				error!(error = %e, kind = %message.kind, "failed to send live-update message, closing transport");
				self.on_transport_closed();
				false
			}
			Err(_) => {
				warn!(timeout_ms = send_timeout.as_millis(), kind = %message.kind, "peer stopped reading, closing transport");
				self.on_transport_closed();
				false
			}
		}
	}

	/// Cancels both timers and any in-flight open, then closes the transport
	async fn disconnect(&mut self) {
		let cancelled_retry = self.reconnect.cancel();
		self.heartbeat.stop();
		let cancelled_open = self.pending_open.take().is_some();
		let was_connected = self.state.is_connected();
		let uptime_ms = self.state.uptime().map(|uptime| uptime.as_millis());

		if let Some(stream) = self.transport.take() {
			close_transport(stream, self.config.close_timeout).await;
		}

		if !self.state.is_disconnected() {
			self.apply(StateTransition::Reset);
			info!(cancelled_retry, cancelled_open, ?uptime_ms, "live-update connection disconnected");
		}

		if was_connected {
			self.handler.on_disconnect();
		}
	}
}

fn open_transport(url: String, connect_timeout: Duration) -> PendingOpen {
	Box::pin(async move {
		match tokio::time::timeout(connect_timeout, connect_async(url)).await {
			Ok(Ok((stream, _response))) => Ok(stream),
			Ok(Err(e)) => Err(ConnectionError::WebSocketConnection(e)),
			Err(_) => Err(ConnectionError::Timeout {
				timeout_ms: connect_timeout.as_millis(),
			}),
		}
	})
}

async fn close_transport(mut stream: WsStream, close_timeout: Duration) {
	// poll_close also flushes a close reply queued after the peer closed first
	match tokio::time::timeout(close_timeout, SinkExt::close(&mut stream)).await {
		Ok(Ok(())) => trace!("close frame sent"),
		Ok(Err(e)) => debug!(error = %e, "error while closing transport"),
		Err(_) => warn!(timeout_ms = close_timeout.as_millis(), "timed out closing transport"),
	}
}

async fn poll_open(pending: &mut Option<PendingOpen>) -> Result<WsStream, ConnectionError> {
	match pending.as_mut() {
		Some(open) => open.await,
		None => std::future::pending().await,
	}
}

async fn next_frame(transport: &mut Option<WsStream>) -> Option<Result<TungsteniteMessage, tokio_tungstenite::tungstenite::Error>> {
	match transport.as_mut() {
		Some(stream) => stream.next().await,
		None => std::future::pending().await,
	}
}

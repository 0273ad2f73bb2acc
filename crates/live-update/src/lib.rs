// live-update Library
//
// Client for the cycling-stats live endpoint: one persistent WebSocket with
// automatic reconnect, keep-alive pings, topic subscription, and ordered
// delivery of decoded messages to a single handler.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

mod config;
mod core;
mod messages;

use self::core::{ClientCommand, ConnectionActor};

pub use config::{ConfigError, LiveUpdateConfig, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_RECONNECT_INTERVAL, DEFAULT_SEND_TIMEOUT, DEFAULT_URL};
pub use self::core::{Callbacks, ChannelHandler, ClientEvent, ConnectionError, ConnectionState, ConnectionStats, LiveUpdateHandler, StateError};
pub use messages::{LiveMessage, MessageError, MessageType, ServerEvent};

/// Errors for live-update crate
#[derive(Debug, Error)]
pub enum LiveUpdateError {
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("Connection error: {0}")]
	Connection(#[from] ConnectionError),

	#[error("State error: {0}")]
	State(#[from] StateError),

	#[error("Message error: {0}")]
	Message(#[from] MessageError),

	#[error("Live-update connection task unavailable")]
	ActorUnavailable,
}

pub type Result<T> = std::result::Result<T, LiveUpdateError>;

/// Cloneable handle to the connection task.
///
/// The task keeps running until [`LiveUpdateClient::shutdown`] is called or every
/// handle has been dropped; either way it disconnects first.
#[derive(Debug, Clone)]
pub struct LiveUpdateClient {
	sender: mpsc::Sender<ClientCommand>,
	state_rx: watch::Receiver<ConnectionState>,
	config: Arc<LiveUpdateConfig>,
}

impl LiveUpdateClient {
	/// Validate the config and spawn the connection task. Does not connect.
	///
	/// Must be called from within a tokio runtime.
	///
	/// # Errors
	/// Returns [`LiveUpdateError::Config`] if the configuration is invalid.
	pub fn spawn<H: LiveUpdateHandler>(config: LiveUpdateConfig, handler: H) -> Result<Self> {
		config.validate()?;

		let config = Arc::new(config);
		let (sender, receiver) = mpsc::channel(config.command_buffer);
		let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

		let actor = ConnectionActor::new(config.clone(), handler, receiver, state_tx);
		tokio::spawn(actor.run());

		Ok(Self { sender, state_rx, config })
	}

	pub fn builder(config: LiveUpdateConfig) -> LiveUpdateClientBuilder {
		LiveUpdateClientBuilder {
			config,
			callbacks: Callbacks::default(),
		}
	}

	pub fn config(&self) -> &LiveUpdateConfig {
		&self.config
	}

	/// Open the connection unless one is already open or opening
	///
	/// # Errors
	/// Returns [`LiveUpdateError::ActorUnavailable`] if the connection task has stopped.
	pub async fn connect(&self) -> Result<()> {
		self.command(ClientCommand::Connect).await
	}

	/// Cancel both timers and close the transport. No handler call happens after this returns.
	///
	/// # Errors
	/// Returns [`LiveUpdateError::ActorUnavailable`] if the connection task has stopped.
	pub async fn disconnect(&self) -> Result<()> {
		self.request(|reply| ClientCommand::Disconnect { reply }).await
	}

	/// Send `{"type":"subscribe","topic":..}` if connected, otherwise drop it
	///
	/// # Errors
	/// Returns [`LiveUpdateError::ActorUnavailable`] if the connection task has stopped.
	pub async fn subscribe(&self, topic: impl Into<String>) -> Result<()> {
		self.command(ClientCommand::Subscribe { topic: topic.into() }).await
	}

	/// # Errors
	/// Returns [`LiveUpdateError::ActorUnavailable`] if the connection task has stopped.
	pub async fn unsubscribe(&self, topic: impl Into<String>) -> Result<()> {
		self.command(ClientCommand::Unsubscribe { topic: topic.into() }).await
	}

	/// Send an arbitrary message if connected, otherwise drop it
	///
	/// # Errors
	/// Returns [`LiveUpdateError::ActorUnavailable`] if the connection task has stopped.
	pub async fn send(&self, message: LiveMessage) -> Result<()> {
		self.command(ClientCommand::Send { message }).await
	}

	/// # Errors
	/// Returns [`LiveUpdateError::ActorUnavailable`] if the connection task has stopped.
	pub async fn state(&self) -> Result<ConnectionState> {
		self.request(|reply| ClientCommand::GetState { reply }).await
	}

	/// # Errors
	/// Returns [`LiveUpdateError::ActorUnavailable`] if the connection task has stopped.
	pub async fn is_connected(&self) -> Result<bool> {
		Ok(self.state().await?.is_connected())
	}

	/// Most recently delivered message, if any
	///
	/// # Errors
	/// Returns [`LiveUpdateError::ActorUnavailable`] if the connection task has stopped.
	pub async fn last_message(&self) -> Result<Option<LiveMessage>> {
		self.request(|reply| ClientCommand::GetLastMessage { reply }).await
	}

	/// # Errors
	/// Returns [`LiveUpdateError::ActorUnavailable`] if the connection task has stopped.
	pub async fn stats(&self) -> Result<ConnectionStats> {
		self.request(|reply| ClientCommand::GetStats { reply }).await
	}

	/// Receiver that observes every state transition
	pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
		self.state_rx.clone()
	}

	/// Disconnect and stop the connection task
	///
	/// # Errors
	/// Returns [`LiveUpdateError::ActorUnavailable`] if the connection task had already stopped.
	pub async fn shutdown(&self) -> Result<()> {
		self.request(|reply| ClientCommand::Shutdown { reply }).await
	}

	async fn command(&self, command: ClientCommand) -> Result<()> {
		self.sender.send(command).await.map_err(|_| LiveUpdateError::ActorUnavailable)
	}

	async fn request<T, F>(&self, build: F) -> Result<T>
	where
		F: FnOnce(oneshot::Sender<T>) -> ClientCommand,
	{
		let (tx, rx) = oneshot::channel();
		self.command(build(tx)).await?;
		rx.await.map_err(|_| LiveUpdateError::ActorUnavailable)
	}
}

/// Registers closures instead of a [`LiveUpdateHandler`] implementation
pub struct LiveUpdateClientBuilder {
	config: LiveUpdateConfig,
	callbacks: Callbacks,
}

impl LiveUpdateClientBuilder {
	#[must_use]
	pub fn on_message<F>(mut self, callback: F) -> Self
	where
		F: FnMut(LiveMessage) + Send + 'static,
	{
		self.callbacks.on_message = Some(Box::new(callback));
		self
	}

	#[must_use]
	pub fn on_connect<F>(mut self, callback: F) -> Self
	where
		F: FnMut() + Send + 'static,
	{
		self.callbacks.on_connect = Some(Box::new(callback));
		self
	}

	#[must_use]
	pub fn on_disconnect<F>(mut self, callback: F) -> Self
	where
		F: FnMut() + Send + 'static,
	{
		self.callbacks.on_disconnect = Some(Box::new(callback));
		self
	}

	/// # Errors
	/// Returns [`LiveUpdateError::Config`] if the configuration is invalid.
	pub fn spawn(self) -> Result<LiveUpdateClient> {
		LiveUpdateClient::spawn(self.config, self.callbacks)
	}
}

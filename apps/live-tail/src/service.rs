use crate::{Config, Result};
use live_update::{ChannelHandler, ClientEvent, LiveMessage, LiveUpdateClient, ServerEvent};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

/// Tracks the rankings reloads a `ranking_update` push asks for
#[derive(Debug, Default, Clone)]
pub struct RankingsRefresh {
	count: u64,
	last: Option<Instant>,
}

impl RankingsRefresh {
	/// Record one refresh and return the running total
	pub fn trigger(&mut self) -> u64 {
		self.count += 1;
		self.last = Some(Instant::now());
		self.count
	}

	pub const fn count(&self) -> u64 {
		self.count
	}

	pub const fn last(&self) -> Option<Instant> {
		self.last
	}
}

/// Follows the live feed until cancelled
pub struct LiveTailService {
	config: Config,
	client: LiveUpdateClient,
	events: mpsc::UnboundedReceiver<ClientEvent>,
	refresh: RankingsRefresh,
	cancel_token: CancellationToken,
}

impl LiveTailService {
	/// Spawn the live-update client. Nothing connects until [`LiveTailService::run`].
	///
	/// # Errors
	/// Fails when the configured endpoint or intervals are invalid.
	pub fn new(config: Config) -> Result<Self> {
		let (handler, events) = ChannelHandler::new();
		let client = LiveUpdateClient::spawn(config.live_update(), handler)?;

		Ok(Self {
			config,
			client,
			events,
			refresh: RankingsRefresh::default(),
			cancel_token: CancellationToken::new(),
		})
	}

	pub fn cancel_token(&self) -> CancellationToken {
		self.cancel_token.clone()
	}

	pub const fn client(&self) -> &LiveUpdateClient {
		&self.client
	}

	/// Connect and handle events until the token is cancelled. Returns the number of rankings refreshes.
	///
	/// # Errors
	/// Fails if the client task stops underneath the service.
	pub async fn run(mut self) -> Result<u64> {
		info!(url = %self.client.config().url, topics = ?self.config.topics, "🚀 Following live feed");
		self.client.connect().await?;

		loop {
			tokio::select! {
				() = self.cancel_token.cancelled() => {
					info!("🔄 Initiating graceful shutdown...");
					break;
				}
				event = self.events.recv() => match event {
					Some(event) => self.handle_event(event).await?,
					None => break,
				},
			}
		}

		let stats = self.client.stats().await?;
		self.client.shutdown().await?;
		info!(
			refreshes = self.refresh.count(),
			connects = stats.connects,
			reconnects = stats.reconnect_attempts,
			received = stats.messages_received,
			dropped = stats.malformed_dropped,
			"✅ live-tail stopped"
		);
		Ok(self.refresh.count())
	}

	async fn handle_event(&mut self, event: ClientEvent) -> Result<()> {
		match event {
			ClientEvent::Connected => {
				info!("✅ Connected to live feed");
				// subscriptions do not survive a reconnect
				for topic in &self.config.topics {
					self.client.subscribe(topic.as_str()).await?;
				}
			}
			ClientEvent::Message(message) => self.handle_message(&message),
			ClientEvent::Disconnected => warn!("💔 Live feed disconnected"),
		}
		Ok(())
	}

	fn handle_message(&mut self, message: &LiveMessage) {
		match message.event() {
			ServerEvent::RankingUpdate => {
				let since_last_ms = self.refresh.last().map(|last| last.elapsed().as_millis());
				let total = self.refresh.trigger();
				info!(total, ?since_last_ms,"🏆 Rankings changed, refreshing");
			}
			ServerEvent::Subscribed(topic) => info!(topic = topic.unwrap_or_default(), "subscribed"),
			ServerEvent::Unsubscribed(topic) => info!(topic = topic.unwrap_or_default(), "unsubscribed"),
			ServerEvent::Pong => trace!("pong"),
			ServerEvent::Other(kind) => {
				let data = message.data.as_ref().map(Value::to_string).unwrap_or_default();
				info!(kind, topic = message.topic.as_deref().unwrap_or_default(), %data, "live message");
			}
		}
	}
}

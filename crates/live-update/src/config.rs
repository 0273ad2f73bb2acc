use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

/// Live endpoint exposed by the stats backend
pub const DEFAULT_URL: &str = "ws://localhost:8000/ws/live";
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30000);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_COMMAND_BUFFER: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
	#[error("Unsupported endpoint scheme in {url:?}, expected ws:// or wss://")]
	UnsupportedScheme { url: String },

	#[error("Invalid endpoint {url:?}: {reason}")]
	InvalidUrl { url: String, reason: String },

	#[error("{field} must be greater than zero")]
	ZeroValue { field: &'static str },

	#[error("Invalid value {value:?} for {var}")]
	InvalidEnv { var: &'static str, value: String },
}

/// Connection settings, resolved once when the client is spawned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveUpdateConfig {
	/// `ws://` or `wss://` endpoint
	pub url: String,
	/// Schedule a reconnect after the transport closes
	pub auto_reconnect: bool,
	pub reconnect_interval: Duration,
	/// Period of the `ping` keep-alive while connected
	pub heartbeat_interval: Duration,
	pub connect_timeout: Duration,
	/// Upper bound on sending the close frame during `disconnect()`
	pub close_timeout: Duration,
	/// Upper bound on writing one outbound frame. A write that takes longer closes the transport.
	pub send_timeout: Duration,
	/// Close the transport when nothing arrives for this long. Disabled when `None`.
	pub idle_timeout: Option<Duration>,
	/// Re-send `subscribe` for every remembered topic after a reconnect
	pub resubscribe_on_reconnect: bool,
	/// Capacity of the command channel between handles and the connection task
	pub command_buffer: usize,
}

impl Default for LiveUpdateConfig {
	fn default() -> Self {
		Self::new(DEFAULT_URL)
	}
}

impl LiveUpdateConfig {
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			auto_reconnect: true,
			reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
			heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			close_timeout: DEFAULT_CLOSE_TIMEOUT,
			send_timeout: DEFAULT_SEND_TIMEOUT,
			idle_timeout: None,
			resubscribe_on_reconnect: false,
			command_buffer: DEFAULT_COMMAND_BUFFER,
		}
	}

	/// Load configuration from environment variables with sensible defaults
	///
	/// # Errors
	/// Returns [`ConfigError::InvalidEnv`] when a variable is set but cannot be parsed.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::new(lookup("LIVE_UPDATE_URL").unwrap_or_else(|| DEFAULT_URL.to_string()));

		if let Some(value) = lookup("LIVE_UPDATE_AUTO_RECONNECT") {
			config.auto_reconnect = parse_env("LIVE_UPDATE_AUTO_RECONNECT", &value)?;
		}
		if let Some(value) = lookup("LIVE_UPDATE_RECONNECT_INTERVAL_MS") {
			config.reconnect_interval = Duration::from_millis(parse_env("LIVE_UPDATE_RECONNECT_INTERVAL_MS", &value)?);
		}
		if let Some(value) = lookup("LIVE_UPDATE_HEARTBEAT_INTERVAL_MS") {
			config.heartbeat_interval = Duration::from_millis(parse_env("LIVE_UPDATE_HEARTBEAT_INTERVAL_MS", &value)?);
		}
		if let Some(value) = lookup("LIVE_UPDATE_CONNECT_TIMEOUT_MS") {
			config.connect_timeout = Duration::from_millis(parse_env("LIVE_UPDATE_CONNECT_TIMEOUT_MS", &value)?);
		}
		if let Some(value) = lookup("LIVE_UPDATE_SEND_TIMEOUT_MS") {
			config.send_timeout = Duration::from_millis(parse_env("LIVE_UPDATE_SEND_TIMEOUT_MS", &value)?);
		}

		Ok(config)
	}

	#[must_use]
	pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
		self.auto_reconnect = enabled;
		self
	}

	#[must_use]
	pub const fn with_reconnect_interval(mut self, interval: Duration) -> Self {
		self.reconnect_interval = interval;
		self
	}

	#[must_use]
	pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
		self.heartbeat_interval = interval;
		self
	}

	#[must_use]
	pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = timeout;
		self
	}

	#[must_use]
	pub const fn with_close_timeout(mut self, timeout: Duration) -> Self {
		self.close_timeout = timeout;
		self
	}

	#[must_use]
	pub const fn with_send_timeout(mut self, timeout: Duration) -> Self {
		self.send_timeout = timeout;
		self
	}

	#[must_use]
	pub const fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.idle_timeout = timeout;
		self
	}

	#[must_use]
	pub const fn with_resubscribe_on_reconnect(mut self, enabled: bool) -> Self {
		self.resubscribe_on_reconnect = enabled;
		self
	}

	/// Check the endpoint and timer settings before anything is spawned
	///
	/// # Errors
	/// Returns a [`ConfigError`] describing the first invalid setting.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let scheme = self.url.split_once("://").map(|(scheme, _)| scheme.to_ascii_lowercase());
		if !matches!(scheme.as_deref(), Some("ws" | "wss")) {
			return Err(ConfigError::UnsupportedScheme { url: self.url.clone() });
		}

		self.url.as_str().into_client_request().map_err(|e| ConfigError::InvalidUrl {
			url: self.url.clone(),
			reason: e.to_string(),
		})?;

		let durations = [
			("reconnect_interval", self.reconnect_interval),
			("heartbeat_interval", self.heartbeat_interval),
			("connect_timeout", self.connect_timeout),
			("send_timeout", self.send_timeout),
		];
		if let Some(&(field, _)) = durations.iter().find(|(_, value)| value.is_zero()) {
			return Err(ConfigError::ZeroValue { field });
		}
		if self.idle_timeout.is_some_and(|timeout| timeout.is_zero()) {
			return Err(ConfigError::ZeroValue { field: "idle_timeout" });
		}
		if self.command_buffer == 0 {
			return Err(ConfigError::ZeroValue { field: "command_buffer" });
		}

		Ok(())
	}
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
	value.trim().parse().map_err(|_| ConfigError::InvalidEnv { var, value: value.to_string() })
}

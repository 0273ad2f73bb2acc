use clap::Parser;
use live_update::LiveUpdateConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Parser, Clone, Debug, Serialize, Deserialize)]
#[command(author, version, about = "Follow the cycling-stats live feed", long_about = None)]
pub struct Config {
	/// Use JSON formatting for tracing
	#[arg(long, env = "LOG_JSON", default_value = "false")]
	pub log_json: bool,

	/// Log filter directives
	#[arg(long, env = "RUST_LOG", default_value = "info")]
	pub rust_log: String,

	/// Live endpoint
	#[arg(long, env = "LIVE_UPDATE_URL", default_value = live_update::DEFAULT_URL)]
	pub url: String,

	/// Topics to subscribe to on every connect, comma separated
	#[arg(long, env = "LIVE_TAIL_TOPICS", value_delimiter = ',')]
	pub topics: Vec<String>,

	/// Delay before reconnecting after the connection drops
	#[arg(long, env = "LIVE_UPDATE_RECONNECT_INTERVAL_MS", default_value = "5000")]
	pub reconnect_interval_ms: u64,

	/// Keep-alive ping period
	#[arg(long, env = "LIVE_UPDATE_HEARTBEAT_INTERVAL_MS", default_value = "30000")]
	pub heartbeat_interval_ms: u64,

	#[arg(long, env = "LIVE_UPDATE_CONNECT_TIMEOUT_MS", default_value = "10000")]
	pub connect_timeout_ms: u64,

	/// Give up on a write the server is not reading
	#[arg(long, env = "LIVE_UPDATE_SEND_TIMEOUT_MS", default_value = "5000")]
	pub send_timeout_ms: u64,

	/// Stay disconnected once the server goes away
	#[arg(long, env = "LIVE_TAIL_NO_RECONNECT")]
	pub no_reconnect: bool,

	/// Drop the connection when nothing arrives for this many seconds
	#[arg(long, env = "LIVE_TAIL_IDLE_TIMEOUT_SECS")]
	pub idle_timeout_secs: Option<u64>,
}

impl Config {
	pub fn live_update(&self) -> LiveUpdateConfig {
		LiveUpdateConfig::new(self.url.clone())
			.with_auto_reconnect(!self.no_reconnect)
			.with_reconnect_interval(Duration::from_millis(self.reconnect_interval_ms))
			.with_heartbeat_interval(Duration::from_millis(self.heartbeat_interval_ms))
			.with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
			.with_send_timeout(Duration::from_millis(self.send_timeout_ms))
			.with_idle_timeout(self.idle_timeout_secs.map(Duration::from_secs))
	}
}

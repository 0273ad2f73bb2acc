use serde::Serialize;

/// Counters kept by the connection task since it was spawned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
	/// Transitions into Connected
	pub connects: u64,
	pub open_failures: u64,
	/// Connection attempts started by the reconnect timer
	pub reconnect_attempts: u64,
	pub messages_received: u64,
	/// Inbound payloads dropped because they did not decode
	pub malformed_dropped: u64,
	pub messages_sent: u64,
	pub heartbeats_sent: u64,
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
	#[error("Failed to decode live-update message: {0}")]
	Decode(#[source] serde_json::Error),

	#[error("Failed to encode live-update message: {0}")]
	Encode(#[source] serde_json::Error),
}

/// Message `type` values spoken by the stats backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
	Ping,
	Pong,
	Subscribe,
	Subscribed,
	Unsubscribe,
	Unsubscribed,
	RankingUpdate,
}

impl MessageType {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Ping => "ping",
			Self::Pong => "pong",
			Self::Subscribe => "subscribe",
			Self::Subscribed => "subscribed",
			Self::Unsubscribe => "unsubscribe",
			Self::Unsubscribed => "unsubscribed",
			Self::RankingUpdate => "ranking_update",
		}
	}
}

/// A single frame on the live-update channel: `{type, topic?, data?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveMessage {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub topic: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

impl LiveMessage {
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			topic: None,
			data: None,
		}
	}

	pub fn ping() -> Self {
		Self::new(MessageType::Ping.as_str())
	}

	pub fn subscribe(topic: impl Into<String>) -> Self {
		Self::new(MessageType::Subscribe.as_str()).with_topic(topic)
	}

	pub fn unsubscribe(topic: impl Into<String>) -> Self {
		Self::new(MessageType::Unsubscribe.as_str()).with_topic(topic)
	}

	#[must_use]
	pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
		self.topic = Some(topic.into());
		self
	}

	#[must_use]
	pub fn with_data(mut self, data: Value) -> Self {
		self.data = Some(data);
		self
	}

	/// Decode an inbound text frame
	///
	/// # Errors
	/// Fails when the payload is not JSON or has no string `type`.
	pub fn parse(text: &str) -> Result<Self, MessageError> {
		serde_json::from_str(text).map_err(MessageError::Decode)
	}

	/// Encode for an outbound text frame
	///
	/// # Errors
	/// Fails only if `data` cannot be represented as JSON.
	pub fn to_text(&self) -> Result<String, MessageError> {
		serde_json::to_string(self).map_err(MessageError::Encode)
	}

	pub fn is(&self, kind: MessageType) -> bool {
		self.kind == kind.as_str()
	}

	/// Classify the message the way the backend's live endpoint uses it
	pub fn event(&self) -> ServerEvent<'_> {
		let topic = self.topic.as_deref();
		match self.kind.as_str() {
			"pong" => ServerEvent::Pong,
			"subscribed" => ServerEvent::Subscribed(topic),
			"unsubscribed" => ServerEvent::Unsubscribed(topic),
			"ranking_update" => ServerEvent::RankingUpdate,
			other => ServerEvent::Other(other),
		}
	}
}

/// Borrowed view over a received [`LiveMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEvent<'a> {
	/// Reply to a heartbeat `ping`
	Pong,
	Subscribed(Option<&'a str>),
	Unsubscribed(Option<&'a str>),
	/// Rankings changed server-side; consumers should refetch them
	RankingUpdate,
	Other(&'a str),
}

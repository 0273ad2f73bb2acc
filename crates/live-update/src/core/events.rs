use crate::messages::LiveMessage;
use tokio::sync::mpsc;
use tracing::trace;

/// Receives connection lifecycle callbacks and inbound messages.
///
/// Every method runs on the connection task, one call at a time and in the order
/// the events happened, so implementations should return quickly.
pub trait LiveUpdateHandler: Send + 'static {
	/// Called once per successfully decoded inbound message
	fn on_message(&mut self, _message: LiveMessage) {}

	/// Called once each time the connection becomes open
	fn on_connect(&mut self) {}

	/// Called once each time an open connection goes away, for any reason
	fn on_disconnect(&mut self) {}
}

impl LiveUpdateHandler for () {}

type MessageCallback = Box<dyn FnMut(LiveMessage) + Send>;
type LifecycleCallback = Box<dyn FnMut() + Send>;

/// Closure-backed handler assembled by [`crate::LiveUpdateClientBuilder`]
#[derive(Default)]
pub struct Callbacks {
	pub(crate) on_message: Option<MessageCallback>,
	pub(crate) on_connect: Option<LifecycleCallback>,
	pub(crate) on_disconnect: Option<LifecycleCallback>,
}

impl LiveUpdateHandler for Callbacks {
	fn on_message(&mut self, message: LiveMessage) {
		if let Some(callback) = self.on_message.as_mut() {
			callback(message);
		}
	}

	fn on_connect(&mut self) {
		if let Some(callback) = self.on_connect.as_mut() {
			callback();
		}
	}

	fn on_disconnect(&mut self) {
		if let Some(callback) = self.on_disconnect.as_mut() {
			callback();
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
	Connected,
	Message(LiveMessage),
	Disconnected,
}

/// Forwards every callback as a [`ClientEvent`] into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelHandler {
	sender: mpsc::UnboundedSender<ClientEvent>,
}

impl ChannelHandler {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
		let (sender, receiver) = mpsc::unbounded_channel();
		(Self { sender }, receiver)
	}

	fn forward(&self, event: ClientEvent) {
		if self.sender.send(event).is_err() {
			trace!("client event receiver dropped");
		}
	}
}

impl LiveUpdateHandler for ChannelHandler {
	fn on_message(&mut self, message: LiveMessage) {
		self.forward(ClientEvent::Message(message));
	}

	fn on_connect(&mut self) {
		self.forward(ClientEvent::Connected);
	}

	fn on_disconnect(&mut self) {
		self.forward(ClientEvent::Disconnected);
	}
}

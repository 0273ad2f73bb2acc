use super::{ConnectionState, ConnectionStats};
use crate::messages::LiveMessage;
use tokio::sync::oneshot;

/// Messages sent from client handles to the connection task
#[derive(Debug)]
pub(crate) enum ClientCommand {
	Connect,
	Disconnect { reply: oneshot::Sender<()> },
	Subscribe { topic: String },
	Unsubscribe { topic: String },
	Send { message: LiveMessage },

	GetState { reply: oneshot::Sender<ConnectionState> },
	GetLastMessage { reply: oneshot::Sender<Option<LiveMessage>> },
	GetStats { reply: oneshot::Sender<ConnectionStats> },

	Shutdown { reply: oneshot::Sender<()> },
}

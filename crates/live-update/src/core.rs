mod commands;
mod connection;
mod events;
mod state;
mod stats;
mod subscriptions;
mod timers;

pub(crate) use commands::ClientCommand;
pub(crate) use connection::ConnectionActor;
pub use connection::ConnectionError;
pub use events::{Callbacks, ChannelHandler, ClientEvent, LiveUpdateHandler};
pub(crate) use state::StateTransition;
pub use state::{ConnectionState, StateError};
pub use stats::ConnectionStats;
pub(crate) use subscriptions::SubscriptionSet;
pub(crate) use timers::{HeartbeatTimer, ReconnectTimer};

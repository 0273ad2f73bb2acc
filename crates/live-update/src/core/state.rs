use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Lifecycle of the single live-update connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
	#[default]
	Disconnected,
	Connecting { started_at: Instant },
	Connected { connected_at: Instant },
	ReconnectPending { retry_at: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StateTransition {
	StartConnecting,
	ConnectionEstablished,
	ConnectionFailed,
	ConnectionClosed { reconnect_after: Option<Duration> },
	Reset,
}

impl StateTransition {
	const fn name(self) -> &'static str {
		match self {
			Self::StartConnecting => "start_connecting",
			Self::ConnectionEstablished => "connection_established",
			Self::ConnectionFailed => "connection_failed",
			Self::ConnectionClosed { .. } => "connection_closed",
			Self::Reset => "reset",
		}
	}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
	#[error("Invalid state transition: {transition} while {from}")]
	InvalidTransition { from: &'static str, transition: &'static str },
}

impl ConnectionState {
	pub const fn name(&self) -> &'static str {
		match self {
			Self::Disconnected => "disconnected",
			Self::Connecting { .. } => "connecting",
			Self::Connected { .. } => "connected",
			Self::ReconnectPending { .. } => "reconnect_pending",
		}
	}

	pub const fn is_connected(&self) -> bool {
		matches!(self, Self::Connected { .. })
	}

	pub const fn is_connecting(&self) -> bool {
		matches!(self, Self::Connecting { .. })
	}

	pub const fn is_reconnect_pending(&self) -> bool {
		matches!(self, Self::ReconnectPending { .. })
	}

	pub const fn is_disconnected(&self) -> bool {
		matches!(self, Self::Disconnected)
	}

	pub fn uptime(&self) -> Option<Duration> {
		match self {
			Self::Connected { connected_at } => Some(connected_at.elapsed()),
			_ => None,
		}
	}

	/// Validate a transition and produce the state it leads to
	pub(crate) fn next(&self, transition: StateTransition) -> Result<Self, StateError> {
		let now = Instant::now();
		let next = match (self, transition) {
			(Self::Disconnected | Self::ReconnectPending { .. }, StateTransition::StartConnecting) => Self::Connecting { started_at: now },
			(Self::Connecting { .. }, StateTransition::ConnectionEstablished) => Self::Connected { connected_at: now },
			(Self::Connecting { .. }, StateTransition::ConnectionFailed) => Self::Disconnected,
			(Self::Connected { .. }, StateTransition::ConnectionClosed { reconnect_after: Some(delay) }) => Self::ReconnectPending { retry_at: now + delay },
			(Self::Connected { .. }, StateTransition::ConnectionClosed { reconnect_after: None }) | (_, StateTransition::Reset) => Self::Disconnected,
			_ => {
				return Err(StateError::InvalidTransition {
					from: self.name(),
					transition: transition.name(),
				})
			}
		};

		Ok(next)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn connected() -> ConnectionState {
		ConnectionState::Disconnected
			.next(StateTransition::StartConnecting)
			.and_then(|s| s.next(StateTransition::ConnectionEstablished))
			.unwrap()
	}

	#[test]
	fn test_initial_state_is_disconnected() {
		assert!(ConnectionState::default().is_disconnected());
	}

	#[test]
	fn test_open_and_fail_paths() {
		let connecting = ConnectionState::Disconnected.next(StateTransition::StartConnecting).unwrap();
		assert!(connecting.is_connecting());

		assert!(connecting.next(StateTransition::ConnectionEstablished).unwrap().is_connected());
		assert!(connecting.next(StateTransition::ConnectionFailed).unwrap().is_disconnected());
	}

	#[test]
	fn test_close_with_reconnect_goes_pending() {
		let pending = connected()
			.next(StateTransition::ConnectionClosed {
				reconnect_after: Some(Duration::from_millis(5000)),
			})
			.unwrap();

		match pending {
			ConnectionState::ReconnectPending { retry_at } => assert!(retry_at > Instant::now()),
			other => panic!("Expected ReconnectPending, got {other:?}"),
		}
		assert!(pending.next(StateTransition::StartConnecting).unwrap().is_connecting());
	}

	#[test]
	fn test_close_without_reconnect_goes_disconnected() {
		let state = connected().next(StateTransition::ConnectionClosed { reconnect_after: None }).unwrap();

		assert!(state.is_disconnected());
	}

	#[test]
	fn test_reset_from_every_state() {
		let states = [
			ConnectionState::Disconnected,
			ConnectionState::Connecting { started_at: Instant::now() },
			connected(),
			ConnectionState::ReconnectPending { retry_at: Instant::now() },
		];

		for state in states {
			assert!(state.next(StateTransition::Reset).unwrap().is_disconnected());
		}
	}

	#[test]
	fn test_invalid_transitions_are_rejected() {
		let err = ConnectionState::Disconnected.next(StateTransition::ConnectionEstablished).unwrap_err();
		assert_eq!(
			err,
			StateError::InvalidTransition {
				from: "disconnected",
				transition: "connection_established"
			}
		);

		assert!(connected().next(StateTransition::StartConnecting).is_err());
		assert!(ConnectionState::Disconnected.next(StateTransition::ConnectionClosed { reconnect_after: None }).is_err());
	}

	#[test]
	fn test_uptime_only_while_connected() {
		assert!(connected().uptime().is_some());
		assert!(ConnectionState::Disconnected.uptime().is_none());
	}
}

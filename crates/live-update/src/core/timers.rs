use std::pin::Pin;
use std::time::Duration;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior, Sleep};

/// One-shot timer armed while a reconnect is pending
#[derive(Debug, Default)]
pub(crate) struct ReconnectTimer {
	sleep: Option<Pin<Box<Sleep>>>,
}

impl ReconnectTimer {
	/// Arm (or re-arm) the timer, returning its deadline
	pub(crate) fn schedule(&mut self, delay: Duration) -> Instant {
		let deadline = Instant::now() + delay;
		self.sleep = Some(Box::pin(sleep_until(deadline)));
		deadline
	}

	/// Returns whether a pending deadline was dropped
	pub(crate) fn cancel(&mut self) -> bool {
		self.sleep.take().is_some()
	}

	#[cfg(test)]
	pub(crate) const fn is_armed(&self) -> bool {
		self.sleep.is_some()
	}

	/// Resolves once the armed deadline passes, then disarms. Never resolves while disarmed.
	pub(crate) async fn elapsed(&mut self) {
		match self.sleep.as_mut() {
			Some(sleep) => {
				sleep.as_mut().await;
				self.sleep = None;
			}
			None => std::future::pending().await,
		}
	}
}

/// Periodic keep-alive timer, only running while connected
#[derive(Debug, Default)]
pub(crate) struct HeartbeatTimer {
	interval: Option<Interval>,
}

impl HeartbeatTimer {
	/// First tick lands one full period after starting
	pub(crate) fn start(&mut self, period: Duration) {
		let mut interval = interval_at(Instant::now() + period, period);
		interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
		self.interval = Some(interval);
	}

	pub(crate) fn stop(&mut self) {
		self.interval = None;
	}

	#[cfg(test)]
	pub(crate) const fn is_running(&self) -> bool {
		self.interval.is_some()
	}

	pub(crate) async fn tick(&mut self) {
		match self.interval.as_mut() {
			Some(interval) => {
				interval.tick().await;
			}
			None => std::future::pending().await,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::time::timeout;

	#[tokio::test(start_paused = true)]
	async fn test_reconnect_timer_fires_after_delay() {
		let mut timer = ReconnectTimer::default();
		let deadline = timer.schedule(Duration::from_millis(5000));

		assert!(timeout(Duration::from_millis(4999), timer.elapsed()).await.is_err());
		assert!(timer.is_armed());

		timer.elapsed().await;

		assert!(Instant::now() >= deadline);
		assert!(!timer.is_armed());
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancelled_reconnect_timer_never_fires() {
		let mut timer = ReconnectTimer::default();
		timer.schedule(Duration::from_millis(100));

		assert!(timer.cancel());
		assert!(!timer.cancel());
		assert!(timeout(Duration::from_secs(3600), timer.elapsed()).await.is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn test_heartbeat_ticks_every_period() {
		let mut heartbeat = HeartbeatTimer::default();
		let started = Instant::now();
		heartbeat.start(Duration::from_secs(30));

		heartbeat.tick().await;
		assert_eq!(started.elapsed(), Duration::from_secs(30));

		heartbeat.tick().await;
		assert_eq!(started.elapsed(), Duration::from_secs(60));
	}

	#[tokio::test(start_paused = true)]
	async fn test_stopped_heartbeat_is_silent() {
		let mut heartbeat = HeartbeatTimer::default();
		heartbeat.start(Duration::from_secs(30));
		heartbeat.stop();

		assert!(!heartbeat.is_running());
		assert!(timeout(Duration::from_secs(300), heartbeat.tick()).await.is_err());
	}
}

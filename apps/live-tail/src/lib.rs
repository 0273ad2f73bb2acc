pub mod config;
pub mod error;
pub mod service;

pub use config::Config;
pub use error::{Error, Result};
pub use service::{LiveTailService, RankingsRefresh};

use std::str::FromStr;
use tracing_subscriber::{fmt::format::JsonFields, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber.
///
/// # Errors
/// Fails on an unparseable filter or when a subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
	let filter = EnvFilter::from_str(&config.rust_log).map_err(|e| Error::LogFilter(e.to_string()))?;

	tracing_subscriber::registry()
		.with(if config.log_json {
			Box::new(
				tracing_subscriber::fmt::layer()
					.fmt_fields(JsonFields::default())
					.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
					.with_filter(filter),
			) as Box<dyn Layer<_> + Send + Sync>
		} else {
			Box::new(tracing_subscriber::fmt::layer().event_format(tracing_subscriber::fmt::format().pretty()).with_filter(filter))
		})
		.try_init()
		.map_err(|e| Error::Tracing(e.to_string()))
}

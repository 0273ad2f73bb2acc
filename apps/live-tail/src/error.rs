use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error("Live-update error: {0}")]
	LiveUpdate(#[from] live_update::LiveUpdateError),

	#[error("Invalid log filter: {0}")]
	LogFilter(String),

	#[error("Tracing already initialised: {0}")]
	Tracing(String),
}

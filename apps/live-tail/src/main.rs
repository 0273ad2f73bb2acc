use clap::Parser;
use live_tail::{init_tracing, Config, LiveTailService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenv::dotenv().ok();
	let config = Config::parse();
	init_tracing(&config)?;

	tracing::info!(url = %config.url, topics = ?config.topics, "🚀 Starting live-tail");

	let service = LiveTailService::new(config)?;

	// Setup graceful shutdown handler
	let shutdown_token = service.cancel_token();
	tokio::spawn(async move {
		match tokio::signal::ctrl_c().await {
			Ok(()) => {
				tracing::info!("🛑 Shutdown signal received");
				shutdown_token.cancel();
			}
			Err(e) => {
				tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
			}
		}
	});

	let refreshes = service.run().await?;

	tracing::info!(refreshes, "👋 live-tail shutdown complete");
	Ok(())
}

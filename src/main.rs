//! Relay binary entry point.

// crates.io
use color_eyre::Result;
// self
use alert_relay::{config::RelayConfig, obs, server};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	obs::init();

	let config = RelayConfig::from_env()?;

	server::serve(config).await?;

	Ok(())
}

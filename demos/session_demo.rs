//! Demonstrates session reuse across client restarts against a mock gateway.
//!
//! The first client logs in and writes the session file; the second client adopts that file
//! and calls the gateway without logging in again. Set `RUST_LOG=projectx_gateway=debug` to see
//! the call spans.

// std
use std::{env, fs};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use tracing_subscriber::EnvFilter;
// self
use projectx_gateway::{client::Client, config::ClientConfig};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Auth/loginKey");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"success\":true,\"errorCode\":0,\"token\":\"demo-token\"}");
		})
		.await;
	let accounts = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/Account/search")
				.header("authorization", "Bearer demo-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"success\":true,\"accounts\":[{\"id\":7,\"name\":\"PRAC-7\"}]}");
		})
		.await;
	let session_file = env::temp_dir().join("projectx_gateway_demo_session.json");
	let base_url = server.base_url();
	let session_path = session_file.display().to_string();
	let lookup = |name: &str| match name {
		"API_USER" => Some("demo-trader".to_owned()),
		"API_KEY" => Some("demo-key".to_owned()),
		"API_BASE_URL" => Some(base_url.clone()),
		"PROJECTX_SESSION_FILE" => Some(session_path.clone()),
		"PROJECTX_MIN_INTERVAL_MS" => Some("100".to_owned()),
		_ => None,
	};
	let config = ClientConfig::from_lookup(lookup)?.with_validate_interval(None);

	{
		let client = Client::new(config.clone())?;
		let listed = client.active_accounts().await?;

		println!("first client listed {} account(s)", listed.len());
	}

	let client = Client::new(config)?;
	let listed = client.active_accounts().await?;

	println!("second client listed {} account(s)", listed.len());
	println!(
		"login calls: {}, account calls: {}",
		login.calls_async().await,
		accounts.calls_async().await
	);

	fs::remove_file(&session_file)?;

	Ok(())
}

//! Shared fixtures for relay integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use axum::{
	Router,
	body::{Body, to_bytes},
	http::{Request, Response},
};
use jsonwebtoken::{Algorithm, EncodingKey};
// self
use alert_relay::{
	config::{RelayConfig, Secret},
	github::{AppCredentials, GithubClient},
	server::{self, RelayState},
	signature,
	url::Url,
};

/// Webhook secret shared by every integration scenario.
pub const WEBHOOK_SECRET: &str = "relay-test-secret";
/// App identifier shared by every integration scenario.
pub const APP_ID: &str = "12345";

/// Builds a relay router wired to a GitHub API double at `api_base_url`.
pub fn test_router(api_base_url: &str) -> Router {
	let config = test_config(api_base_url);
	let credentials = AppCredentials::with_key(
		APP_ID,
		EncodingKey::from_secret(b"integration-signing-key"),
		Algorithm::HS256,
	);
	let github = GithubClient::with_credentials(&config, credentials)
		.expect("HTTP client should build for tests.");

	server::build_router(Arc::new(RelayState::with_github(config, github)))
}

/// Builds an immutable test configuration pointing at the mock API.
pub fn test_config(api_base_url: &str) -> RelayConfig {
	RelayConfig {
		port: 0,
		webhook_secret: Secret::new(WEBHOOK_SECRET),
		app_id: APP_ID.into(),
		private_key: Secret::new("unused-behind-the-injected-signer"),
		api_base_url: Url::parse(api_base_url).expect("Mock API base URL should parse."),
	}
}

/// Signs `body` exactly the way the sender would.
pub fn sign(body: &[u8]) -> String {
	signature::sign(WEBHOOK_SECRET.as_bytes(), body)
}

/// Representative Dependabot alert delivery body.
pub fn alert_body() -> Vec<u8> {
	serde_json::json!({
		"alert": {
			"number": 123,
			"dependency": { "package": { "name": "minimatch", "ecosystem": "npm" } },
			"security_advisory": {
				"ghsa_id": "GHSA-xxxx",
				"vulnerabilities": [{ "package": { "name": "brace-expansion" } }]
			},
			"security_vulnerability": { "severity": "high" }
		},
		"installation": { "id": 1 },
		"repository": { "owner": { "login": "acme" }, "name": "widgets" }
	})
	.to_string()
	.into_bytes()
}

/// Builds a signed webhook POST carrying the standard protocol headers.
pub fn webhook_request(body: Vec<u8>, event: &str, signature_header: &str) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri("/webhook")
		.header("x-github-delivery", "delivery-0001")
		.header("x-github-event", event)
		.header("x-hub-signature-256", signature_header)
		.body(Body::from(body))
		.expect("Webhook request should build.")
}

/// Reads a response body as JSON.
pub async fn read_json(response: Response<Body>) -> serde_json::Value {
	let bytes = to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Response body should be readable.");

	serde_json::from_slice(&bytes).expect("Response body should be JSON.")
}

//! Axum HTTP surface and the per-delivery pipeline.
//!
//! Route map: `GET /health` (liveness, no auth, no body processing), `POST /webhook` and
//! `POST /` (the only mutating entry point), anything else `404`. Each delivery runs the
//! gate → verify → normalize → credential → dispatch pipeline start to finish; stages share no
//! mutable state across requests, so concurrent deliveries proceed independently and either
//! exactly one outbound dispatch is issued or none is.

// crates.io
use axum::{
	Json, Router,
	body::Body,
	extract::{Request, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use futures::StreamExt;
use tokio::net::TcpListener;
use tracing::Instrument;
// self
use crate::{
	_prelude::*,
	alert,
	config::{ConfigError, RelayConfig},
	error::RejectError,
	github::GithubClient,
	obs::{self, DeliveryOutcome},
	signature,
};

/// Header carrying the opaque delivery identifier.
pub const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header carrying the event kind tag.
pub const HEADER_EVENT: &str = "x-github-event";
/// Header carrying the body signature.
pub const HEADER_SIGNATURE: &str = "x-hub-signature-256";
/// The single event kind this relay forwards.
pub const SUPPORTED_EVENT: &str = "dependabot_alert";
/// Hard ceiling on inbound body size, enforced while streaming.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared per-process state handed to every request task.
///
/// Read-only after startup; handlers take `Arc` clones and never synchronize.
#[derive(Debug)]
pub struct RelayState {
	/// Immutable startup configuration.
	pub config: RelayConfig,
	/// Outbound GitHub client used for credential exchange and dispatch.
	pub github: GithubClient,
}
impl RelayState {
	/// Builds the state from configuration, constructing the default RS256 GitHub client.
	pub fn new(config: RelayConfig) -> Result<Self, ConfigError> {
		let github = GithubClient::new(&config)?;

		Ok(Self { config, github })
	}

	/// Builds the state with an injected GitHub client (tests, custom key management).
	pub fn with_github(config: RelayConfig, github: GithubClient) -> Self {
		Self { config, github }
	}
}

/// Fatal serving failures raised before or while the listener runs.
#[derive(Debug, ThisError)]
pub enum ServeError {
	/// Configuration was rejected while building the relay state.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The listener could not bind or the server loop failed.
	#[error("HTTP server failed.")]
	Io(#[from] std::io::Error),
}

/// Builds the relay router with every route attached.
pub fn build_router(state: Arc<RelayState>) -> Router {
	Router::new()
		.route("/health", get(handle_health))
		.route("/webhook", post(handle_webhook))
		.route("/", post(handle_webhook))
		.fallback(handle_fallback)
		.method_not_allowed_fallback(handle_fallback)
		.with_state(state)
}

/// Binds the listener and serves the relay until shutdown.
pub async fn serve(config: RelayConfig) -> Result<(), ServeError> {
	let port = config.port;
	let state = Arc::new(RelayState::new(config)?);
	let router = build_router(state);
	let listener = TcpListener::bind(("0.0.0.0", port)).await?;

	tracing::info!(port, "relay listening");

	axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		let _ = tokio::signal::ctrl_c().await;
	};
	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			},
			Err(_) => std::future::pending().await,
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}
}

/// `GET /health`: liveness probe.
async fn handle_health() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "ok" }))
}

/// Fallback for unknown paths and methods.
async fn handle_fallback() -> Response {
	(StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not_found" }))).into_response()
}

/// `POST /webhook`: runs the full delivery pipeline for one request.
async fn handle_webhook(State(state): State<Arc<RelayState>>, request: Request) -> Response {
	let (parts, body) = request.into_parts();
	let Some(headers) = DeliveryHeaders::extract(&parts.headers) else {
		return Error::from(RejectError::MissingHeaders).into_response();
	};
	let span = tracing::info_span!(
		"relay.delivery",
		delivery = %headers.delivery_id,
		event = %headers.event_kind,
	);

	async move {
		if headers.event_kind != SUPPORTED_EVENT {
			tracing::info!("unsupported event kind, skipping");
			obs::record_delivery_outcome(DeliveryOutcome::Skipped);

			return (
				StatusCode::ACCEPTED,
				Json(serde_json::json!({ "status": "skipped", "reason": "unsupported_event" })),
			)
				.into_response();
		}

		match run_pipeline(&state, &headers, body).await {
			Ok(()) => {
				tracing::info!("alert dispatched");
				obs::record_delivery_outcome(DeliveryOutcome::Dispatched);

				(StatusCode::ACCEPTED, Json(serde_json::json!({ "status": "dispatched" })))
					.into_response()
			},
			Err(error) => error.into_response(),
		}
	}
	.instrument(span)
	.await
}

/// Verify → decode → normalize → exchange → dispatch, aborting at the first failed gate.
async fn run_pipeline(
	state: &RelayState,
	headers: &DeliveryHeaders,
	body: Body,
) -> Result<()> {
	let raw = read_limited(body, MAX_BODY_BYTES).await?;
	let secret = state.config.webhook_secret.expose().as_bytes();

	if !signature::verify(secret, &raw, &headers.signature) {
		return Err(Error::InvalidSignature);
	}

	let event = alert::decode(&raw)?;
	let normalized = alert::normalize(&event)?;
	let token = state.github.create_installation_token(normalized.installation_id).await?;

	state.github.repository_dispatch(&token, &normalized).await?;

	Ok(())
}

/// The three protocol headers every delivery must carry.
struct DeliveryHeaders {
	delivery_id: String,
	event_kind: String,
	signature: String,
}
impl DeliveryHeaders {
	/// Extracts all three headers; any absent or non-UTF-8 value fails the whole set.
	fn extract(headers: &HeaderMap) -> Option<Self> {
		Some(Self {
			delivery_id: header_value(headers, HEADER_DELIVERY)?,
			event_kind: header_value(headers, HEADER_EVENT)?,
			signature: header_value(headers, HEADER_SIGNATURE)?,
		})
	}
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
	Some(headers.get(name)?.to_str().ok()?.to_owned())
}

/// Reads the request body incrementally, aborting once `limit` bytes would be exceeded.
///
/// The ceiling is checked per chunk so an oversized sender is cut off without buffering the
/// full body; nothing downstream (signature, parsing) ever sees a partial read.
async fn read_limited(body: Body, limit: usize) -> Result<Vec<u8>, RejectError> {
	let mut stream = body.into_data_stream();
	let mut buffer = Vec::new();

	while let Some(chunk) = stream.next().await {
		let chunk = chunk.map_err(RejectError::BodyRead)?;

		if buffer.len() + chunk.len() > limit {
			return Err(RejectError::PayloadTooLarge { limit });
		}

		buffer.extend_from_slice(&chunk);
	}

	Ok(buffer)
}

//! Relay-level error types shared across the delivery pipeline.
//!
//! Every pipeline stage returns either a narrowed success value or one variant of this closed
//! taxonomy; failures never cross the request boundary. Each error knows its HTTP status, its
//! machine-readable code, and the pipeline stage it is attributed to, so the response mapping
//! and the metrics labels stay in one place.

// crates.io
use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
// self
use crate::{
	_prelude::*,
	obs::{self, DeliveryOutcome, Stage},
};

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical pipeline error surfaced by the webhook handler.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Client-class rejection raised before the payload is trusted.
	#[error(transparent)]
	Reject(#[from] RejectError),
	/// The supplied signature did not authenticate the raw body.
	#[error("Webhook signature verification failed.")]
	InvalidSignature,
	/// An authenticated payload violated the semantic alert contract.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Credential exchange or dispatch failed downstream.
	#[error(transparent)]
	Github(#[from] GithubError),
}
impl Error {
	/// HTTP status reported for this error.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Reject(inner) => inner.status(),
			Self::InvalidSignature => StatusCode::UNAUTHORIZED,
			Self::Validation(_) | Self::Github(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Stable machine-readable code carried in the response body.
	///
	/// Internal failures all collapse to `internal_error`; their detail goes to the log stream
	/// only.
	pub fn code(&self) -> &'static str {
		match self {
			Self::Reject(inner) => inner.code(),
			Self::InvalidSignature => "invalid_signature",
			Self::Validation(_) | Self::Github(_) => "internal_error",
		}
	}

	/// Pipeline stage this error is attributed to.
	pub fn stage(&self) -> Stage {
		match self {
			Self::Reject(
				RejectError::InvalidJson(_)
				| RejectError::InvalidBody(_)
				| RejectError::MissingRepositoryUrl,
			) => Stage::Normalize,
			Self::Reject(_) => Stage::Gate,
			Self::InvalidSignature => Stage::Verify,
			Self::Validation(_) => Stage::Normalize,
			Self::Github(inner) => inner.stage(),
		}
	}
}
impl IntoResponse for Error {
	fn into_response(self) -> Response {
		match &self {
			Self::Reject(inner) => tracing::warn!(code = inner.code(), error = %inner, "delivery rejected"),
			Self::InvalidSignature =>
				tracing::warn!(code = "invalid_signature", "delivery failed authentication"),
			Self::Validation(inner) =>
				tracing::error!(error = %inner, "authenticated payload violated the alert contract"),
			Self::Github(inner) =>
				tracing::error!(stage = %inner.stage(), error = ?inner, "downstream GitHub call failed"),
		}

		obs::record_stage_failure(self.stage());
		obs::record_delivery_outcome(DeliveryOutcome::Rejected);

		(self.status(), Json(serde_json::json!({ "error": self.code() }))).into_response()
	}
}

/// Client-class rejections: malformed transport or payload shape.
///
/// These are reported immediately with a machine-readable code and are never retried by the
/// sender.
#[derive(Debug, ThisError)]
pub enum RejectError {
	/// One or more required webhook headers were absent.
	#[error("Required webhook headers are missing.")]
	MissingHeaders,
	/// Repository owner or name was absent, so no dispatch URL can be formed.
	#[error("Repository coordinates are missing from the payload.")]
	MissingRepositoryUrl,
	/// Request body exceeded the streaming ceiling.
	#[error("Request body exceeded the {limit}-byte ceiling.")]
	PayloadTooLarge {
		/// Configured body ceiling in bytes.
		limit: usize,
	},
	/// Request body could not be read from the transport.
	#[error("Request body could not be read.")]
	BodyRead(#[source] axum::Error),
	/// Body was not valid JSON.
	#[error("Request body is not valid JSON.")]
	InvalidJson(#[source] serde_json::Error),
	/// JSON body did not match the alert event shape.
	#[error("Request body does not match the alert event shape.")]
	InvalidBody(#[source] serde_path_to_error::Error<serde_json::Error>),
}
impl RejectError {
	/// HTTP status reported for this rejection.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
			_ => StatusCode::BAD_REQUEST,
		}
	}

	/// Stable machine-readable code carried in the response body.
	pub fn code(&self) -> &'static str {
		match self {
			Self::MissingHeaders => "missing_headers",
			Self::MissingRepositoryUrl => "missing_url",
			Self::PayloadTooLarge { .. } => "payload_too_large",
			Self::BodyRead(_) => "body_read",
			Self::InvalidJson(_) => "invalid_json",
			Self::InvalidBody(_) => "invalid_body",
		}
	}
}

/// Semantic contract violations in an authenticated payload.
///
/// The sender's signature was valid, so these indicate a defective upstream payload rather than
/// a malicious request; they surface as internal errors with a generic body.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// The alert object was absent.
	#[error("Alert object is missing from the payload.")]
	MissingAlert,
	/// The alert number was absent.
	#[error("Alert number is missing from the payload.")]
	MissingAlertNumber,
	/// The advisory identifier was absent.
	#[error("Advisory identifier is missing from the payload.")]
	MissingAdvisoryId,
	/// The severity tier was absent.
	#[error("Severity is missing from the payload.")]
	MissingSeverity,
	/// The direct dependency package was absent.
	#[error("Direct dependency package is missing from the payload.")]
	MissingDirectDependency,
	/// The direct dependency carried no usable ecosystem.
	#[error("Direct dependency ecosystem is missing or empty.")]
	MissingEcosystem,
	/// Every candidate dependency name was empty after normalization.
	#[error("No usable dependency names remain after normalization.")]
	NoUsableDependencies,
	/// The installation identifier was absent.
	#[error("Installation identifier is missing from the payload.")]
	MissingInstallation,
}

/// Downstream failures from the GitHub API.
#[derive(Debug, ThisError)]
pub enum GithubError {
	/// The App JWT could not be signed.
	#[error("App JWT could not be signed.")]
	Jwt(#[source] jsonwebtoken::errors::Error),
	/// Transport failure while calling GitHub.
	#[error("Network error occurred during the {stage} call.")]
	Network {
		/// Outbound call this failure belongs to.
		stage: Stage,
		/// Transport-level failure.
		#[source]
		source: reqwest::Error,
	},
	/// GitHub answered with a non-success status.
	#[error("The {stage} call was rejected with status {status}.")]
	Status {
		/// Outbound call this failure belongs to.
		stage: Stage,
		/// HTTP status returned by GitHub.
		status: u16,
		/// Response body preview for the log stream.
		body: String,
	},
	/// The token endpoint returned a body the relay could not decode.
	#[error("The token endpoint returned a malformed response.")]
	TokenResponse(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// The token expiry timestamp could not be parsed.
	#[error("The token expiry `{value}` is not a valid RFC 3339 timestamp.")]
	TokenExpiry {
		/// Raw `expires_at` value returned by GitHub.
		value: String,
		/// Parsing failure.
		#[source]
		source: time::error::Parse,
	},
}
impl GithubError {
	/// Outbound stage this failure is attributed to.
	pub fn stage(&self) -> Stage {
		match self {
			Self::Jwt(_) | Self::TokenResponse(_) | Self::TokenExpiry { .. } => Stage::Credential,
			Self::Network { stage, .. } | Self::Status { stage, .. } => *stage,
		}
	}
}

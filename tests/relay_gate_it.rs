//! Request-gate behavior: routing, header checks, body ceiling, and decode rejections.
//!
//! None of these scenarios should ever reach GitHub, so the router is pointed at an
//! unresolvable API base and any outbound attempt would fail loudly.

mod common;

// crates.io
use axum::{
	body::Body,
	http::{Request, StatusCode},
};
use tower::ServiceExt;
// self
use common::*;

const DEAD_API: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn health_returns_ok_without_auth() {
	let response = test_router(DEAD_API)
		.oneshot(
			Request::builder()
				.method("GET")
				.uri("/health")
				.body(Body::empty())
				.expect("Health request should build."),
		)
		.await
		.expect("Router should answer the health probe.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(read_json(response).await, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn unknown_paths_and_methods_are_not_found() {
	for (method, uri) in [("GET", "/nope"), ("DELETE", "/webhook"), ("GET", "/")] {
		let response = test_router(DEAD_API)
			.oneshot(
				Request::builder()
					.method(method)
					.uri(uri)
					.body(Body::empty())
					.expect("Request should build."),
			)
			.await
			.expect("Router should answer unknown routes.");

		assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
		assert_eq!(read_json(response).await, serde_json::json!({ "error": "not_found" }));
	}
}

#[tokio::test]
async fn missing_headers_are_rejected() {
	let response = test_router(DEAD_API)
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/webhook")
				.header("x-github-event", "dependabot_alert")
				.body(Body::from(alert_body()))
				.expect("Request should build."),
		)
		.await
		.expect("Router should answer header-less deliveries.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(read_json(response).await, serde_json::json!({ "error": "missing_headers" }));
}

#[tokio::test]
async fn unsupported_event_kinds_are_skipped_not_failed() {
	let body = alert_body();
	// Deliberately unsigned: a skipped event must not require signature verification.
	let response = test_router(DEAD_API)
		.oneshot(webhook_request(body, "push", "sha256=junk"))
		.await
		.expect("Router should answer unsupported events.");

	assert_eq!(response.status(), StatusCode::ACCEPTED);
	assert_eq!(
		read_json(response).await,
		serde_json::json!({ "status": "skipped", "reason": "unsupported_event" }),
	);
}

#[tokio::test]
async fn oversized_bodies_are_rejected_before_verification() {
	let body = vec![b'a'; 1024 * 1024 + 1];
	// A garbage signature proves the ceiling fires before any crypto: a verified-first
	// pipeline would answer 401 here.
	let response = test_router(DEAD_API)
		.oneshot(webhook_request(body, "dependabot_alert", "sha256=junk"))
		.await
		.expect("Router should answer oversized deliveries.");

	assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
	assert_eq!(read_json(response).await, serde_json::json!({ "error": "payload_too_large" }));
}

#[tokio::test]
async fn tampered_bodies_fail_authentication() {
	let body = alert_body();
	let signature = sign(&body);
	let mut tampered = body;

	tampered[0] ^= 0x01;

	let response = test_router(DEAD_API)
		.oneshot(webhook_request(tampered, "dependabot_alert", &signature))
		.await
		.expect("Router should answer tampered deliveries.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(read_json(response).await, serde_json::json!({ "error": "invalid_signature" }));
}

#[tokio::test]
async fn non_json_bodies_are_rejected_after_authentication() {
	let body = b"{".to_vec();
	let signature = sign(&body);
	let response = test_router(DEAD_API)
		.oneshot(webhook_request(body, "dependabot_alert", &signature))
		.await
		.expect("Router should answer malformed deliveries.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(read_json(response).await, serde_json::json!({ "error": "invalid_json" }));
}

#[tokio::test]
async fn non_event_shapes_are_rejected_as_invalid_body() {
	let body = b"[1, 2, 3]".to_vec();
	let signature = sign(&body);
	let response = test_router(DEAD_API)
		.oneshot(webhook_request(body, "dependabot_alert", &signature))
		.await
		.expect("Router should answer mis-shaped deliveries.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(read_json(response).await, serde_json::json!({ "error": "invalid_body" }));
}

//! Observability helpers for the delivery pipeline.
//!
//! Every delivery runs inside a `relay.delivery` span tagged with the delivery id and event
//! kind. Two counters cover the pipeline: `alert_relay_delivery_total` labeled by terminal
//! `outcome`, and `alert_relay_stage_failure_total` labeled by the `stage` that rejected the
//! delivery.

// crates.io
use tracing_subscriber::EnvFilter;
// self
use crate::_prelude::*;

/// Pipeline stages observed by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Header extraction and body-size enforcement.
	Gate,
	/// HMAC signature verification.
	Verify,
	/// Payload decoding and normalization.
	Normalize,
	/// Installation token exchange.
	Credential,
	/// Outbound repository dispatch.
	Dispatch,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Gate => "gate",
			Stage::Verify => "verify",
			Stage::Normalize => "normalize",
			Stage::Credential => "credential",
			Stage::Dispatch => "dispatch",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Terminal outcome labels recorded once per delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryOutcome {
	/// Pipeline completed and exactly one dispatch was issued.
	Dispatched,
	/// Event kind is unsupported; accepted without processing.
	Skipped,
	/// Some stage rejected the delivery; zero dispatches were issued.
	Rejected,
}
impl DeliveryOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			DeliveryOutcome::Dispatched => "dispatched",
			DeliveryOutcome::Skipped => "skipped",
			DeliveryOutcome::Rejected => "rejected",
		}
	}
}
impl Display for DeliveryOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records a delivery outcome on the global metrics recorder.
pub fn record_delivery_outcome(outcome: DeliveryOutcome) {
	metrics::counter!("alert_relay_delivery_total", "outcome" => outcome.as_str()).increment(1);
}

/// Records a stage failure on the global metrics recorder.
pub fn record_stage_failure(stage: Stage) {
	metrics::counter!("alert_relay_stage_failure_total", "stage" => stage.as_str()).increment(1);
}

/// Installs the tracing subscriber for the relay binary.
///
/// Honors `RUST_LOG` when set; defaults to `info` for the relay and `warn` for everything else.
pub fn init() {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,alert_relay=info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

//! Dependabot alert payload decoding and normalization.
//!
//! The inbound shape is GitHub's `dependabot_alert` webhook payload; the outbound contract is a
//! fixed five-field payload with a deterministic dependency list. Decoding keeps every field
//! optional so that shape errors (client-class) and semantic contract violations (internal)
//! stay distinguishable, and [`normalize`] enforces presence in a fixed order.

// self
use crate::{
	_prelude::*,
	error::{RejectError, ValidationError},
};

/// Decoded `dependabot_alert` webhook event.
#[derive(Clone, Debug, Deserialize)]
pub struct AlertEvent {
	/// The vulnerability alert this delivery describes.
	pub alert: Option<Alert>,
	/// App installation scoping the delegated credential.
	pub installation: Option<Installation>,
	/// Repository the alert fired on.
	pub repository: Option<Repository>,
}

/// One vulnerability alert tied to one dependency in one repository.
#[derive(Clone, Debug, Deserialize)]
pub struct Alert {
	/// Alert number within its repository.
	pub number: Option<u64>,
	/// The dependency that triggered the alert.
	pub dependency: Option<AlertDependency>,
	/// The underlying advisory record.
	pub security_advisory: Option<SecurityAdvisory>,
	/// The vulnerability as it applies to this repository.
	pub security_vulnerability: Option<SecurityVulnerability>,
}

/// The direct dependency reference carried by an alert.
#[derive(Clone, Debug, Deserialize)]
pub struct AlertDependency {
	/// Package coordinates of the direct dependency.
	pub package: Option<Package>,
}

/// Package coordinates as GitHub reports them.
#[derive(Clone, Debug, Deserialize)]
pub struct Package {
	/// Package name.
	pub name: Option<String>,
	/// Package ecosystem (npm, pip, cargo, ...).
	pub ecosystem: Option<String>,
}

/// Advisory record referenced by an alert.
#[derive(Clone, Debug, Deserialize)]
pub struct SecurityAdvisory {
	/// GHSA advisory identifier.
	pub ghsa_id: Option<String>,
	/// Per-package vulnerability records attached to the advisory.
	#[serde(default)]
	pub vulnerabilities: Vec<AdvisoryVulnerability>,
}

/// One vulnerable package entry inside an advisory.
#[derive(Clone, Debug, Deserialize)]
pub struct AdvisoryVulnerability {
	/// Affected package coordinates.
	pub package: Option<Package>,
}

/// The vulnerability scoped to the alerting repository.
#[derive(Clone, Debug, Deserialize)]
pub struct SecurityVulnerability {
	/// Severity tier reported by GitHub.
	pub severity: Option<String>,
}

/// App installation reference.
#[derive(Clone, Debug, Deserialize)]
pub struct Installation {
	/// Installation identifier used for the credential exchange.
	pub id: Option<u64>,
}

/// Repository reference.
#[derive(Clone, Debug, Deserialize)]
pub struct Repository {
	/// Repository name.
	pub name: Option<String>,
	/// Repository owner.
	pub owner: Option<RepositoryOwner>,
}

/// Repository owner reference.
#[derive(Clone, Debug, Deserialize)]
pub struct RepositoryOwner {
	/// Owner login.
	pub login: Option<String>,
}

/// Fixed-shape payload attached to the outbound `repository_dispatch` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPayload {
	/// Alert number, carried through unchanged.
	pub alert_number: u64,
	/// GHSA advisory identifier, carried through unchanged.
	pub ghsa_id: String,
	/// Severity tier, carried through unchanged.
	pub severity: String,
	/// Lower-cased ecosystem of the direct dependency.
	pub ecosystem: String,
	/// Deduplicated, ascending-sorted union of the direct and related dependency names.
	pub dependencies: Vec<String>,
}

/// Normalized alert: the dispatch payload plus the routing facts needed to deliver it.
#[derive(Clone, Debug)]
pub struct NormalizedAlert {
	/// Payload forwarded as the dispatch attachment.
	pub payload: DispatchPayload,
	/// Repository owner login.
	pub owner: String,
	/// Repository name.
	pub repository: String,
	/// Installation the credential exchange is scoped to.
	pub installation_id: u64,
}

/// Decodes a verified raw body into an [`AlertEvent`].
///
/// Non-JSON bodies and JSON that does not fit the event shape are client-class rejections,
/// distinct from the semantic validation performed by [`normalize`].
pub fn decode(raw: &[u8]) -> Result<AlertEvent, RejectError> {
	let value: serde_json::Value = serde_json::from_slice(raw).map_err(RejectError::InvalidJson)?;

	serde_path_to_error::deserialize(value).map_err(RejectError::InvalidBody)
}

/// Validates an authenticated event and produces its normalized dispatch form.
///
/// Checks run in a fixed order: direct package and ecosystem, dependency list, installation
/// identifier, carried-through fields, then the repository coordinates that address the
/// dispatch. Any failure aborts before an outbound call is attempted.
pub fn normalize(event: &AlertEvent) -> Result<NormalizedAlert> {
	let alert = event.alert.as_ref().ok_or(ValidationError::MissingAlert)?;
	let package = alert
		.dependency
		.as_ref()
		.and_then(|dependency| dependency.package.as_ref())
		.ok_or(ValidationError::MissingDirectDependency)?;
	let ecosystem = package
		.ecosystem
		.as_deref()
		.map(str::trim)
		.filter(|ecosystem| !ecosystem.is_empty())
		.ok_or(ValidationError::MissingEcosystem)?;
	let advisory = alert.security_advisory.as_ref();
	let related = advisory
		.map(|advisory| advisory.vulnerabilities.as_slice())
		.unwrap_or_default()
		.iter()
		.filter_map(|vulnerability| vulnerability.package.as_ref()?.name.as_deref());
	let dependencies = normalize_dependencies(package.name.as_deref().into_iter().chain(related));

	if dependencies.is_empty() {
		return Err(ValidationError::NoUsableDependencies.into());
	}

	let installation_id = event
		.installation
		.as_ref()
		.and_then(|installation| installation.id)
		.ok_or(ValidationError::MissingInstallation)?;
	let alert_number = alert.number.ok_or(ValidationError::MissingAlertNumber)?;
	let ghsa_id = advisory
		.and_then(|advisory| advisory.ghsa_id.clone())
		.ok_or(ValidationError::MissingAdvisoryId)?;
	let severity = alert
		.security_vulnerability
		.as_ref()
		.and_then(|vulnerability| vulnerability.severity.clone())
		.ok_or(ValidationError::MissingSeverity)?;
	let (owner, repository) = event
		.repository
		.as_ref()
		.and_then(|repository| {
			Some((repository.owner.as_ref()?.login.clone()?, repository.name.clone()?))
		})
		.ok_or(RejectError::MissingRepositoryUrl)?;

	Ok(NormalizedAlert {
		payload: DispatchPayload {
			alert_number,
			ghsa_id,
			severity,
			ecosystem: ecosystem.to_lowercase(),
			dependencies,
		},
		owner,
		repository,
		installation_id,
	})
}

/// Trims, filters, deduplicates, and sorts candidate dependency names.
///
/// Idempotent: feeding the output back in yields the same list.
pub fn normalize_dependencies<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
	names
		.into_iter()
		.map(str::trim)
		.filter(|name| !name.is_empty())
		.map(str::to_owned)
		.collect::<BTreeSet<_>>()
		.into_iter()
		.collect()
}

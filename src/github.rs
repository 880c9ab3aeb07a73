//! GitHub App credential exchange and repository dispatch.
//!
//! The relay authenticates as a GitHub App: a short-lived RS256 JWT signed with the App's
//! private key buys an installation-scoped access token, and that token authorizes exactly one
//! `repository_dispatch` call before being discarded. Tokens are never cached or reused across
//! deliveries; the sender's redelivery policy is the only retry mechanism.

// std
use std::time::Duration;
// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, header};
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	alert::NormalizedAlert,
	config::{ConfigError, RelayConfig, Secret},
	error::GithubError,
	obs::Stage,
};

/// Fixed, versioned event-type tag attached to every outbound dispatch.
pub const DISPATCH_EVENT_TYPE: &str = "dependabot-alert-v1";

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("alert-relay/", env!("CARGO_PKG_VERSION"));
/// Leeway subtracted from `iat` to absorb clock skew between relay and GitHub.
const JWT_IAT_LEEWAY_SECS: i64 = 60;
/// App JWT validity window (GitHub caps this at ten minutes).
const JWT_TTL_SECS: i64 = 600;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// App signing identity: the issuer id plus the key used to mint App JWTs.
pub struct AppCredentials {
	app_id: String,
	key: EncodingKey,
	algorithm: Algorithm,
}
impl AppCredentials {
	/// Builds RS256 credentials from the App's PEM-encoded RSA private key.
	pub fn from_rsa_pem(app_id: impl Into<String>, pem: &Secret) -> Result<Self, ConfigError> {
		let key = EncodingKey::from_rsa_pem(pem.expose().as_bytes())
			.map_err(ConfigError::InvalidPrivateKey)?;

		Ok(Self { app_id: app_id.into(), key, algorithm: Algorithm::RS256 })
	}

	/// Builds credentials from a pre-constructed signing key.
	///
	/// This is the injection seam for tests and custom key management; production callers
	/// should prefer [`AppCredentials::from_rsa_pem`].
	pub fn with_key(app_id: impl Into<String>, key: EncodingKey, algorithm: Algorithm) -> Self {
		Self { app_id: app_id.into(), key, algorithm }
	}

	fn mint_jwt(&self, now: OffsetDateTime) -> Result<String, GithubError> {
		#[derive(Serialize)]
		struct Claims<'a> {
			iat: i64,
			exp: i64,
			iss: &'a str,
		}

		let issued = now.unix_timestamp();
		let claims = Claims {
			iat: issued - JWT_IAT_LEEWAY_SECS,
			exp: issued + JWT_TTL_SECS,
			iss: &self.app_id,
		};

		jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.key)
			.map_err(GithubError::Jwt)
	}
}
impl Debug for AppCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppCredentials")
			.field("app_id", &self.app_id)
			.field("key", &"<redacted>")
			.field("algorithm", &self.algorithm)
			.finish()
	}
}

/// Installation-scoped bearer credential, held only for the single call that follows.
#[derive(Debug)]
pub struct InstallationToken {
	/// Bearer token; callers must avoid logging it.
	pub token: Secret,
	/// Provider-reported expiry instant.
	pub expires_at: OffsetDateTime,
}

/// Minimal GitHub REST client covering the relay's two outbound calls.
#[derive(Debug)]
pub struct GithubClient {
	http: Client,
	api_base_url: Url,
	credentials: AppCredentials,
}
impl GithubClient {
	/// Creates a client from startup configuration, signing RS256 over the configured PEM.
	pub fn new(config: &RelayConfig) -> Result<Self, ConfigError> {
		let credentials = AppCredentials::from_rsa_pem(&config.app_id, &config.private_key)?;

		Self::with_credentials(config, credentials)
	}

	/// Creates a client with injected signing credentials.
	pub fn with_credentials(
		config: &RelayConfig,
		credentials: AppCredentials,
	) -> Result<Self, ConfigError> {
		let http = Client::builder()
			.user_agent(USER_AGENT)
			.connect_timeout(CONNECT_TIMEOUT)
			.timeout(CALL_TIMEOUT)
			.build()
			.map_err(ConfigError::HttpClientBuild)?;

		Ok(Self { http, api_base_url: config.api_base_url.clone(), credentials })
	}

	/// Exchanges the App identity for an installation-scoped access token.
	///
	/// The token is returned to the caller and never cached; its lifetime is the single
	/// dispatch that follows.
	pub async fn create_installation_token(
		&self,
		installation_id: u64,
	) -> Result<InstallationToken, GithubError> {
		const STAGE: Stage = Stage::Credential;

		#[derive(Deserialize)]
		struct TokenResponse {
			token: String,
			expires_at: String,
		}

		let jwt = self.credentials.mint_jwt(OffsetDateTime::now_utc())?;
		let url = self.endpoint(&format!("app/installations/{installation_id}/access_tokens"));
		let response = self
			.http
			.post(url)
			.header(header::ACCEPT, ACCEPT)
			.header(API_VERSION_HEADER, API_VERSION)
			.bearer_auth(jwt)
			.send()
			.await
			.map_err(|source| GithubError::Network { stage: STAGE, source })?;
		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|source| GithubError::Network { stage: STAGE, source })?;

		if !status.is_success() {
			return Err(GithubError::Status { stage: STAGE, status: status.as_u16(), body });
		}

		let mut deserializer = serde_json::Deserializer::from_str(&body);
		let payload: TokenResponse = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(GithubError::TokenResponse)?;
		let expires_at = OffsetDateTime::parse(&payload.expires_at, &Rfc3339).map_err(|source| {
			GithubError::TokenExpiry { value: payload.expires_at.clone(), source }
		})?;

		Ok(InstallationToken { token: Secret::new(payload.token), expires_at })
	}

	/// Raises the `repository_dispatch` event carrying the normalized payload.
	///
	/// This is the relay's only network mutation. Acceptance of the call is the success
	/// criterion; no downstream workflow state is awaited or tracked.
	pub async fn repository_dispatch(
		&self,
		token: &InstallationToken,
		alert: &NormalizedAlert,
	) -> Result<(), GithubError> {
		const STAGE: Stage = Stage::Dispatch;

		let url = self.endpoint(&format!("repos/{}/{}/dispatches", alert.owner, alert.repository));
		let body = serde_json::json!({
			"event_type": DISPATCH_EVENT_TYPE,
			"client_payload": alert.payload,
		});
		let response = self
			.http
			.post(url)
			.header(header::ACCEPT, ACCEPT)
			.header(API_VERSION_HEADER, API_VERSION)
			.bearer_auth(token.token.expose())
			.json(&body)
			.send()
			.await
			.map_err(|source| GithubError::Network { stage: STAGE, source })?;
		let status = response.status();

		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();

			return Err(GithubError::Status { stage: STAGE, status: status.as_u16(), body });
		}

		Ok(())
	}

	fn endpoint(&self, path: &str) -> String {
		format!("{}/{}", self.api_base_url.as_str().trim_end_matches('/'), path)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use jsonwebtoken::{DecodingKey, Validation};
	// self
	use super::*;

	fn test_credentials() -> AppCredentials {
		AppCredentials::with_key("12345", EncodingKey::from_secret(b"test-key"), Algorithm::HS256)
	}

	#[test]
	fn minted_jwt_carries_the_app_claims() {
		#[derive(Deserialize)]
		struct Claims {
			iat: i64,
			exp: i64,
			iss: String,
		}

		let now = OffsetDateTime::now_utc();
		let jwt = test_credentials().mint_jwt(now).expect("JWT should sign with an HMAC key.");
		let mut validation = Validation::new(Algorithm::HS256);

		validation.set_issuer(&["12345"]);

		let decoded = jsonwebtoken::decode::<Claims>(
			&jwt,
			&DecodingKey::from_secret(b"test-key"),
			&validation,
		)
		.expect("JWT should decode with the same key.");

		assert_eq!(decoded.claims.iss, "12345");
		assert_eq!(decoded.claims.iat, now.unix_timestamp() - JWT_IAT_LEEWAY_SECS);
		assert_eq!(decoded.claims.exp, now.unix_timestamp() + JWT_TTL_SECS);
	}

	#[test]
	fn rsa_credentials_reject_junk_pem() {
		let result = AppCredentials::from_rsa_pem("12345", &Secret::new("not a pem"));

		assert!(matches!(result, Err(ConfigError::InvalidPrivateKey(_))));
	}

	#[test]
	fn credentials_debug_redacts_the_key() {
		let rendered = format!("{:?}", test_credentials());

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("test-key"));
	}

	#[test]
	fn endpoints_tolerate_trailing_slashes() {
		let config = RelayConfig {
			port: 0,
			webhook_secret: Secret::new("secret"),
			app_id: "12345".into(),
			private_key: Secret::new("unused"),
			api_base_url: Url::parse("https://ghe.example.com/api/v3/")
				.expect("Base URL should parse."),
		};
		let client = GithubClient::with_credentials(&config, test_credentials())
			.expect("Client should build.");

		assert_eq!(
			client.endpoint("repos/acme/widgets/dispatches"),
			"https://ghe.example.com/api/v3/repos/acme/widgets/dispatches",
		);
	}
}

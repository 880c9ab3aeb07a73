//! Webhook HMAC-SHA256 signing and verification.
//!
//! GitHub signs each delivery as `sha256=<lower-hex digest>` computed over the exact raw body
//! bytes with the shared webhook secret. Verification recomputes the digest from the same raw
//! bytes (never from a re-serialized form) and compares in constant time.

// crates.io
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Scheme tag prefixing every signature header value.
pub const SIGNATURE_SCHEME: &str = "sha256=";

/// Signs `body` with `secret`, producing the full header value (`sha256=<hex>`).
pub fn sign(secret: &[u8], body: &[u8]) -> String {
	format!("{SIGNATURE_SCHEME}{}", hex::encode(compute_digest(secret, body)))
}

/// Verifies a sender-supplied signature header against the raw request body.
///
/// Malformed headers (missing scheme tag, non-hex payload) yield `false` just like digest
/// mismatches; a `false` verdict is an authentication failure, not an error.
pub fn verify(secret: &[u8], body: &[u8], signature: &str) -> bool {
	let Some(supplied_hex) = signature.strip_prefix(SIGNATURE_SCHEME) else {
		return false;
	};
	let Ok(supplied) = hex::decode(supplied_hex) else {
		return false;
	};

	compute_digest(secret, body).ct_eq(supplied.as_slice()).into()
}

fn compute_digest(secret: &[u8], body: &[u8]) -> Vec<u8> {
	// HMAC accepts keys of any length, so construction cannot fail.
	let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC key of any length");

	mac.update(body);

	mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const SECRET: &[u8] = b"it's a secret to everybody";
	const BODY: &[u8] = br#"{"alert":{"number":7}}"#;

	#[test]
	fn sign_then_verify_roundtrips() {
		let header = sign(SECRET, BODY);

		assert!(header.starts_with(SIGNATURE_SCHEME));
		assert!(verify(SECRET, BODY, &header));
	}

	#[test]
	fn verify_rejects_mutated_body() {
		let header = sign(SECRET, BODY);
		let mut tampered = BODY.to_vec();

		tampered[0] ^= 0x01;

		assert!(!verify(SECRET, &tampered, &header));
	}

	#[test]
	fn verify_rejects_mutated_signature() {
		let mut header = sign(SECRET, BODY).into_bytes();
		let last = header.len() - 1;

		header[last] = if header[last] == b'0' { b'1' } else { b'0' };

		let header = String::from_utf8(header).expect("hex stays ASCII after mutation");

		assert!(!verify(SECRET, BODY, &header));
	}

	#[test]
	fn verify_rejects_wrong_secret() {
		let header = sign(SECRET, BODY);

		assert!(!verify(b"another secret", BODY, &header));
	}

	#[test]
	fn verify_rejects_malformed_headers() {
		assert!(!verify(SECRET, BODY, ""));
		assert!(!verify(SECRET, BODY, "sha1=deadbeef"));
		assert!(!verify(SECRET, BODY, "sha256=not-hex"));
		assert!(!verify(SECRET, BODY, "sha256=abc"));
	}

	#[test]
	fn verify_rejects_truncated_digest() {
		let header = sign(SECRET, BODY);

		assert!(!verify(SECRET, BODY, &header[..header.len() - 2]));
	}
}

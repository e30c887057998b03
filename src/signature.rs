//! Keyed-hash message signing with the timestamp bound into the digest.
//!
//! The digest covers `data` followed by the decimal Unix-seconds timestamp, so a signature can
//! never be replayed under a different timestamp. [`verify_at`] additionally enforces a symmetric
//! replay window that tolerates bounded clock skew in both directions and rejects stale and
//! future-dated signatures alike, without any server-side nonce storage.

// crates.io
use hmac::{Hmac, Mac, digest::KeyInit};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::ValidationError,
	validate::{self, require},
};

/// Replay window applied when the caller does not supply one.
pub const DEFAULT_REPLAY_WINDOW: Duration = Duration::minutes(5);

/// Keyed-hash variants supported by the codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
	/// HMAC over SHA-1 (160-bit digest).
	#[serde(rename = "HMAC-SHA1")]
	HmacSha1,
	/// HMAC over SHA-256 (256-bit digest).
	#[serde(rename = "HMAC-SHA256")]
	HmacSha256,
	/// HMAC over SHA-512 (512-bit digest).
	#[serde(rename = "HMAC-SHA512")]
	HmacSha512,
}
impl SignatureAlgorithm {
	/// Returns the wire name of the algorithm.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::HmacSha1 => "HMAC-SHA1",
			Self::HmacSha256 => "HMAC-SHA256",
			Self::HmacSha512 => "HMAC-SHA512",
		}
	}

	/// Digest width in bytes.
	pub const fn digest_len(self) -> usize {
		match self {
			Self::HmacSha1 => 20,
			Self::HmacSha256 => 32,
			Self::HmacSha512 => 64,
		}
	}

	fn digest(self, secret: &[u8], data: &[u8], unix_seconds: i64) -> Result<Vec<u8>> {
		let digest = match self {
			Self::HmacSha1 => keyed::<Hmac<Sha1>>(secret, data, unix_seconds)?.finalize(),
			Self::HmacSha256 => keyed::<Hmac<Sha256>>(secret, data, unix_seconds)?.finalize(),
			Self::HmacSha512 => keyed::<Hmac<Sha512>>(secret, data, unix_seconds)?.finalize(),
		};

		Ok(digest)
	}

	fn matches(self, secret: &[u8], data: &[u8], unix_seconds: i64, expected: &[u8]) -> Result<bool> {
		let matched = match self {
			Self::HmacSha1 => keyed::<Hmac<Sha1>>(secret, data, unix_seconds)?.verify(expected),
			Self::HmacSha256 => keyed::<Hmac<Sha256>>(secret, data, unix_seconds)?.verify(expected),
			Self::HmacSha512 => keyed::<Hmac<Sha512>>(secret, data, unix_seconds)?.verify(expected),
		};

		Ok(matched)
	}
}
impl Display for SignatureAlgorithm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for SignatureAlgorithm {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"HMAC-SHA1" => Ok(Self::HmacSha1),
			"HMAC-SHA256" => Ok(Self::HmacSha256),
			"HMAC-SHA512" => Ok(Self::HmacSha512),
			_ => Err(Error::UnsupportedAlgorithm { algorithm: s.to_owned() }),
		}
	}
}

/// Signature output plus the timestamp that was bound into it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSignature {
	/// Lowercase hex digest.
	pub signature: String,
	/// Unix-seconds timestamp covered by the digest.
	pub timestamp: i64,
	/// Algorithm used.
	pub algorithm: SignatureAlgorithm,
}

/// Sign-message record (`algorithm`, `secret`, `data` all required).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SignRequest {
	/// Algorithm name, e.g. `HMAC-SHA256`.
	#[serde(default, alias = "signing_method")]
	pub algorithm: Option<String>,
	/// Signing secret.
	#[serde(default)]
	pub secret: Option<Credential>,
	/// Payload to sign; may be empty but must be present.
	#[serde(default)]
	pub data: Option<String>,
}
impl SignRequest {
	/// Validates the record and signs it at `now`.
	pub fn sign_at(self, now: OffsetDateTime) -> Result<MessageSignature> {
		let algorithm: SignatureAlgorithm = require("algorithm", self.algorithm.as_deref())?.parse()?;
		let secret = self.secret.ok_or(ValidationError::Missing { field: "secret" })?;
		let data = self.data.ok_or(ValidationError::Missing { field: "data" })?;
		let signature = sign(now, algorithm, data.as_bytes(), &secret)?;

		Ok(MessageSignature { signature, timestamp: now.unix_timestamp(), algorithm })
	}
}

/// Verify-message record; `window` defaults to the configured replay window.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct VerifyRequest {
	/// Hex signature to check.
	#[serde(default)]
	pub signature: Option<String>,
	/// Unix-seconds timestamp the signature claims.
	#[serde(default)]
	pub timestamp: Option<i64>,
	/// Algorithm name.
	#[serde(default, alias = "signing_method")]
	pub algorithm: Option<String>,
	/// Verification secret.
	#[serde(default)]
	pub secret: Option<Credential>,
	/// Payload that was signed.
	#[serde(default)]
	pub data: Option<String>,
	/// Replay window as a duration string (`5m`, `30s`).
	#[serde(default, alias = "ttl")]
	pub window: Option<String>,
}
impl VerifyRequest {
	/// Validates the record and verifies it at `now`.
	pub fn verify_at(self, default_window: Duration, now: OffsetDateTime) -> Result<()> {
		let signature = require("signature", self.signature.as_deref())?;
		let timestamp = match self.timestamp {
			Some(value) if value > 0 => unix_to_datetime(value)?,
			Some(_) => return Err(ValidationError::NotPositive { field: "timestamp" }.into()),
			None => return Err(ValidationError::Missing { field: "timestamp" }.into()),
		};
		let algorithm: SignatureAlgorithm = require("algorithm", self.algorithm.as_deref())?.parse()?;
		let secret = self.secret.as_ref().ok_or(ValidationError::Missing { field: "secret" })?;
		let data = self.data.as_deref().ok_or(ValidationError::Missing { field: "data" })?;
		let window = validate::parse_duration_or("window", self.window.as_deref(), default_window)?;

		verify_at(signature, timestamp, algorithm, data.as_bytes(), secret, window, now)
	}
}

/// Computes the lowercase hex signature of `data` bound to `timestamp`.
pub fn sign(
	timestamp: OffsetDateTime,
	algorithm: SignatureAlgorithm,
	data: &[u8],
	secret: &Credential,
) -> Result<String> {
	ensure_secret(secret)?;

	let digest = algorithm.digest(secret.expose(), data, timestamp.unix_timestamp())?;

	Ok(hex::encode(digest))
}

/// Verifies `signature` against the current clock; `window` defaults to five minutes.
pub fn verify(
	signature: &str,
	timestamp: OffsetDateTime,
	algorithm: SignatureAlgorithm,
	data: &[u8],
	secret: &Credential,
	window: Option<Duration>,
) -> Result<()> {
	verify_at(
		signature,
		timestamp,
		algorithm,
		data,
		secret,
		window.unwrap_or(DEFAULT_REPLAY_WINDOW),
		OffsetDateTime::now_utc(),
	)
}

/// Verifies `signature` as of `now`.
///
/// Rejects with [`Error::ExpiredTimestamp`] unless `timestamp` lies within `window` of `now` in
/// either direction, then with [`Error::InvalidSignature`] unless `signature` is exactly the
/// lowercase hex of the recomputed digest. The digest comparison runs in constant time.
pub fn verify_at(
	signature: &str,
	timestamp: OffsetDateTime,
	algorithm: SignatureAlgorithm,
	data: &[u8],
	secret: &Credential,
	window: Duration,
	now: OffsetDateTime,
) -> Result<()> {
	ensure_secret(secret)?;
	validate::ensure_positive("window", window)?;

	let skew = now - timestamp;

	if skew > window || -skew > window {
		return Err(Error::ExpiredTimestamp { window: window.whole_seconds() });
	}

	let canonical = signature.len() == algorithm.digest_len() * 2
		&& signature.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

	if !canonical {
		return Err(Error::InvalidSignature);
	}

	let expected = hex::decode(signature).map_err(|_| Error::InvalidSignature)?;

	if algorithm.matches(secret.expose(), data, timestamp.unix_timestamp(), &expected)? {
		Ok(())
	} else {
		Err(Error::InvalidSignature)
	}
}

/// Running MAC keyed with the secret and already fed with the signed payload.
struct Keyed<M>(M);
impl<M> Keyed<M>
where
	M: Mac,
{
	fn finalize(self) -> Vec<u8> {
		self.0.finalize().into_bytes().to_vec()
	}

	fn verify(self, expected: &[u8]) -> bool {
		self.0.verify_slice(expected).is_ok()
	}
}

fn keyed<M>(secret: &[u8], data: &[u8], unix_seconds: i64) -> Result<Keyed<M>>
where
	M: Mac + KeyInit,
{
	let mut mac = <M as KeyInit>::new_from_slice(secret).map_err(|_| {
		ValidationError::Malformed { field: "secret", reason: "unusable key length".into() }
	})?;

	mac.update(data);
	mac.update(unix_seconds.to_string().as_bytes());

	Ok(Keyed(mac))
}

fn ensure_secret(secret: &Credential) -> Result<(), ValidationError> {
	if secret.is_empty() { Err(ValidationError::Missing { field: "secret" }) } else { Ok(()) }
}

fn unix_to_datetime(value: i64) -> Result<OffsetDateTime, ValidationError> {
	OffsetDateTime::from_unix_timestamp(value)
		.map_err(|e| ValidationError::Malformed { field: "timestamp", reason: e.to_string() })
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	const T0: OffsetDateTime = macros::datetime!(2025-06-01 12:00 UTC);

	fn secret() -> Credential {
		Credential::from("gateway-secret")
	}

	#[test]
	fn signatures_are_lowercase_hex_of_digest_width() {
		for algorithm in [
			SignatureAlgorithm::HmacSha1,
			SignatureAlgorithm::HmacSha256,
			SignatureAlgorithm::HmacSha512,
		] {
			let signature = sign(T0, algorithm, b"payload", &secret())
				.expect("Signing with a supported algorithm should succeed.");

			assert_eq!(signature.len(), algorithm.digest_len() * 2);
			assert!(signature.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
		}
	}

	#[test]
	fn timestamp_is_bound_into_digest() {
		let a = sign(T0, SignatureAlgorithm::HmacSha256, b"payload", &secret())
			.expect("First signature should succeed.");
		let b = sign(T0 + Duration::seconds(1), SignatureAlgorithm::HmacSha256, b"payload", &secret())
			.expect("Second signature should succeed.");

		assert_ne!(a, b);
		assert_eq!(
			a,
			sign(T0, SignatureAlgorithm::HmacSha256, b"payload", &secret())
				.expect("Repeated signature should succeed.")
		);
	}

	#[test]
	fn digest_matches_payload_followed_by_decimal_timestamp() {
		let mut mac = <Hmac<Sha256> as KeyInit>::new_from_slice(b"gateway-secret")
			.expect("HMAC accepts keys of any length.");

		mac.update(b"payload");
		mac.update(T0.unix_timestamp().to_string().as_bytes());

		let expected = hex::encode(mac.finalize().into_bytes());

		assert_eq!(
			sign(T0, SignatureAlgorithm::HmacSha256, b"payload", &secret())
				.expect("Signing should succeed."),
			expected
		);
	}

	#[test]
	fn algorithm_gate_rejects_unknown_names() {
		let err = "HMAC-MD5".parse::<SignatureAlgorithm>().expect_err("MD5 must be rejected.");

		assert!(matches!(err, Error::UnsupportedAlgorithm { ref algorithm } if algorithm == "HMAC-MD5"));

		let err = SignRequest {
			algorithm: Some("HMAC-MD5".into()),
			secret: Some(secret()),
			data: Some("payload".into()),
		}
		.sign_at(T0)
		.expect_err("Unsupported algorithms must not produce a signature.");

		assert!(matches!(err, Error::UnsupportedAlgorithm { .. }));
	}

	#[test]
	fn replay_window_is_symmetric_and_inclusive() {
		let window = Duration::minutes(5);
		let signature = sign(T0, SignatureAlgorithm::HmacSha512, b"payload", &secret())
			.expect("Signing should succeed.");
		let check = |now| {
			verify_at(
				&signature,
				T0,
				SignatureAlgorithm::HmacSha512,
				b"payload",
				&secret(),
				window,
				now,
			)
		};

		check(T0 + window).expect("Signature at the window edge should verify.");
		check(T0 - window).expect("Future-dated signature at the window edge should verify.");
		assert!(matches!(
			check(T0 + window + Duration::seconds(1)),
			Err(Error::ExpiredTimestamp { window: 300 })
		));
		assert!(matches!(
			check(T0 - window - Duration::seconds(1)),
			Err(Error::ExpiredTimestamp { .. })
		));
	}

	#[test]
	fn non_hex_signature_is_invalid() {
		let err = verify_at(
			"not-hex",
			T0,
			SignatureAlgorithm::HmacSha256,
			b"payload",
			&secret(),
			DEFAULT_REPLAY_WINDOW,
			T0,
		)
		.expect_err("Garbage signatures must be rejected.");

		assert!(matches!(err, Error::InvalidSignature));
	}

	#[test]
	fn only_the_exact_lowercase_signature_verifies() {
		let signature = sign(T0, SignatureAlgorithm::HmacSha256, b"payload", &secret())
			.expect("Signing should succeed.");
		let check = |candidate: &str| {
			verify_at(
				candidate,
				T0,
				SignatureAlgorithm::HmacSha256,
				b"payload",
				&secret(),
				DEFAULT_REPLAY_WINDOW,
				T0,
			)
		};

		check(&signature).expect("The exact signature should verify.");
		assert!(matches!(check(&signature.to_uppercase()), Err(Error::InvalidSignature)));
		assert!(matches!(check(&signature[..62]), Err(Error::InvalidSignature)));
		assert!(matches!(check(&format!("{signature}00")), Err(Error::InvalidSignature)));
	}

	#[test]
	fn verify_request_requires_fields_and_positive_timestamp() {
		let err = VerifyRequest { timestamp: Some(1), ..Default::default() }
			.verify_at(DEFAULT_REPLAY_WINDOW, T0)
			.expect_err("Missing signature must be rejected.");

		assert!(matches!(
			err,
			Error::Validation(ValidationError::Missing { field: "signature" })
		));

		let err = VerifyRequest {
			signature: Some("00".into()),
			timestamp: Some(0),
			..Default::default()
		}
		.verify_at(DEFAULT_REPLAY_WINDOW, T0)
		.expect_err("Zero timestamps must be rejected.");

		assert!(matches!(
			err,
			Error::Validation(ValidationError::NotPositive { field: "timestamp" })
		));
	}

	#[test]
	fn verify_request_honors_window_override() {
		let signature = sign(T0, SignatureAlgorithm::HmacSha256, b"payload", &secret())
			.expect("Signing should succeed.");
		let request = |window: Option<&str>| VerifyRequest {
			signature: Some(signature.clone()),
			timestamp: Some(T0.unix_timestamp()),
			algorithm: Some("HMAC-SHA256".into()),
			secret: Some(secret()),
			data: Some("payload".into()),
			window: window.map(Into::into),
		};
		let later = T0 + Duration::minutes(10);

		assert!(matches!(
			request(None).verify_at(DEFAULT_REPLAY_WINDOW, later),
			Err(Error::ExpiredTimestamp { .. })
		));

		request(Some("15m"))
			.verify_at(DEFAULT_REPLAY_WINDOW, later)
			.expect("A wider caller-supplied window should accept the signature.");
	}
}

//! Bearer-token issuance and validation over HMAC-signed JWTs.
//!
//! Tokens carry [`Claims`] and are signed with a caller-supplied secret; nothing is stored
//! server-side. A token stays valid for its whole lifetime unless it expires, because there is
//! no revocation list. Expiry is evaluated by this module against an explicit instant with zero
//! leeway so [`Error::Expired`] stays distinct from structural failures.

// crates.io
use jsonwebtoken::{
	Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind as JwtErrorKind,
};
// self
use crate::{
	_prelude::*,
	auth::{Claims, Credential, DEFAULT_ISSUER, SubjectId},
	error::ValidationError,
	validate::{self, require},
};

/// Signing scheme used when the caller does not name one.
pub const DEFAULT_TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Algorithms a shared secret can verify.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Opaque bearer token returned by [`issue`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
	/// Compact JWT string.
	pub token: String,
}
impl Debug for IssuedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuedToken").field("token", &"<redacted>").finish()
	}
}

/// Issue-token record (`secret`, `subject`, `ttl` required).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IssueRequest {
	/// Subject the token is issued for.
	#[serde(default, alias = "user_id")]
	pub subject: Option<String>,
	/// Signing scheme name; defaults to `HS256`.
	#[serde(default, alias = "signing_method")]
	pub algorithm: Option<String>,
	/// Signing secret.
	#[serde(default)]
	pub secret: Option<Credential>,
	/// Lifetime as a duration string (`1h`, `15m`).
	#[serde(default)]
	pub ttl: Option<String>,
	/// Issuer name; defaults to the gateway issuer.
	#[serde(default)]
	pub issuer: Option<String>,
}
impl IssueRequest {
	/// Validates the record and issues a token at `now`, applying the supplied defaults.
	pub fn issue_at(
		self,
		default_algorithm: Algorithm,
		default_issuer: &str,
		now: OffsetDateTime,
	) -> Result<IssuedToken> {
		let algorithm = match self.algorithm.as_deref() {
			Some(name) if !name.is_empty() => parse_algorithm(name)?,
			_ => default_algorithm,
		};
		let secret = self.secret.ok_or(ValidationError::Missing { field: "secret" })?;
		let subject = SubjectId::new(require("subject", self.subject.as_deref())?)?;
		let ttl = require("ttl", self.ttl.as_deref())?;
		let ttl = validate::to_signed("ttl", validate::parse_positive_duration("ttl", ttl)?)?;
		let issuer = match self.issuer {
			Some(issuer) if !issuer.is_empty() => issuer,
			_ => default_issuer.to_owned(),
		};

		issue_at(subject, algorithm, &secret, ttl, &issuer, now)
	}
}

/// Validate-token record (`token`, `secret` required).
#[derive(Clone, Default, Deserialize)]
pub struct ValidateRequest {
	/// Compact JWT string.
	#[serde(default)]
	pub token: Option<String>,
	/// Verification secret.
	#[serde(default)]
	pub secret: Option<Credential>,
}
impl ValidateRequest {
	/// Validates the record and the token at `now`.
	pub fn validate_at(self, now: OffsetDateTime) -> Result<Claims> {
		let token = require("token", self.token.as_deref())?;
		let secret = self.secret.ok_or(ValidationError::Missing { field: "secret" })?;

		validate_at(token, &secret, now)
	}
}
impl Debug for ValidateRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ValidateRequest")
			.field("token", &self.token.as_ref().map(|_| "<redacted>"))
			.field("secret", &self.secret)
			.finish()
	}
}

/// Returns `true` when `algorithm` can be keyed by a shared secret.
pub fn supports_secret(algorithm: Algorithm) -> bool {
	HMAC_ALGORITHMS.contains(&algorithm)
}

/// Parses a signing scheme name such as `HS256`.
pub fn parse_algorithm(name: &str) -> Result<Algorithm> {
	Algorithm::from_str(name).map_err(|_| Error::UnsupportedAlgorithm { algorithm: name.to_owned() })
}

/// Issues a token for `subject` valid from now for `ttl`.
pub fn issue(
	subject: SubjectId,
	algorithm: Algorithm,
	secret: &Credential,
	ttl: Duration,
	issuer: &str,
) -> Result<IssuedToken> {
	issue_at(subject, algorithm, secret, ttl, issuer, OffsetDateTime::now_utc())
}

/// Issues a token as of `now`; an empty `issuer` falls back to [`DEFAULT_ISSUER`].
///
/// Algorithms outside the HMAC family are recognized but cannot be keyed by a shared secret, so
/// they fail with [`Error::Signing`].
pub fn issue_at(
	subject: SubjectId,
	algorithm: Algorithm,
	secret: &Credential,
	ttl: Duration,
	issuer: &str,
	now: OffsetDateTime,
) -> Result<IssuedToken> {
	if secret.is_empty() {
		return Err(ValidationError::Missing { field: "secret" }.into());
	}

	validate::ensure_positive("ttl", ttl)?;

	let issuer = if issuer.is_empty() { DEFAULT_ISSUER } else { issuer };
	let claims = Claims::new(subject, issuer, now, ttl)?;
	let token = jsonwebtoken::encode(
		&Header::new(algorithm),
		&claims,
		&EncodingKey::from_secret(secret.expose()),
	)
	.map_err(Error::signing)?;

	Ok(IssuedToken { token })
}

/// Validates `token` against the current clock.
pub fn validate(token: &str, secret: &Credential) -> Result<Claims> {
	validate_at(token, secret, OffsetDateTime::now_utc())
}

/// Verifies the signature and structure of `token`, then checks expiry as of `now`.
pub fn validate_at(token: &str, secret: &Credential, now: OffsetDateTime) -> Result<Claims> {
	if token.is_empty() {
		return Err(ValidationError::Missing { field: "token" }.into());
	}
	if secret.is_empty() {
		return Err(ValidationError::Missing { field: "secret" }.into());
	}

	let data =
		jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(secret.expose()), &validation())
			.map_err(map_decode_error)?;
	let claims = data.claims;

	if claims.issued_at > claims.expires_at {
		return Err(Error::InvalidClaims { reason: "issued after expiry".into() });
	}
	if claims.is_expired_at(now) {
		return Err(Error::Expired { expired_at: claims.expires_at });
	}

	Ok(claims)
}

fn validation() -> Validation {
	let mut validation = Validation::new(DEFAULT_TOKEN_ALGORITHM);

	validation.algorithms = HMAC_ALGORITHMS.to_vec();
	validation.leeway = 0;
	validation.validate_exp = false;
	validation.validate_nbf = false;
	validation.validate_aud = false;
	validation.set_required_spec_claims(&["exp", "iss", "sub"]);

	validation
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> Error {
	match err.kind() {
		JwtErrorKind::InvalidSignature
		| JwtErrorKind::InvalidAlgorithm
		| JwtErrorKind::InvalidAlgorithmName
		| JwtErrorKind::InvalidKeyFormat => Error::InvalidSignature,
		JwtErrorKind::MissingRequiredClaim(claim) =>
			Error::InvalidClaims { reason: format!("missing claim `{claim}`") },
		JwtErrorKind::Json(inner) => Error::InvalidClaims { reason: inner.to_string() },
		JwtErrorKind::InvalidToken | JwtErrorKind::Base64(_) | JwtErrorKind::Utf8(_) =>
			Error::InvalidClaims { reason: "token is malformed".into() },
		_ => Error::InvalidClaims { reason: "token failed validation".into() },
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{T0, test_credential as secret},
		auth::TokenStatus,
	};

	fn subject() -> SubjectId {
		SubjectId::new("u1").expect("Subject fixture should be valid.")
	}

	#[test]
	fn issue_then_validate_round_trips_claims() {
		let issued = issue_at(subject(), Algorithm::HS384, &secret(), Duration::hours(1), "", T0)
			.expect("Issuing with a valid secret should succeed.");
		let claims = validate_at(&issued.token, &secret(), T0 + Duration::minutes(5))
			.expect("Fresh tokens should validate.");

		assert_eq!(claims.subject.as_ref(), "u1");
		assert_eq!(claims.issuer, DEFAULT_ISSUER);
		assert_eq!(claims.issued_at, T0);
		assert_eq!(claims.expires_at, T0 + Duration::hours(1));
		assert_eq!(claims.status_at(T0), TokenStatus::Valid);
	}

	#[test]
	fn expiry_is_distinct_from_structural_failures() {
		let issued = issue_at(subject(), Algorithm::HS256, &secret(), Duration::hours(1), "edge", T0)
			.expect("Issuing should succeed.");
		let err = validate_at(&issued.token, &secret(), T0 + Duration::hours(1) + Duration::seconds(1))
			.expect_err("Tokens past expiry must be rejected.");

		assert!(matches!(err, Error::Expired { expired_at } if expired_at == T0 + Duration::hours(1)));

		let err = validate_at(&issued.token, &secret(), T0 + Duration::hours(1))
			.expect_err("Expiry is reached at the exact expiry instant.");

		assert!(matches!(err, Error::Expired { .. }));
	}

	#[test]
	fn wrong_secret_or_tampering_is_invalid_signature() {
		let issued = issue_at(subject(), Algorithm::HS256, &secret(), Duration::hours(1), "", T0)
			.expect("Issuing should succeed.");
		let err = validate_at(&issued.token, &Credential::from("other-secret"), T0)
			.expect_err("A different secret must not validate.");

		assert!(matches!(err, Error::InvalidSignature));

		let mut parts = issued.token.split('.').map(str::to_owned).collect::<Vec<_>>();
		let forged = Claims::new(
			SubjectId::new("admin").expect("Forged subject is valid."),
			"x",
			T0,
			Duration::days(365),
		)
		.expect("Forged claims should be in range.");

		parts[1] = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &forged, &EncodingKey::from_secret(b"k"))
			.expect("Forged token should encode.")
			.split('.')
			.nth(1)
			.expect("Compact tokens have a payload segment.")
			.to_owned();

		let err = validate_at(&parts.join("."), &secret(), T0)
			.expect_err("A swapped payload must not validate.");

		assert!(matches!(err, Error::InvalidSignature));
	}

	#[test]
	fn malformed_tokens_are_invalid_claims() {
		let err = validate_at("not-a-jwt", &secret(), T0).expect_err("Garbage must be rejected.");

		assert!(matches!(err, Error::InvalidClaims { .. }));

		#[derive(Serialize)]
		struct Partial {
			iss: String,
			exp: i64,
		}

		let partial = jsonwebtoken::encode(
			&Header::new(Algorithm::HS256),
			&Partial { iss: "edge".into(), exp: (T0 + Duration::hours(1)).unix_timestamp() },
			&EncodingKey::from_secret(secret().expose()),
		)
		.expect("Partial token should encode.");
		let err = validate_at(&partial, &secret(), T0).expect_err("Missing subject must be rejected.");

		assert!(matches!(err, Error::InvalidClaims { .. }));
	}

	#[test]
	fn algorithm_names_are_checked() {
		assert!(matches!(parse_algorithm("HS512"), Ok(Algorithm::HS512)));
		assert!(matches!(parse_algorithm("HS999"), Err(Error::UnsupportedAlgorithm { .. })));
		assert!(supports_secret(Algorithm::HS384));
		assert!(!supports_secret(Algorithm::ES256));

		let err = issue_at(subject(), Algorithm::RS256, &secret(), Duration::hours(1), "", T0)
			.expect_err("Asymmetric algorithms cannot be keyed by a shared secret.");

		assert!(matches!(err, Error::Signing { .. }));
	}

	#[test]
	fn issue_request_validates_fields_and_applies_defaults() {
		let request = |ttl: Option<&str>| IssueRequest {
			subject: Some("u1".into()),
			algorithm: None,
			secret: Some(secret()),
			ttl: ttl.map(Into::into),
			issuer: Some(String::new()),
		};
		let err = request(None)
			.issue_at(DEFAULT_TOKEN_ALGORITHM, DEFAULT_ISSUER, T0)
			.expect_err("TTL is required.");

		assert!(matches!(err, Error::Validation(ValidationError::Missing { field: "ttl" })));

		let err = request(Some("0s"))
			.issue_at(DEFAULT_TOKEN_ALGORITHM, DEFAULT_ISSUER, T0)
			.expect_err("TTL must be positive.");

		assert!(matches!(err, Error::Validation(ValidationError::NotPositive { field: "ttl" })));

		let issued = request(Some("1h"))
			.issue_at(DEFAULT_TOKEN_ALGORITHM, "edge-gw", T0)
			.expect("Valid issue requests should succeed.");
		let header = jsonwebtoken::decode_header(&issued.token).expect("Header should decode.");
		let claims = validate_at(&issued.token, &secret(), T0).expect("Token should validate.");

		assert_eq!(header.alg, Algorithm::HS256);
		assert_eq!(claims.issuer, "edge-gw");
	}

	#[test]
	fn oversized_ttl_is_a_validation_error() {
		let err = IssueRequest {
			subject: Some("u1".into()),
			algorithm: None,
			secret: Some(secret()),
			ttl: Some("100000years".into()),
			issuer: None,
		}
		.issue_at(DEFAULT_TOKEN_ALGORITHM, DEFAULT_ISSUER, T0)
		.expect_err("An expiry past the calendar range must be rejected.");

		assert!(matches!(err, Error::Validation(ValidationError::Malformed { field: "ttl", .. })));

		let err = issue_at(subject(), Algorithm::HS256, &secret(), Duration::MAX, "", T0)
			.expect_err("The typed API rejects the same overflow.");

		assert!(matches!(err, Error::Validation(ValidationError::Malformed { field: "ttl", .. })));
	}

	#[test]
	fn issued_token_debug_is_redacted() {
		let issued = IssuedToken { token: "a.b.c".into() };

		assert_eq!(format!("{issued:?}"), "IssuedToken { token: \"<redacted>\" }");
	}
}

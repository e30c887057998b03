//! Immutable bearer-token claims and lifecycle helpers.

// self
use crate::{_prelude::*, auth::SubjectId, error::ValidationError};

/// Issuer recorded when the caller does not name one.
pub const DEFAULT_ISSUER: &str = "IxO-Gateway";

/// Current lifecycle status for issued claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Claims are inside their validity period.
	Valid,
	/// Claims reached their expiry instant.
	Expired,
}

/// Signed assertions about a subject and its validity period.
///
/// Serialized with the registered JWT claim names; timestamps travel as Unix seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// Identity the token was issued for.
	#[serde(rename = "sub")]
	pub subject: SubjectId,
	/// Issuer name.
	#[serde(rename = "iss")]
	pub issuer: String,
	/// Issued-at instant.
	#[serde(rename = "iat", with = "time::serde::timestamp")]
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	#[serde(rename = "exp", with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
}
impl Claims {
	/// Builds claims valid from `issued_at` for `ttl`.
	///
	/// Sub-second precision is dropped because the wire format carries whole seconds. Fails when
	/// the expiry instant is not representable.
	pub fn new(
		subject: SubjectId,
		issuer: impl Into<String>,
		issued_at: OffsetDateTime,
		ttl: Duration,
	) -> Result<Self, ValidationError> {
		let issued_at = issued_at.replace_nanosecond(0).unwrap_or(issued_at);
		let expires_at = issued_at.checked_add(ttl).ok_or_else(|| ValidationError::Malformed {
			field: "ttl",
			reason: "expiry is out of range".into(),
		})?;

		Ok(Self { subject, issuer: issuer.into(), issued_at, expires_at })
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant >= self.expires_at { TokenStatus::Expired } else { TokenStatus::Valid }
	}

	/// Returns `true` if the claims have expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Remaining validity at `instant`, zero once expired.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn subject() -> SubjectId {
		SubjectId::new("u1").expect("Subject fixture should be valid.")
	}

	#[test]
	fn status_transitions_at_expiry_boundary() {
		let claims = Claims::new(
			subject(),
			DEFAULT_ISSUER,
			macros::datetime!(2025-01-01 00:00 UTC),
			Duration::hours(1),
		)
		.expect("Claims fixture should be in range.");

		assert_eq!(claims.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
		assert_eq!(claims.status_at(macros::datetime!(2025-01-01 00:59:59 UTC)), TokenStatus::Valid);
		assert_eq!(claims.status_at(macros::datetime!(2025-01-01 01:00 UTC)), TokenStatus::Expired);
		assert!(claims.is_expired_at(macros::datetime!(2025-01-01 01:00:01 UTC)));
		assert_eq!(
			claims.remaining_at(macros::datetime!(2025-01-01 00:30 UTC)),
			Duration::minutes(30)
		);
		assert_eq!(claims.remaining_at(macros::datetime!(2025-01-02 00:00 UTC)), Duration::ZERO);
	}

	#[test]
	fn claims_serialize_with_registered_names() {
		let claims = Claims::new(
			subject(),
			"edge",
			macros::datetime!(2025-01-01 00:00:00.750 UTC),
			Duration::minutes(30),
		)
		.expect("Claims fixture should be in range.");
		let payload = serde_json::to_value(&claims).expect("Claims should serialize to JSON.");

		assert_eq!(payload["sub"], "u1");
		assert_eq!(payload["iss"], "edge");
		assert_eq!(payload["iat"], 1_735_689_600_i64);
		assert_eq!(payload["exp"], 1_735_691_400_i64);

		let round_trip: Claims =
			serde_json::from_value(payload).expect("Claims should deserialize from JSON.");

		assert_eq!(round_trip, claims);
	}

	#[test]
	fn unrepresentable_expiry_is_rejected() {
		let err = Claims::new(
			subject(),
			DEFAULT_ISSUER,
			macros::datetime!(2025-01-01 00:00 UTC),
			Duration::days(365 * 100_000),
		)
		.expect_err("Expiry beyond the supported calendar must be rejected.");

		assert!(matches!(err, ValidationError::Malformed { field: "ttl", .. }));
	}
}

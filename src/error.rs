//! Gateway-level error types shared by the signature codec, token issuer, and admission limiter.

// self
use crate::{_prelude::*, context::CancelReason};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
///
/// Every variant terminates the call without partial effect. Messages never carry secrets,
/// tokens, signatures, or request bodies.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Missing or malformed input field.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Structural admission cache failure.
	#[error(transparent)]
	Cache(#[from] CacheError),
	/// Upstream transport failure raised by the forwarding passthrough.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Algorithm name is not one the gateway can sign with.
	#[error("Unsupported algorithm: {algorithm}.")]
	UnsupportedAlgorithm {
		/// Algorithm name supplied by the caller.
		algorithm: String,
	},
	/// Signature does not match the recomputed digest, or the token failed verification.
	#[error("Signature is invalid.")]
	InvalidSignature,
	/// Signed message timestamp falls outside the replay window.
	#[error("Timestamp is outside the {window}-second replay window.")]
	ExpiredTimestamp {
		/// Replay window applied, in whole seconds.
		window: i64,
	},
	/// Token claims are malformed or missing.
	#[error("Token claims are invalid: {reason}.")]
	InvalidClaims {
		/// Structural reason reported by the validator.
		reason: String,
	},
	/// Token passed its expiry instant.
	#[error("Token expired at {expired_at}.")]
	Expired {
		/// Expiry instant embedded in the token.
		expired_at: OffsetDateTime,
	},
	/// Token could not be signed with the requested algorithm and secret.
	#[error("Token could not be signed.")]
	Signing {
		/// Underlying signing failure.
		#[source]
		source: BoxError,
	},
	/// Admission denied because the bucket is empty.
	#[error("Too many requests for limiter `{key}`.")]
	TooManyRequests {
		/// Limiter key that rejected the call.
		key: String,
		/// Earliest delay after which a token is expected, when a refill is possible.
		retry_after: Option<std::time::Duration>,
	},
	/// Call was aborted before it could complete.
	#[error("Call was canceled: {reason}.")]
	Canceled {
		/// Cancellation cause.
		reason: CancelReason,
	},
}
impl Error {
	/// Wraps a signing backend failure.
	pub fn signing(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Signing { source: Box::new(src) }
	}

	/// Returns the stable kind label for this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Validation(_) => ErrorKind::Validation,
			Self::Cache(_) => ErrorKind::InternalCache,
			Self::Transport(_) => ErrorKind::Transport,
			Self::UnsupportedAlgorithm { .. } => ErrorKind::UnsupportedAlgorithm,
			Self::InvalidSignature => ErrorKind::InvalidSignature,
			Self::ExpiredTimestamp { .. } => ErrorKind::ExpiredTimestamp,
			Self::InvalidClaims { .. } => ErrorKind::InvalidClaims,
			Self::Expired { .. } => ErrorKind::Expired,
			Self::Signing { .. } => ErrorKind::Signing,
			Self::TooManyRequests { .. } => ErrorKind::TooManyRequests,
			Self::Canceled { .. } => ErrorKind::Canceled,
		}
	}
}

/// Stable error classification surfaced by dispatchers next to the human-readable message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Missing or malformed input field.
	Validation,
	/// Unknown algorithm name.
	UnsupportedAlgorithm,
	/// Signature or token verification failed.
	InvalidSignature,
	/// Signed message outside the replay window.
	ExpiredTimestamp,
	/// Malformed token claims.
	InvalidClaims,
	/// Token expired.
	Expired,
	/// Token signing failed.
	Signing,
	/// Admission denied.
	TooManyRequests,
	/// Wait aborted by cancellation or deadline.
	Canceled,
	/// Admission cache failure.
	InternalCache,
	/// Forwarding transport failure.
	Transport,
}
impl ErrorKind {
	/// Returns a stable label suitable for responses, span fields, or metric labels.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Validation => "validation_error",
			Self::UnsupportedAlgorithm => "unsupported_algorithm",
			Self::InvalidSignature => "invalid_signature",
			Self::ExpiredTimestamp => "expired_timestamp",
			Self::InvalidClaims => "invalid_claims",
			Self::Expired => "expired",
			Self::Signing => "signing_error",
			Self::TooManyRequests => "too_many_requests",
			Self::Canceled => "canceled",
			Self::InternalCache => "internal_cache_error",
			Self::Transport => "transport_error",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Input validation failures; each names the offending field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ValidationError {
	/// Required field was absent or empty.
	#[error("Field `{field}` is required.")]
	Missing {
		/// Field name.
		field: &'static str,
	},
	/// Field was present but could not be interpreted.
	#[error("Field `{field}` is malformed: {reason}.")]
	Malformed {
		/// Field name.
		field: &'static str,
		/// Parser-supplied reason.
		reason: String,
	},
	/// Numeric or duration field must be strictly positive.
	#[error("Field `{field}` must be positive.")]
	NotPositive {
		/// Field name.
		field: &'static str,
	},
	/// Generic request record could not be decoded into a typed request.
	#[error("Request could not be decoded at `{path}`: {reason}.")]
	Decode {
		/// Path to the offending field within the record.
		path: String,
		/// Decoder-supplied reason.
		reason: String,
	},
}

/// Structural admission cache failures; fatal to the call and never retried internally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Entry deadline cannot be represented by the monotonic clock.
	#[error("Cache entry deadline for `{key}` exceeds the supported range.")]
	DeadlineOverflow {
		/// Limiter key being inserted.
		key: String,
	},
}

/// Transport-level failures surfaced by the forwarding passthrough.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a failure.
	#[error("Network error occurred while calling the upstream server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn validation_error_converts_with_source() {
		let validation = ValidationError::Missing { field: "secret" };
		let error: Error = validation.clone().into();

		assert_eq!(error.kind(), ErrorKind::Validation);
		assert_eq!(error.to_string(), "Field `secret` is required.");

		let source = StdError::source(&error);

		assert!(source.is_none(), "Transparent variants forward the inner source.");
		assert_eq!(validation.to_string(), error.to_string());
	}

	#[test]
	fn kind_labels_are_stable() {
		let too_many = Error::TooManyRequests { key: "route-a".into(), retry_after: None };

		assert_eq!(too_many.kind().as_str(), "too_many_requests");
		assert_eq!(Error::InvalidSignature.kind().to_string(), "invalid_signature");
		assert_eq!(
			Error::Canceled { reason: CancelReason::DeadlineExceeded }.kind(),
			ErrorKind::Canceled
		);
		assert_eq!(
			serde_json::to_string(&ErrorKind::InternalCache)
				.expect("ErrorKind should serialize to JSON."),
			"\"internal_cache\""
		);
	}

	#[test]
	fn messages_stay_free_of_caller_payloads() {
		let error = Error::InvalidClaims { reason: "missing field `sub`".into() };

		assert_eq!(error.to_string(), "Token claims are invalid: missing field `sub`.");
		assert_eq!(
			Error::ExpiredTimestamp { window: 300 }.to_string(),
			"Timestamp is outside the 300-second replay window."
		);
	}
}

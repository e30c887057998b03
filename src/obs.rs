//! Optional observability helpers for gateway operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `gateway_guard.operation` with the
//!   `operation` field.
//! - Enable `metrics` to increment the `gateway_guard_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`; failures also carry
//!   `error_kind`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Gateway operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// HMAC message signing.
	SignMessage,
	/// HMAC message verification.
	VerifyMessage,
	/// Bearer token issuance.
	IssueToken,
	/// Bearer token validation.
	ValidateToken,
	/// Admission check.
	Admission,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::SignMessage => "sign_message",
			OperationKind::VerifyMessage => "verify_message",
			OperationKind::IssueToken => "issue_token",
			OperationKind::ValidateToken => "validate_token",
			OperationKind::Admission => "admit",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

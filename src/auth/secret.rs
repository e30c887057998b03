//! Call-scoped credential wrapper that redacts sensitive material.

// self
use crate::_prelude::*;

/// Opaque secret bytes supplied for a single call.
///
/// The gateway never stores a credential beyond the call that received it, and its formatters
/// never print the underlying bytes.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct Credential(Vec<u8>);
impl Credential {
	/// Wraps secret bytes.
	pub fn new(value: impl Into<Vec<u8>>) -> Self {
		Self(value.into())
	}

	/// Returns the raw secret. Callers must avoid logging these bytes.
	pub fn expose(&self) -> &[u8] {
		&self.0
	}

	/// Returns `true` when no secret material was supplied.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<&str> for Credential {
	fn from(value: &str) -> Self {
		Self::new(value.as_bytes())
	}
}
impl From<String> for Credential {
	fn from(value: String) -> Self {
		Self::new(value.into_bytes())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Credential").field(&"<redacted>").finish()
	}
}
impl Display for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

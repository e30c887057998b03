//! Strongly typed identifiers for token subjects and limiter keys.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::{_prelude::*, error::ValidationError};

macro_rules! def_id {
	($name:ident, $doc:literal, $field:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
				let view = value.as_ref();

				validate_view($field, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = ValidationError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($field, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!(stringify!($name), "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = ValidationError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

def_id! { SubjectId, "User identifier carried as the subject of a bearer token.", "subject" }
def_id! { LimiterKey, "Caller-chosen name of a throttled resource (route, account id, ...).", "key" }

fn validate_view(field: &'static str, view: &str) -> Result<(), ValidationError> {
	if view.is_empty() {
		return Err(ValidationError::Missing { field });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_empty_values() {
		assert_eq!(SubjectId::new(""), Err(ValidationError::Missing { field: "subject" }));
		assert_eq!(LimiterKey::new(""), Err(ValidationError::Missing { field: "key" }));

		let key = LimiterKey::new("GET /api/user").expect("Route keys may contain spaces.");

		assert_eq!(key.as_ref(), "GET /api/user");
		assert_eq!(format!("{key:?}"), "LimiterKey(GET /api/user)");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let subject: SubjectId =
			serde_json::from_str("\"u1\"").expect("Subject should deserialize successfully.");

		assert_eq!(subject.as_ref(), "u1");
		assert!(serde_json::from_str::<SubjectId>("\"\"").is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<LimiterKey, u8> = HashMap::from_iter([(
			LimiterKey::new("account-42").expect("Limiter key used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("account-42"), Some(&7));
	}
}

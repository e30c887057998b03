//! Required-field and duration helpers shared by request records.

// self
use crate::{_prelude::*, error::ValidationError};

/// Returns the value when present and non-empty.
pub(crate) fn require<'a>(
	field: &'static str,
	value: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
	match value {
		Some(view) if !view.is_empty() => Ok(view),
		_ => Err(ValidationError::Missing { field }),
	}
}

/// Parses a duration string that must be strictly positive.
///
/// Humantime syntax (`90s`, `5m`, `1h 30m`) is tried first; compact decimal segments such as
/// `1.5h` or `2m0.5s` are accepted as well.
pub(crate) fn parse_positive_duration(
	field: &'static str,
	value: &str,
) -> Result<std::time::Duration, ValidationError> {
	let value = value.trim();
	let duration = match humantime::parse_duration(value) {
		Ok(duration) => duration,
		Err(e) => parse_decimal_segments(value)
			.ok_or_else(|| ValidationError::Malformed { field, reason: e.to_string() })?,
	};

	if duration.is_zero() {
		return Err(ValidationError::NotPositive { field });
	}

	Ok(duration)
}

fn parse_decimal_segments(value: &str) -> Option<std::time::Duration> {
	let mut rest = value;
	let mut seconds = 0_f64;

	if rest.is_empty() {
		return None;
	}

	while !rest.is_empty() {
		let (number, tail) = rest.split_at(rest.find(|c: char| !(c.is_ascii_digit() || c == '.'))?);
		let (unit, tail) =
			tail.split_at(tail.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(tail.len()));
		let scale = match unit {
			"ns" => 1e-9,
			"us" | "µs" => 1e-6,
			"ms" => 1e-3,
			"s" => 1.,
			"m" => 60.,
			"h" => 3_600.,
			_ => return None,
		};

		seconds += number.parse::<f64>().ok()? * scale;
		rest = tail;
	}

	std::time::Duration::try_from_secs_f64(seconds).ok()
}

/// Parses an optional duration field, falling back to `default` when absent or empty.
pub(crate) fn parse_duration_or(
	field: &'static str,
	value: Option<&str>,
	default: Duration,
) -> Result<Duration, ValidationError> {
	match value {
		Some(view) if !view.is_empty() => to_signed(field, parse_positive_duration(field, view)?),
		_ => Ok(default),
	}
}

/// Converts a parsed std duration into the signed duration used for wall-clock math.
pub(crate) fn to_signed(
	field: &'static str,
	duration: std::time::Duration,
) -> Result<Duration, ValidationError> {
	Duration::try_from(duration)
		.map_err(|e| ValidationError::Malformed { field, reason: e.to_string() })
}

/// Rejects non-positive signed durations supplied through typed APIs.
pub(crate) fn ensure_positive(field: &'static str, duration: Duration) -> Result<(), ValidationError> {
	if duration.is_positive() { Ok(()) } else { Err(ValidationError::NotPositive { field }) }
}

// self
use crate::{
	_prelude::*,
	error::ErrorKind,
	obs::{OperationKind, OperationOutcome},
};

/// Records that an operation was entered.
pub fn record_operation_attempt(kind: OperationKind) {
	emit(&operation_labels(kind, OperationOutcome::Attempt, None));
}

/// Records how an operation ended; failures are additionally labeled by their [`ErrorKind`].
pub fn record_operation_result<T>(kind: OperationKind, result: &Result<T>) {
	let labels = match result {
		Ok(_) => operation_labels(kind, OperationOutcome::Success, None),
		Err(e) => operation_labels(kind, OperationOutcome::Failure, Some(e.kind())),
	};

	emit(&labels);
}

fn operation_labels(
	kind: OperationKind,
	outcome: OperationOutcome,
	error: Option<ErrorKind>,
) -> Vec<(&'static str, &'static str)> {
	let mut labels = vec![("operation", kind.as_str()), ("outcome", outcome.as_str())];

	if let Some(error) = error {
		labels.push(("error_kind", error.as_str()));
	}

	labels
}

fn emit(labels: &[(&'static str, &'static str)]) {
	#[cfg(feature = "metrics")]
	{
		let labels = labels
			.iter()
			.map(|&(key, value)| metrics::Label::new(key, value))
			.collect::<Vec<_>>();

		metrics::counter!("gateway_guard_operation_total", labels).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = labels;
	}
}

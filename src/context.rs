//! Per-call cancellation and deadline propagation.
//!
//! Every gateway operation receives a [`CallContext`]. The admission limiter's waiting mode and
//! the forwarding passthrough race their suspensions against it, so a canceled caller or an
//! elapsed deadline always bounds the wait.

// crates.io
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
// self
use crate::_prelude::*;

/// Why a call stopped before completing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
	/// The caller (or a parent scope) triggered the cancellation token.
	Canceled,
	/// The call's deadline elapsed, or would elapse before the operation could finish.
	DeadlineExceeded,
}
impl CancelReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Canceled => "canceled",
			Self::DeadlineExceeded => "deadline_exceeded",
		}
	}
}
impl Display for CancelReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Cancellation signal plus optional deadline attached to a single call.
#[derive(Clone, Debug)]
pub struct CallContext {
	cancel: CancellationToken,
	deadline: Option<Instant>,
}
impl CallContext {
	/// Creates a context with a fresh cancellation token and no deadline.
	pub fn new() -> Self {
		Self { cancel: CancellationToken::new(), deadline: None }
	}

	/// Creates a context driven by an existing (host-owned) cancellation token.
	pub fn with_token(cancel: CancellationToken) -> Self {
		Self { cancel, deadline: None }
	}

	/// Sets an absolute deadline, keeping the earlier one if a deadline is already set.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(current) if current < deadline => current,
			_ => deadline,
		});

		self
	}

	/// Sets a deadline relative to now.
	pub fn with_timeout(self, timeout: std::time::Duration) -> Self {
		match Instant::now().checked_add(timeout) {
			Some(deadline) => self.with_deadline(deadline),
			None => self,
		}
	}

	/// Derives a child context canceled together with this one, inheriting its deadline.
	pub fn child(&self) -> Self {
		Self { cancel: self.cancel.child_token(), deadline: self.deadline }
	}

	/// Triggers cancellation for this context and its children.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Returns the cancellation token observed by this context.
	pub fn token(&self) -> &CancellationToken {
		&self.cancel
	}

	/// Returns the absolute deadline, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Time left before the deadline; `None` without a deadline, zero once it has passed.
	pub fn remaining(&self) -> Option<std::time::Duration> {
		self.deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
	}

	/// Reports why the context is already done, without waiting.
	pub fn done_reason(&self) -> Option<CancelReason> {
		if self.cancel.is_cancelled() {
			return Some(CancelReason::Canceled);
		}

		match self.deadline {
			Some(deadline) if deadline <= Instant::now() => Some(CancelReason::DeadlineExceeded),
			_ => None,
		}
	}

	/// Resolves once the context is canceled or its deadline elapses.
	pub async fn done(&self) -> CancelReason {
		match self.deadline {
			Some(deadline) => tokio::select! {
				biased;
				_ = self.cancel.cancelled() => CancelReason::Canceled,
				_ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
			},
			None => {
				self.cancel.cancelled().await;

				CancelReason::Canceled
			},
		}
	}

	/// Fails fast with [`Error::Canceled`] when the context is already done.
	pub fn ensure_active(&self) -> Result<()> {
		match self.done_reason() {
			Some(reason) => Err(Error::Canceled { reason }),
			None => Ok(()),
		}
	}
}
impl Default for CallContext {
	fn default() -> Self {
		Self::new()
	}
}

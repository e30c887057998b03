//! Continuous-refill token bucket.

// crates.io
use tokio::time::Instant;

/// Outcome of a single acquisition attempt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Acquire {
	/// A token was consumed.
	Granted,
	/// No token yet; one is expected after the delay.
	Retry(std::time::Duration),
	/// The bucket can never produce a token under its configuration.
	Exhausted,
}

/// Refill-and-consume state for one limiter key.
///
/// Tokens accumulate at `rate` per second up to `burst`. A fresh bucket starts full. A rate of
/// `+inf` admits everything without consuming; a rate of zero never refills.
#[derive(Clone, Debug)]
pub struct TokenBucket {
	rate: f64,
	burst: f64,
	tokens: f64,
	last_refill: Instant,
}
impl TokenBucket {
	/// Creates a full bucket observed at `now`.
	pub fn new(rate: f64, burst: u32, now: Instant) -> Self {
		let burst = f64::from(burst);

		Self { rate, burst, tokens: burst, last_refill: now }
	}

	/// Refill rate in tokens per second.
	pub fn rate(&self) -> f64 {
		self.rate
	}

	/// Capacity of the bucket.
	pub fn burst(&self) -> u32 {
		self.burst as u32
	}

	/// Tokens available at `now`, without consuming any.
	pub fn available(&mut self, now: Instant) -> f64 {
		self.refill(now);

		self.tokens
	}

	/// Refills to `now`, then consumes one token if available.
	///
	/// Never consumes on failure.
	pub fn try_acquire(&mut self, now: Instant) -> Acquire {
		if self.rate == f64::INFINITY {
			return Acquire::Granted;
		}

		self.refill(now);

		if self.tokens >= 1.0 {
			self.tokens -= 1.0;

			return Acquire::Granted;
		}
		if self.burst < 1.0 || self.rate <= 0.0 {
			return Acquire::Exhausted;
		}

		match std::time::Duration::try_from_secs_f64((1.0 - self.tokens) / self.rate) {
			Ok(delay) => Acquire::Retry(delay),
			Err(_) => Acquire::Exhausted,
		}
	}

	fn refill(&mut self, now: Instant) {
		if now <= self.last_refill {
			return;
		}

		let elapsed = now.duration_since(self.last_refill).as_secs_f64();

		self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
		self.last_refill = now;
	}
}

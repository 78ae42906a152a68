//! Failure classification and exponential backoff.
//!
//! [`RetryPolicy`] is plain `Copy` data: it decides *whether* and *how long*, while the attempt
//! loop that actually sleeps lives in [`RequestExecutor`](crate::executor::RequestExecutor) and
//! [`TokenManager`](crate::token::TokenManager).

// self
use crate::_prelude::*;

/// Whether a failure may be re-attempted automatically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
	/// Timeout, connection failure, or 503; safe to retry.
	Retryable,
	/// Everything else; surfaces to the caller unchanged.
	Fatal,
}
impl Classification {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Classification::Retryable => "retryable",
			Classification::Fatal => "fatal",
		}
	}
}
impl Display for Classification {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Verdict for one failed invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
	/// Sleep for the delay, then try again.
	Retry(StdDuration),
	/// Surface the original error.
	Fatal,
	/// Retryable, but the attempt budget is spent.
	Exhausted,
}

/// One failed invocation inside a single retry loop; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallAttempt {
	/// 0-based index of the failed invocation.
	pub attempt: u32,
	/// Classification of its failure.
	pub classification: Classification,
	/// Delay scheduled before the next invocation, if any.
	pub delay: Option<StdDuration>,
}

/// Bounded exponential backoff: `base_delay * 2^attempt`, capped at `max_delay`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	max_attempts: u32,
	base_delay: StdDuration,
	max_delay: StdDuration,
}
impl RetryPolicy {
	/// Default number of invocations per call.
	pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
	/// Default delay before the first retry.
	pub const DEFAULT_BASE_DELAY: StdDuration = StdDuration::from_secs(1);
	/// Default ceiling for a single backoff delay.
	pub const DEFAULT_MAX_DELAY: StdDuration = StdDuration::from_secs(60);

	/// Creates a policy allowing `max_attempts` invocations (clamped to at least one).
	pub fn new(max_attempts: u32, base_delay: StdDuration) -> Self {
		Self { max_attempts: max_attempts.max(1), base_delay, max_delay: Self::DEFAULT_MAX_DELAY }
	}

	/// Policy that invokes the operation exactly once.
	pub fn no_retry() -> Self {
		Self::new(1, StdDuration::ZERO)
	}

	/// Overrides the ceiling for a single delay.
	pub fn with_max_delay(mut self, max_delay: StdDuration) -> Self {
		self.max_delay = max_delay;

		self
	}

	/// Total invocations allowed per call.
	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	/// Delay before the first retry.
	pub fn base_delay(&self) -> StdDuration {
		self.base_delay
	}

	/// Ceiling for a single delay.
	pub fn max_delay(&self) -> StdDuration {
		self.max_delay
	}

	/// Classifies a failure as retryable or fatal.
	pub fn classify(error: &Error) -> Classification {
		if error.is_retryable() { Classification::Retryable } else { Classification::Fatal }
	}

	/// Backoff before re-attempting after the `attempt`-th failure (0-based).
	pub fn next_delay(&self, attempt: u32) -> StdDuration {
		1_u32
			.checked_shl(attempt)
			.and_then(|factor| self.base_delay.checked_mul(factor))
			.unwrap_or(self.max_delay)
			.min(self.max_delay)
	}

	/// Decides what to do after invocation `attempt` (0-based) failed with `error`.
	///
	/// A gateway Retry-After hint lengthens the delay but never past `max_delay`.
	pub fn decide(&self, attempt: u32, error: &Error) -> RetryDecision {
		if Self::classify(error) == Classification::Fatal {
			return RetryDecision::Fatal;
		}
		if attempt.saturating_add(1) >= self.max_attempts {
			return RetryDecision::Exhausted;
		}

		let hint = error.retry_after().map(|hint| hint.min(self.max_delay)).unwrap_or_default();

		RetryDecision::Retry(self.next_delay(attempt).max(hint))
	}

	/// Builds the [`CallAttempt`] record for a decision.
	pub fn attempt_record(attempt: u32, error: &Error, decision: RetryDecision) -> CallAttempt {
		let delay = match decision {
			RetryDecision::Retry(delay) => Some(delay),
			RetryDecision::Fatal | RetryDecision::Exhausted => None,
		};

		CallAttempt { attempt, classification: Self::classify(error), delay }
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BASE_DELAY)
	}
}

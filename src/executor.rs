//! Single entry point for authenticated gateway calls.
//!
//! [`RequestExecutor::execute`] paces each invocation, hands it a valid bearer token, and
//! retries transient failures with backoff. A `401 Unauthorized` is read as server-side
//! revocation: the token is dropped and the call is re-issued once with a fresh login.

// crates.io
use tokio::time;
// self
use crate::{
	_prelude::*,
	auth::Secret,
	obs::{self, CallKind, CallOutcome, CallSpan},
	rate_limit::RateLimiter,
	retry::{RetryDecision, RetryPolicy},
	token::TokenManager,
};

/// Wraps units of remote work with pacing, token renewal, and classified retries.
#[derive(Debug)]
pub struct RequestExecutor {
	tokens: TokenManager,
	limiter: RateLimiter,
	policy: RetryPolicy,
}
impl RequestExecutor {
	/// Assembles an executor from its parts.
	pub fn new(tokens: TokenManager, limiter: RateLimiter, policy: RetryPolicy) -> Self {
		Self { tokens, limiter, policy }
	}

	/// Session manager shared by every call.
	pub fn tokens(&self) -> &TokenManager {
		&self.tokens
	}

	/// Call pacer shared by every call.
	pub fn limiter(&self) -> &RateLimiter {
		&self.limiter
	}

	/// Default backoff policy.
	pub fn policy(&self) -> RetryPolicy {
		self.policy
	}

	/// Runs `op` under the default policy.
	///
	/// `op` receives the bearer token and must perform exactly one remote call per invocation.
	pub async fn execute<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
	where
		F: FnMut(Secret) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		self.execute_with_policy(operation, self.policy, op).await
	}

	/// Runs `op` under an explicit policy.
	pub async fn execute_with_policy<T, F, Fut>(
		&self,
		operation: &str,
		policy: RetryPolicy,
		op: F,
	) -> Result<T>
	where
		F: FnMut(Secret) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, operation);
		let result = span.instrument(self.run(operation, policy, op)).await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	/// Paces, then terminates the server-side session; see [`TokenManager::logout`].
	pub async fn logout(&self) -> Result<bool> {
		self.limiter.wait().await;

		let result = self.tokens.logout().await;

		self.limiter.complete().await;

		result
	}

	async fn run<T, F, Fut>(&self, operation: &str, policy: RetryPolicy, mut op: F) -> Result<T>
	where
		F: FnMut(Secret) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut attempt = 0_u32;
		let mut after_unauthorized = false;

		loop {
			self.limiter.wait().await;

			let session = match self.tokens.ensure_valid().await {
				Ok(session) => session,
				Err(e) => {
					self.limiter.complete().await;

					return Err(e);
				},
			};

			obs::record_call_outcome(CallKind::Request, CallOutcome::Attempt);
			tracing::debug!(operation, attempt, "Issuing gateway call.");

			let outcome = op(session.token.clone()).await;

			self.limiter.complete().await;

			let error = match outcome {
				Ok(value) => return Ok(value),
				Err(e) => e,
			};

			if error.is_unauthorized() {
				self.tokens.invalidate_token(&session.token).await;

				if !after_unauthorized && attempt.saturating_add(1) < policy.max_attempts() {
					tracing::warn!(
						operation,
						attempt,
						"Gateway revoked the token; re-authenticating."
					);

					after_unauthorized = true;
					attempt += 1;

					continue;
				}
			}

			after_unauthorized = false;

			let decision = policy.decide(attempt, &error);
			let record = RetryPolicy::attempt_record(attempt, &error, decision);

			match decision {
				RetryDecision::Retry(delay) => {
					tracing::warn!(
						operation,
						attempt = record.attempt,
						classification = %record.classification,
						delay_ms = delay.as_millis() as u64,
						error = %error,
						"Gateway call failed; retrying."
					);
					time::sleep(delay).await;

					attempt += 1;
				},
				RetryDecision::Fatal => {
					tracing::debug!(
						operation,
						attempt = record.attempt,
						classification = %record.classification,
						error = %error,
						"Gateway call failed."
					);

					return Err(error);
				},
				RetryDecision::Exhausted => {
					tracing::warn!(
						operation,
						attempt = record.attempt,
						classification = %record.classification,
						error = %error,
						"Gateway call kept failing; giving up."
					);

					return Err(Error::RetriesExhausted {
						operation: operation.into(),
						attempts: attempt + 1,
						last: Box::new(error),
					});
				},
			}
		}
	}
}

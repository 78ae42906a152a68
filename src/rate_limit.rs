//! Call pacing shared by every request a client issues.
//!
//! [`RateLimiter`] is a depth-1 leaky bucket: it tracks a single "last call" instant for the
//! whole client, so concurrent callers are serialized with respect to the interval instead of
//! being throttled individually.

// crates.io
use tokio::time::{self, Instant};
// self
use crate::_prelude::*;

/// Enforces a minimum spacing between outbound calls.
#[derive(Debug)]
pub struct RateLimiter {
	min_interval: StdDuration,
	last: AsyncMutex<Option<Instant>>,
}
impl RateLimiter {
	/// Creates a limiter; a zero interval disables pacing.
	pub fn new(min_interval: StdDuration) -> Self {
		Self { min_interval, last: AsyncMutex::new(None) }
	}

	/// Configured minimum spacing.
	pub fn min_interval(&self) -> StdDuration {
		self.min_interval
	}

	/// Suspends the caller until `min_interval` elapsed since the previous call, then claims
	/// the slot. The first call never waits.
	pub async fn wait(&self) {
		if self.min_interval.is_zero() {
			return;
		}

		let mut last = self.last.lock().await;

		if let Some(previous) = *last {
			let ready_at = previous + self.min_interval;

			if ready_at > Instant::now() {
				time::sleep_until(ready_at).await;
			}
		}

		*last = Some(Instant::now());
	}

	/// Records the completion of a call, successful or not, so the next [`wait`] is measured
	/// from it.
	///
	/// [`wait`]: RateLimiter::wait
	pub async fn complete(&self) {
		if self.min_interval.is_zero() {
			return;
		}

		let now = Instant::now();
		let mut last = self.last.lock().await;

		*last = Some(last.map_or(now, |previous| previous.max(now)));
	}
}
impl Default for RateLimiter {
	fn default() -> Self {
		Self::new(StdDuration::ZERO)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const INTERVAL: StdDuration = StdDuration::from_millis(300);

	#[tokio::test(start_paused = true)]
	async fn first_call_never_waits() {
		let limiter = RateLimiter::new(INTERVAL);
		let start = Instant::now();

		limiter.wait().await;

		assert_eq!(start.elapsed(), StdDuration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn second_call_waits_for_the_interval() {
		let limiter = RateLimiter::new(INTERVAL);

		limiter.wait().await;

		let first_return = Instant::now();

		time::advance(StdDuration::from_millis(100)).await;
		limiter.wait().await;

		assert!(first_return.elapsed() >= INTERVAL);
	}

	#[tokio::test(start_paused = true)]
	async fn completion_restarts_the_interval() {
		let limiter = RateLimiter::new(INTERVAL);

		limiter.wait().await;
		time::advance(StdDuration::from_millis(500)).await;
		limiter.complete().await;

		let completed_at = Instant::now();

		limiter.wait().await;

		assert!(completed_at.elapsed() >= INTERVAL);
	}

	#[tokio::test(start_paused = true)]
	async fn concurrent_callers_share_one_schedule() {
		let limiter = Arc::new(RateLimiter::new(INTERVAL));
		let start = Instant::now();
		let waits = (0..3).map(|_| {
			let limiter = limiter.clone();

			async move {
				limiter.wait().await;

				start.elapsed()
			}
		});
		let mut elapsed = spawn_all(waits).await;

		elapsed.sort();

		assert_eq!(elapsed[0], StdDuration::ZERO);
		assert!(elapsed[1] >= INTERVAL);
		assert!(elapsed[2] >= INTERVAL * 2);
	}

	#[tokio::test(start_paused = true)]
	async fn zero_interval_disables_pacing() {
		let limiter = RateLimiter::default();
		let start = Instant::now();

		for _ in 0..5 {
			limiter.wait().await;
			limiter.complete().await;
		}

		assert_eq!(start.elapsed(), StdDuration::ZERO);
	}

	async fn spawn_all<F>(futures: impl IntoIterator<Item = F>) -> Vec<F::Output>
	where
		F: 'static + Future + Send,
		F::Output: 'static + Send,
	{
		let handles: Vec<_> = futures.into_iter().map(tokio::spawn).collect();
		let mut outputs = Vec::with_capacity(handles.len());

		for handle in handles {
			outputs.push(handle.await.expect("Limiter task should not panic."));
		}

		outputs
	}
}

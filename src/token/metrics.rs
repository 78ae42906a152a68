// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for session lifecycle events.
#[derive(Debug, Default)]
pub struct AuthMetrics {
	logins: AtomicU64,
	login_failures: AtomicU64,
	adoptions: AtomicU64,
	validations: AtomicU64,
}
impl AuthMetrics {
	/// Returns the number of login calls issued, retries included.
	pub fn logins(&self) -> u64 {
		self.logins.load(Ordering::Relaxed)
	}

	/// Returns the number of authentications that ended in failure.
	pub fn login_failures(&self) -> u64 {
		self.login_failures.load(Ordering::Relaxed)
	}

	/// Returns the number of sessions adopted from the store.
	pub fn adoptions(&self) -> u64 {
		self.adoptions.load(Ordering::Relaxed)
	}

	/// Returns the number of remote validation calls issued.
	pub fn validations(&self) -> u64 {
		self.validations.load(Ordering::Relaxed)
	}

	pub(crate) fn record_login(&self) {
		self.logins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_login_failure(&self) {
		self.login_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_adoption(&self) {
		self.adoptions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_validation(&self) {
		self.validations.fetch_add(1, Ordering::Relaxed);
	}
}

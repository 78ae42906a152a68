//! In-memory session model and its lifecycle helpers.

// self
use crate::{
	_prelude::*,
	auth::{Secret, Username},
	store::PersistedSession,
};

/// Lifecycle status of a [`Session`] at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
	/// Issued-at lies in the future (clock skew or a tampered record); not usable.
	Pending,
	/// Session is usable.
	Active,
	/// Lifetime elapsed.
	Expired,
}

/// Bearer token plus the window in which the client trusts it.
///
/// Sessions are replaced, never mutated: a renewed token produces a new value.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
	/// Bearer token; callers must avoid logging it.
	pub token: Secret,
	/// Instant the token was issued (or adopted from a refresh).
	pub issued_at: OffsetDateTime,
	/// Validity window measured from `issued_at`.
	pub lifetime: Duration,
}
impl Session {
	/// Creates a session from explicit parts.
	pub fn new(token: impl Into<Secret>, issued_at: OffsetDateTime, lifetime: Duration) -> Self {
		Self { token: token.into(), issued_at, lifetime }
	}

	/// Creates a session issued at the current UTC instant.
	pub fn issued_now(token: impl Into<Secret>, lifetime: Duration) -> Self {
		Self::new(token, OffsetDateTime::now_utc(), lifetime)
	}

	/// Rebuilds a session from its durable mirror using the configured lifetime.
	pub fn from_persisted(record: PersistedSession, lifetime: Duration) -> Self {
		Self::new(record.token, record.issued_at, lifetime)
	}

	/// Builds the durable mirror owned by `username`.
	pub fn to_persisted(&self, username: &Username) -> PersistedSession {
		PersistedSession {
			token: self.token.clone(),
			issued_at: self.issued_at,
			username: username.clone(),
		}
	}

	/// Instant after which the session is no longer trusted.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.issued_at.saturating_add(self.lifetime)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> SessionStatus {
		if instant < self.issued_at {
			return SessionStatus::Pending;
		}
		if instant >= self.expires_at() {
			return SessionStatus::Expired;
		}

		SessionStatus::Active
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> SessionStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the session is usable at the provided instant.
	pub fn is_active_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), SessionStatus::Active)
	}

	/// Returns `true` if the session's lifetime elapsed at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), SessionStatus::Expired)
	}

	/// Remaining validity at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at() - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("lifetime", &self.lifetime)
			.finish()
	}
}

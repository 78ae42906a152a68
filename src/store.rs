//! Session persistence contract and built-in store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Secret, Username},
};

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable storage for the single session record of a client.
///
/// Implementations treat a missing or undecodable record as a cold start (`Ok(None)`), never as
/// an error, and must not expose a partially written record to a concurrent [`load`].
///
/// [`load`]: SessionStore::load
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Loads the record owned by `principal`; records owned by anyone else are discarded.
	fn load<'a>(&'a self, principal: &'a Username) -> StoreFuture<'a, Option<PersistedSession>>;

	/// Atomically replaces the durable record.
	fn save(&self, record: PersistedSession) -> StoreFuture<'_, ()>;

	/// Removes the durable record; a no-op when none exists.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Durable mirror of a session plus the principal that owns it.
///
/// Serialized as `{ "token": string, "timestamp": unix seconds (float), "username": string }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
	/// Bearer token.
	pub token: Secret,
	/// Instant the token was issued.
	#[serde(rename = "timestamp", with = "unix_seconds")]
	pub issued_at: OffsetDateTime,
	/// Principal that owns the record.
	pub username: Username,
}
impl PersistedSession {
	/// Returns `true` when the record belongs to `principal`.
	pub fn belongs_to(&self, principal: &Username) -> bool {
		&self.username == principal
	}
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

mod unix_seconds {
	// crates.io
	use serde::{Deserializer, Serializer, de::Error as _};
	// self
	use crate::_prelude::*;

	const NANOS_PER_SECOND: f64 = 1_000_000_000.;

	pub fn serialize<S>(instant: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let seconds = instant.unix_timestamp() as f64;
		let fraction = instant.nanosecond() as f64 / NANOS_PER_SECOND;

		serializer.serialize_f64(seconds + fraction)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
	where
		D: Deserializer<'de>,
	{
		let seconds = f64::deserialize(deserializer)?;

		if !seconds.is_finite() {
			return Err(D::Error::custom("timestamp must be a finite number"));
		}

		let whole = seconds.floor();
		let mut nanos = ((seconds - whole) * NANOS_PER_SECOND).round() as i64;
		let mut whole = whole as i64;

		if nanos >= NANOS_PER_SECOND as i64 {
			whole += 1;
			nanos -= NANOS_PER_SECOND as i64;
		}

		OffsetDateTime::from_unix_timestamp(whole)
			.map_err(D::Error::custom)?
			.checked_add(Duration::nanoseconds(nanos))
			.ok_or_else(|| D::Error::custom("timestamp is out of range"))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn owner() -> Username {
		Username::new("trader").expect("Username fixture should be valid.")
	}

	#[test]
	fn persisted_session_uses_float_timestamp_on_the_wire() {
		let record = PersistedSession {
			token: Secret::new("tok"),
			issued_at: datetime!(2023-11-14 22:13:20.5 UTC),
			username: owner(),
		};
		let value = serde_json::to_value(&record).expect("Record should serialize.");

		assert_eq!(value["token"], "tok");
		assert_eq!(value["username"], "trader");
		assert_eq!(value["timestamp"].as_f64(), Some(1_700_000_000.5));
	}

	#[test]
	fn persisted_session_accepts_integer_and_fractional_timestamps() {
		let record: PersistedSession = serde_json::from_str(
			"{\"token\":\"tok\",\"timestamp\":1700000000.25,\"username\":\"trader\"}",
		)
		.expect("Fractional timestamp should parse.");

		assert_eq!(record.issued_at.unix_timestamp(), 1_700_000_000);
		assert_eq!(record.issued_at.millisecond(), 250);

		let record: PersistedSession =
			serde_json::from_str(r#"{"token":"tok","timestamp":1700000000,"username":"trader"}"#)
				.expect("Integer timestamp should parse.");

		assert_eq!(record.issued_at.unix_timestamp(), 1_700_000_000);
		assert!(record.belongs_to(&owner()));
	}

	#[test]
	fn timestamp_survives_a_write_read_cycle_at_current_epochs() {
		let record = PersistedSession {
			token: Secret::new("tok"),
			issued_at: datetime!(2024-05-01 12:00:00.123 UTC),
			username: owner(),
		};
		let json = serde_json::to_string(&record).expect("Record should serialize.");
		let decoded: PersistedSession =
			serde_json::from_str(&json).expect("Record should deserialize.");

		assert_eq!(decoded.issued_at.unix_timestamp(), record.issued_at.unix_timestamp());
		assert_eq!(decoded.issued_at.millisecond(), 123);
		assert!((decoded.issued_at - record.issued_at).abs() < Duration::microseconds(1));
	}

	#[test]
	fn persisted_session_rejects_invalid_owner() {
		let parsed = serde_json::from_str::<PersistedSession>(
			"{\"token\":\"tok\",\"timestamp\":1.0,\"username\":\"\"}",
		);

		assert!(parsed.is_err());
	}
}

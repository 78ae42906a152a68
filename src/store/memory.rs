//! Thread-safe in-memory [`SessionStore`] for tests and ephemeral clients.

// self
use crate::{
	_prelude::*,
	auth::Username,
	store::{PersistedSession, SessionStore, StoreError, StoreFuture},
};

type Slot = Arc<RwLock<Option<PersistedSession>>>;

/// Storage backend that keeps the record in-process; every instance is isolated.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	/// Creates a store pre-seeded with `record`.
	pub fn with_record(record: PersistedSession) -> Self {
		Self(Arc::new(RwLock::new(Some(record))))
	}

	/// Returns a copy of the stored record, regardless of its owner.
	pub fn snapshot(&self) -> Option<PersistedSession> {
		self.0.read().clone()
	}

	fn load_now(slot: &Slot, principal: &Username) -> Option<PersistedSession> {
		slot.read().as_ref().filter(|record| record.belongs_to(principal)).cloned()
	}
}
impl SessionStore for MemoryStore {
	fn load<'a>(&'a self, principal: &'a Username) -> StoreFuture<'a, Option<PersistedSession>> {
		Box::pin(async move { Ok::<_, StoreError>(Self::load_now(&self.0, principal)) })
	}

	fn save(&self, record: PersistedSession) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			*self.0.write() = Some(record);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.0.write().take();

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::Secret;

	fn record(owner: &str) -> PersistedSession {
		PersistedSession {
			token: Secret::new("memory-token"),
			issued_at: OffsetDateTime::now_utc(),
			username: Username::new(owner).expect("Username fixture should be valid."),
		}
	}

	#[tokio::test]
	async fn load_filters_by_principal() {
		let store = MemoryStore::with_record(record("alice"));
		let alice = Username::new("alice").expect("Username fixture should be valid.");
		let bob = Username::new("bob").expect("Username fixture should be valid.");

		assert!(store.load(&alice).await.expect("Load should succeed.").is_some());
		assert!(store.load(&bob).await.expect("Load should succeed.").is_none());
	}

	#[tokio::test]
	async fn instances_do_not_share_state() {
		let first = MemoryStore::default();
		let second = MemoryStore::default();

		first.save(record("alice")).await.expect("Save should succeed.");

		assert!(first.snapshot().is_some());
		assert!(second.snapshot().is_none());

		first.clear().await.expect("Clear should succeed.");
		first.clear().await.expect("Clearing twice must be a no-op.");

		assert!(first.snapshot().is_none());
	}
}

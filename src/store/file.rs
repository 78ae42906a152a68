//! JSON session file that survives process restarts.

// std
use std::{
	ffi::{OsStr, OsString},
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
	process,
	sync::atomic::{AtomicU64, Ordering},
};
// self
use crate::{
	_prelude::*,
	auth::Username,
	store::{PersistedSession, SessionStore, StoreError, StoreFuture},
};

static TMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Persists the session record to a single JSON file, replacing it atomically on save.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
}
impl FileStore {
	/// Opens a store at the provided path, creating parent directories on demand.
	///
	/// No record is read until [`SessionStore::load`] is called.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path })
	}

	/// Location of the session file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_record(&self, principal: &Username) -> Result<Option<PersistedSession>, StoreError> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", self.path.display()),
				}),
		};

		if bytes.is_empty() {
			return Ok(None);
		}

		let record = match serde_json::from_slice::<PersistedSession>(&bytes) {
			Ok(record) => record,
			Err(e) => {
				tracing::warn!(
					path = %self.path.display(),
					error = %e,
					"Ignoring unreadable session file."
				);

				return Ok(None);
			},
		};

		if !record.belongs_to(principal) {
			tracing::info!(
				path = %self.path.display(),
				owner = %record.username,
				principal = %principal,
				"Discarding session file owned by another principal."
			);

			return Ok(None);
		}

		Ok(Some(record))
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create session directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, record: &PersistedSession) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(record).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize session record: {e}"),
			})?;
		let tmp_path = self.tmp_path();
		let written = Self::write_synced(&tmp_path, &serialized).and_then(|()| {
			fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
				message: format!("Failed to replace {}: {e}", self.path.display()),
			})
		});

		if written.is_err() {
			let _ = fs::remove_file(&tmp_path);
		}

		written
	}

	// Staging name is unique per write and never equals the target.
	fn tmp_path(&self) -> PathBuf {
		let mut name = OsString::from(".");

		name.push(self.path.file_name().unwrap_or_else(|| OsStr::new("session")));
		name.push(format!(
			".{}.{}.tmp",
			process::id(),
			TMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
		));

		self.path.with_file_name(name)
	}

	fn write_synced(tmp_path: &Path, serialized: &[u8]) -> Result<(), StoreError> {
		let mut file = File::create(tmp_path).map_err(|e| StoreError::Backend {
			message: format!("Failed to create {}: {e}", tmp_path.display()),
		})?;

		file.write_all(serialized).map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", tmp_path.display()),
		})?;
		file.sync_all().map_err(|e| StoreError::Backend {
			message: format!("Failed to sync {}: {e}", tmp_path.display()),
		})
	}

	fn remove(&self) -> Result<(), StoreError> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to remove {}: {e}", self.path.display()),
			}),
		}
	}
}
impl SessionStore for FileStore {
	fn load<'a>(&'a self, principal: &'a Username) -> StoreFuture<'a, Option<PersistedSession>> {
		Box::pin(async move { self.read_record(principal) })
	}

	fn save(&self, record: PersistedSession) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.persist(&record) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.remove() })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::auth::Secret;

	fn temp_path(tag: &str) -> PathBuf {
		let unique = format!(
			"projectx_gateway_file_store_{tag}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn principal(name: &str) -> Username {
		Username::new(name).expect("Failed to build username fixture.")
	}

	fn build_record(owner: &str) -> PersistedSession {
		PersistedSession {
			token: Secret::new("file-token"),
			issued_at: OffsetDateTime::now_utc(),
			username: principal(owner),
		}
	}

	fn staging_files(path: &Path) -> Vec<PathBuf> {
		let prefix = format!(".{}.", path.file_name().and_then(OsStr::to_str).unwrap_or_default());
		let dir = path.parent().expect("Fixture path should have a parent.");

		fs::read_dir(dir)
			.expect("Fixture directory should be readable.")
			.filter_map(|entry| entry.ok().map(|entry| entry.path()))
			.filter(|candidate| {
				candidate
					.file_name()
					.and_then(OsStr::to_str)
					.is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".tmp"))
			})
			.collect()
	}

	fn runtime() -> Runtime {
		Runtime::new().expect("Failed to build Tokio runtime for file store test.")
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path("round_trip");
		let store = FileStore::open(&path).expect("Failed to open file store.");
		let record = build_record("trader");
		let rt = runtime();

		rt.block_on(store.save(record.clone())).expect("Failed to save fixture record.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store.");
		let loaded = rt
			.block_on(reopened.load(&principal("trader")))
			.expect("Failed to load fixture record.")
			.expect("File store lost record after reopen.");

		assert_eq!(loaded.token.expose(), "file-token");
		assert_eq!(loaded.username, record.username);
		assert!((loaded.issued_at - record.issued_at).abs() < Duration::milliseconds(1));
		assert!(staging_files(&path).is_empty(), "Staging files must be renamed away.");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session file {}: {e}", path.display())
		});
	}

	#[test]
	fn record_owned_by_another_principal_is_discarded() {
		let path = temp_path("mismatch");
		let store = FileStore::open(&path).expect("Failed to open file store.");
		let rt = runtime();

		rt.block_on(store.save(build_record("alice"))).expect("Failed to save fixture record.");

		let loaded =
			rt.block_on(store.load(&principal("bob"))).expect("Mismatch must not be an error.");

		assert!(loaded.is_none());

		rt.block_on(store.clear()).expect("Failed to clear session file.");
	}

	#[test]
	fn missing_empty_and_corrupt_files_are_cold_starts() {
		let path = temp_path("corrupt");
		let store = FileStore::open(&path).expect("Failed to open file store.");
		let rt = runtime();
		let owner = principal("trader");

		assert!(rt.block_on(store.load(&owner)).expect("Missing file is not an error.").is_none());

		fs::write(&path, b"").expect("Failed to write empty fixture.");
		assert!(rt.block_on(store.load(&owner)).expect("Empty file is not an error.").is_none());

		fs::write(&path, b"{\"token\":").expect("Failed to write corrupt fixture.");
		assert!(rt.block_on(store.load(&owner)).expect("Corrupt file is not an error.").is_none());

		rt.block_on(store.clear()).expect("Failed to clear session file.");
	}

	#[test]
	fn clear_removes_record_and_tolerates_missing_file() {
		let path = temp_path("clear");
		let store = FileStore::open(&path).expect("Failed to open file store.");
		let rt = runtime();

		rt.block_on(store.save(build_record("trader"))).expect("Failed to save fixture record.");
		assert!(path.exists());

		rt.block_on(store.clear()).expect("Failed to clear session file.");
		assert!(!path.exists());

		rt.block_on(store.clear()).expect("Clearing twice must be a no-op.");
	}

	#[test]
	fn target_with_tmp_extension_is_still_replaced_atomically() {
		let path = temp_path("staging").with_extension("tmp");
		let store = FileStore::open(&path).expect("Failed to open file store.");
		let rt = runtime();

		rt.block_on(store.save(build_record("trader"))).expect("Failed to save first record.");
		rt.block_on(store.save(build_record("trader"))).expect("Failed to save second record.");

		let loaded = rt
			.block_on(store.load(&principal("trader")))
			.expect("Failed to load record.")
			.expect("Record should survive consecutive saves.");

		assert_eq!(loaded.token.expose(), "file-token");
		assert!(staging_files(&path).is_empty(), "Staging files must be renamed away.");

		rt.block_on(store.clear()).expect("Failed to clear session file.");
	}

	#[test]
	fn staging_names_are_unique_per_write() {
		let store = FileStore::open(temp_path("unique")).expect("Failed to open file store.");
		let first = store.tmp_path();
		let second = store.tmp_path();

		assert_ne!(first, second);
		assert_ne!(first, store.path());
		assert_eq!(first.parent(), store.path().parent());
	}

	#[test]
	fn open_creates_missing_parent_directories() {
		let dir = temp_path("nested").with_extension("");
		let path = dir.join("inner").join("session.json");
		let store = FileStore::open(&path).expect("Failed to open nested file store.");
		let rt = runtime();

		rt.block_on(store.save(build_record("trader"))).expect("Failed to save nested record.");
		assert!(store.path().exists());

		fs::remove_dir_all(&dir).unwrap_or_else(|e| {
			panic!("Failed to remove temporary directory {}: {e}", dir.display())
		});
	}
}

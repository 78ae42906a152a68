//! Session state machine with singleflight authentication.
//!
//! [`TokenManager`] owns the only mutable session of a client. Every check-and-refresh runs
//! under one async lock, so concurrent callers queue behind a single in-flight login and
//! observe its outcome instead of issuing their own. A failed login is shared the same way:
//! callers that were already waiting receive the identical [`Error::AuthenticationFailed`].

mod metrics;

pub use metrics::AuthMetrics;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use tokio::time::{self, Instant};
// self
use crate::{
	_prelude::*,
	auth::{AuthApi, Credentials, Secret, Session, Validation},
	config::ClientConfig,
	obs::{self, CallKind, CallOutcome, CallSpan},
	retry::{RetryDecision, RetryPolicy},
	store::SessionStore,
};

/// Lifetime, validation, and login retry settings for a [`TokenManager`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenSettings {
	/// Local trust window for a freshly issued token.
	pub lifetime: Duration,
	/// Maximum age of the last remote validation; `None` disables remote validation.
	pub validate_interval: Option<StdDuration>,
	/// Backoff policy for login calls.
	pub auth_retry: RetryPolicy,
}
impl TokenSettings {
	/// Extracts the token settings from a client configuration.
	pub fn from_config(config: &ClientConfig) -> Self {
		Self {
			lifetime: config.token_lifetime,
			validate_interval: config.validate_interval,
			auth_retry: config.auth_retry,
		}
	}
}
impl Default for TokenSettings {
	fn default() -> Self {
		Self {
			lifetime: ClientConfig::DEFAULT_TOKEN_LIFETIME,
			validate_interval: Some(ClientConfig::DEFAULT_VALIDATE_INTERVAL),
			auth_retry: RetryPolicy::default(),
		}
	}
}

#[derive(Clone, Debug)]
struct AuthFailure {
	epoch: u64,
	reason: String,
	attempts: u32,
}
impl AuthFailure {
	fn to_error(&self) -> Error {
		Error::AuthenticationFailed { reason: self.reason.clone(), attempts: self.attempts }
	}
}

#[derive(Debug, Default)]
struct TokenState {
	session: Option<Session>,
	last_remote_check: Option<Instant>,
	last_failure: Option<AuthFailure>,
}
impl TokenState {
	fn drop_session(&mut self) {
		self.session = None;
		self.last_remote_check = None;
	}
}

/// Keeps a valid session available, authenticating at most once per expiry.
pub struct TokenManager {
	credentials: Credentials,
	api: Arc<dyn AuthApi>,
	store: Arc<dyn SessionStore>,
	settings: TokenSettings,
	state: AsyncMutex<TokenState>,
	auth_epoch: AtomicU64,
	metrics: AuthMetrics,
}
impl TokenManager {
	/// Creates a manager; nothing is loaded or fetched until the first call.
	pub fn new(
		credentials: Credentials,
		api: Arc<dyn AuthApi>,
		store: Arc<dyn SessionStore>,
		settings: TokenSettings,
	) -> Self {
		Self {
			credentials,
			api,
			store,
			settings,
			state: AsyncMutex::new(TokenState::default()),
			auth_epoch: AtomicU64::new(0),
			metrics: AuthMetrics::default(),
		}
	}

	/// Credentials the manager authenticates with.
	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	/// Active settings.
	pub fn settings(&self) -> &TokenSettings {
		&self.settings
	}

	/// Lifecycle counters.
	pub fn metrics(&self) -> &AuthMetrics {
		&self.metrics
	}

	/// Snapshot of the held session, if any.
	pub async fn current(&self) -> Option<Session> {
		self.state.lock().await.session.clone()
	}

	/// Returns a session that is active now, restoring, validating, or authenticating as needed.
	pub async fn ensure_valid(&self) -> Result<Session> {
		let observed_epoch = self.auth_epoch.load(Ordering::Acquire);
		let mut state = self.state.lock().await;

		if state.session.is_none() {
			self.restore(&mut state).await;
		}

		let now = OffsetDateTime::now_utc();

		if let Some(session) = state.session.clone() {
			if session.is_active_at(now) {
				if let Some(session) = self.revalidate(&mut state, session).await {
					return Ok(session);
				}
			} else {
				tracing::info!(
					expired_at = %session.expires_at(),
					"Session is no longer active; re-authenticating."
				);

				state.drop_session();
			}
		}
		if let Some(failure) =
			state.last_failure.as_ref().filter(|failure| failure.epoch > observed_epoch)
		{
			return Err(failure.to_error());
		}

		self.authenticate(&mut state).await
	}

	/// Drops the held session and clears the durable record.
	pub async fn invalidate(&self) -> Result<()> {
		let mut state = self.state.lock().await;

		state.drop_session();
		self.store.clear().await?;

		Ok(())
	}

	/// Drops the held session only if it still carries `token`; returns whether it did.
	///
	/// A session already replaced by a concurrent caller is left untouched.
	pub async fn invalidate_token(&self, token: &Secret) -> bool {
		let mut state = self.state.lock().await;

		if state.session.as_ref().is_none_or(|session| &session.token != token) {
			return false;
		}

		state.drop_session();

		if let Err(e) = self.store.clear().await {
			tracing::warn!(error = %e, "Failed to clear the revoked session record.");
		}

		true
	}

	/// Terminates the server-side session; returns the gateway's verdict.
	///
	/// Returns `false` without a remote call when no session is held or stored.
	pub async fn logout(&self) -> Result<bool> {
		const KIND: CallKind = CallKind::Logout;

		let mut state = self.state.lock().await;

		if state.session.is_none() {
			self.restore(&mut state).await;
		}

		let Some(session) = state.session.clone() else {
			return Ok(false);
		};
		let span = CallSpan::new(KIND, "logout");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let accepted = match span.instrument(self.api.logout(&session.token)).await {
			Ok(accepted) => {
				obs::record_call_outcome(KIND, CallOutcome::Success);

				accepted
			},
			Err(e) => {
				obs::record_call_outcome(KIND, CallOutcome::Failure);

				return Err(e);
			},
		};

		if accepted {
			state.drop_session();
			self.store.clear().await?;

			tracing::info!(username = %self.credentials.username(), "Logged out of the gateway.");
		} else {
			tracing::warn!("Gateway refused the logout request.");
		}

		Ok(accepted)
	}

	async fn restore(&self, state: &mut TokenState) {
		let principal = self.credentials.username();
		let record = match self.store.load(principal).await {
			Ok(Some(record)) => record,
			Ok(None) => return,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to load the persisted session; starting cold.");

				return;
			},
		};
		let session = Session::from_persisted(record, self.settings.lifetime);

		if !session.is_active_at(OffsetDateTime::now_utc()) {
			tracing::debug!(issued_at = %session.issued_at, "Persisted session is not active.");

			return;
		}

		self.metrics.record_adoption();

		tracing::info!(username = %principal, "Adopted the persisted session.");

		state.session = Some(session);
		state.last_remote_check = None;
	}

	async fn revalidate(&self, state: &mut TokenState, session: Session) -> Option<Session> {
		const KIND: CallKind = CallKind::Validate;

		let Some(interval) = self.settings.validate_interval else {
			return Some(session);
		};

		if state.last_remote_check.is_some_and(|at| at.elapsed() < interval) {
			return Some(session);
		}

		let span = CallSpan::new(KIND, "validate");

		self.metrics.record_validation();
		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let verdict = span.instrument(self.api.validate(&session.token)).await;

		obs::record_call_outcome(
			KIND,
			if verdict.is_ok() { CallOutcome::Success } else { CallOutcome::Failure },
		);

		match verdict {
			Ok(Validation::Valid) => {
				state.last_remote_check = Some(Instant::now());

				Some(session)
			},
			Ok(Validation::Refreshed(token)) => {
				let refreshed = Session::issued_now(token, self.settings.lifetime);

				tracing::info!("Gateway issued a replacement token during validation.");

				state.session = Some(refreshed.clone());
				state.last_remote_check = Some(Instant::now());
				self.persist(&refreshed).await;

				Some(refreshed)
			},
			Ok(Validation::Invalid) => {
				tracing::info!("Gateway rejected the session token; re-authenticating.");

				state.drop_session();

				None
			},
			Err(e) if e.is_unauthorized() => {
				tracing::info!("Validation answered 401; re-authenticating.");

				state.drop_session();

				None
			},
			Err(e) => {
				tracing::warn!(error = %e, "Validation failed; trusting the local expiry.");

				state.last_remote_check = Some(Instant::now());

				Some(session)
			},
		}
	}

	async fn authenticate(&self, state: &mut TokenState) -> Result<Session> {
		const KIND: CallKind = CallKind::Login;

		let span = CallSpan::new(KIND, "login");
		let result = span.instrument(self.login_with_retry()).await;
		let epoch = self.auth_epoch.fetch_add(1, Ordering::AcqRel) + 1;

		match result {
			Ok(token) => {
				let session = Session::issued_now(token, self.settings.lifetime);

				obs::record_call_outcome(KIND, CallOutcome::Success);
				tracing::info!(
					username = %self.credentials.username(),
					expires_at = %session.expires_at(),
					"Authenticated with the gateway."
				);

				state.session = Some(session.clone());
				state.last_remote_check = Some(Instant::now());
				state.last_failure = None;
				self.persist(&session).await;

				Ok(session)
			},
			Err(failure) => {
				let failure = AuthFailure { epoch, ..failure };

				obs::record_call_outcome(KIND, CallOutcome::Failure);
				self.metrics.record_login_failure();
				tracing::warn!(
					username = %self.credentials.username(),
					attempts = failure.attempts,
					reason = %failure.reason,
					"Authentication failed."
				);

				let error = failure.to_error();

				state.drop_session();
				state.last_failure = Some(failure);

				Err(error)
			},
		}
	}

	async fn login_with_retry(&self) -> Result<Secret, AuthFailure> {
		let policy = self.settings.auth_retry;
		let mut attempt = 0_u32;

		loop {
			self.metrics.record_login();
			obs::record_call_outcome(CallKind::Login, CallOutcome::Attempt);

			let error = match self.api.login(&self.credentials).await {
				Ok(token) => return Ok(token),
				Err(e) => e,
			};

			match policy.decide(attempt, &error) {
				RetryDecision::Retry(delay) => {
					tracing::warn!(
						attempt,
						delay_ms = delay.as_millis() as u64,
						error = %error,
						"Login failed; retrying."
					);
					time::sleep(delay).await;

					attempt += 1;
				},
				RetryDecision::Fatal | RetryDecision::Exhausted =>
					return Err(AuthFailure {
						epoch: 0,
						reason: error.to_string(),
						attempts: attempt + 1,
					}),
			}
		}
	}

	async fn persist(&self, session: &Session) {
		let record = session.to_persisted(self.credentials.username());

		if let Err(e) = self.store.save(record).await {
			tracing::warn!(error = %e, "Failed to persist the session; continuing in memory.");
		}
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("credentials", &self.credentials)
			.field("settings", &self.settings)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::{Username, remote::scripted::ScriptedAuth},
		error::TransientError,
		store::{MemoryStore, PersistedSession},
	};

	fn credentials() -> Credentials {
		Credentials::new(Username::new("trader").expect("Username fixture should be valid."), "k")
	}

	fn settings(validate_interval: Option<StdDuration>) -> TokenSettings {
		TokenSettings {
			validate_interval,
			auth_retry: RetryPolicy::new(3, StdDuration::from_millis(10)),
			..TokenSettings::default()
		}
	}

	fn manager(
		auth: &Arc<ScriptedAuth>,
		store: &MemoryStore,
		validate_interval: Option<StdDuration>,
	) -> TokenManager {
		TokenManager::new(
			credentials(),
			auth.clone(),
			Arc::new(store.clone()),
			settings(validate_interval),
		)
	}

	fn persisted(token: &str, age: Duration) -> PersistedSession {
		PersistedSession {
			token: Secret::new(token),
			issued_at: OffsetDateTime::now_utc() - age,
			username: credentials().username().clone(),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn cold_start_authenticates_once_and_persists() {
		let auth = Arc::new(ScriptedAuth::default());
		let store = MemoryStore::default();
		let tokens = manager(&auth, &store, None);
		let first = tokens.ensure_valid().await.expect("Cold start should authenticate.");
		let second = tokens.ensure_valid().await.expect("Held session should be reused.");

		assert_eq!(auth.login_calls(), 1);
		assert_eq!(first.token, second.token);
		assert_eq!(store.snapshot().expect("Session should be persisted.").token, first.token);
	}

	#[tokio::test(start_paused = true)]
	async fn active_persisted_session_is_adopted_without_login() {
		let auth = Arc::new(ScriptedAuth::default());
		let store = MemoryStore::with_record(persisted("stored", Duration::hours(1)));
		let tokens = manager(&auth, &store, None);
		let session = tokens.ensure_valid().await.expect("Stored session should be adopted.");

		assert_eq!(session.token.expose(), "stored");
		assert_eq!(auth.login_calls(), 0);
		assert_eq!(tokens.metrics().adoptions(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn expired_persisted_session_triggers_login() {
		let auth = Arc::new(ScriptedAuth::default());
		let store = MemoryStore::with_record(persisted("stale", Duration::hours(24)));
		let tokens = manager(&auth, &store, None);
		let session = tokens.ensure_valid().await.expect("Expired record should be replaced.");

		assert_ne!(session.token.expose(), "stale");
		assert_eq!(auth.login_calls(), 1);
		assert_eq!(tokens.metrics().adoptions(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn concurrent_cold_start_shares_one_login() {
		let auth =
			Arc::new(ScriptedAuth::default().with_login_delay(StdDuration::from_millis(100)));
		let store = MemoryStore::default();
		let tokens = Arc::new(manager(&auth, &store, None));
		let handles: Vec<_> = (0..8)
			.map(|_| {
				let tokens = tokens.clone();

				tokio::spawn(async move { tokens.ensure_valid().await })
			})
			.collect();
		let mut issued = Vec::new();

		for handle in handles {
			let session = handle
				.await
				.expect("Caller task should not panic.")
				.expect("Every caller should receive the session.");

			issued.push(session.token);
		}

		assert_eq!(auth.login_calls(), 1);
		assert!(issued.windows(2).all(|pair| pair[0] == pair[1]));
	}

	#[tokio::test(start_paused = true)]
	async fn waiters_observe_a_shared_authentication_failure() {
		let auth =
			Arc::new(ScriptedAuth::default().with_login_delay(StdDuration::from_millis(100)));

		auth.push_login(Err(Error::Business {
			operation: "login".into(),
			error_code: "3".into(),
			message: "invalid credentials".into(),
		}));

		let store = MemoryStore::default();
		let tokens = Arc::new(manager(&auth, &store, None));
		let handles: Vec<_> = (0..4)
			.map(|_| {
				let tokens = tokens.clone();

				tokio::spawn(async move { tokens.ensure_valid().await })
			})
			.collect();

		for handle in handles {
			let err = handle
				.await
				.expect("Caller task should not panic.")
				.expect_err("Every waiter should observe the failure.");

			let Error::AuthenticationFailed { reason, attempts } = &err else {
				panic!("Expected an authentication failure, got {err:?}.");
			};

			assert_eq!(*attempts, 1);
			assert!(reason.contains("invalid credentials"), "{reason}");
		}

		assert_eq!(auth.login_calls(), 1);

		tokens.ensure_valid().await.expect("A later caller should try again and succeed.");

		assert_eq!(auth.login_calls(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn transient_login_failures_are_retried_within_budget() {
		let auth = Arc::new(ScriptedAuth::default());

		auth.push_login(Err(TransientError::timeout("login").into()));
		auth.push_login(Err(TransientError::unavailable("login").into()));

		let store = MemoryStore::default();
		let tokens = manager(&auth, &store, None);

		tokens.ensure_valid().await.expect("Third login should succeed.");

		assert_eq!(auth.login_calls(), 3);

		let auth = Arc::new(ScriptedAuth::default());

		for _ in 0..3 {
			auth.push_login(Err(TransientError::timeout("login").into()));
		}

		let tokens = manager(&auth, &MemoryStore::default(), None);
		let err = tokens.ensure_valid().await.expect_err("Budget should run out.");

		assert!(matches!(err, Error::AuthenticationFailed { attempts: 3, .. }));
		assert_eq!(auth.login_calls(), 3);
		assert_eq!(tokens.metrics().login_failures(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn rejected_validation_forces_login() {
		let auth = Arc::new(ScriptedAuth::default());

		auth.push_validation(Ok(Validation::Invalid));

		let store = MemoryStore::with_record(persisted("stored", Duration::hours(1)));
		let tokens = manager(&auth, &store, Some(StdDuration::from_secs(300)));
		let session = tokens.ensure_valid().await.expect("Rejected session should be replaced.");

		assert_ne!(session.token.expose(), "stored");
		assert_eq!(auth.validate_calls(), 1);
		assert_eq!(auth.login_calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn validation_runs_once_per_interval() {
		let auth = Arc::new(ScriptedAuth::default());
		let store = MemoryStore::with_record(persisted("stored", Duration::hours(1)));
		let tokens = manager(&auth, &store, Some(StdDuration::from_secs(300)));

		tokens.ensure_valid().await.expect("Stored session should validate.");
		tokens.ensure_valid().await.expect("Checked session should be reused.");

		assert_eq!(auth.validate_calls(), 1);

		time::advance(StdDuration::from_secs(301)).await;
		tokens.ensure_valid().await.expect("Session should validate again.");

		assert_eq!(auth.validate_calls(), 2);
		assert_eq!(auth.login_calls(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn refreshed_token_is_adopted_and_persisted() {
		let auth = Arc::new(ScriptedAuth::default());

		auth.push_validation(Ok(Validation::Refreshed(Secret::new("rotated"))));

		let store = MemoryStore::with_record(persisted("stored", Duration::hours(1)));
		let tokens = manager(&auth, &store, Some(StdDuration::from_secs(300)));
		let session = tokens.ensure_valid().await.expect("Refreshed session should be returned.");

		assert_eq!(session.token.expose(), "rotated");
		assert_eq!(store.snapshot().expect("Record should exist.").token.expose(), "rotated");
		assert_eq!(auth.login_calls(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn unreachable_validation_trusts_local_expiry() {
		let auth = Arc::new(ScriptedAuth::default());

		auth.push_validation(Err(TransientError::timeout("validate").into()));

		let store = MemoryStore::with_record(persisted("stored", Duration::hours(1)));
		let tokens = manager(&auth, &store, Some(StdDuration::from_secs(300)));
		let session = tokens.ensure_valid().await.expect("Local expiry should be trusted.");

		assert_eq!(session.token.expose(), "stored");
		assert_eq!(auth.login_calls(), 0);

		auth.push_validation(Err(Error::http("validate", 401, b"")));
		time::advance(StdDuration::from_secs(301)).await;

		let session = tokens.ensure_valid().await.expect("401 should force a new login.");

		assert_ne!(session.token.expose(), "stored");
		assert_eq!(auth.login_calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn invalidate_token_ignores_replaced_sessions() {
		let auth = Arc::new(ScriptedAuth::default());
		let store = MemoryStore::default();
		let tokens = manager(&auth, &store, None);
		let session = tokens.ensure_valid().await.expect("Cold start should authenticate.");

		assert!(!tokens.invalidate_token(&Secret::new("someone-else")).await);
		assert!(tokens.current().await.is_some());
		assert!(tokens.invalidate_token(&session.token).await);
		assert!(tokens.current().await.is_none());
		assert!(store.snapshot().is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn logout_clears_memory_and_store() {
		let auth = Arc::new(ScriptedAuth::default());
		let store = MemoryStore::default();
		let tokens = manager(&auth, &store, None);

		assert!(!tokens.logout().await.expect("Logout without session should succeed."));
		assert_eq!(auth.logout_calls(), 0);

		tokens.ensure_valid().await.expect("Cold start should authenticate.");

		assert!(tokens.logout().await.expect("Logout should succeed."));
		assert_eq!(auth.logout_calls(), 1);
		assert!(tokens.current().await.is_none());
		assert!(store.snapshot().is_none());
	}
}

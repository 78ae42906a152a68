//! Client configuration with documented defaults and environment loading.

// std
use std::path::PathBuf;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Username},
	error::ConfigError,
	retry::RetryPolicy,
};

/// Environment variable holding the gateway base URL.
pub const ENV_BASE_URL: &str = "API_BASE_URL";
/// Environment variable holding the username.
pub const ENV_USERNAME: &str = "API_USER";
/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "API_KEY";
/// Environment variable holding the session file location.
pub const ENV_SESSION_FILE: &str = "PROJECTX_SESSION_FILE";
/// Environment variable overriding the minimum call spacing, in milliseconds.
pub const ENV_MIN_INTERVAL_MS: &str = "PROJECTX_MIN_INTERVAL_MS";
/// Environment variable overriding the attempt budget per call.
pub const ENV_MAX_ATTEMPTS: &str = "PROJECTX_MAX_ATTEMPTS";
/// Environment variable overriding the first backoff delay, in milliseconds.
pub const ENV_BASE_DELAY_MS: &str = "PROJECTX_BASE_DELAY_MS";
/// Environment variable overriding the trusted token lifetime, in seconds.
pub const ENV_TOKEN_LIFETIME_SECS: &str = "PROJECTX_TOKEN_LIFETIME_SECS";

/// Gateway endpoint paths used by the session core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
	/// Credential exchange.
	pub login: String,
	/// Token validation.
	pub validate: String,
	/// Session termination.
	pub logout: String,
}
impl Default for Endpoints {
	fn default() -> Self {
		Self {
			login: "/api/Auth/loginKey".into(),
			validate: "/api/Auth/validate".into(),
			logout: "/api/Auth/logout".into(),
		}
	}
}

/// Everything a [`Client`](crate::client::Client) needs, with named defaults.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Gateway root URL.
	pub base_url: Url,
	/// Login credentials.
	pub credentials: Credentials,
	/// Session endpoint paths.
	pub endpoints: Endpoints,
	/// Local trust window for a freshly issued token.
	pub token_lifetime: Duration,
	/// Maximum age of the last remote validation; `None` disables remote validation.
	pub validate_interval: Option<StdDuration>,
	/// Minimum spacing between outbound calls.
	pub min_interval: StdDuration,
	/// Backoff policy for domain calls.
	pub retry: RetryPolicy,
	/// Backoff policy for login calls.
	pub auth_retry: RetryPolicy,
	/// Per-request HTTP timeout.
	pub request_timeout: StdDuration,
	/// Session file location.
	pub session_path: PathBuf,
}
impl ClientConfig {
	/// Default gateway root.
	pub const DEFAULT_BASE_URL: &'static str = "https://api.topstepx.com";
	/// Default session file name, relative to the working directory.
	pub const DEFAULT_SESSION_PATH: &'static str = "projectx_session.json";
	/// Default local trust window.
	pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::hours(23);
	/// Default maximum age of the last remote validation.
	pub const DEFAULT_VALIDATE_INTERVAL: StdDuration = StdDuration::from_secs(5 * 60);
	/// Default minimum spacing between outbound calls.
	pub const DEFAULT_MIN_INTERVAL: StdDuration = StdDuration::from_millis(300);
	/// Default per-request HTTP timeout.
	pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(10);

	/// Creates a configuration with every default applied.
	pub fn new(credentials: Credentials) -> Result<Self> {
		Ok(Self {
			base_url: Url::parse(Self::DEFAULT_BASE_URL).map_err(ConfigError::from)?,
			credentials,
			endpoints: Endpoints::default(),
			token_lifetime: Self::DEFAULT_TOKEN_LIFETIME,
			validate_interval: Some(Self::DEFAULT_VALIDATE_INTERVAL),
			min_interval: Self::DEFAULT_MIN_INTERVAL,
			retry: RetryPolicy::default(),
			auth_retry: RetryPolicy::default(),
			request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
			session_path: PathBuf::from(Self::DEFAULT_SESSION_PATH),
		})
	}

	/// Loads `.env` (when present) and builds a configuration from the process environment.
	pub fn from_env() -> Result<Self> {
		if let Err(e) = dotenvy::dotenv() {
			tracing::debug!(error = %e, "No .env file loaded.");
		}

		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Builds a configuration from an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required = |name: &'static str| {
			lookup(name)
				.filter(|value| !value.trim().is_empty())
				.ok_or(ConfigError::MissingEnv { name })
		};
		let username = Username::new(required(ENV_USERNAME)?).map_err(ConfigError::from)?;
		let mut config = Self::new(Credentials::new(username, required(ENV_API_KEY)?))?;

		if let Some(base_url) = lookup(ENV_BASE_URL) {
			config = config.with_base_url(&base_url)?;
		}
		if let Some(path) = lookup(ENV_SESSION_FILE) {
			config.session_path = PathBuf::from(path);
		}
		if let Some(millis) = parse_env::<u64, _>(&lookup, ENV_MIN_INTERVAL_MS)? {
			config.min_interval = StdDuration::from_millis(millis);
		}
		if let Some(attempts) = parse_env::<u32, _>(&lookup, ENV_MAX_ATTEMPTS)? {
			config.retry = RetryPolicy::new(attempts, config.retry.base_delay())
				.with_max_delay(config.retry.max_delay());
		}
		if let Some(millis) = parse_env::<u64, _>(&lookup, ENV_BASE_DELAY_MS)? {
			let base_delay = StdDuration::from_millis(millis);

			config.retry = RetryPolicy::new(config.retry.max_attempts(), base_delay)
				.with_max_delay(config.retry.max_delay());
		}
		if let Some(secs) = parse_env::<i64, _>(&lookup, ENV_TOKEN_LIFETIME_SECS)? {
			config.token_lifetime = Duration::seconds(secs);
		}

		config.validate()?;

		Ok(config)
	}

	/// Overrides the gateway root.
	pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
		self.base_url = Url::parse(base_url).map_err(ConfigError::from)?;

		Ok(self)
	}

	/// Overrides the endpoint paths.
	pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the local trust window.
	pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
		self.token_lifetime = lifetime;

		self
	}

	/// Overrides the remote validation interval; `None` disables remote validation.
	pub fn with_validate_interval(mut self, interval: Option<StdDuration>) -> Self {
		self.validate_interval = interval;

		self
	}

	/// Overrides the minimum spacing between outbound calls.
	pub fn with_min_interval(mut self, interval: StdDuration) -> Self {
		self.min_interval = interval;

		self
	}

	/// Overrides the domain-call backoff policy.
	pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
		self.retry = policy;

		self
	}

	/// Overrides the login backoff policy.
	pub fn with_auth_retry(mut self, policy: RetryPolicy) -> Self {
		self.auth_retry = policy;

		self
	}

	/// Overrides the per-request HTTP timeout.
	pub fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the session file location.
	pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.session_path = path.into();

		self
	}

	/// Rejects configurations the session core cannot operate with.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.token_lifetime.is_positive() {
			return Err(ConfigError::NonPositiveLifetime);
		}

		Ok(())
	}
}

fn parse_env<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>>
where
	T: FromStr,
	F: Fn(&str) -> Option<String>,
{
	let Some(raw) = lookup(name) else {
		return Ok(None);
	};

	raw.trim()
		.parse::<T>()
		.map(Some)
		.map_err(|_| ConfigError::InvalidEnv { name, value: raw }.into())
}

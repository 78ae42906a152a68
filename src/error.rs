//! Gateway-level error taxonomy shared by the session core and the domain pass-throughs.

// self
use crate::{_prelude::*, auth::UsernameError};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Session persistence failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),

	/// The login endpoint rejected the credentials or stayed unreachable.
	#[error("Authentication failed after {attempts} attempt(s): {reason}")]
	AuthenticationFailed {
		/// Last failure observed while authenticating.
		reason: String,
		/// Number of login calls performed before giving up.
		attempts: u32,
	},
	/// The call reached the gateway but its envelope reported `success: false`.
	#[error("Gateway rejected `{operation}` (errorCode={error_code}): {message}.")]
	Business {
		/// Logical operation name.
		operation: String,
		/// Gateway-supplied error code, or `n/a`.
		error_code: String,
		/// Gateway-supplied error message.
		message: String,
	},
	/// A retryable failure persisted past the attempt budget.
	#[error("`{operation}` kept failing after {attempts} attempt(s).")]
	RetriesExhausted {
		/// Logical operation name.
		operation: String,
		/// Number of invocations performed.
		attempts: u32,
		/// Last retryable failure.
		#[source]
		last: Box<Error>,
	},
	/// The response envelope is missing expected fields or cannot be parsed.
	#[error("`{operation}` returned a malformed response: {detail}.")]
	MalformedResponse {
		/// Logical operation name.
		operation: String,
		/// HTTP status code of the response, when available.
		status: Option<u16>,
		/// Parsing failure, including the JSON path when known.
		detail: String,
	},
	/// Non-retryable HTTP status (4xx and 5xx other than 503).
	#[error("`{operation}` failed with HTTP {status}.")]
	Http {
		/// Logical operation name.
		operation: String,
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
	},
	/// Transport failure that is neither a timeout nor a connection failure.
	#[error("Transport error occurred while calling `{operation}`.")]
	Transport {
		/// Logical operation name.
		operation: String,
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
}
impl Error {
	/// Builds an [`Error::Http`] with a truncated body preview.
	pub fn http(operation: impl Into<String>, status: u16, body: &[u8]) -> Self {
		Self::Http { operation: operation.into(), status, body: body_preview(body) }
	}

	/// Wraps a transport-specific failure.
	pub fn transport(
		operation: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Transport { operation: operation.into(), source: Box::new(src) }
	}

	/// Returns `true` for failures that are safe to re-attempt automatically.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient(_))
	}

	/// Returns `true` when the gateway answered `401 Unauthorized`.
	pub fn is_unauthorized(&self) -> bool {
		self.status() == Some(401)
	}

	/// HTTP status attached to the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Http { status, .. } => Some(*status),
			Self::MalformedResponse { status, .. } => *status,
			Self::Transient(TransientError::ServiceUnavailable { status, .. }) => Some(*status),
			Self::RetriesExhausted { last, .. } => last.status(),
			_ => None,
		}
	}

	/// Retry-After hint supplied by the gateway, if any.
	pub fn retry_after(&self) -> Option<StdDuration> {
		match self {
			Self::Transient(TransientError::ServiceUnavailable { retry_after, .. }) => *retry_after,
			_ => None,
		}
	}
}

/// Configuration and validation failures raised while wiring a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL or endpoint path cannot be parsed.
	#[error("Gateway URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Username failed validation.
	#[error("Username is invalid.")]
	InvalidUsername(#[from] UsernameError),
	/// Required environment variable is absent.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// Environment variable holds an unparsable value.
	#[error("Environment variable `{name}` has an invalid value `{value}`.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// Raw value read from the environment.
		value: String,
	},
	/// Token lifetime must be strictly positive.
	#[error("Token lifetime must be positive.")]
	NonPositiveLifetime,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<url::ParseError> for ConfigError {
	fn from(source: url::ParseError) -> Self {
		Self::InvalidUrl { source }
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// The request exceeded its timeout.
	#[error("`{operation}` timed out.")]
	Timeout {
		/// Logical operation name.
		operation: String,
	},
	/// The connection to the gateway could not be established.
	#[error("Connection failed while calling `{operation}`.")]
	Connect {
		/// Logical operation name.
		operation: String,
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The gateway answered `503 Service Unavailable`.
	#[error("`{operation}` is temporarily unavailable (HTTP {status}).")]
	ServiceUnavailable {
		/// Logical operation name.
		operation: String,
		/// HTTP status code.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<StdDuration>,
	},
}
impl TransientError {
	/// Builds a [`TransientError::Timeout`].
	pub fn timeout(operation: impl Into<String>) -> Self {
		Self::Timeout { operation: operation.into() }
	}

	/// Builds a [`TransientError::ServiceUnavailable`] for a plain 503.
	pub fn unavailable(operation: impl Into<String>) -> Self {
		Self::ServiceUnavailable { operation: operation.into(), status: 503, retry_after: None }
	}
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	if text.len() <= BODY_PREVIEW_LIMIT {
		return text.into_owned();
	}

	let mut end = BODY_PREVIEW_LIMIT;

	while !text.is_char_boundary(end) {
		end -= 1;
	}

	format!("{}... ({} bytes total)", &text[..end], text.len())
}

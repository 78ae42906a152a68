//! Transport primitives for gateway calls.
//!
//! [`ApiHttpClient`] owns the shared reqwest client and the base URL. It turns transport
//! failures into classified [`Error`] values and hands back raw [`HttpReply`] values so the
//! envelope layer decides what a status code means for each endpoint.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::{
	RequestBuilder,
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::{
	auth::Secret,
	error::{ConfigError, TransientError},
};

/// Status, retry hint, and body of a completed HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpReply {
	/// HTTP status code.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<StdDuration>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpReply {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Gateway endpoints answer directly, so redirects are never followed.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ApiHttpClient {
	client: ReqwestClient,
	base_url: Url,
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient {
	/// Builds a client with a per-request timeout.
	pub fn new(base_url: Url, timeout: StdDuration) -> Result<Self> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.redirect(Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Ok(Self::with_client(client, base_url))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, base_url: Url) -> Self {
		Self { client, base_url }
	}

	/// Gateway root every endpoint path is resolved against.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Resolves an endpoint path against the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url> {
		let mut url = self.base_url.clone();
		let base_path = url.path().trim_end_matches('/').to_owned();

		url.set_path(&format!("{base_path}/{}", path.trim_start_matches('/')));

		if url.cannot_be_a_base() {
			return Err(ConfigError::from(url::ParseError::RelativeUrlWithCannotBeABaseBase).into());
		}

		Ok(url)
	}

	/// POSTs a JSON body, optionally authenticated with a bearer token.
	pub async fn post_json<B>(
		&self,
		operation: &str,
		path: &str,
		bearer: Option<&Secret>,
		body: &B,
	) -> Result<HttpReply>
	where
		B: ?Sized + Serialize,
	{
		let request = self.client.post(self.endpoint(path)?).json(body);

		self.send(operation, request, bearer).await
	}

	/// POSTs without a body, optionally authenticated with a bearer token.
	pub async fn post_empty(
		&self,
		operation: &str,
		path: &str,
		bearer: Option<&Secret>,
	) -> Result<HttpReply> {
		let request = self.client.post(self.endpoint(path)?);

		self.send(operation, request, bearer).await
	}

	/// Issues a GET, optionally authenticated with a bearer token.
	pub async fn get(
		&self,
		operation: &str,
		path: &str,
		bearer: Option<&Secret>,
	) -> Result<HttpReply> {
		let request = self.client.get(self.endpoint(path)?);

		self.send(operation, request, bearer).await
	}

	async fn send(
		&self,
		operation: &str,
		request: RequestBuilder,
		bearer: Option<&Secret>,
	) -> Result<HttpReply> {
		let request = match bearer {
			Some(token) => request.bearer_auth(token.expose()),
			None => request,
		};
		let response = request.send().await.map_err(|e| map_reqwest_error(operation, e))?;
		let status = response.status().as_u16();
		let retry_after = parse_retry_after(response.headers());
		let body = response.bytes().await.map_err(|e| map_reqwest_error(operation, e))?.to_vec();

		tracing::debug!(operation, status, bytes = body.len(), "Gateway responded.");

		Ok(HttpReply { status, retry_after, body })
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(operation: &str, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::timeout(operation).into();
	}
	if err.is_connect() {
		return TransientError::Connect { operation: operation.into(), source: Box::new(err) }
			.into();
	}

	Error::transport(operation, err)
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<StdDuration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(StdDuration::from_secs(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return StdDuration::try_from(delta).ok();
		}
	}

	None
}

//! Remote session endpoints: login, validate, and logout.

// self
use crate::{
	_prelude::*,
	auth::{Credentials, Secret},
};
#[cfg(feature = "reqwest")] use crate::{config::Endpoints, envelope, http::ApiHttpClient};

/// Boxed future returned by [`AuthApi`] operations.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Server verdict on a token that is still trusted locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validation {
	/// The token is still accepted.
	Valid,
	/// The token is accepted and the gateway issued a replacement.
	Refreshed(Secret),
	/// The gateway no longer accepts the token.
	Invalid,
}

/// Remote half of the session lifecycle.
///
/// Implementations perform exactly one HTTP exchange per call and never retry; pacing and
/// backoff belong to the caller.
pub trait AuthApi
where
	Self: Send + Sync,
{
	/// Exchanges credentials for a fresh bearer token.
	fn login<'a>(&'a self, credentials: &'a Credentials) -> AuthFuture<'a, Secret>;

	/// Asks the gateway whether `token` is still accepted.
	fn validate<'a>(&'a self, token: &'a Secret) -> AuthFuture<'a, Validation>;

	/// Terminates the server-side session; returns the gateway's success flag.
	fn logout<'a>(&'a self, token: &'a Secret) -> AuthFuture<'a, bool>;
}

#[cfg(feature = "reqwest")]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
	user_name: &'a str,
	api_key: &'a str,
}

#[cfg(feature = "reqwest")]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateReply {
	#[serde(default)]
	success: bool,
	#[serde(default)]
	new_token: Option<String>,
}
#[cfg(feature = "reqwest")]
impl ValidateReply {
	fn into_validation(self) -> Validation {
		match (self.success, self.new_token) {
			(false, _) => Validation::Invalid,
			(true, Some(token)) if !token.is_empty() => Validation::Refreshed(Secret::new(token)),
			(true, _) => Validation::Valid,
		}
	}
}

#[cfg(feature = "reqwest")]
#[derive(Debug, Deserialize)]
struct AckReply {
	#[serde(default)]
	success: bool,
}

/// [`AuthApi`] backed by the gateway's REST endpoints.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestAuthApi {
	http: ApiHttpClient,
	endpoints: Endpoints,
}
#[cfg(feature = "reqwest")]
impl ReqwestAuthApi {
	/// Creates the remote auth client over a shared transport.
	pub fn new(http: ApiHttpClient, endpoints: Endpoints) -> Self {
		Self { http, endpoints }
	}
}
#[cfg(feature = "reqwest")]
impl AuthApi for ReqwestAuthApi {
	fn login<'a>(&'a self, credentials: &'a Credentials) -> AuthFuture<'a, Secret> {
		Box::pin(async move {
			const OPERATION: &str = "login";

			let body = LoginRequest {
				user_name: credentials.username().as_str(),
				api_key: credentials.api_key().expose(),
			};
			let reply = self.http.post_json(OPERATION, &self.endpoints.login, None, &body).await?;
			let token: Secret = envelope::decode_field(OPERATION, &reply, "token")?;

			if token.is_empty() {
				return Err(Error::MalformedResponse {
					operation: OPERATION.into(),
					status: Some(reply.status),
					detail: "empty field `token`".into(),
				});
			}

			Ok(token)
		})
	}

	fn validate<'a>(&'a self, token: &'a Secret) -> AuthFuture<'a, Validation> {
		Box::pin(async move {
			const OPERATION: &str = "validate";

			let reply =
				self.http.post_empty(OPERATION, &self.endpoints.validate, Some(token)).await?;

			envelope::decode_raw::<ValidateReply>(OPERATION, &reply)
				.map(ValidateReply::into_validation)
		})
	}

	fn logout<'a>(&'a self, token: &'a Secret) -> AuthFuture<'a, bool> {
		Box::pin(async move {
			const OPERATION: &str = "logout";

			let reply =
				self.http.post_empty(OPERATION, &self.endpoints.logout, Some(token)).await?;

			envelope::decode_raw::<AckReply>(OPERATION, &reply).map(|ack| ack.success)
		})
	}
}

//! Immutable login credentials.

// self
use crate::{
	_prelude::*,
	auth::{Secret, Username},
};

/// Principal plus API key supplied once at construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	username: Username,
	api_key: Secret,
}
impl Credentials {
	/// Creates credentials for `username`.
	pub fn new(username: Username, api_key: impl Into<Secret>) -> Self {
		Self { username, api_key: api_key.into() }
	}

	/// Principal the credentials authenticate as.
	pub fn username(&self) -> &Username {
		&self.username
	}

	/// API key; callers must avoid logging it.
	pub fn api_key(&self) -> &Secret {
		&self.api_key
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("username", &self.username)
			.field("api_key", &"<redacted>")
			.finish()
	}
}

//! Gateway principal name.

// self
use crate::_prelude::*;

/// Longest `userName` the gateway accepts.
pub const USERNAME_MAX_LEN: usize = 128;

/// Reason a username was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum UsernameError {
	/// Nothing to log in with.
	#[error("Username cannot be empty.")]
	Empty,
	/// Whitespace never survives the login form, so it is refused up front.
	#[error("Username contains whitespace.")]
	Whitespace,
	/// Longer than [`USERNAME_MAX_LEN`] bytes.
	#[error("Username exceeds {USERNAME_MAX_LEN} bytes.")]
	TooLong,
}

/// Principal sent as `userName` at login and stamped on every persisted session.
///
/// A session file is only adopted when its owner equals the configured username, so two
/// accounts sharing one session path never reuse each other's token.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);
impl Username {
	/// Validates and wraps `value`.
	pub fn new(value: impl Into<String>) -> Result<Self, UsernameError> {
		let value = value.into();

		if value.is_empty() {
			Err(UsernameError::Empty)
		} else if value.chars().any(char::is_whitespace) {
			Err(UsernameError::Whitespace)
		} else if value.len() > USERNAME_MAX_LEN {
			Err(UsernameError::TooLong)
		} else {
			Ok(Self(value))
		}
	}

	/// Borrowed view of the name.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Username {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl TryFrom<String> for Username {
	type Error = UsernameError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<Username> for String {
	fn from(value: Username) -> Self {
		value.0
	}
}
impl Debug for Username {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Username({})", self.0)
	}
}
impl Display for Username {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

//! Observability helpers for gateway calls.
//!
//! # Feature Flags
//!
//! - Spans named `projectx.call` with the `kind` (login, validate, logout, request) and
//!   `operation` (logical endpoint) fields are always emitted through `tracing`.
//! - Enable `metrics` to increment the `projectx_call_total` counter for every
//!   attempt/success/failure, labeled by `kind` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Kinds of remote call issued by the gateway client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Credential exchange for a fresh token.
	Login,
	/// Server-side token validation.
	Validate,
	/// Server-side session termination.
	Logout,
	/// Authenticated domain request.
	Request,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Login => "login",
			CallKind::Validate => "validate",
			CallKind::Logout => "logout",
			CallKind::Request => "request",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// A single invocation was issued.
	Attempt,
	/// The call completed successfully.
	Success,
	/// The call failed and the error propagated to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

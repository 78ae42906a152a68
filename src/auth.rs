//! Principal identifiers, redacted secrets, credentials, sessions, and the remote auth contract.

pub mod credentials;
pub mod id;
pub mod remote;
pub mod secret;
pub mod session;

pub use credentials::*;
pub use id::*;
pub use remote::*;
pub use secret::*;
pub use session::*;

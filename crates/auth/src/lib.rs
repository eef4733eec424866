//! `bankline-auth`: caller identity, token verification and the access guards.
//!
//! No HTTP routing here; the API crate wires these into its middleware.

pub mod authorize;
pub mod caller;
pub mod remote;
pub mod roles;
pub mod verifier;

pub use authorize::{AuthzError, authorize_customer, require_admin};
pub use caller::Caller;
pub use remote::RemoteTokenVerifier;
pub use roles::Role;
pub use verifier::{AuthError, StaticTokenVerifier, TokenVerifier};

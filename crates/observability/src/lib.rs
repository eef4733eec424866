//! Process-wide logging setup shared by binaries and test harnesses.

/// Subscriber configuration (filters, JSON formatting).
pub mod tracing;

pub use crate::tracing::{DEFAULT_DIRECTIVES, init, init_with_default};

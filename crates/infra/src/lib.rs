//! Infrastructure layer: Postgres, in-memory store, config, pool wiring.

pub mod config;
pub mod db;
pub mod in_memory;
pub mod postgres;

pub use config::{AppConfig, ConfigError, DatabaseConfig, IdentityConfig, ServerConfig};
pub use db::InitError;
pub use in_memory::InMemoryAccountRepository;
pub use postgres::PgAccountRepository;

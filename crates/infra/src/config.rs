//! Process configuration, read once from the environment at startup.
//!
//! Required variables:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `SERVER_ADDRESS`, `SERVER_PORT` | HTTP listen address |
//! | `AUTH_SERVER_ADDRESS`, `AUTH_SERVER_PORT` | identity service |
//! | `DB_USER`, `DB_PASSWORD`, `DB_ADDRESS`, `DB_PORT`, `DB_NAME` | Postgres |
//!
//! Optional variables (defaults in parentheses): `DB_MAX_CONNECTIONS` (10),
//! `DB_ACQUIRE_TIMEOUT_MS` (5000), `DB_LOCK_TIMEOUT_MS` (2000),
//! `DB_CONN_MAX_LIFETIME_SECS` (180), `LEDGER_MIN_OPENING_BALANCE` (5000),
//! `LEDGER_MAX_ATTEMPTS` (3), `LEDGER_REQUEST_DEADLINE_MS` (10000).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

use bankline_accounts::LedgerPolicy;
use bankline_core::Money;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Every required variable that was unset or blank, in lookup order.
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Location of the identity service used to verify bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub address: String,
    pub port: u16,
}

impl IdentityConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub address: String,
    pub port: u16,
    pub name: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub lock_timeout: Duration,
    pub max_lifetime: Duration,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.address)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
    }
}

// Hand-written so the password never ends up in logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("lock_timeout", &self.lock_timeout)
            .field("max_lifetime", &self.max_lifetime)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub database: DatabaseConfig,
    pub policy: LedgerPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// All missing required variables are collected before any value is
    /// parsed, so one error names every gap.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut vars = Vars {
            lookup,
            missing: Vec::new(),
        };

        let server_address = vars.required("SERVER_ADDRESS");
        let server_port = vars.required("SERVER_PORT");
        let auth_address = vars.required("AUTH_SERVER_ADDRESS");
        let auth_port = vars.required("AUTH_SERVER_PORT");
        let db_user = vars.required("DB_USER");
        let db_password = vars.required("DB_PASSWORD");
        let db_address = vars.required("DB_ADDRESS");
        let db_port = vars.required("DB_PORT");
        let db_name = vars.required("DB_NAME");

        if !vars.missing.is_empty() {
            return Err(ConfigError::Missing(vars.missing));
        }

        let max_connections: u32 = vars.optional("DB_MAX_CONNECTIONS", 10)?;
        if max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "must be at least 1"));
        }
        let max_attempts: u32 = vars.optional("LEDGER_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(invalid("LEDGER_MAX_ATTEMPTS", "must be at least 1"));
        }

        let minimum_opening_balance = match vars.value("LEDGER_MIN_OPENING_BALANCE") {
            None => LedgerPolicy::DEFAULT_MINIMUM_OPENING_BALANCE,
            Some(raw) => parse_money("LEDGER_MIN_OPENING_BALANCE", &raw)?,
        };

        let defaults = LedgerPolicy::default();

        Ok(Self {
            server: ServerConfig {
                address: server_address,
                port: parse("SERVER_PORT", &server_port)?,
            },
            identity: IdentityConfig {
                address: auth_address,
                port: parse("AUTH_SERVER_PORT", &auth_port)?,
            },
            database: DatabaseConfig {
                user: db_user,
                password: db_password,
                address: db_address,
                port: parse("DB_PORT", &db_port)?,
                name: db_name,
                max_connections,
                acquire_timeout: Duration::from_millis(vars.optional("DB_ACQUIRE_TIMEOUT_MS", 5_000)?),
                lock_timeout: Duration::from_millis(vars.optional("DB_LOCK_TIMEOUT_MS", 2_000)?),
                max_lifetime: Duration::from_secs(vars.optional("DB_CONN_MAX_LIFETIME_SECS", 180)?),
            },
            policy: LedgerPolicy {
                minimum_opening_balance,
                max_attempts,
                retry_backoff: defaults.retry_backoff,
                deadline: Duration::from_millis(vars.optional("LEDGER_REQUEST_DEADLINE_MS", 10_000)?),
            },
        })
    }
}

struct Vars<F> {
    lookup: F,
    missing: Vec<String>,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn value(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, key: &'static str) -> String {
        match self.value(key) {
            Some(v) => v,
            None => {
                self.missing.push(key.to_string());
                String::new()
            }
        }
    }

    fn optional<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.value(key) {
            Some(raw) => parse(key, &raw),
            None => Ok(default),
        }
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| invalid(key, format!("'{raw}': {e}")))
}

fn parse_money(key: &'static str, raw: &str) -> Result<Money, ConfigError> {
    let amount = Decimal::from_str(raw).map_err(|e| invalid(key, format!("'{raw}': {e}")))?;
    let money = Money::from_decimal(amount).map_err(|e| invalid(key, e.to_string()))?;
    if !money.is_positive() {
        return Err(invalid(key, "must be positive"));
    }
    Ok(money)
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.into(),
    }
}

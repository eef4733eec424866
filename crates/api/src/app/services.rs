use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use bankline_accounts::{AccountService, LedgerPolicy, LedgerService};
use bankline_auth::{AuthError, RemoteTokenVerifier, TokenVerifier};
use bankline_infra::{AppConfig, InMemoryAccountRepository, InitError, PgAccountRepository, db};

/// Everything the router needs, type-erased behind the service traits.
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<dyn AccountService>,
    pub verifier: Arc<dyn TokenVerifier>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Init(#[from] InitError),

    #[error("failed to set up the identity client: {0}")]
    Identity(#[from] AuthError),
}

/// Production wiring: Postgres ledger + remote identity service.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;

    let repository = PgAccountRepository::new(pool, config.database.lock_timeout);
    let accounts = Arc::new(LedgerService::new(repository, config.policy));

    let verifier = Arc::new(RemoteTokenVerifier::new(
        &config.identity.base_url(),
        RemoteTokenVerifier::DEFAULT_TIMEOUT,
    )?);

    info!(
        identity = %config.identity.base_url(),
        minimum_opening_balance = %config.policy.minimum_opening_balance,
        "services ready"
    );

    Ok(AppServices { accounts, verifier })
}

/// In-memory wiring (dev/test): same ledger rules over `InMemoryAccountRepository`.
pub fn build_in_memory_services(
    repository: Arc<InMemoryAccountRepository>,
    policy: LedgerPolicy,
    verifier: Arc<dyn TokenVerifier>,
) -> AppServices {
    AppServices {
        accounts: Arc::new(LedgerService::new(repository, policy)),
        verifier,
    }
}

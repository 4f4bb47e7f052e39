//! Apply the embedded schema migrations to the configured database.
//!
//! Settings load the same way as the storage core (`SOCIAL_STORE_*`
//! variables, CLI flags, config file); only the database URL is used.

use color_eyre::eyre::{Result, eyre};
use diesel::Connection as _;
use diesel_async::AsyncPgConnection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_migrations::MigrationHarness as _;
use ortho_config::OrthoConfig as _;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use social_backend::config::StorageSettings;
use social_backend::outbound::persistence::MIGRATIONS;

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        eprintln!("failed to initialise tracing: {e}");
    }

    let settings = StorageSettings::load_from_iter(std::env::args_os())
        .map_err(|err| eyre!("failed to load storage settings: {err}"))?;
    let url = settings
        .database_url()
        .ok_or_else(|| eyre!("SOCIAL_STORE_DATABASE_URL is not set"))?;

    // The wrapper drives the async connection on its own runtime, so `main`
    // stays synchronous.
    let mut conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(url)
        .map_err(|err| eyre!("failed to connect to database: {err}"))?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| eyre!("failed to run migrations: {err}"))?;

    info!(count = applied.len(), "migrations applied");
    Ok(())
}

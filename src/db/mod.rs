use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Establish a connection to the database with connection pooling.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(database_url);
    opts.max_connections(20)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(false);

    let db = Database::connect(opts).await?;
    Ok(db)
}

/// Applied state of one known migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationState {
    pub name: String,
    pub applied: bool,
}

/// Apply every pending migration in identifier order.
///
/// Each migration is recorded as applied only once its `up` succeeds. A failure
/// stops the run and is returned; nothing is retried. A pending migration that
/// sorts before the newest applied one is refused before anything runs.
///
/// Returns the identifiers that were applied by this call.
///
/// # Errors
///
/// Returns an error if the identifier set is invalid, a pending migration is
/// out of order, or a migration fails.
pub async fn apply_pending(db: &DatabaseConnection) -> anyhow::Result<Vec<String>> {
    Migrator::check_order()?;
    Migrator::check_pending(db).await?;

    let pending: Vec<String> = Migrator::get_pending_migrations(db)
        .await?
        .iter()
        .map(|m| m.name().to_string())
        .collect();

    if pending.is_empty() {
        tracing::info!("No pending migrations");
        return Ok(pending);
    }

    for name in &pending {
        tracing::info!(migration = %name, "Applying migration");
    }

    Migrator::up(db, None)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to apply migrations: {e}"))?;

    tracing::info!(count = pending.len(), "Migrations applied");
    Ok(pending)
}

/// Revert the `steps` most recently applied migrations (at least one).
///
/// Returns the reverted identifiers, most recent first.
///
/// # Errors
///
/// Returns an error if a `down` procedure fails.
pub async fn rollback(db: &DatabaseConnection, steps: u32) -> anyhow::Result<Vec<String>> {
    let steps = steps.max(1);

    let reverted: Vec<String> = Migrator::get_applied_migrations(db)
        .await?
        .iter()
        .rev()
        .take(steps as usize)
        .map(|m| m.name().to_string())
        .collect();

    if reverted.is_empty() {
        tracing::info!("No applied migrations to revert");
        return Ok(reverted);
    }

    for name in &reverted {
        tracing::info!(migration = %name, "Reverting migration");
    }

    Migrator::down(db, Some(steps))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to revert migrations: {e}"))?;

    Ok(reverted)
}

/// List every known migration with whether it has been applied.
///
/// # Errors
///
/// Returns an error if the migration table cannot be read.
pub async fn migration_status(db: &DatabaseConnection) -> anyhow::Result<Vec<MigrationState>> {
    let applied: Vec<String> = Migrator::get_applied_migrations(db)
        .await?
        .iter()
        .map(|m| m.name().to_string())
        .collect();

    Ok(Migrator::migrations()
        .iter()
        .map(|m| MigrationState {
            name: m.name().to_string(),
            applied: applied.iter().any(|name| name == m.name()),
        })
        .collect())
}

pub use sea_orm_migration::prelude::*;

use std::fmt;

mod m20250110_000001_create_users_table;
mod m20250110_000002_create_coupons_table;
mod m20250305_000001_add_is_admin_to_users;
mod m20250305_000002_backfill_seed_admin;
mod m20250318_000001_add_birthdate_to_users;
mod m20250402_000001_add_points_to_users;
mod m20250402_000002_add_points_cost_to_coupons;
mod m20250402_000003_create_coupon_redemptions_table;
mod m20250420_000001_add_otp_to_users;
mod m20250420_000002_add_otp_attempts_to_users;

pub use m20250305_000002_backfill_seed_admin::SEED_ADMIN_EMAIL;

pub struct Migrator;

/// Every migration known to the application, in authoring order.
///
/// The order here is not trusted: [`Migrator::migrations`] sorts by identifier
/// and [`Migrator::check_order`] rejects duplicate or malformed identifiers.
fn definitions() -> Vec<Box<dyn MigrationTrait>> {
    vec![
        Box::new(m20250110_000001_create_users_table::Migration),
        Box::new(m20250110_000002_create_coupons_table::Migration),
        Box::new(m20250305_000001_add_is_admin_to_users::Migration),
        Box::new(m20250305_000002_backfill_seed_admin::Migration),
        Box::new(m20250318_000001_add_birthdate_to_users::Migration),
        Box::new(m20250402_000001_add_points_to_users::Migration),
        Box::new(m20250402_000002_add_points_cost_to_coupons::Migration),
        Box::new(m20250402_000003_create_coupon_redemptions_table::Migration),
        Box::new(m20250420_000001_add_otp_to_users::Migration),
        Box::new(m20250420_000002_add_otp_attempts_to_users::Migration),
    ]
}

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        sort_migrations(definitions())
    }
}

impl Migrator {
    /// Validate the identifiers of every known migration.
    ///
    /// # Errors
    ///
    /// Returns the first malformed or duplicated identifier.
    pub fn check_order() -> Result<(), MigrationOrderError> {
        let migrations = definitions();
        check_order(migrations.iter().map(|m| m.name()))?;
        Ok(())
    }

    /// Refuse to apply a pending migration that sorts before one already applied.
    ///
    /// Applying it would put the database history out of identifier order, and
    /// rolling back would then revert the wrong migration.
    ///
    /// # Errors
    ///
    /// Returns `DbErr::Migration` describing the out-of-order identifier, or the
    /// error from reading the migration table.
    pub async fn check_pending(db: &sea_orm::DatabaseConnection) -> Result<(), DbErr> {
        let applied: Vec<String> = Self::get_applied_migrations(db)
            .await?
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        let pending: Vec<String> = Self::get_pending_migrations(db)
            .await?
            .iter()
            .map(|m| m.name().to_string())
            .collect();

        check_pending_order(
            applied.iter().map(String::as_str),
            pending.iter().map(String::as_str),
        )
        .map_err(|e| DbErr::Migration(e.to_string()))
    }
}

/// Sort migrations by identifier so they apply in timestamp order.
#[must_use]
pub fn sort_migrations(mut migrations: Vec<Box<dyn MigrationTrait>>) -> Vec<Box<dyn MigrationTrait>> {
    migrations.sort_by(|a, b| a.name().cmp(b.name()));
    migrations
}

/// A migration identifier set that cannot be applied deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOrderError {
    /// Identifier does not match `mYYYYMMDD_NNNNNN_name`.
    Malformed(String),
    /// Identifier appears more than once.
    Duplicate(String),
    /// Pending identifier sorts before the newest applied one.
    OutOfOrder {
        pending: String,
        latest_applied: String,
    },
}

impl fmt::Display for MigrationOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(name) => write!(
                f,
                "Malformed migration identifier '{name}' (expected mYYYYMMDD_NNNNNN_name)"
            ),
            Self::Duplicate(name) => write!(f, "Duplicate migration identifier '{name}'"),
            Self::OutOfOrder {
                pending,
                latest_applied,
            } => write!(
                f,
                "Pending migration '{pending}' sorts before applied migration '{latest_applied}'"
            ),
        }
    }
}

impl std::error::Error for MigrationOrderError {}

/// Validate migration identifiers and return them in apply order.
///
/// Identifiers must be well formed and, once sorted, strictly increasing.
///
/// # Errors
///
/// Returns [`MigrationOrderError`] for the first offending identifier.
pub fn check_order<'a, I>(names: I) -> Result<Vec<&'a str>, MigrationOrderError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sorted: Vec<&str> = names.into_iter().collect();

    if let Some(bad) = sorted.iter().find(|name| !is_well_formed(name)) {
        return Err(MigrationOrderError::Malformed((*bad).to_string()));
    }

    sorted.sort_unstable();

    if let Some(pair) = sorted.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(MigrationOrderError::Duplicate(pair[1].to_string()));
    }

    Ok(sorted)
}

/// Check that every pending identifier sorts after every applied one.
///
/// # Errors
///
/// Returns [`MigrationOrderError::OutOfOrder`] for the lowest offending pending identifier.
pub fn check_pending_order<'a, A, P>(applied: A, pending: P) -> Result<(), MigrationOrderError>
where
    A: IntoIterator<Item = &'a str>,
    P: IntoIterator<Item = &'a str>,
{
    let Some(latest_applied) = applied.into_iter().max() else {
        return Ok(());
    };

    match pending.into_iter().filter(|name| *name < latest_applied).min() {
        Some(pending) => Err(MigrationOrderError::OutOfOrder {
            pending: pending.to_string(),
            latest_applied: latest_applied.to_string(),
        }),
        None => Ok(()),
    }
}

/// `m` + 8-digit date + `_` + 6-digit sequence + `_` + lowercase snake name.
fn is_well_formed(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.len() < 18 || bytes[0] != b'm' || bytes[9] != b'_' || bytes[16] != b'_' {
        return false;
    }

    let suffix = &bytes[17..];

    bytes[1..9].iter().chain(&bytes[10..16]).all(u8::is_ascii_digit)
        && !suffix.is_empty()
        && suffix
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'_')
}

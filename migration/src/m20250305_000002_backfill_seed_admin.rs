use sea_orm_migration::prelude::*;

/// Account promoted to admin when the `is_admin` column is introduced.
pub const SEED_ADMIN_EMAIL: &str = "admin@tattant.com";

/// Data backfill: grants the admin flag to the seed account.
///
/// Kept apart from the column addition so the schema change stays schema-only.
/// The schema shape is untouched in both directions.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        set_seed_admin(manager, true).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        set_seed_admin(manager, false).await
    }
}

async fn set_seed_admin(manager: &SchemaManager<'_>, is_admin: bool) -> Result<(), DbErr> {
    manager
        .exec_stmt(
            Query::update()
                .table(Users::Table)
                .value(Users::IsAdmin, is_admin)
                .and_where(Expr::col(Users::Email).eq(SEED_ADMIN_EMAIL))
                .to_owned(),
        )
        .await
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Email,
    IsAdmin,
}

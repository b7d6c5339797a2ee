use sea_orm_migration::prelude::*;

/// Adds `points_cost` to `coupons`. Null means the coupon cannot be bought with points.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Coupons::Table)
                    .add_column(
                        ColumnDef::new(Coupons::PointsCost)
                            .integer()
                            .null()
                            .default(Value::Int(None)),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Coupons::Table)
                    .drop_column(Coupons::PointsCost)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Coupons {
    Table,
    PointsCost,
}

use sea_orm_migration::prelude::*;

/// Creates `coupon_redemptions`, one row per coupon bought with points.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CouponRedemptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CouponRedemptions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CouponRedemptions::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CouponRedemptions::CouponId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CouponRedemptions::PointsSpent)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CouponRedemptions::RedeemedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coupon_redemptions_user_id")
                            .from(CouponRedemptions::Table, CouponRedemptions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coupon_redemptions_coupon_id")
                            .from(CouponRedemptions::Table, CouponRedemptions::CouponId)
                            .to(Coupons::Table, Coupons::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupon_redemptions_user_id")
                    .table(CouponRedemptions::Table)
                    .col(CouponRedemptions::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CouponRedemptions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CouponRedemptions {
    Table,
    Id,
    UserId,
    CouponId,
    PointsSpent,
    RedeemedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Coupons {
    Table,
    Id,
}

//! 点击分析表迁移
//!
//! 每次成功跳转写入一行，由 ingestion pipeline 批量落盘。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Analytics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Analytics::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Analytics::ShortCode).string_len(32).not_null())
                    .col(ColumnDef::new(Analytics::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(Analytics::UserAgent).text().null())
                    .col(
                        ColumnDef::new(Analytics::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_analytics_short_code")
                    .table(Analytics::Table)
                    .col(Analytics::ShortCode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_analytics_timestamp")
                    .table(Analytics::Table)
                    .col(Analytics::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_analytics_timestamp").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_analytics_short_code").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Analytics::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Analytics {
    Table,
    Id,
    ShortCode,
    IpAddress,
    UserAgent,
    Timestamp,
}

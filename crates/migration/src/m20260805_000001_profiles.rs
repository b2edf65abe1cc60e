use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profiles::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Profiles::Email).string().not_null())
                    .col(ColumnDef::new(Profiles::FullName).string())
                    .col(ColumnDef::new(Profiles::UserType).string().not_null())
                    .col(ColumnDef::new(Profiles::Address).string())
                    .col(ColumnDef::new(Profiles::City).string())
                    .col(ColumnDef::new(Profiles::PostalCode).string())
                    .col(
                        ColumnDef::new(Profiles::Country)
                            .string()
                            .not_null()
                            .default("España"),
                    )
                    .col(ColumnDef::new(Profiles::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Profiles::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_email")
                    .table(Profiles::Table)
                    .col(Profiles::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let _ = manager
            .drop_index(Index::drop().name("idx_profiles_email").to_owned())
            .await;

        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    Email,
    FullName,
    UserType,
    Address,
    City,
    PostalCode,
    Country,
    CreatedAt,
    UpdatedAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Roles::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Roles::UserId).string().not_null())
                    .col(ColumnDef::new(Roles::RoleType).string().not_null())
                    .col(
                        ColumnDef::new(Roles::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Roles::IsActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Roles::VerificationToken).string())
                    .col(ColumnDef::new(Roles::VerificationExpiresAt).big_integer())
                    .col(ColumnDef::new(Roles::VerificationConfirmedAt).big_integer())
                    .col(ColumnDef::new(Roles::RoleSpecificData).json())
                    .col(ColumnDef::new(Roles::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Roles::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // One row per (user, role type).
        manager
            .create_index(
                Index::create()
                    .name("idx_roles_user_id_role_type")
                    .table(Roles::Table)
                    .col(Roles::UserId)
                    .col(Roles::RoleType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Token lookup on the verification path. NULLs (verified rows) do not
        // collide in a unique index.
        manager
            .create_index(
                Index::create()
                    .name("idx_roles_verification_token")
                    .table(Roles::Table)
                    .col(Roles::VerificationToken)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let _ = manager
            .drop_index(Index::drop().name("idx_roles_verification_token").to_owned())
            .await;
        let _ = manager
            .drop_index(Index::drop().name("idx_roles_user_id_role_type").to_owned())
            .await;

        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Roles {
    Table,
    Id,
    UserId,
    RoleType,
    IsVerified,
    IsActive,
    VerificationToken,
    VerificationExpiresAt,
    VerificationConfirmedAt,
    RoleSpecificData,
    CreatedAt,
    UpdatedAt,
}

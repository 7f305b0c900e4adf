//! Creates the read-side directory tables consumed by the grant flows.
//!
//! - oauth_application: registered client applications
//! - directory_user: user accounts (password hash, realm, groups)
//! - directory_group: groups granting access to applications

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OauthApplication::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OauthApplication::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OauthApplication::Secret).string().not_null())
                    .col(
                        ColumnDef::new(OauthApplication::RedirectUri)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(OauthApplication::Description).text().null())
                    .col(
                        ColumnDef::new(OauthApplication::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthApplication::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DirectoryUser::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DirectoryUser::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DirectoryUser::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DirectoryUser::Active)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(DirectoryUser::PasswordHash).string().null())
                    .col(
                        ColumnDef::new(DirectoryUser::Realm)
                            .string()
                            .not_null()
                            .default("local"),
                    )
                    .col(
                        ColumnDef::new(DirectoryUser::Groups)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(DirectoryUser::Applications)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(DirectoryUser::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DirectoryGroup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DirectoryGroup::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DirectoryGroup::Description).text().null())
                    .col(
                        ColumnDef::new(DirectoryGroup::Applications)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DirectoryGroup::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DirectoryUser::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OauthApplication::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum OauthApplication {
    Table,
    Id,
    Secret,
    RedirectUri,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DirectoryUser {
    Table,
    Username,
    Email,
    Active,
    PasswordHash,
    Realm,
    Groups,
    Applications,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DirectoryGroup {
    Table,
    Name,
    Description,
    Applications,
}

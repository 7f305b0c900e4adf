//! Creates the tables owned by the grant core.
//!
//! - oauth_authorization: authorization-code grants, one per (username, application)
//! - ticket: bearer session tickets
//! - configuration: the single deployment configuration row (holds the secret key)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OauthAuthorization::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OauthAuthorization::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorization::Username)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorization::Application)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorization::Code)
                            .string()
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorization::Scopes)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorization::RedirectUri)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorization::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorization::IssuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // find-or-create relies on this index to settle concurrent inserts
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth_authorization_username_application")
                    .table(OauthAuthorization::Table)
                    .col(OauthAuthorization::Username)
                    .col(OauthAuthorization::Application)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ticket::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ticket::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ticket::Username).string().not_null())
                    .col(ColumnDef::new(Ticket::Application).string().not_null())
                    .col(
                        ColumnDef::new(Ticket::FromBrowser)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Ticket::RememberMe)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Ticket::CreatedAt)
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
                    .name("idx_ticket_application")
                    .table(Ticket::Table)
                    .col(Ticket::Application)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Configuration::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Configuration::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Configuration::Name).string().not_null())
                    .col(ColumnDef::new(Configuration::PublicUrl).string().null())
                    .col(ColumnDef::new(Configuration::SecretKey).string().not_null())
                    .col(
                        ColumnDef::new(Configuration::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Configuration::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_ticket_application").to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_oauth_authorization_username_application")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Configuration::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ticket::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OauthAuthorization::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum OauthAuthorization {
    Table,
    Id,
    Username,
    Application,
    Code,
    Scopes,
    RedirectUri,
    CreatedAt,
    IssuedAt,
}

#[derive(DeriveIden)]
enum Ticket {
    Table,
    Id,
    Username,
    Application,
    FromBrowser,
    RememberMe,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Configuration {
    Table,
    Id,
    Name,
    PublicUrl,
    SecretKey,
    CreatedAt,
    UpdatedAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Http::Table)
                    .add_column(ColumnDef::new(Http::Fingerprint).string().null())
                    .to_owned(),
            )
            .await?;

        // Not unique: delta rows and requests imported before this
        // migration share or lack fingerprints
        manager
            .create_index(
                Index::create()
                    .name("idx_http_workspace_fingerprint")
                    .table(Http::Table)
                    .col(Http::WorkspaceId)
                    .col(Http::Fingerprint)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_http_workspace_fingerprint")
                    .table(Http::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Http::Table)
                    .drop_column(Http::Fingerprint)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Http {
    Table,
    WorkspaceId,
    Fingerprint,
}

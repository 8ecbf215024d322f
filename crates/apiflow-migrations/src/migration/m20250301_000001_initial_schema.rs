use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Child tables of `http` sharing the key/value layout
const KEY_VALUE_TABLES: [&str; 4] = [
    "http_headers",
    "http_search_params",
    "http_body_forms",
    "http_body_urlencoded",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========================================
        // WORKSPACES TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(Workspaces::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Workspaces::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Workspaces::Name).string().not_null())
                    .col(
                        ColumnDef::new(Workspaces::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ========================================
        // HTTP TABLE (base and delta rows)
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(Http::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Http::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Http::WorkspaceId).string().not_null())
                    .col(ColumnDef::new(Http::ParentFolderId).string().null())
                    .col(ColumnDef::new(Http::Name).string().not_null())
                    .col(ColumnDef::new(Http::Method).string().not_null())
                    .col(ColumnDef::new(Http::Url).text().not_null())
                    .col(
                        ColumnDef::new(Http::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Http::BodyKind)
                            .string()
                            .not_null()
                            .default("none"),
                    )
                    .col(
                        ColumnDef::new(Http::IsDelta)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Http::DeltaParentId).string().null())
                    .col(
                        ColumnDef::new(Http::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Http::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_http_workspace")
                            .from(Http::Table, Http::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_http_workspace_id")
                    .table(Http::Table)
                    .col(Http::WorkspaceId)
                    .to_owned(),
            )
            .await?;

        // ========================================
        // HTTP KEY/VALUE CHILD TABLES
        // ========================================
        for table in KEY_VALUE_TABLES {
            manager
                .create_table(
                    Table::create()
                        .table(Alias::new(table))
                        .if_not_exists()
                        .col(
                            ColumnDef::new(KeyValue::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(KeyValue::HttpId).string().not_null())
                        .col(ColumnDef::new(KeyValue::Key).string().not_null())
                        .col(ColumnDef::new(KeyValue::Value).text().not_null())
                        .col(
                            ColumnDef::new(KeyValue::Enabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(KeyValue::Description)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(KeyValue::DisplayOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(KeyValue::IsDelta)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("fk_{}_http", table))
                                .from(Alias::new(table), KeyValue::HttpId)
                                .to(Http::Table, Http::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{}_http_id", table))
                        .table(Alias::new(table))
                        .col(KeyValue::HttpId)
                        .to_owned(),
                )
                .await?;
        }

        // ========================================
        // HTTP_BODY_RAW TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(HttpBodyRaw::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HttpBodyRaw::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HttpBodyRaw::HttpId).string().not_null())
                    .col(ColumnDef::new(HttpBodyRaw::RawData).blob().not_null())
                    .col(
                        ColumnDef::new(HttpBodyRaw::IsDelta)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_http_body_raw_http")
                            .from(HttpBodyRaw::Table, HttpBodyRaw::HttpId)
                            .to(Http::Table, Http::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_http_body_raw_http_delta")
                    .table(HttpBodyRaw::Table)
                    .col(HttpBodyRaw::HttpId)
                    .col(HttpBodyRaw::IsDelta)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ========================================
        // HTTP_ASSERTS TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(HttpAsserts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HttpAsserts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HttpAsserts::HttpId).string().not_null())
                    .col(ColumnDef::new(HttpAsserts::Expression).text().not_null())
                    .col(
                        ColumnDef::new(HttpAsserts::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(HttpAsserts::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(HttpAsserts::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(HttpAsserts::IsDelta)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_http_asserts_http")
                            .from(HttpAsserts::Table, HttpAsserts::HttpId)
                            .to(Http::Table, Http::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ========================================
        // FILES TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(Files::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Files::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Files::WorkspaceId).string().not_null())
                    .col(ColumnDef::new(Files::ParentId).string().null())
                    .col(ColumnDef::new(Files::ContentId).string().null())
                    .col(ColumnDef::new(Files::ContentType).string().not_null())
                    .col(ColumnDef::new(Files::Name).string().not_null())
                    .col(
                        ColumnDef::new(Files::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Files::PathHash).string().null())
                    .col(
                        ColumnDef::new(Files::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_files_workspace")
                            .from(Files::Table, Files::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_files_workspace_path_hash")
                    .table(Files::Table)
                    .col(Files::WorkspaceId)
                    .col(Files::PathHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ========================================
        // FLOWS, NODES, SIDE TABLES, EDGES
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(Flows::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Flows::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Flows::WorkspaceId).string().not_null())
                    .col(ColumnDef::new(Flows::Name).string().not_null())
                    .col(
                        ColumnDef::new(Flows::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_flows_workspace")
                            .from(Flows::Table, Flows::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FlowNodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FlowNodes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FlowNodes::FlowId).string().not_null())
                    .col(ColumnDef::new(FlowNodes::Name).string().not_null())
                    .col(ColumnDef::new(FlowNodes::Kind).string().not_null())
                    .col(
                        ColumnDef::new(FlowNodes::PositionX)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(FlowNodes::PositionY)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_flow_nodes_flow")
                            .from(FlowNodes::Table, FlowNodes::FlowId)
                            .to(Flows::Table, Flows::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FlowNodeRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FlowNodeRequests::FlowNodeId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FlowNodeRequests::HttpId).string().null())
                    .col(
                        ColumnDef::new(FlowNodeRequests::DeltaHttpId)
                            .string()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_flow_node_requests_node")
                            .from(FlowNodeRequests::Table, FlowNodeRequests::FlowNodeId)
                            .to(FlowNodes::Table, FlowNodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FlowNodeNoops::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FlowNodeNoops::FlowNodeId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FlowNodeNoops::Kind).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_flow_node_noops_node")
                            .from(FlowNodeNoops::Table, FlowNodeNoops::FlowNodeId)
                            .to(FlowNodes::Table, FlowNodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FlowEdges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FlowEdges::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FlowEdges::FlowId).string().not_null())
                    .col(ColumnDef::new(FlowEdges::SourceId).string().not_null())
                    .col(ColumnDef::new(FlowEdges::TargetId).string().not_null())
                    .col(
                        ColumnDef::new(FlowEdges::SourceHandle)
                            .string()
                            .not_null()
                            .default("unspecified"),
                    )
                    .col(
                        ColumnDef::new(FlowEdges::Kind)
                            .string()
                            .not_null()
                            .default("unspecified"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_flow_edges_flow")
                            .from(FlowEdges::Table, FlowEdges::FlowId)
                            .to(Flows::Table, Flows::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ========================================
        // ENVIRONMENTS & VARIABLES
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(Environments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Environments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Environments::WorkspaceId).string().not_null())
                    .col(ColumnDef::new(Environments::Name).string().not_null())
                    .col(
                        ColumnDef::new(Environments::Kind)
                            .string()
                            .not_null()
                            .default("global"),
                    )
                    .col(
                        ColumnDef::new(Environments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_environments_workspace")
                            .from(Environments::Table, Environments::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Variables::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Variables::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Variables::EnvId).string().not_null())
                    .col(ColumnDef::new(Variables::Key).string().not_null())
                    .col(ColumnDef::new(Variables::Value).text().not_null())
                    .col(
                        ColumnDef::new(Variables::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Variables::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Variables::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_variables_environment")
                            .from(Variables::Table, Variables::EnvId)
                            .to(Environments::Table, Environments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_variables_env_key")
                    .table(Variables::Table)
                    .col(Variables::EnvId)
                    .col(Variables::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Variables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Environments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FlowEdges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FlowNodeNoops::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FlowNodeRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FlowNodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Flows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Files::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(HttpAsserts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(HttpBodyRaw::Table).to_owned())
            .await?;
        for table in KEY_VALUE_TABLES {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).to_owned())
                .await?;
        }
        manager
            .drop_table(Table::drop().table(Http::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workspaces::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Workspaces {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Http {
    Table,
    Id,
    WorkspaceId,
    ParentFolderId,
    Name,
    Method,
    Url,
    Description,
    BodyKind,
    IsDelta,
    DeltaParentId,
    CreatedAt,
    UpdatedAt,
}

/// Columns shared by every key/value child table
#[derive(DeriveIden)]
enum KeyValue {
    Id,
    HttpId,
    Key,
    Value,
    Enabled,
    Description,
    DisplayOrder,
    IsDelta,
}

#[derive(DeriveIden)]
enum HttpBodyRaw {
    Table,
    Id,
    HttpId,
    RawData,
    IsDelta,
}

#[derive(DeriveIden)]
enum HttpAsserts {
    Table,
    Id,
    HttpId,
    Expression,
    Description,
    Enabled,
    DisplayOrder,
    IsDelta,
}

#[derive(DeriveIden)]
enum Files {
    Table,
    Id,
    WorkspaceId,
    ParentId,
    ContentId,
    ContentType,
    Name,
    DisplayOrder,
    PathHash,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Flows {
    Table,
    Id,
    WorkspaceId,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum FlowNodes {
    Table,
    Id,
    FlowId,
    Name,
    Kind,
    PositionX,
    PositionY,
}

#[derive(DeriveIden)]
enum FlowNodeRequests {
    Table,
    FlowNodeId,
    HttpId,
    DeltaHttpId,
}

#[derive(DeriveIden)]
enum FlowNodeNoops {
    Table,
    FlowNodeId,
    Kind,
}

#[derive(DeriveIden)]
enum FlowEdges {
    Table,
    Id,
    FlowId,
    SourceId,
    TargetId,
    SourceHandle,
    Kind,
}

#[derive(DeriveIden)]
enum Environments {
    Table,
    Id,
    WorkspaceId,
    Name,
    Kind,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Variables {
    Table,
    Id,
    EnvId,
    Key,
    Value,
    Enabled,
    Description,
    DisplayOrder,
}

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

use crate::db::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();

        manager
            .create_table(
                Table::create()
                    .table(AmityUsers::Table)
                    .if_not_exists()
                    .col(id_col(backend, AmityUsers::UserId, false))
                    .col(ColumnDef::new(AmityUsers::Handle).string().not_null())
                    .col(
                        ColumnDef::new(AmityUsers::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_amity_users")
                            .col(AmityUsers::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite primary key is the per-direction uniqueness constraint;
        // symmetry across directions is the manager's job, not the schema's.
        manager
            .create_table(
                Table::create()
                    .table(AmityMatchEdges::Table)
                    .if_not_exists()
                    .col(id_col(backend, AmityMatchEdges::SourceId, false))
                    .col(id_col(backend, AmityMatchEdges::TargetId, false))
                    .col(
                        ColumnDef::new(AmityMatchEdges::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_amity_match_edges")
                            .col(AmityMatchEdges::SourceId)
                            .col(AmityMatchEdges::TargetId),
                    )
                    .to_owned(),
            )
            .await?;

        // Reverse lookup; the PK prefix already covers source_id.
        manager
            .create_index(
                Index::create()
                    .name("ix_amity_match_edges_target")
                    .table(AmityMatchEdges::Table)
                    .col(AmityMatchEdges::TargetId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(AmityMatchEdges::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(AmityUsers::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn id_col(backend: DatabaseBackend, col: impl Iden + 'static, nullable: bool) -> ColumnDef {
    let mut col_def = ColumnDef::new(col);
    match backend {
        DatabaseBackend::Postgres => {
            col_def.uuid();
        }
        DatabaseBackend::MySql => {
            col_def.binary_len(16);
        }
        DatabaseBackend::Sqlite => {
            col_def.string_len(36);
        }
        _ => {
            col_def.string_len(36);
        }
    }
    if nullable {
        col_def.null();
    } else {
        col_def.not_null();
    }
    col_def.to_owned()
}

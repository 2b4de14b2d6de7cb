use sea_orm_migration::prelude::Iden;
use sea_orm_migration::sea_orm::sea_query;

#[derive(Iden, Clone, Copy)]
pub enum AmityUsers {
    Table,
    UserId,
    Handle,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum AmityMatchEdges {
    Table,
    SourceId,
    TargetId,
    CreatedAt,
}

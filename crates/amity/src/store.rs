use std::path::Path;
use std::time::Duration;

use sea_orm::sea_query;
use sea_orm::sea_query::{
    Alias, Expr, ExprTrait, Func, MysqlQueryBuilder, Order, PostgresQueryBuilder, Query,
    QueryStatementWriter, SqliteQueryBuilder, Value as SeaValue,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, QueryResult,
    SqlErr, Statement,
};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use crate::api::{CreateUserInput, MatchEdge, User};
use crate::db::{AmityMatchEdges, AmityUsers};
use crate::migration::Migrator;
use crate::{AmityConfig, AmityError, AmityResult, DatabaseConfig, Id, Timestamp, UserId};

/// Durable storage of users and directed match edges.
///
/// The composite primary key on (source_id, target_id) enforces per-direction
/// uniqueness; keeping the two directions of a pair in step is
/// [`crate::MatchManager`]'s responsibility.
#[derive(Clone)]
pub struct AmityStore {
    conn: DatabaseConnection,
    backend: DatabaseBackend,
}

impl AmityStore {
    pub async fn connect(config: &AmityConfig, base_dir: &Path) -> AmityResult<Self> {
        let url = build_connection_url(config, base_dir)?;
        let mut options = ConnectOptions::new(url);
        if let Some(pool) = &config.pool {
            if let Some(max) = pool.max_connections {
                options.max_connections(max);
            }
            if let Some(min) = pool.min_connections {
                options.min_connections(min);
            }
            if let Some(timeout_ms) = pool.connect_timeout_ms {
                options.connect_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.acquire_timeout_ms {
                options.acquire_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.idle_timeout_ms {
                options.idle_timeout(Duration::from_millis(timeout_ms));
            }
        }
        let conn = Database::connect(options).await.map_err(AmityError::from)?;
        let backend = conn.get_database_backend();
        let store = Self { conn, backend };
        Migrator::up(&store.conn, None)
            .await
            .map_err(AmityError::from)?;
        Ok(store)
    }

    pub async fn connect_sqlite(path: &Path) -> AmityResult<Self> {
        let config = AmityConfig::default_sqlite(path.to_string_lossy());
        Self::connect(&config, path.parent().unwrap_or_else(|| Path::new("."))).await
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub(crate) fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    pub async fn create_user(&self, input: CreateUserInput) -> AmityResult<User> {
        let insert = Query::insert()
            .into_table(AmityUsers::Table)
            .columns([
                AmityUsers::UserId,
                AmityUsers::Handle,
                AmityUsers::CreatedAt,
            ])
            .values_panic([
                id_value(self.backend, input.user_id.0).into(),
                input.handle.clone().into(),
                input.created_at.as_i64().into(),
            ])
            .to_owned();
        let (sql, values) = build_stmt(self.backend, &insert);
        match self
            .conn
            .execute(Statement::from_sql_and_values(self.backend, sql, values))
            .await
        {
            Ok(_) => Ok(User {
                user_id: input.user_id,
                handle: input.handle,
                created_at: input.created_at,
            }),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(AmityError::invalid(format!(
                    "user {} already exists",
                    input.user_id
                ))),
                _ => Err(err.into()),
            },
        }
    }

    pub async fn get_user(&self, user_id: UserId) -> AmityResult<Option<User>> {
        let select = Query::select()
            .from(AmityUsers::Table)
            .columns([
                AmityUsers::UserId,
                AmityUsers::Handle,
                AmityUsers::CreatedAt,
            ])
            .and_where(Expr::col(AmityUsers::UserId).eq(id_value(self.backend, user_id.0)))
            .limit(1)
            .to_owned();
        let row = query_one(&self.conn, &select).await?;
        row.as_ref().map(read_user).transpose()
    }

    /// Insert the directed edge (source, target).
    ///
    /// Fails with [`AmityError::ConstraintViolation`] if the pair already
    /// exists. Direct use bypasses reciprocal maintenance; go through
    /// [`crate::MatchManager`] unless the other direction is handled by hand.
    pub async fn create_edge(
        &self,
        source: UserId,
        target: UserId,
        created_at: Timestamp,
    ) -> AmityResult<MatchEdge> {
        self.insert_edge_on(&self.conn, source, target, created_at)
            .await
    }

    pub async fn edge_exists(&self, source: UserId, target: UserId) -> AmityResult<bool> {
        self.edge_exists_on(&self.conn, source, target).await
    }

    /// All edges whose source is `source`, in insertion order.
    pub async fn edges_from(&self, source: UserId) -> AmityResult<Vec<MatchEdge>> {
        let select = Query::select()
            .from(AmityMatchEdges::Table)
            .columns([
                AmityMatchEdges::SourceId,
                AmityMatchEdges::TargetId,
                AmityMatchEdges::CreatedAt,
            ])
            .and_where(Expr::col(AmityMatchEdges::SourceId).eq(id_value(self.backend, source.0)))
            .order_by(AmityMatchEdges::CreatedAt, Order::Asc)
            .order_by(AmityMatchEdges::TargetId, Order::Asc)
            .to_owned();
        let rows = query_all(&self.conn, &select).await?;
        rows.iter().map(read_edge).collect()
    }

    /// Delete the directed edge (source, target), returning the removed
    /// record so the caller can mirror the deletion. `None` when the edge
    /// did not exist.
    pub async fn delete_edge(
        &self,
        source: UserId,
        target: UserId,
    ) -> AmityResult<Option<MatchEdge>> {
        self.delete_edge_on(&self.conn, source, target).await
    }

    /// Number of distinct users related to `source`.
    ///
    /// Counts distinct target identity on the edge table, so the result is
    /// the same no matter which columns a read-path projection adds. Defined
    /// over edges alone: every target is assumed to have a row in
    /// `amity_users` (there is no user-deletion path that could orphan one).
    pub async fn related_count(&self, source: UserId) -> AmityResult<u64> {
        let select = Query::select()
            .from(AmityMatchEdges::Table)
            .expr_as(
                Func::count_distinct(Expr::col(AmityMatchEdges::TargetId)),
                Alias::new("cnt"),
            )
            .and_where(Expr::col(AmityMatchEdges::SourceId).eq(id_value(self.backend, source.0)))
            .to_owned();
        let row = query_one(&self.conn, &select)
            .await?
            .ok_or_else(|| AmityError::malformed_aggregate("count query returned no row"))?;
        let count: i64 = row
            .try_get("", "cnt")
            .map_err(|err| AmityError::malformed_aggregate(format!("count column: {err}")))?;
        Ok(count as u64)
    }

    pub(crate) async fn edge_exists_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        source: UserId,
        target: UserId,
    ) -> AmityResult<bool> {
        let select = Query::select()
            .from(AmityMatchEdges::Table)
            .column(AmityMatchEdges::SourceId)
            .and_where(Expr::col(AmityMatchEdges::SourceId).eq(id_value(self.backend, source.0)))
            .and_where(Expr::col(AmityMatchEdges::TargetId).eq(id_value(self.backend, target.0)))
            .limit(1)
            .to_owned();
        Ok(query_one(conn, &select).await?.is_some())
    }

    pub(crate) async fn insert_edge_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        source: UserId,
        target: UserId,
        created_at: Timestamp,
    ) -> AmityResult<MatchEdge> {
        let insert = Query::insert()
            .into_table(AmityMatchEdges::Table)
            .columns([
                AmityMatchEdges::SourceId,
                AmityMatchEdges::TargetId,
                AmityMatchEdges::CreatedAt,
            ])
            .values_panic([
                id_value(self.backend, source.0).into(),
                id_value(self.backend, target.0).into(),
                created_at.as_i64().into(),
            ])
            .to_owned();
        let (sql, values) = build_stmt(self.backend, &insert);
        match conn
            .execute(Statement::from_sql_and_values(self.backend, sql, values))
            .await
        {
            Ok(_) => Ok(MatchEdge {
                source_id: source,
                target_id: target,
                created_at,
            }),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(AmityError::constraint_violation(source, target))
                }
                _ => Err(err.into()),
            },
        }
    }

    pub(crate) async fn delete_edge_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        source: UserId,
        target: UserId,
    ) -> AmityResult<Option<MatchEdge>> {
        let select = Query::select()
            .from(AmityMatchEdges::Table)
            .columns([
                AmityMatchEdges::SourceId,
                AmityMatchEdges::TargetId,
                AmityMatchEdges::CreatedAt,
            ])
            .and_where(Expr::col(AmityMatchEdges::SourceId).eq(id_value(self.backend, source.0)))
            .and_where(Expr::col(AmityMatchEdges::TargetId).eq(id_value(self.backend, target.0)))
            .limit(1)
            .to_owned();
        let row = query_one(conn, &select).await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let edge = read_edge(&row)?;
        let delete = Query::delete()
            .from_table(AmityMatchEdges::Table)
            .and_where(Expr::col(AmityMatchEdges::SourceId).eq(id_value(self.backend, source.0)))
            .and_where(Expr::col(AmityMatchEdges::TargetId).eq(id_value(self.backend, target.0)))
            .to_owned();
        exec(conn, &delete).await?;
        Ok(Some(edge))
    }
}

pub(crate) fn id_value(backend: DatabaseBackend, id: Id) -> SeaValue {
    match backend {
        DatabaseBackend::Postgres => {
            let uuid = Uuid::from_bytes(id.as_bytes());
            SeaValue::Uuid(Some(Box::new(uuid)))
        }
        DatabaseBackend::MySql => SeaValue::Bytes(Some(Box::new(id.as_vec()))),
        DatabaseBackend::Sqlite => SeaValue::String(Some(Box::new(id.to_uuid_string()))),
        _ => SeaValue::String(Some(Box::new(id.to_uuid_string()))),
    }
}

fn bytes_to_id(bytes: Vec<u8>) -> Option<Id> {
    if bytes.len() == 16 {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&bytes);
        Some(Id::from_bytes(buf))
    } else {
        None
    }
}

pub(crate) fn read_id(row: &QueryResult, column: impl sea_query::Iden) -> AmityResult<Id> {
    let name = col_name(column);
    if let Ok(value) = row.try_get::<String>("", &name) {
        return Id::from_uuid_str(&value);
    }
    if let Ok(value) = row.try_get::<Uuid>("", &name) {
        return Ok(Id::from_bytes(*value.as_bytes()));
    }
    if let Ok(value) = row.try_get::<Vec<u8>>("", &name) {
        return bytes_to_id(value).ok_or_else(|| AmityError::storage("invalid id length"));
    }
    Err(AmityError::storage("unsupported id format"))
}

pub(crate) fn read_user(row: &QueryResult) -> AmityResult<User> {
    let user_id = UserId(read_id(row, AmityUsers::UserId)?);
    let handle: String = row.try_get("", &col_name(AmityUsers::Handle))?;
    let created_at: i64 = row.try_get("", &col_name(AmityUsers::CreatedAt))?;
    Ok(User {
        user_id,
        handle,
        created_at: Timestamp::from_i64(created_at),
    })
}

fn read_edge(row: &QueryResult) -> AmityResult<MatchEdge> {
    let source_id = UserId(read_id(row, AmityMatchEdges::SourceId)?);
    let target_id = UserId(read_id(row, AmityMatchEdges::TargetId)?);
    let created_at: i64 = row.try_get("", &col_name(AmityMatchEdges::CreatedAt))?;
    Ok(MatchEdge {
        source_id,
        target_id,
        created_at: Timestamp::from_i64(created_at),
    })
}

pub(crate) fn col_name(column: impl sea_query::Iden) -> String {
    column.to_string()
}

fn build_stmt<S: QueryStatementWriter>(
    backend: DatabaseBackend,
    stmt: &S,
) -> (String, sea_orm::sea_query::Values) {
    match backend {
        DatabaseBackend::Sqlite => stmt.build(SqliteQueryBuilder),
        DatabaseBackend::Postgres => stmt.build(PostgresQueryBuilder),
        DatabaseBackend::MySql => stmt.build(MysqlQueryBuilder),
        _ => stmt.build(SqliteQueryBuilder),
    }
}

pub(crate) async fn exec<C, S>(conn: &C, stmt: &S) -> AmityResult<()>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    conn.execute(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(())
}

pub(crate) async fn query_all<C, S>(conn: &C, stmt: &S) -> AmityResult<Vec<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let rows = conn
        .query_all(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(rows)
}

pub(crate) async fn query_one<C, S>(conn: &C, stmt: &S) -> AmityResult<Option<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let row = conn
        .query_one(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(row)
}

fn build_connection_url(config: &AmityConfig, base_dir: &Path) -> AmityResult<String> {
    match &config.database {
        DatabaseConfig::Sqlite { .. } => {
            let path = config.sqlite_path(base_dir)?;
            Ok(format!("sqlite://{}?mode=rwc", path.display()))
        }
        DatabaseConfig::Postgres { url } => Ok(url.clone()),
        DatabaseConfig::Mysql { url } => Ok(url.clone()),
    }
}

use crate::config::DatabaseConfig;
use crate::error::{DatagenError, Result};
use crate::store::sql::{
    cell_value, column_types, create_table_sql, drop_table_sql, insert_sql, render_schema_ddl,
    row_json_query, unique_column_names, CellValue,
};
use crate::store::{LoadResults, TableStore};
use crate::table::Table;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Column, Executor, Statement};
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

const DESCRIBE_QUERY: &str = "SELECT table_name::text, column_name::text, data_type::text \
     FROM information_schema.columns \
     WHERE table_schema = current_schema() AND table_name = ANY($1) \
     ORDER BY table_name, ordinal_position";

/// postgres-backed table store; the pool connects on first use
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        Self::with_acquire_timeout(config, ACQUIRE_TIMEOUT)
    }

    fn with_acquire_timeout(config: &DatabaseConfig, acquire_timeout: Duration) -> Result<Self> {
        let database = config
            .name
            .as_deref()
            .ok_or_else(|| DatagenError::Config("DB_NAME is not set".to_string()))?;

        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(database);
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(options);

        tracing::debug!(host = %config.host, port = config.port, database, "postgres pool configured");
        Ok(Self { pool })
    }

    async fn load_table(&self, name: &str, table: &Table) -> Result<()> {
        let columns = column_types(table);
        if columns.is_empty() {
            tracing::warn!(table = name, "table has no columns, skipping load");
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(&drop_table_sql(name))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        sqlx::query(&create_table_sql(name, &columns))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let insert = insert_sql(name, &columns);
        for row in table.rows() {
            let mut query = sqlx::query(&insert);
            for (column, ty) in &columns {
                query = match cell_value(row.get(column), *ty) {
                    CellValue::BigInt(v) => query.bind(v),
                    CellValue::Double(v) => query.bind(v),
                    CellValue::Boolean(v) => query.bind(v),
                    CellValue::Text(v) => query.bind(v),
                };
            }
            query.execute(&mut *tx).await.map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        tracing::info!(table = name, rows = table.len(), "table loaded");
        Ok(())
    }
}

#[async_trait]
impl TableStore for PgStore {
    #[tracing::instrument(skip(self, tables), fields(tables = tables.len()))]
    async fn load_tables(&self, tables: &IndexMap<String, Table>) -> LoadResults {
        let mut results = LoadResults::new();
        for (name, table) in tables {
            if let Some(message) = table.error() {
                tracing::warn!(table = %name, error = message, "skipping failed table");
                continue;
            }
            let result = self.load_table(name, table).await;
            if let Err(e) = &result {
                tracing::error!(table = %name, error = %e, "table load failed");
            }
            results.insert(name.clone(), result);
        }
        results
    }

    #[tracing::instrument(skip(self))]
    async fn describe_tables(&self, names: &[String]) -> Result<String> {
        let columns: Vec<(String, String, String)> = sqlx::query_as(DESCRIBE_QUERY)
            .bind(names)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(render_schema_ddl(names, &columns))
    }

    #[tracing::instrument(skip(self))]
    async fn run_query(&self, sql: &str) -> Result<Table> {
        // result columns by position, so joins that repeat a name keep every column
        let statement = (&self.pool).prepare(sql).await.map_err(db_error)?;
        let described: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let columns = unique_column_names(&described);

        let wrapped = row_json_query(sql, &columns);
        let rows: Vec<String> = sqlx::query_scalar(&wrapped)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let records = rows
            .iter()
            .map(|row| serde_json::from_str::<Value>(row))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let table = Table::from_columns(columns, records)?;
        tracing::debug!(rows = table.len(), "query executed");
        Ok(table)
    }
}

/// statement failures are query errors; everything else means the database
/// could not be reached
fn db_error(e: sqlx::Error) -> DatagenError {
    match e {
        sqlx::Error::Database(db) => DatagenError::Query(db.to_string()),
        sqlx::Error::RowNotFound | sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            DatagenError::Query(e.to_string())
        }
        other => DatagenError::Connection(other.to_string()),
    }
}

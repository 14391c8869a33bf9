//! Data sources and the named registry
//!
//! [`SqliteDatabase`] implements [`Database`] over a sqlx pool. SQLite takes `?`
//! placeholders natively, which is the only placeholder style generated here.
//!
//! [`Registry`] maps names to data sources. Applications own one and pass it
//! around; [`Registry::global`] exists for code that cannot.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::config::DataSourceConfig;
use crate::error::{MetaSqlError, Result};
use crate::executor::{Database, ExecResult, ScanValue, ScannedRow};

/// Name of the default data source
pub const DEFAULT_SOURCE: &str = "default";

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// SQLite data source backed by a connection pool
///
/// With `sqlite::memory:` every pooled connection opens its own database, so use a
/// single connection for in-memory work.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open a pool from configuration
    pub async fn connect(config: &DataSourceConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        tracing::info!(
            source = %config.name,
            max_connections = config.max_connections,
            "sqlite data source connected"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> Result<SqliteQuery<'q>> {
    Ok(match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                let i = i64::try_from(u).map_err(|_| {
                    MetaSqlError::validation(format!("Integer {} exceeds the SQLite range", u))
                })?;
                query.bind(i)
            } else {
                query.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    })
}

fn prepare<'q>(sql: &'q str, args: &[Value]) -> Result<SqliteQuery<'q>> {
    args.iter()
        .try_fold(sqlx::query(sql), |query, value| bind_value(query, value))
}

fn scan_row(row: &SqliteRow) -> Result<ScannedRow> {
    let mut columns = Vec::with_capacity(row.columns().len());
    for (i, column) in row.columns().iter().enumerate() {
        let type_name = {
            let raw = row.try_get_raw(i)?;
            if raw.is_null() {
                columns.push((column.name().to_string(), ScanValue::Null));
                continue;
            }
            raw.type_info().name().to_uppercase()
        };

        let value = match type_name.as_str() {
            "INTEGER" | "INT" | "INT8" | "BIGINT" => ScanValue::Int(row.try_get_unchecked(i)?),
            "BOOLEAN" => ScanValue::Bool(row.try_get_unchecked(i)?),
            "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => ScanValue::Float(row.try_get_unchecked(i)?),
            "BLOB" => ScanValue::Bytes(row.try_get_unchecked(i)?),
            _ => ScanValue::Text(row.try_get_unchecked(i)?),
        };
        columns.push((column.name().to_string(), value));
    }
    Ok(ScannedRow::new(columns))
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        let result = prepare(sql, args)?.execute(&self.pool).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: Some(result.last_insert_rowid()),
        })
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<ScannedRow>> {
        let rows = prepare(sql, args)?.fetch_all(&self.pool).await?;
        rows.iter().map(scan_row).collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Named data sources guarded by a single read/write lock
#[derive(Default)]
pub struct Registry {
    sources: RwLock<HashMap<String, Arc<dyn Database>>>,
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Register `db` under `name`; the first registration wins
    ///
    /// Returns `false` when the name was already taken.
    pub fn register(&self, name: impl Into<String>, db: Arc<dyn Database>) -> bool {
        let name = name.into();
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        if sources.contains_key(&name) {
            return false;
        }
        tracing::info!(source = %name, "data source registered");
        sources.insert(name, db);
        true
    }

    /// Connect a SQLite source from configuration and register it
    ///
    /// If the name is already registered the existing source is returned and no
    /// connection is opened.
    pub async fn connect(&self, config: &DataSourceConfig) -> Result<Arc<dyn Database>> {
        if let Some(existing) = self.get(&config.name) {
            return Ok(existing);
        }

        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::connect(config).await?);
        if self.register(config.name.clone(), db.clone()) {
            return Ok(db);
        }

        // Lost a registration race; keep the winner.
        db.close().await?;
        self.get(&config.name)
            .ok_or_else(|| MetaSqlError::registry(format!("source '{}' vanished", config.name)))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Database>> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// The source registered as [`DEFAULT_SOURCE`]
    pub fn default_db(&self) -> Option<Arc<dyn Database>> {
        self.get(DEFAULT_SOURCE)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Remove every source and close it
    ///
    /// All sources are closed even if some fail; the first error is returned.
    pub async fn close_all(&self) -> Result<()> {
        let drained: Vec<(String, Arc<dyn Database>)> = self
            .sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        let mut first_err = None;
        for (name, db) in drained {
            match db.close().await {
                Ok(()) => tracing::info!(source = %name, "data source closed"),
                Err(e) => {
                    tracing::warn!(source = %name, error = %e, "failed to close data source");
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

//! Statement execution and row mapping
//!
//! [`Database`] is the capability a data source provides: execute, query, ping and
//! close. [`Executor`] builds statements from schemas and predicates, runs them, and
//! maps SELECT rows back through [`Schema::validate`] so rows read from the
//! database get the same coercion as inbound JSON.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{MetaSqlError, Result};
use crate::schema::Schema;
use crate::sql::builder::{self, Page};
use crate::sql::condition::Where;
use crate::sql::ddl::DdlScript;
use crate::sql::join::Joint;
use crate::value::{ValueGetter, ValueObject};

/// Outcome of a non-SELECT statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Driver-reported id of the last inserted row, when the driver has one
    pub last_insert_id: Option<i64>,
}

/// Driver-level value as scanned from a result row
#[derive(Debug, Clone, PartialEq)]
pub enum ScanValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Time(DateTime<Utc>),
}

impl ScanValue {
    /// Plain JSON value: raw bytes become text, times become RFC 3339 strings
    pub fn normalize(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Int(n) => Value::from(n),
            Self::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Text(s) => Value::String(s),
            Self::Bytes(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
            Self::Bool(b) => Value::Bool(b),
            Self::Time(t) => Value::String(t.to_rfc3339()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// One result row: column labels with their scanned values, in select order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScannedRow {
    columns: Vec<(String, ScanValue)>,
}

impl ScannedRow {
    pub fn new(columns: Vec<(String, ScanValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, label: &str) -> Option<&ScanValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> &[(String, ScanValue)] {
        &self.columns
    }
}

/// Data source capability
///
/// Arguments bind positionally to `?` placeholders. Implementations must be safe
/// for concurrent use; a pooled handle is assumed.
#[async_trait]
pub trait Database: Send + Sync {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult>;

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<ScannedRow>>;

    async fn ping(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Map a scanned row into a validated value object for `schema`
///
/// Only columns labelled `<qualifier>__<column>` for this schema are taken; others
/// belong to other tables of a join and are ignored.
pub fn map_row(schema: &Schema, row: &ScannedRow) -> Result<ValueObject> {
    schema.validate(&Value::Object(collect(schema, row)))
}

fn collect(schema: &Schema, row: &ScannedRow) -> Map<String, Value> {
    let mut map = Map::new();
    for (label, value) in row.columns() {
        if let Some(meta) = schema.meta_by_alias(label) {
            map.insert(meta.provider_name.clone(), value.clone().normalize());
        }
    }
    map
}

/// Row of a join select: the base object plus one entry per joined schema
///
/// A joined entry is `None` when all of its columns are NULL, i.e. a LEFT JOIN
/// found no match.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub base: ValueObject,
    pub joined: Vec<Option<ValueObject>>,
}

/// Runs generated statements against a [`Database`]
#[derive(Clone)]
pub struct Executor {
    db: Arc<dyn Database>,
}

impl Executor {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    async fn run_query(&self, sql: &str, args: &[Value]) -> Result<Vec<ScannedRow>> {
        tracing::debug!(sql = %sql, args = args.len(), "query");
        self.db.query(sql, args).await
    }

    async fn run_execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        tracing::debug!(sql = %sql, args = args.len(), "execute");
        let result = self.db.execute(sql, args).await?;
        tracing::debug!(rows_affected = result.rows_affected, "executed");
        Ok(result)
    }

    /// All rows of `schema` matching `filter`
    pub async fn select(&self, schema: &Schema, filter: Option<&Where>) -> Result<Vec<ValueObject>> {
        let (sql, args) = builder::select_sql(Some(schema), filter)?;
        self.run_query(&sql, &args)
            .await?
            .iter()
            .map(|row| map_row(schema, row))
            .collect()
    }

    /// One window of rows, see [`builder::select_page_sql`]
    pub async fn select_page(
        &self,
        schema: &Schema,
        filter: Option<&Where>,
        page: &Page,
    ) -> Result<Vec<ValueObject>> {
        let (sql, args) = builder::select_page_sql(Some(schema), filter, page)?;
        self.run_query(&sql, &args)
            .await?
            .iter()
            .map(|row| map_row(schema, row))
            .collect()
    }

    /// First matching row in primary-key order
    pub async fn select_one(
        &self,
        schema: &Schema,
        filter: Option<&Where>,
    ) -> Result<Option<ValueObject>> {
        let rows = self.select_page(schema, filter, &Page::new(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Select all fields of `base` and of each `joined` schema through `joins`
    pub async fn select_join(
        &self,
        base: &Schema,
        joined: &[&Schema],
        joins: &[Joint],
        filter: Option<&Where>,
    ) -> Result<Vec<JoinedRow>> {
        let mut projection = base.fields();
        for schema in joined {
            projection.extend(schema.fields());
        }

        let (sql, args) = builder::select_join_sql(base, &projection, joins, filter)?;
        let rows = self.run_query(&sql, &args).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let base_obj = map_row(base, row)?;
            let mut others = Vec::with_capacity(joined.len());
            for schema in joined {
                let values = collect(schema, row);
                if values.values().all(Value::is_null) {
                    others.push(None);
                } else {
                    others.push(Some(schema.validate(&Value::Object(values))?));
                }
            }
            out.push(JoinedRow {
                base: base_obj,
                joined: others,
            });
        }
        Ok(out)
    }

    pub async fn count(&self, schema: &Schema, filter: Option<&Where>) -> Result<u64> {
        let (sql, args) = builder::count_sql(schema, filter)?;
        let rows = self.run_query(&sql, &args).await?;
        match rows.first().and_then(|row| row.get("count")) {
            Some(ScanValue::Int(n)) => u64::try_from(*n)
                .map_err(|_| MetaSqlError::mapping(format!("negative count {}", n))),
            other => Err(MetaSqlError::mapping(format!(
                "COUNT(*) returned unexpected value: {:?}",
                other
            ))),
        }
    }

    pub async fn insert(&self, schema: &Schema, values: &dyn ValueGetter) -> Result<ExecResult> {
        let (sql, args) = builder::insert_sql(schema, values)?;
        self.run_execute(&sql, &args).await
    }

    /// Returns the number of rows updated
    pub async fn update(
        &self,
        schema: &Schema,
        values: &dyn ValueGetter,
        filter: Option<&Where>,
    ) -> Result<u64> {
        let (sql, args) = builder::update_sql(schema, values, filter)?;
        Ok(self.run_execute(&sql, &args).await?.rows_affected)
    }

    /// Returns the number of rows deleted
    pub async fn delete(&self, schema: &Schema, filter: Option<&Where>) -> Result<u64> {
        let (sql, args) = builder::delete_sql(schema, filter)?;
        Ok(self.run_execute(&sql, &args).await?.rows_affected)
    }

    /// Run every statement of a DDL script in order
    pub async fn execute_ddl(&self, script: &DdlScript) -> Result<()> {
        for statement in script.statements() {
            self.run_execute(statement, &[]).await?;
        }
        Ok(())
    }
}

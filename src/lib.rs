//! # metasql
//!
//! Metadata-driven SQL generation.
//!
//! Record types describe their fields once, as a [`RecordDecl`] with tag directives.
//! From that declaration this crate derives a [`Schema`] with a deterministic column
//! order, dialect DDL, and schema-bound [`Field`] references for a small typed query
//! DSL. Rows read back are revalidated through the same schema that validates
//! inbound JSON.
//!
//! ## Features
//!
//! - **Metadata extraction**: tag directives for primary keys, column renames, SQL type
//!   overrides, NOT NULL, UNIQUE, indexes, defaults and foreign keys; embedded
//!   sub-records are flattened
//! - **Deterministic ordering**: primary keys, then host fields, then embedded fields,
//!   with a content hash that ignores declaration order
//! - **Dialect DDL**: PostgreSQL, MySQL and SQLite from declarative type tables
//! - **Predicates**: comparisons, `IN`, null checks, `AND`/`OR`/`NOT` with explicit
//!   grouping and positional `?` arguments in textual order
//! - **Joins**: two-table INNER/LEFT joins, self-join aliasing, and translation of a
//!   join into a correlated `EXISTS` predicate
//! - **Safe mutations**: UPDATE and DELETE refuse to run without a WHERE clause
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use metasql::{
//!     DataSourceConfig, DdlGenerator, DeclaredType, Dialect, Executor, RecordDecl,
//!     Schema, SqliteDatabase, Where,
//! };
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let decl = RecordDecl::new("Account")
//!         .field("ID", DeclaredType::Int(64), "pk")
//!         .field("Email", DeclaredType::String, "unique;not_null")
//!         .field("Age", DeclaredType::Int(32), "")
//!         .table("accounts");
//!     let accounts = Schema::from_decl(&decl)?;
//!
//!     let config = DataSourceConfig::builder("sqlite::memory:").max_connections(1).build();
//!     let exec = Executor::new(Arc::new(SqliteDatabase::connect(&config).await?));
//!     exec.execute_ddl(&DdlGenerator::for_dialect(Dialect::Sqlite).generate(&accounts)?)
//!         .await?;
//!
//!     let row = accounts.validate(&json!({"Email": "ada@example.com", "Age": 36}))?;
//!     exec.insert(&accounts, &row).await?;
//!
//!     let adults = Where::and([
//!         accounts.field("Age")?.gte(18),
//!         accounts.field("Email")?.like("%@example.com"),
//!     ]);
//!     for account in exec.select(&accounts, Some(&adults)).await? {
//!         println!("{:?}", account.get("Email"));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use metasql::{DataSourceConfig, Dialect, GenerateConfig};
//!
//! let generate = GenerateConfig::builder("generated")
//!     .dialects([Dialect::Postgres, Dialect::Sqlite])
//!     .write_source(true)
//!     .build();
//!
//! let source = DataSourceConfig::builder("sqlite://app.db")
//!     .name("default")
//!     .max_connections(5)
//!     .build();
//! ```
//!
//! ## Placeholders
//!
//! Generated statements always use `?`. SQLite and MySQL accept that directly;
//! numbered placeholders are not produced.

pub mod codegen;
pub mod config;
pub mod datasource;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod extract;
pub mod order;
pub mod schema;
pub mod sql;
pub mod tag;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use codegen::{Artifacts, Generator};
pub use config::{DataSourceConfig, DataSourceConfigBuilder, GenerateConfig, GenerateConfigBuilder};
pub use datasource::{DEFAULT_SOURCE, Registry, SqliteDatabase};
pub use dialect::{Dialect, TypeMapping, map_pk_clause, map_type};
pub use error::{MetaSqlError, Result};
pub use executor::{Database, ExecResult, Executor, JoinedRow, ScanValue, ScannedRow, map_row};
pub use extract::{DeclExtractor, FieldDecl, FieldExtractor, FieldKind, Record, RecordDecl, TableNameFn};
pub use schema::{Field, FieldMeta, Schema};
pub use tag::{ForeignKeyRef, TagDirectives, parse_tag};
pub use types::{DeclaredType, LogicalType};
pub use value::{ValueGetter, ValueObject};

// Re-export the query DSL
pub use sql::condition::{CmpOp, Where};
pub use sql::ddl::{DdlGenerator, DdlScript};
pub use sql::join::{Joint, join, left_join, where_from_join};

//! Dialect type mapping
//!
//! Each dialect is described by a declarative [`TypeMapping`]: logical type name to
//! SQL type text, the set of SQL types forming its integer family, and how an
//! auto-increment primary key is spelled. The built-in tables can be replaced by
//! loading a mapping from JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::LogicalType;

/// Target database dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Auto-increment through dedicated serial integer types
    Postgres,
    /// Auto-increment through `AUTO_INCREMENT`
    MySql,
    /// Auto-increment through rowid aliasing (`INTEGER PRIMARY KEY`)
    Sqlite,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Postgres, Dialect::MySql, Dialect::Sqlite];

    pub fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Identifier quote character
    pub fn quote_char(self) -> char {
        match self {
            Self::MySql => '`',
            Self::Postgres | Self::Sqlite => '"',
        }
    }

    /// Built-in mapping table for this dialect
    pub fn mapping(self) -> &'static TypeMapping {
        match self {
            Self::Postgres => &POSTGRES,
            Self::MySql => &MYSQL,
            Self::Sqlite => &SQLITE,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declarative per-dialect type table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    pub dialect: Dialect,
    /// Logical type to SQL type text
    pub types: BTreeMap<LogicalType, String>,
    /// Base SQL type names (uppercase, without arguments) that may auto-increment
    pub integer_family: Vec<String>,
    /// Column fragment for an integer-family primary key; `{type}` is substituted
    pub pk_template: String,
    /// Type substitutions applied before `pk_template`, e.g. BIGINT to BIGSERIAL
    #[serde(default)]
    pub pk_type_rewrite: BTreeMap<String, String>,
    /// SQL type used when a logical type has no entry
    pub fallback: String,
}

/// Integer widths at or below this get an advisory warning when used as primary key
const NARROW_PK_WIDTH: u8 = 16;

impl TypeMapping {
    /// Load a mapping table from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve the SQL type for a logical type; an override always wins
    pub fn map_type(&self, logical: LogicalType, override_type: Option<&str>) -> String {
        if let Some(sql) = override_type.filter(|s| !s.trim().is_empty()) {
            return sql.trim().to_string();
        }
        self.types
            .get(&logical)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// True if the SQL type's base name belongs to the integer family
    pub fn is_integer_family(&self, sql_type: &str) -> bool {
        let base = base_type_name(sql_type);
        self.integer_family.iter().any(|t| t.eq_ignore_ascii_case(&base))
    }

    /// Column fragment for a primary key, plus an optional advisory warning
    ///
    /// Integer-family types get the dialect's auto-increment spelling; anything else
    /// gets a plain `PRIMARY KEY`. Narrow integer widths are allowed but warned about.
    pub fn map_pk_clause(&self, logical: LogicalType, sql_type: &str) -> (String, Option<String>) {
        if !self.is_integer_family(sql_type) {
            return (format!("{} PRIMARY KEY", sql_type), None);
        }

        let base = base_type_name(sql_type);
        let resolved = self
            .pk_type_rewrite
            .iter()
            .find(|(from, _)| from.eq_ignore_ascii_case(&base))
            .map(|(_, to)| to.clone())
            .unwrap_or_else(|| sql_type.to_string());
        let clause = self.pk_template.replace("{type}", &resolved);

        let warning = logical
            .int_width()
            .filter(|w| *w <= NARROW_PK_WIDTH)
            .map(|w| {
                format!(
                    "{}: primary key of type {} ({}-bit) is discouraged; small-width primary keys overflow quickly",
                    self.dialect, logical, w
                )
            });

        (clause, warning)
    }
}

/// Uppercase type name without arguments or modifiers: `VARCHAR(64)` -> `VARCHAR`
fn base_type_name(sql_type: &str) -> String {
    sql_type
        .trim()
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

/// Resolve a SQL type with the built-in mapping for `dialect`
pub fn map_type(logical: LogicalType, override_type: Option<&str>, dialect: Dialect) -> String {
    dialect.mapping().map_type(logical, override_type)
}

/// Primary-key clause with the built-in mapping for `dialect`
pub fn map_pk_clause(
    logical: LogicalType,
    sql_type: &str,
    dialect: Dialect,
) -> (String, Option<String>) {
    dialect.mapping().map_pk_clause(logical, sql_type)
}

fn table(entries: &[(LogicalType, &str)]) -> BTreeMap<LogicalType, String> {
    entries.iter().map(|(k, v)| (*k, v.to_string())).collect()
}

fn names(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|s| s.to_string()).collect()
}

static POSTGRES: LazyLock<TypeMapping> = LazyLock::new(|| TypeMapping {
    dialect: Dialect::Postgres,
    types: table(&[
        (LogicalType::I8, "SMALLINT"),
        (LogicalType::I16, "SMALLINT"),
        (LogicalType::I32, "INTEGER"),
        (LogicalType::I64, "BIGINT"),
        (LogicalType::U8, "SMALLINT"),
        (LogicalType::U16, "INTEGER"),
        (LogicalType::U32, "BIGINT"),
        (LogicalType::U64, "BIGINT"),
        (LogicalType::F32, "REAL"),
        (LogicalType::F64, "DOUBLE PRECISION"),
        (LogicalType::Bool, "BOOLEAN"),
        (LogicalType::String, "TEXT"),
        (LogicalType::DateTime, "TIMESTAMPTZ"),
    ]),
    integer_family: names(&["SMALLINT", "INTEGER", "INT", "BIGINT"]),
    pk_template: "{type} PRIMARY KEY".to_string(),
    pk_type_rewrite: [
        ("SMALLINT", "SMALLSERIAL"),
        ("INTEGER", "SERIAL"),
        ("INT", "SERIAL"),
        ("BIGINT", "BIGSERIAL"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect(),
    fallback: "TEXT".to_string(),
});

static MYSQL: LazyLock<TypeMapping> = LazyLock::new(|| TypeMapping {
    dialect: Dialect::MySql,
    types: table(&[
        (LogicalType::I8, "TINYINT"),
        (LogicalType::I16, "SMALLINT"),
        (LogicalType::I32, "INT"),
        (LogicalType::I64, "BIGINT"),
        (LogicalType::U8, "TINYINT UNSIGNED"),
        (LogicalType::U16, "SMALLINT UNSIGNED"),
        (LogicalType::U32, "INT UNSIGNED"),
        (LogicalType::U64, "BIGINT UNSIGNED"),
        (LogicalType::F32, "FLOAT"),
        (LogicalType::F64, "DOUBLE"),
        (LogicalType::Bool, "BOOLEAN"),
        (LogicalType::String, "VARCHAR(255)"),
        (LogicalType::DateTime, "DATETIME"),
    ]),
    integer_family: names(&["TINYINT", "SMALLINT", "MEDIUMINT", "INT", "INTEGER", "BIGINT"]),
    pk_template: "{type} PRIMARY KEY AUTO_INCREMENT".to_string(),
    pk_type_rewrite: BTreeMap::new(),
    fallback: "LONGTEXT".to_string(),
});

static SQLITE: LazyLock<TypeMapping> = LazyLock::new(|| TypeMapping {
    dialect: Dialect::Sqlite,
    types: table(&[
        (LogicalType::I8, "INTEGER"),
        (LogicalType::I16, "INTEGER"),
        (LogicalType::I32, "INTEGER"),
        (LogicalType::I64, "INTEGER"),
        (LogicalType::U8, "INTEGER"),
        (LogicalType::U16, "INTEGER"),
        (LogicalType::U32, "INTEGER"),
        (LogicalType::U64, "INTEGER"),
        (LogicalType::F32, "REAL"),
        (LogicalType::F64, "REAL"),
        (LogicalType::Bool, "BOOLEAN"),
        (LogicalType::String, "TEXT"),
        (LogicalType::DateTime, "DATETIME"),
    ]),
    integer_family: names(&["INTEGER"]),
    pk_template: "INTEGER PRIMARY KEY".to_string(),
    pk_type_rewrite: BTreeMap::new(),
    fallback: "TEXT".to_string(),
});

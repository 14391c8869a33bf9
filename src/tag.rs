//! Field annotation parsing
//!
//! A tag is a semicolon-separated list of directives:
//!
//! | Directive | Meaning |
//! |---|---|
//! | `pk` | primary key |
//! | `column:<name>` | rename the column |
//! | `type:<sql>` | override the dialect SQL type |
//! | `not_null` | NOT NULL constraint |
//! | `unique` | UNIQUE constraint |
//! | `index` | emit a CREATE INDEX statement |
//! | `default:<literal>` | DEFAULT clause, emitted verbatim |
//! | `fk:<table>.<column>` | foreign-key reference |
//! | `-` | ignore the field entirely |
//!
//! Example: `pk;column:account_id;type:BIGINT`

use serde::{Deserialize, Serialize};

use crate::error::{MetaSqlError, Result};
use crate::sql::sanitize::validate_identifier;

/// Target of a foreign-key directive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// Directives parsed from one field's tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDirectives {
    pub primary_key: bool,
    pub column: Option<String>,
    pub sql_type: Option<String>,
    pub not_null: bool,
    pub unique: bool,
    pub index: bool,
    pub default: Option<String>,
    pub foreign_key: Option<ForeignKeyRef>,
    pub ignore: bool,
}

/// Parse the tag attached to `field`
pub fn parse_tag(field: &str, tag: &str) -> Result<TagDirectives> {
    let mut directives = TagDirectives::default();

    for raw in tag.split(';') {
        let directive = raw.trim();
        if directive.is_empty() {
            continue;
        }

        let (key, value) = match directive.split_once(':') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (directive, None),
        };

        match (key, value) {
            ("-", None) => directives.ignore = true,
            ("pk", None) => directives.primary_key = true,
            ("not_null", None) => directives.not_null = true,
            ("unique", None) => directives.unique = true,
            ("index", None) => directives.index = true,
            ("column", Some(name)) => {
                validate_identifier(name).map_err(|e| MetaSqlError::invalid_tag(field, e))?;
                directives.column = Some(name.to_string());
            }
            ("type", Some(sql)) if !sql.is_empty() => directives.sql_type = Some(sql.to_string()),
            ("default", Some(literal)) if !literal.is_empty() => {
                directives.default = Some(literal.to_string())
            }
            ("fk", Some(target)) => directives.foreign_key = Some(parse_fk(field, target)?),
            _ => {
                return Err(MetaSqlError::invalid_tag(
                    field,
                    format!("unrecognized directive '{}'", directive),
                ));
            }
        }
    }

    Ok(directives)
}

fn parse_fk(field: &str, target: &str) -> Result<ForeignKeyRef> {
    let (table, column) = target.split_once('.').ok_or_else(|| {
        MetaSqlError::invalid_tag(field, format!("fk target '{}' must be table.column", target))
    })?;
    for part in [table, column] {
        validate_identifier(part).map_err(|e| MetaSqlError::invalid_tag(field, e))?;
    }
    Ok(ForeignKeyRef {
        table: table.to_string(),
        column: column.to_string(),
    })
}

//! Error types for metadata extraction, SQL generation and execution

use thiserror::Error;

/// Errors that can occur while extracting metadata, building SQL or running it
#[derive(Debug, Error)]
pub enum MetaSqlError {
    #[error("Unsupported type for field '{field}': {type_name}")]
    UnsupportedType { field: String, type_name: String },

    #[error("Duplicate field: {0}")]
    DuplicateField(String),

    #[error("Invalid tag on field '{field}': {message}")]
    InvalidTag { field: String, message: String },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Schema is missing or has no fields")]
    EmptySchema,

    #[error("{0} requires a non-empty WHERE clause")]
    MissingWhere(&'static str),

    #[error("{0} has no fields to write")]
    NoFields(&'static str),

    #[error("{statement} cannot target table '{table}' through alias '{alias}'")]
    AliasedTarget {
        statement: &'static str,
        table: String,
        alias: String,
    },

    #[error("Unknown field '{field}' on table '{table}'")]
    UnknownField { table: String, field: String },

    #[error("Join target mismatch: expected '{expected}', found '{found}'")]
    JoinTargetMismatch { expected: String, found: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetaSqlError {
    pub fn unsupported_type(field: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            field: field.into(),
            type_name: type_name.into(),
        }
    }

    pub fn invalid_tag(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTag {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unknown_field(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            table: table.into(),
            field: field.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping(msg.into())
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// True for the metadata class of errors, which abort generation of a record
    pub fn is_metadata_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedType { .. }
                | Self::DuplicateField(_)
                | Self::InvalidTag { .. }
                | Self::InvalidIdentifier(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MetaSqlError>;

//! DDL generation from schema metadata
//!
//! Produces `CREATE TABLE` with columns in schema order and inline constraints,
//! followed by one `CREATE INDEX` per indexed column. Schema names are already free of
//! reserved words; names passed in directly are quoted for the target dialect when they
//! collide with one.

use crate::dialect::{Dialect, TypeMapping};
use crate::error::{MetaSqlError, Result};
use crate::schema::{FieldMeta, Schema};
use crate::sql::sanitize::quote_if_reserved;

/// Generated DDL for one table in one dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlScript {
    pub dialect: Dialect,
    pub create_table: String,
    pub indexes: Vec<String>,
    /// Advisory warnings, e.g. narrow-width primary keys
    pub warnings: Vec<String>,
}

impl DdlScript {
    /// Individual statements, without trailing semicolons
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.create_table.as_str()).chain(self.indexes.iter().map(String::as_str))
    }

    /// Whole script, one statement per line group, each terminated with `;`
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for statement in self.statements() {
            out.push_str(statement);
            out.push_str(";\n");
        }
        out
    }
}

/// DDL generator bound to one dialect mapping table
pub struct DdlGenerator<'a> {
    mapping: &'a TypeMapping,
}

impl DdlGenerator<'static> {
    /// Generator using the built-in mapping of `dialect`
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            mapping: dialect.mapping(),
        }
    }
}

impl<'a> DdlGenerator<'a> {
    /// Create a generator over a custom mapping table
    pub fn new(mapping: &'a TypeMapping) -> Self {
        Self { mapping }
    }

    pub fn dialect(&self) -> Dialect {
        self.mapping.dialect
    }

    fn ident(&self, name: &str) -> String {
        quote_if_reserved(self.mapping.dialect, name)
    }

    /// Generate CREATE TABLE plus index statements
    ///
    /// A single primary key gets the dialect's primary-key clause inline. Several
    /// primary keys become a trailing `PRIMARY KEY (...)` table constraint and none
    /// of them auto-increments.
    pub fn generate(&self, schema: &Schema) -> Result<DdlScript> {
        if schema.is_empty() {
            return Err(MetaSqlError::EmptySchema);
        }

        let pk_count = schema.primary_keys().count();
        let mut warnings = Vec::new();
        let mut lines = Vec::with_capacity(schema.len() + 1);

        for meta in schema.metas() {
            let (line, warning) = self.format_column_definition(meta, pk_count == 1);
            if let Some(warning) = warning {
                tracing::warn!(
                    table = schema.table_name(),
                    column = %meta.column_name,
                    "{}",
                    warning
                );
                warnings.push(format!("{}.{}: {}", schema.table_name(), meta.column_name, warning));
            }
            lines.push(line);
        }

        if pk_count > 1 {
            let keys: Vec<String> = schema
                .primary_keys()
                .map(|meta| self.ident(&meta.column_name))
                .collect();
            lines.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        let create_table = format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.ident(schema.table_name()),
            lines.join(",\n    ")
        );

        let indexes = schema
            .metas()
            .iter()
            .filter(|meta| meta.is_indexed)
            .map(|meta| self.generate_create_index(schema.table_name(), &meta.column_name))
            .collect();

        Ok(DdlScript {
            dialect: self.mapping.dialect,
            create_table,
            indexes,
            warnings,
        })
    }

    /// `DROP TABLE IF EXISTS <table>`
    pub fn generate_drop_table(&self, table_name: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.ident(table_name))
    }

    /// `CREATE INDEX idx_<table>_<column> ON <table> (<column>)`
    pub fn generate_create_index(&self, table_name: &str, column: &str) -> String {
        format!(
            "CREATE INDEX {} ON {} ({})",
            self.ident(&format!("idx_{}_{}", table_name, column)),
            self.ident(table_name),
            self.ident(column)
        )
    }

    /// Format one column definition; `inline_pk` selects the dialect PK clause
    pub fn format_column_definition(
        &self,
        meta: &FieldMeta,
        inline_pk: bool,
    ) -> (String, Option<String>) {
        let sql_type = self
            .mapping
            .map_type(meta.logical_type, meta.sql_type.as_deref());
        let mut parts = vec![self.ident(&meta.column_name)];
        let mut warning = None;

        if meta.is_pk && inline_pk {
            let (clause, pk_warning) = self.mapping.map_pk_clause(meta.logical_type, &sql_type);
            parts.push(clause);
            warning = pk_warning;
        } else {
            parts.push(sql_type);
            if meta.is_not_null || meta.is_pk {
                parts.push("NOT NULL".to_string());
            }
        }

        if meta.is_unique && !meta.is_pk {
            parts.push("UNIQUE".to_string());
        }

        if let Some(default) = &meta.default_literal {
            parts.push(format!("DEFAULT {}", default));
        }

        if let Some(fk) = &meta.foreign_key {
            parts.push(format!(
                "REFERENCES {}({})",
                self.ident(&fk.table),
                self.ident(&fk.column)
            ));
        }

        (parts.join(" "), warning)
    }
}

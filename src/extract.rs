//! Field metadata extraction
//!
//! Record declarations describe a record type's fields, their declared types and
//! their tags. How a declaration is produced (hand-written, a derive macro, a build
//! script) is up to the caller; extraction only sees the [`RecordDecl`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{MetaSqlError, Result};
use crate::order;
use crate::schema::FieldMeta;
use crate::sql::sanitize::validate_identifier;
use crate::tag::parse_tag;
use crate::types::{Classification, DeclaredType};

/// Body shape of a record's table-name method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "value", rename_all = "lowercase")]
pub enum TableNameFn {
    /// A single unconditional string-literal return
    Literal(String),
    /// Anything computed at runtime
    Computed,
    /// Branches on some condition
    Conditional,
}

/// What a field declares: a value or an embedded sub-record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Value(DeclaredType),
    Embedded(RecordDecl),
}

/// One declared field with its raw tag text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub tag: String,
}

/// Declaration of a record type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDecl {
    pub type_name: String,
    pub fields: Vec<FieldDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name_fn: Option<TableNameFn>,
}

impl RecordDecl {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            table_name_fn: None,
        }
    }

    /// Add a value field
    pub fn field(mut self, name: impl Into<String>, ty: DeclaredType, tag: impl Into<String>) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            kind: FieldKind::Value(ty),
            tag: tag.into(),
        });
        self
    }

    /// Add an anonymous embedded sub-record
    pub fn embed(mut self, decl: RecordDecl) -> Self {
        self.fields.push(FieldDecl {
            name: decl.type_name.clone(),
            kind: FieldKind::Embedded(decl),
            tag: String::new(),
        });
        self
    }

    /// Set the table-name method body shape
    pub fn table_name_fn(mut self, body: TableNameFn) -> Self {
        self.table_name_fn = Some(body);
        self
    }

    /// Shorthand for a literal table-name method
    pub fn table(self, name: impl Into<String>) -> Self {
        self.table_name_fn(TableNameFn::Literal(name.into()))
    }
}

/// Implemented by record types that can describe themselves
pub trait Record {
    fn declaration() -> RecordDecl;
}

/// Capability turning a record declaration into field metadata
pub trait FieldExtractor {
    /// Fields in raw (pre-ordering) order; embedded groups stay contiguous
    fn extract_fields(&self, decl: &RecordDecl) -> Result<Vec<FieldMeta>>;

    /// Table the record is stored in
    fn table_name(&self, decl: &RecordDecl) -> Result<String>;
}

/// Default extractor working directly on [`RecordDecl`] values
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclExtractor;

impl FieldExtractor for DeclExtractor {
    fn extract_fields(&self, decl: &RecordDecl) -> Result<Vec<FieldMeta>> {
        let mut out = Vec::new();
        collect(decl, false, &mut out)?;

        let mut seen = HashSet::new();
        for field in &out {
            if !seen.insert(field.provider_name.as_str()) {
                return Err(MetaSqlError::DuplicateField(field.provider_name.clone()));
            }
        }

        Ok(out)
    }

    fn table_name(&self, decl: &RecordDecl) -> Result<String> {
        match &decl.table_name_fn {
            Some(TableNameFn::Literal(name)) => {
                validate_identifier(name).map_err(|e| {
                    MetaSqlError::InvalidIdentifier(format!(
                        "table name for {}: {}",
                        decl.type_name, e
                    ))
                })?;
                Ok(name.clone())
            }
            _ => Ok(order::table_name(&decl.type_name)),
        }
    }
}

fn collect(decl: &RecordDecl, embedded: bool, out: &mut Vec<FieldMeta>) -> Result<()> {
    for field in &decl.fields {
        let directives = parse_tag(&field.name, &field.tag)?;
        if directives.ignore {
            continue;
        }

        let ty = match &field.kind {
            FieldKind::Embedded(inner) => {
                collect(inner, true, out)?;
                continue;
            }
            FieldKind::Value(ty) => ty,
        };

        let logical = match ty.classify() {
            Classification::Column(logical) => logical,
            Classification::Skip => continue,
            Classification::Unsupported => {
                return Err(MetaSqlError::unsupported_type(&field.name, ty.to_string()));
            }
        };

        let mut meta = FieldMeta::new(&field.name, logical);
        if let Some(column) = directives.column {
            meta.column_name = column;
        } else {
            validate_identifier(&meta.column_name).map_err(|e| {
                MetaSqlError::invalid_tag(&field.name, format!("default column name: {}", e))
            })?;
        }
        meta.sql_type = directives.sql_type;
        meta.is_pk = directives.primary_key;
        meta.is_not_null = directives.not_null;
        meta.is_unique = directives.unique;
        meta.is_indexed = directives.index;
        meta.default_literal = directives.default;
        meta.foreign_key = directives.foreign_key;
        meta.is_embedded = embedded;

        out.push(meta);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::types::LogicalType;

    fn base() -> RecordDecl {
        RecordDecl::new("Base")
            .field("ID", DeclaredType::Int(64), "pk;column:ID")
            .field("CreatedAt", DeclaredType::DateTime, "")
            .field("UpdatedAt", DeclaredType::DateTime, "")
    }

    fn account() -> RecordDecl {
        RecordDecl::new("Account")
            .embed(base())
            .field("Email", DeclaredType::String, "unique;not_null")
            .field("Nickname", DeclaredType::Optional(Box::new(DeclaredType::String)), "")
    }

    // ==================== Extraction ====================

    #[test]
    fn test_extract_marks_embedded_fields() {
        let fields = DeclExtractor.extract_fields(&account()).unwrap();
        let flags: Vec<_> = fields
            .iter()
            .map(|f| (f.provider_name.as_str(), f.is_embedded))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("ID", true),
                ("CreatedAt", true),
                ("UpdatedAt", true),
                ("Email", false),
                ("Nickname", false),
            ]
        );
    }

    #[test]
    fn test_extract_applies_directives() {
        let fields = DeclExtractor.extract_fields(&account()).unwrap();
        let id = &fields[0];
        assert!(id.is_pk);
        assert_eq!(id.column_name, "ID");
        assert_eq!(id.logical_type, LogicalType::I64);

        let email = fields.iter().find(|f| f.provider_name == "Email").unwrap();
        assert!(email.is_unique);
        assert!(email.is_not_null);
        assert_eq!(email.column_name, "email");

        let created = fields.iter().find(|f| f.provider_name == "CreatedAt").unwrap();
        assert_eq!(created.column_name, "created_at");
    }

    #[test]
    fn test_schema_order_for_embedded_base() {
        let schema = Schema::from_decl(&account()).unwrap();
        let names: Vec<_> = schema.metas().iter().map(|f| f.provider_name.as_str()).collect();
        assert_eq!(names, vec!["ID", "Email", "Nickname", "CreatedAt", "UpdatedAt"]);
    }

    #[test]
    fn test_nested_embedding_is_recursive() {
        let audit = RecordDecl::new("Audit").field("Actor", DeclaredType::String, "");
        let outer = RecordDecl::new("Doc")
            .field("Title", DeclaredType::String, "")
            .embed(RecordDecl::new("Meta").field("Rev", DeclaredType::Int(32), "").embed(audit));

        let fields = DeclExtractor.extract_fields(&outer).unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.provider_name.as_str()).collect();
        assert_eq!(names, vec!["Title", "Rev", "Actor"]);
        assert!(fields[2].is_embedded);
    }

    #[test]
    fn test_unsupported_type_fails() {
        let decl = RecordDecl::new("Account")
            .field("Email", DeclaredType::String, "")
            .field("Tags", DeclaredType::Map("map[string]string".into()), "");

        let err = DeclExtractor.extract_fields(&decl).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Tags"));
        assert!(msg.contains("map[string]string"));
    }

    #[test]
    fn test_unsupported_type_ignored_by_tag() {
        let decl = RecordDecl::new("Account")
            .field("Email", DeclaredType::String, "")
            .field("Events", DeclaredType::Channel("chan Event".into()), "-")
            .field("Hook", DeclaredType::Callable("func()".into()), "-");

        let fields = DeclExtractor.extract_fields(&decl).unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_unsupported_type_inside_embedded_fails() {
        let decl = RecordDecl::new("Account").embed(
            RecordDecl::new("Base").field("Labels", DeclaredType::Sequence("[]string".into()), ""),
        );
        assert!(matches!(
            DeclExtractor.extract_fields(&decl),
            Err(MetaSqlError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_nested_record_is_skipped() {
        let decl = RecordDecl::new("Account")
            .field("Email", DeclaredType::String, "")
            .field("Settings", DeclaredType::Record("Settings".into()), "");

        let fields = DeclExtractor.extract_fields(&decl).unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_duplicate_after_expansion_fails() {
        let decl = RecordDecl::new("Account")
            .field("ID", DeclaredType::Int(64), "pk")
            .embed(base());

        let err = DeclExtractor.extract_fields(&decl).unwrap_err();
        assert!(matches!(err, MetaSqlError::DuplicateField(name) if name == "ID"));
    }

    // ==================== Table name ====================

    #[test]
    fn test_table_name_literal() {
        let decl = account().table("accounts");
        assert_eq!(DeclExtractor.table_name(&decl).unwrap(), "accounts");
    }

    #[test]
    fn test_table_name_falls_back_for_non_literal_bodies() {
        let computed = RecordDecl::new("UserProfile").table_name_fn(TableNameFn::Computed);
        let conditional = RecordDecl::new("UserProfile").table_name_fn(TableNameFn::Conditional);
        let missing = RecordDecl::new("UserProfile");

        for decl in [computed, conditional, missing] {
            assert_eq!(DeclExtractor.table_name(&decl).unwrap(), "user_profile");
        }
    }

    #[test]
    fn test_invalid_literal_table_name() {
        let decl = RecordDecl::new("Account").table("drop table;");
        assert!(matches!(
            DeclExtractor.table_name(&decl),
            Err(MetaSqlError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_record_trait() {
        struct Account;
        impl Record for Account {
            fn declaration() -> RecordDecl {
                account().table("accounts")
            }
        }

        let schema = Schema::of::<Account>().unwrap();
        assert_eq!(schema.table_name(), "accounts");
        assert_eq!(schema.len(), 5);
    }

    #[test]
    fn test_declaration_round_trips_through_json() {
        let decl = account().table("accounts");
        let json = serde_json::to_string(&decl).unwrap();
        let back: RecordDecl = serde_json::from_str(&json).unwrap();
        assert_eq!(back, decl);
    }
}

//! Field metadata, schemas and schema-bound field references
//!
//! A [`Schema`] is the ordered field list of one record type bound to one table.
//! [`Field`] values can only be obtained from a schema, which is what keeps every
//! column referenced by the query DSL tied to real metadata.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MetaSqlError, Result};
use crate::extract::{DeclExtractor, FieldExtractor, Record, RecordDecl};
use crate::order;
use crate::sql::condition::{CmpOp, Where};
use crate::tag::ForeignKeyRef;
use crate::types::LogicalType;
use crate::value::ValueObject;

/// Canonical metadata for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    /// Name of the field on the record type; unique within a schema
    pub provider_name: String,
    pub column_name: String,
    pub logical_type: LogicalType,
    /// SQL type override from the `type:` directive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<String>,
    pub is_pk: bool,
    pub is_not_null: bool,
    pub is_unique: bool,
    pub is_indexed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_literal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
    /// Pulled in from an embedded sub-record
    pub is_embedded: bool,
}

impl FieldMeta {
    /// Plain field with the default snake_case column name
    pub fn new(provider_name: impl Into<String>, logical_type: LogicalType) -> Self {
        let provider_name = provider_name.into();
        Self {
            column_name: order::column_name(&provider_name),
            provider_name,
            logical_type,
            sql_type: None,
            is_pk: false,
            is_not_null: false,
            is_unique: false,
            is_indexed: false,
            default_literal: None,
            foreign_key: None,
            is_embedded: false,
        }
    }
}

/// Ordered, named collection of fields bound to one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    table_name: String,
    /// Name used to qualify columns; differs from `table_name` for aliased occurrences
    qualifier: String,
    fields: Vec<FieldMeta>,
}

impl Schema {
    /// Build a schema from already-extracted fields, applying the ordering policy
    pub fn new(table_name: impl Into<String>, fields: Vec<FieldMeta>) -> Result<Self> {
        let table_name = table_name.into();
        crate::sql::sanitize::validate_identifier(&table_name)
            .map_err(MetaSqlError::InvalidIdentifier)?;

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.provider_name.as_str()) {
                return Err(MetaSqlError::DuplicateField(field.provider_name.clone()));
            }
            crate::sql::sanitize::validate_identifier(&field.column_name).map_err(|e| {
                MetaSqlError::InvalidIdentifier(format!("{}.{}: {}", table_name, field.provider_name, e))
            })?;
        }

        Ok(Self {
            qualifier: table_name.clone(),
            table_name,
            fields: order::order(fields),
        })
    }

    /// Extract, order and bind a record declaration
    pub fn from_decl(decl: &RecordDecl) -> Result<Self> {
        Self::with_extractor(&DeclExtractor, decl)
    }

    /// Same as [`Schema::from_decl`] with a custom extraction capability
    pub fn with_extractor(extractor: &dyn FieldExtractor, decl: &RecordDecl) -> Result<Self> {
        let fields = extractor.extract_fields(decl)?;
        let table = extractor.table_name(decl)?;
        Self::new(table, fields)
    }

    /// Schema of a type implementing [`Record`]
    pub fn of<R: Record>() -> Result<Self> {
        Self::from_decl(&R::declaration())
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Table name or alias used to qualify this schema's columns
    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn is_aliased(&self) -> bool {
        self.qualifier != self.table_name
    }

    /// Same schema referenced through an alias, e.g. for the inner side of a self-join
    pub fn aliased(&self, alias: impl Into<String>) -> Self {
        Self {
            table_name: self.table_name.clone(),
            qualifier: alias.into(),
            fields: self.fields.clone(),
        }
    }

    pub fn metas(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn meta(&self, provider_name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.provider_name == provider_name)
    }

    /// Schema-bound reference to a field by provider name
    pub fn field(&self, provider_name: &str) -> Result<Field> {
        self.meta(provider_name)
            .map(|meta| self.bind(meta))
            .ok_or_else(|| MetaSqlError::unknown_field(&self.table_name, provider_name))
    }

    /// References to all fields in schema order
    pub fn fields(&self) -> Vec<Field> {
        self.fields.iter().map(|meta| self.bind(meta)).collect()
    }

    /// Invert a `<qualifier>__<column>` SELECT alias back to the field metadata
    pub fn meta_by_alias(&self, alias: &str) -> Option<&FieldMeta> {
        let (qualifier, column) = alias.split_once("__")?;
        if qualifier != self.qualifier {
            return None;
        }
        self.fields.iter().find(|f| f.column_name == column)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.iter().filter(|f| f.is_pk)
    }

    /// Content hash of this schema's metadata (see [`order::content_hash`])
    pub fn content_hash(&self) -> String {
        order::content_hash(&self.table_name, &self.fields)
    }

    /// Validate a JSON object against this schema
    ///
    /// Every key must name a field; values are coerced to the field's logical type;
    /// explicit nulls are rejected for `not_null` and primary-key fields. Absent
    /// fields stay absent.
    pub fn validate(&self, input: &Value) -> Result<ValueObject> {
        let object = input
            .as_object()
            .ok_or_else(|| MetaSqlError::validation("Input must be a JSON object"))?;

        let mut values = Map::new();
        for (key, value) in object {
            let meta = self.meta(key).ok_or_else(|| {
                MetaSqlError::validation(format!(
                    "Unknown field '{}' for table '{}'",
                    key, self.table_name
                ))
            })?;

            if value.is_null() && (meta.is_not_null || meta.is_pk) {
                return Err(MetaSqlError::validation(format!(
                    "Field '{}' does not allow NULL values",
                    key
                )));
            }

            let coerced = meta.logical_type.coerce(value).map_err(|e| {
                MetaSqlError::validation(format!("Invalid value for field '{}': {}", key, e))
            })?;
            values.insert(key.clone(), coerced);
        }

        Ok(ValueObject::from_map(self.table_name.clone(), values))
    }

    /// Parse JSON text and validate it
    pub fn validate_json(&self, json: &str) -> Result<ValueObject> {
        let value: Value = serde_json::from_str(json)?;
        self.validate(&value)
    }

    fn bind(&self, meta: &FieldMeta) -> Field {
        Field {
            table: self.table_name.clone(),
            qualifier: self.qualifier.clone(),
            column: meta.column_name.clone(),
            name: meta.provider_name.clone(),
            logical_type: meta.logical_type,
        }
    }
}

/// Column reference bound to a schema
///
/// Only [`Schema::field`] and [`Schema::fields`] construct these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    table: String,
    qualifier: String,
    column: String,
    name: String,
    logical_type: LogicalType,
}

impl Field {
    /// Underlying table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Table name or alias the column is qualified with
    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Provider (record field) name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logical_type(&self) -> LogicalType {
        self.logical_type
    }

    /// `qualifier.column`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.qualifier, self.column)
    }

    /// `qualifier__column`, the SELECT alias
    pub fn alias(&self) -> String {
        format!("{}__{}", self.qualifier, self.column)
    }

    /// The same column referenced through a table alias
    pub fn aliased(&self, alias: impl Into<String>) -> Self {
        Self {
            qualifier: alias.into(),
            ..self.clone()
        }
    }

    pub fn eq(&self, value: impl Into<Value>) -> Where {
        Where::compare(self, CmpOp::Eq, value.into())
    }

    pub fn ne(&self, value: impl Into<Value>) -> Where {
        Where::compare(self, CmpOp::Ne, value.into())
    }

    pub fn gt(&self, value: impl Into<Value>) -> Where {
        Where::compare(self, CmpOp::Gt, value.into())
    }

    pub fn gte(&self, value: impl Into<Value>) -> Where {
        Where::compare(self, CmpOp::Gte, value.into())
    }

    pub fn lt(&self, value: impl Into<Value>) -> Where {
        Where::compare(self, CmpOp::Lt, value.into())
    }

    pub fn lte(&self, value: impl Into<Value>) -> Where {
        Where::compare(self, CmpOp::Lte, value.into())
    }

    pub fn like(&self, pattern: impl Into<Value>) -> Where {
        Where::compare(self, CmpOp::Like, pattern.into())
    }

    pub fn is_in<I, V>(&self, values: I) -> Where
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Where::is_in(self, values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> Where {
        Where::null_check(self, true)
    }

    pub fn is_not_null(&self) -> Where {
        Where::null_check(self, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn accounts() -> Schema {
        let mut id = FieldMeta::new("ID", LogicalType::I64);
        id.is_pk = true;
        id.column_name = "ID".into();
        let mut email = FieldMeta::new("Email", LogicalType::String);
        email.column_name = "Email".into();
        email.is_not_null = true;
        let active = FieldMeta::new("Active", LogicalType::Bool);
        Schema::new("accounts", vec![email, id, active]).unwrap()
    }

    #[test]
    fn test_schema_orders_fields() {
        let schema = accounts();
        let names: Vec<_> = schema.metas().iter().map(|f| f.provider_name.as_str()).collect();
        assert_eq!(names, vec!["ID", "Email", "Active"]);
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.primary_keys().count(), 1);
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = Schema::new(
            "accounts",
            vec![
                FieldMeta::new("Email", LogicalType::String),
                FieldMeta::new("Email", LogicalType::String),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, MetaSqlError::DuplicateField(name) if name == "Email"));
    }

    #[test]
    fn test_schema_rejects_invalid_table_name() {
        assert!(Schema::new("bad table", vec![]).is_err());
    }

    #[test]
    fn test_schema_rejects_reserved_identifiers() {
        assert!(matches!(
            Schema::new("order", vec![FieldMeta::new("Total", LogicalType::F64)]),
            Err(MetaSqlError::InvalidIdentifier(_))
        ));

        let err = Schema::new("orders", vec![FieldMeta::new("Group", LogicalType::String)])
            .unwrap_err();
        assert!(matches!(&err, MetaSqlError::InvalidIdentifier(msg) if msg.contains("orders.Group")));
    }

    #[test]
    fn test_field_reference() {
        let schema = accounts();
        let email = schema.field("Email").unwrap();
        assert_eq!(email.qualified(), "accounts.Email");
        assert_eq!(email.alias(), "accounts__Email");
        assert_eq!(email.name(), "Email");
        assert_eq!(email.table(), "accounts");

        let inner = email.aliased("accounts_2");
        assert_eq!(inner.qualified(), "accounts_2.Email");
        assert_eq!(inner.table(), "accounts");
    }

    #[test]
    fn test_unknown_field() {
        let err = accounts().field("Missing").unwrap_err();
        assert!(matches!(err, MetaSqlError::UnknownField { .. }));
    }

    #[test]
    fn test_meta_by_alias() {
        let schema = accounts();
        assert_eq!(
            schema.meta_by_alias("accounts__Email").map(|m| m.provider_name.as_str()),
            Some("Email")
        );
        assert!(schema.meta_by_alias("profiles__Email").is_none());
        assert!(schema.meta_by_alias("Email").is_none());

        let aliased = schema.aliased("accounts_2");
        assert!(aliased.is_aliased());
        assert!(aliased.meta_by_alias("accounts_2__ID").is_some());
        assert_eq!(aliased.field("ID").unwrap().qualified(), "accounts_2.ID");
    }

    // ==================== Validation ====================

    #[test]
    fn test_validate_coerces_values() {
        let value = accounts()
            .validate(&json!({"ID": "7", "Email": "a@b.c", "Active": 1}))
            .unwrap();
        assert_eq!(value.get("ID"), Some(&json!(7)));
        assert_eq!(value.get("Active"), Some(&json!(true)));
        assert_eq!(value.table(), "accounts");
    }

    #[test]
    fn test_validate_rejects_unknown_and_null() {
        let schema = accounts();
        assert!(schema.validate(&json!({"Nope": 1})).is_err());
        assert!(schema.validate(&json!({"Email": null})).is_err());
        assert!(schema.validate(&json!({"Active": null})).is_ok());
        assert!(schema.validate(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_validate_json_text() {
        let value = accounts().validate_json(r#"{"Email": "x@y.z"}"#).unwrap();
        assert_eq!(value.get("Email"), Some(&json!("x@y.z")));
        assert!(accounts().validate_json("{not json").is_err());
    }

    #[test]
    fn test_content_hash_matches_order_module() {
        let schema = accounts();
        assert_eq!(
            schema.content_hash(),
            order::content_hash("accounts", schema.metas())
        );
    }
}

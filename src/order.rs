//! Column ordering and naming policy
//!
//! Everything here is a pure function of its input so generated artifacts are
//! byte-identical across runs.

use convert_case::{Case, Casing};
use sha2::{Digest, Sha256};

use crate::schema::FieldMeta;

/// Default column name for a field: snake_case of the provider name
pub fn column_name(provider_name: &str) -> String {
    provider_name.to_case(Case::Snake)
}

/// Default table name for a record type: snake_case of the type name
pub fn table_name(type_name: &str) -> String {
    type_name.to_case(Case::Snake)
}

/// Canonical column order: primary keys, then host fields, then embedded fields
///
/// Each partition keeps its relative input order, so a primary key found inside an
/// embedded group moves to the front while the rest of that group stays contiguous.
pub fn order(fields: Vec<FieldMeta>) -> Vec<FieldMeta> {
    let mut pk = Vec::new();
    let mut host = Vec::new();
    let mut embedded = Vec::new();

    for field in fields {
        if field.is_pk {
            pk.push(field);
        } else if field.is_embedded {
            embedded.push(field);
        } else {
            host.push(field);
        }
    }

    pk.extend(host);
    pk.extend(embedded);
    pk
}

/// SHA-256 over the semantic content of a table's fields, as lowercase hex
///
/// Fields are hashed sorted by provider name, so any permutation of the same field
/// set yields the same digest. Every value is length-framed.
pub fn content_hash(table: &str, fields: &[FieldMeta]) -> String {
    let mut sorted: Vec<&FieldMeta> = fields.iter().collect();
    sorted.sort_by(|a, b| a.provider_name.cmp(&b.provider_name));

    let mut hasher = Sha256::new();
    write_framed(&mut hasher, table.as_bytes());
    for field in sorted {
        write_framed(&mut hasher, field.provider_name.as_bytes());
        write_framed(&mut hasher, field.column_name.as_bytes());
        write_framed(&mut hasher, field.logical_type.name().as_bytes());
        write_framed(
            &mut hasher,
            &[
                u8::from(field.is_pk),
                u8::from(field.is_not_null),
                u8::from(field.is_unique),
                u8::from(field.is_indexed),
                u8::from(field.is_embedded),
            ],
        );
        write_framed(&mut hasher, opt_bytes(field.sql_type.as_deref()));
        write_framed(&mut hasher, opt_bytes(field.default_literal.as_deref()));
        let fk = field
            .foreign_key
            .as_ref()
            .map(|fk| format!("{}.{}", fk.table, fk.column))
            .unwrap_or_default();
        write_framed(&mut hasher, fk.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}

fn opt_bytes(value: Option<&str>) -> &[u8] {
    value.map(str::as_bytes).unwrap_or_default()
}

fn write_framed(hasher: &mut Sha256, bytes: &[u8]) {
    let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    hasher.update(len.to_be_bytes());
    hasher.update(bytes);
}

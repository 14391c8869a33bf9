//! Artifact generation
//!
//! For each record declaration the [`Generator`] produces one Rust source artifact
//! (table name, content hash and field identifiers in schema order) and one DDL
//! script per configured dialect. Everything is generated in memory first; files
//! are only written once the whole record succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use convert_case::{Case, Casing};

use crate::config::GenerateConfig;
use crate::error::Result;
use crate::extract::RecordDecl;
use crate::schema::Schema;
use crate::sql::ddl::{DdlGenerator, DdlScript};
use crate::sql::join::SELF_JOIN_SUFFIX;

/// Everything generated for one record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub type_name: String,
    pub table: String,
    /// Rust source of the field-identifier module
    pub source: String,
    pub ddl: Vec<DdlScript>,
    /// Advisory warnings from all dialects
    pub warnings: Vec<String>,
    pub content_hash: String,
}

pub struct Generator {
    config: GenerateConfig,
}

impl Generator {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerateConfig {
        &self.config
    }

    /// Generate all artifacts for one record type, without touching the filesystem
    pub fn generate(&self, decl: &RecordDecl) -> Result<Artifacts> {
        let schema = Schema::from_decl(decl)?;
        self.generate_schema(&decl.type_name, &schema)
    }

    /// Same as [`Generator::generate`] for an already-built schema
    pub fn generate_schema(&self, type_name: &str, schema: &Schema) -> Result<Artifacts> {
        let ddl = self
            .config
            .dialects
            .iter()
            .map(|dialect| DdlGenerator::for_dialect(*dialect).generate(schema))
            .collect::<Result<Vec<_>>>()?;
        let warnings = ddl.iter().flat_map(|s| s.warnings.iter().cloned()).collect();
        let content_hash = schema.content_hash();

        Ok(Artifacts {
            type_name: type_name.to_string(),
            table: schema.table_name().to_string(),
            source: self.render_source(type_name, schema, &content_hash),
            ddl,
            warnings,
            content_hash,
        })
    }

    fn render_source(&self, type_name: &str, schema: &Schema, hash: &str) -> String {
        let table = schema.table_name();
        let self_join_alias = format!("{}{}", table, SELF_JOIN_SUFFIX);
        let names: Vec<String> = schema
            .metas()
            .iter()
            .map(|m| format!("{:?}", m.provider_name))
            .collect();

        let mut out = format!("// Code generated by metasql for {}. DO NOT EDIT.\n\n", type_name);
        out.push_str(&format!("pub const TABLE: &str = {:?};\n", table));
        out.push_str(&format!("pub const CONTENT_HASH: &str = {:?};\n", hash));
        out.push_str(&format!("pub const SELF_JOIN_ALIAS: &str = {:?};\n\n", self_join_alias));

        out.push_str("/// Field names in column order\n");
        out.push_str(&format!(
            "pub const FIELDS: [&str; {}] = [{}];\n\n",
            names.len(),
            names.join(", ")
        ));

        out.push_str("pub mod fields {\n");
        for meta in schema.metas() {
            let ident = meta.provider_name.to_case(Case::Snake).to_uppercase();
            out.push_str(&format!("    /// Column `{}`\n", meta.column_name));
            out.push_str(&format!("    pub const {}: &str = {:?};\n", ident, meta.provider_name));
        }
        out.push_str("}\n");
        out
    }

    /// Path of the source artifact for `table`
    pub fn source_path(&self, table: &str) -> PathBuf {
        self.config.out_dir.join(format!("{}.rs", table))
    }

    /// Path of the DDL artifact for `table` in `dialect`
    pub fn ddl_path(&self, table: &str, script: &DdlScript) -> PathBuf {
        self.config
            .out_dir
            .join(format!("{}.{}.sql", table, script.dialect))
    }

    /// Write generated artifacts; returns the written paths
    pub fn write(&self, artifacts: &Artifacts) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.config.out_dir)?;

        let mut files: Vec<(PathBuf, &str)> = Vec::new();
        if self.config.write_source {
            files.push((self.source_path(&artifacts.table), artifacts.source.as_str()));
        }
        let scripts: Vec<String> = artifacts.ddl.iter().map(DdlScript::to_sql).collect();
        for (script, sql) in artifacts.ddl.iter().zip(&scripts) {
            files.push((self.ddl_path(&artifacts.table, script), sql.as_str()));
        }

        let mut written = Vec::with_capacity(files.len());
        for (path, contents) in files {
            write_file(&path, contents)?;
            written.push(path);
        }

        tracing::info!(
            record = %artifacts.type_name,
            table = %artifacts.table,
            files = written.len(),
            "artifacts written"
        );
        Ok(written)
    }

    /// Generate and write one record type
    ///
    /// On a metadata error nothing is written for that record.
    pub fn run(&self, decl: &RecordDecl) -> Result<Vec<PathBuf>> {
        let artifacts = self.generate(decl)?;
        self.write(&artifacts)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote artifact");
    Ok(())
}

//! Configuration for artifact generation and data sources
//!
//! Provides builder patterns for the generator and for SQLite-backed data sources.

use std::path::PathBuf;

use crate::dialect::Dialect;

/// Configuration for the artifact generator
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Directory that receives `<table>.rs` and `<table>.<dialect>.sql`
    pub out_dir: PathBuf,
    /// Dialects to emit DDL for (default: all supported dialects)
    pub dialects: Vec<Dialect>,
    /// Whether to write the generated source artifact (default: true)
    pub write_source: bool,
}

impl GenerateConfig {
    /// Create a new configuration builder
    pub fn builder(out_dir: impl Into<PathBuf>) -> GenerateConfigBuilder {
        GenerateConfigBuilder::new(out_dir)
    }
}

/// Builder for GenerateConfig
#[derive(Debug)]
pub struct GenerateConfigBuilder {
    out_dir: PathBuf,
    dialects: Vec<Dialect>,
    write_source: bool,
}

impl GenerateConfigBuilder {
    /// Create a new builder writing into `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            dialects: Dialect::ALL.to_vec(),
            write_source: true,
        }
    }

    /// Restrict DDL output to the given dialects
    pub fn dialects(mut self, dialects: impl IntoIterator<Item = Dialect>) -> Self {
        self.dialects = dialects.into_iter().collect();
        self
    }

    /// Enable or disable the generated source artifact (default: true)
    pub fn write_source(mut self, enabled: bool) -> Self {
        self.write_source = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> GenerateConfig {
        GenerateConfig {
            out_dir: self.out_dir,
            dialects: self.dialects,
            write_source: self.write_source,
        }
    }
}

/// Configuration for a named data source
#[derive(Debug, Clone)]
pub struct DataSourceConfig {
    /// Registry name (default: "default")
    pub name: String,
    /// Database URL, e.g. `sqlite::memory:` or `sqlite://app.db`
    pub database_url: String,
    /// Maximum pooled connections (default: 5)
    pub max_connections: u32,
}

impl DataSourceConfig {
    /// Create a new configuration builder
    pub fn builder(database_url: impl Into<String>) -> DataSourceConfigBuilder {
        DataSourceConfigBuilder::new(database_url)
    }
}

/// Builder for DataSourceConfig
#[derive(Debug)]
pub struct DataSourceConfigBuilder {
    name: String,
    database_url: String,
    max_connections: u32,
}

impl DataSourceConfigBuilder {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            name: crate::datasource::DEFAULT_SOURCE.to_string(),
            database_url: database_url.into(),
            max_connections: 5,
        }
    }

    /// Set the registry name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the pool size. In-memory SQLite needs 1, every connection is its own database.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn build(self) -> DataSourceConfig {
        DataSourceConfig {
            name: self.name,
            database_url: self.database_url,
            max_connections: self.max_connections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // GenerateConfig Tests
    // =========================================================================

    #[test]
    fn test_default_generate_config() {
        let config = GenerateConfig::builder("gen").build();

        assert_eq!(config.out_dir, PathBuf::from("gen"));
        assert_eq!(config.dialects, Dialect::ALL.to_vec());
        assert!(config.write_source);
    }

    #[test]
    fn test_generate_config_overrides() {
        let config = GenerateConfig::builder("out")
            .dialects([Dialect::Sqlite])
            .write_source(false)
            .build();

        assert_eq!(config.dialects, vec![Dialect::Sqlite]);
        assert!(!config.write_source);
    }

    // =========================================================================
    // DataSourceConfig Tests
    // =========================================================================

    #[test]
    fn test_default_data_source_config() {
        let config = DataSourceConfig::builder("sqlite::memory:").build();

        assert_eq!(config.name, "default");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_data_source_config_overrides() {
        let config = DataSourceConfig::builder(String::from("sqlite://app.db"))
            .name("reporting")
            .max_connections(1)
            .build();

        assert_eq!(config.name, "reporting");
        assert_eq!(config.max_connections, 1);
    }
}

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::query_planner::PlannerOptions;
use crate::source_db::connection_pool::PoolConfig;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Converter configuration with validation
///
/// Exactly one source must be given: a database URL or a YAML fixture.
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
#[validate(schema(function = "validate_source"))]
pub struct ConverterConfig {
    /// Source connection string, credentials included
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub database_url: Option<String>,

    /// YAML fixture used instead of a live database
    pub fixture: Option<PathBuf>,

    /// Only introspect tables of this schema
    pub schema: Option<String>,

    /// Tables (and partitions) fetched concurrently
    #[validate(range(
        min = 1,
        max = 1024,
        message = "Parallelism must be between 1 and 1024"
    ))]
    pub parallelism: usize,

    /// Rows per fetch before a table is partitioned
    #[validate(range(min = 1, message = "Fetch size must be at least 1"))]
    pub fetch_size: u64,

    #[validate(range(
        min = 1,
        max = 256,
        message = "Max connections must be between 1 and 256"
    ))]
    pub max_connections: u32,

    #[validate(range(min = 1, message = "Connect timeout must be at least 1 second"))]
    pub connect_timeout_secs: u64,

    /// Output file; stdout when unset
    pub output: Option<PathBuf>,

    pub pretty: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            fixture: None,
            schema: None,
            parallelism: 4,
            fetch_size: 10_000,
            max_connections: 8,
            connect_timeout_secs: 30,
            output: None,
            pretty: false,
        }
    }
}

fn validate_source(config: &ConverterConfig) -> Result<(), ValidationError> {
    match (&config.database_url, &config.fixture) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        (None, None) => Err(ValidationError::new("missing_source")
            .with_message("Either a database URL or a fixture file is required".into())),
        (Some(_), Some(_)) => Err(ValidationError::new("conflicting_sources")
            .with_message("A database URL and a fixture file are mutually exclusive".into())),
    }
}

impl ConverterConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read_yaml_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Layer the sources: YAML file (or defaults), then environment, then CLI.
    pub fn load(config_file: Option<&Path>, cli: CliConfig) -> Result<Self, ConfigError> {
        let mut config = match config_file {
            Some(path) => Self::read_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.merge(cli);
        config.validate()?;
        Ok(config)
    }

    /// Override with explicitly given CLI values
    pub fn merge(&mut self, cli: CliConfig) {
        if let Some(url) = cli.database_url {
            self.database_url = Some(url);
            self.fixture = None;
        }
        if let Some(fixture) = cli.fixture {
            self.fixture = Some(fixture);
            self.database_url = None;
        }
        if cli.schema.is_some() {
            self.schema = cli.schema;
        }
        if let Some(parallelism) = cli.parallelism {
            self.parallelism = parallelism;
        }
        if let Some(fetch_size) = cli.fetch_size {
            self.fetch_size = fetch_size;
        }
        if let Some(max_connections) = cli.max_connections {
            self.max_connections = max_connections;
        }
        if cli.output.is_some() {
            self.output = cli.output;
        }
        self.pretty |= cli.pretty;
    }

    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            parallelism: self.parallelism,
            fetch_size: self.fetch_size,
        }
    }

    /// Pool settings, when a database URL is configured
    pub fn pool_config(&self) -> Option<PoolConfig> {
        self.database_url.as_ref().map(|url| PoolConfig {
            database_url: url.clone(),
            max_connections: self.max_connections,
            connect_timeout_secs: self.connect_timeout_secs,
        })
    }

    fn read_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // RELGRAPH_DATABASE_URL replaces a configured fixture, the same way
        // the CLI does. The generic DATABASE_URL only fills in a missing source.
        if let Ok(url) = env::var("RELGRAPH_DATABASE_URL") {
            self.database_url = Some(url);
            self.fixture = None;
        } else if let Ok(url) = env::var("DATABASE_URL") {
            match &self.fixture {
                Some(fixture) => log::info!(
                    "DATABASE_URL ignored, fixture {} is configured",
                    fixture.display()
                ),
                None => self.database_url = Some(url),
            }
        }
        if let Ok(schema) = env::var("RELGRAPH_SCHEMA") {
            self.schema = Some(schema);
        }
        if let Some(v) = parse_env_var("RELGRAPH_PARALLELISM")? {
            self.parallelism = v;
        }
        if let Some(v) = parse_env_var("RELGRAPH_FETCH_SIZE")? {
            self.fetch_size = v;
        }
        if let Some(v) = parse_env_var("RELGRAPH_MAX_CONNECTIONS")? {
            self.max_connections = v;
        }
        if let Some(v) = parse_env_var("RELGRAPH_CONNECT_TIMEOUT_SECS")? {
            self.connect_timeout_secs = v;
        }
        Ok(())
    }
}

/// CLI configuration (parsed from command line arguments). `None` leaves the
/// lower layers untouched.
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub database_url: Option<String>,
    pub fixture: Option<PathBuf>,
    pub schema: Option<String>,
    pub parallelism: Option<usize>,
    pub fetch_size: Option<u64>,
    pub max_connections: Option<u32>,
    pub output: Option<PathBuf>,
    pub pretty: bool,
}

/// Parse an environment variable if it is set
fn parse_env_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Ok(value) = env::var(key) else {
        return Ok(None);
    };
    value.parse().map(Some).map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

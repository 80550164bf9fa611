use crate::Result;
use crate::graph::{EdgeLimits, GeneratorSettings};
use crate::ingest::{IngestSettings, StoreSettings, is_valid_keyspace};
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Configuration file looked up in the current directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "depsnap.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Candidate packages generated per snapshot
    #[serde(default = "default_package_pool_size")]
    pub package_pool_size: usize,

    /// Exclusive bound on runtime edges per dependency
    #[serde(default = "default_max_runtime_edges")]
    pub max_runtime_edges: usize,

    /// Exclusive bound on development edges per dependency
    #[serde(default = "default_max_development_edges")]
    pub max_development_edges: usize,

    #[serde(default = "default_ref", rename = "ref")]
    pub git_ref: String,

    #[serde(default = "default_blob_host")]
    pub blob_host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    #[serde(default = "default_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

const fn default_package_pool_size() -> usize {
    10_000
}

const fn default_max_runtime_edges() -> usize {
    20
}

const fn default_max_development_edges() -> usize {
    10
}

fn default_ref() -> String {
    "refs/heads/main".to_string()
}

fn default_blob_host() -> String {
    "https://foobar.azure.net".to_string()
}

fn default_nodes() -> Vec<String> {
    vec!["127.0.0.1:9042".to_string()]
}

fn default_keyspace() -> String {
    "depsnap".to_string()
}

const fn default_replication_factor() -> u32 {
    1
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_max_concurrency() -> usize {
    8
}

const fn default_batch_size() -> usize {
    200
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            package_pool_size: default_package_pool_size(),
            max_runtime_edges: default_max_runtime_edges(),
            max_development_edges: default_max_development_edges(),
            git_ref: default_ref(),
            blob_host: default_blob_host(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            keyspace: default_keyspace(),
            replication_factor: default_replication_factor(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            batch_size: default_batch_size(),
        }
    }
}

impl GeneratorConfig {
    #[must_use]
    pub fn settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            package_pool_size: self.package_pool_size,
            edge_limits: EdgeLimits {
                max_runtime: self.max_runtime_edges,
                max_development: self.max_development_edges,
            },
            git_ref: self.git_ref.clone(),
            blob_host: self.blob_host.clone(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn settings(&self) -> StoreSettings {
        StoreSettings {
            nodes: self.nodes.clone(),
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

impl IngestConfig {
    #[must_use]
    pub const fn settings(&self) -> IngestSettings {
        IngestSettings {
            max_concurrency: self.max_concurrency,
            batch_size: self.batch_size,
        }
    }
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `depsnap.toml` in the current directory is used when it
    /// exists.
    pub fn load(config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading depsnap configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = Utf8PathBuf::from(DEFAULT_CONFIG_FILE);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading depsnap configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.generator.package_pool_size == 0 {
            return Err(app_err!("generator.package_pool_size must be greater than 0"));
        }

        if self.store.nodes.is_empty() {
            return Err(app_err!("store.nodes must list at least one contact point"));
        }

        if !is_valid_keyspace(&self.store.keyspace) {
            return Err(app_err!(
                "store.keyspace must start with a letter and contain only letters, digits and underscores (at most 48), got '{}'",
                self.store.keyspace
            ));
        }

        if self.store.replication_factor == 0 {
            return Err(app_err!("store.replication_factor must be greater than 0"));
        }

        if self.ingest.max_concurrency == 0 {
            return Err(app_err!("ingest.max_concurrency must be greater than 0"));
        }

        if self.ingest.batch_size == 0 {
            return Err(app_err!("ingest.batch_size must be greater than 0"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}

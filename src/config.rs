//! Runtime configuration. Every field has a default so a partial TOML file,
//! or no file at all, is valid.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a configuration file when `--config` is absent.
pub const CONFIG_ENV: &str = "HRWSI_CONFIG";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub grid: GridConfig,
    pub query: QueryConfig,
    pub download: DownloadConfig,
}

/// Where the catalog lives. Credentials are resolved by the AWS provider
/// chain (environment or `profile`), never stored here.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub endpoint_url: String,
    pub bucket: String,
    pub region: String,
    pub profile: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "https://s3.WAW3-2.cloudferro.com".to_string(),
            bucket: "HRWSI".to_string(),
            region: "us-east-1".to_string(),
            profile: None,
        }
    }
}

/// Reference tile grid used to resolve geometries into tile identifiers.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub path: PathBuf,
    /// Attribute holding the tile name of each grid cell
    pub name_field: String,
    /// CRS of the grid when the file does not declare one
    pub epsg: u16,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("MGRS_tiles.geojson"),
            name_field: "Name".to_string(),
            epsg: 4326,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    /// Above this many products a query only warns
    pub max_results: usize,
    pub artifact_name: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_results: 500,
            artifact_name: "query_file.txt".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DownloadConfig {
    /// Above this many products a download refuses to start
    pub max_products: usize,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub result_dir: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_products: 500,
            max_attempts: 3,
            retry_delay_secs: 2,
            result_dir: "result".to_string(),
        }
    }
}

impl DownloadConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Reads `path`, else the file named by `HRWSI_CONFIG`, else the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => Self::read(PathBuf::from(path)),
                None => Ok(Self::default()),
            },
        }
    }
}

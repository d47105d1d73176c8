use std::collections::HashMap;
use std::env;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use config::{Config as HierarchicalConfig, Environment};
use pokedex_catalog::{
    CatalogClientConfig,
    DEFAULT_CATALOG_URL,
    DEFAULT_MAX_CONCURRENT_FETCHES,
    DEFAULT_PAGE_LIMIT,
    PageRequest,
    PipelineConfig,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of pokedex managed directories (config, data, cache)
const POKEDEX_DIR_NAME: &str = "pokedex";
const POKEDEX_CONFIG_FILE: &str = "pokedex.toml";
pub const POKEDEX_CONFIG_DIR_VAR: &str = "POKEDEX_CONFIG_DIR";
const POKEDEX_ENV_PREFIX: &str = "POKEDEX_";

/// Settings of the pokedex cli
///
/// Read from (later sources take precedence):
///
/// 1. built in defaults
/// 2. `/etc/pokedex/pokedex.toml`
/// 3. `pokedex.toml` in the config directory
/// 4. `POKEDEX_*` environment variables
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Base url of the catalog service
    pub catalog_url: String,
    /// Offset of the first catalog entry to fetch
    pub page_offset: u32,
    /// Number of catalog entries to fetch
    pub page_limit: NonZeroU32,
    /// Upper bound for detail requests in flight
    pub max_concurrent_fetches: NonZeroUsize,
    /// Value of the `User-Agent` header
    pub user_agent: Option<String>,
    /// Directory holding `pokedex.toml`.
    /// Only settable through `$POKEDEX_CONFIG_DIR`.
    pub config_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            page_offset: 0,
            page_limit: DEFAULT_PAGE_LIMIT,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            user_agent: None,
            config_dir: PathBuf::new(),
        }
    }
}

impl Config {
    /// Creates a [Config] from the environment and config files
    pub fn parse() -> Result<Config> {
        let config_dir = match env::var(POKEDEX_CONFIG_DIR_VAR) {
            Ok(v) => {
                debug!("`${POKEDEX_CONFIG_DIR_VAR}` set: {v}");
                PathBuf::from(v)
            },
            Err(_) => {
                let config_dir = dirs::config_dir()
                    .ok_or_else(|| anyhow!("Could not determine the user config directory"))?
                    .join(POKEDEX_DIR_NAME);
                debug!("`${POKEDEX_CONFIG_DIR_VAR}` not set, using {config_dir:?}");
                config_dir
            },
        };

        let envs = env::vars()
            .filter_map(|(k, v)| {
                k.strip_prefix(POKEDEX_ENV_PREFIX)
                    .map(|k| (k.to_owned(), v))
            })
            .collect();

        Self::load(&PathBuf::from("/etc").join(POKEDEX_DIR_NAME), &config_dir, envs)
    }

    /// Read the config from the given locations and prefix stripped variables
    fn load(
        system_dir: &Path,
        config_dir: &Path,
        envs: HashMap<String, String>,
    ) -> Result<Config> {
        let config_dir_str = config_dir
            .to_str()
            .context("Config directory is not valid unicode")?;

        let builder = HierarchicalConfig::builder()
            .set_default("catalog_url", DEFAULT_CATALOG_URL)?
            .set_default("page_offset", 0)?
            .set_default("page_limit", i64::from(DEFAULT_PAGE_LIMIT.get()))?
            .set_default(
                "max_concurrent_fetches",
                DEFAULT_MAX_CONCURRENT_FETCHES.get() as i64,
            )?
            // the config file cannot change the config dir
            .set_override("config_dir", config_dir_str)?
            .add_source(
                config::File::from(system_dir.join(POKEDEX_CONFIG_FILE))
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::File::from(config_dir.join(POKEDEX_CONFIG_FILE))
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::default().source(Some(envs)).try_parsing(true));

        builder
            .build()?
            .try_deserialize()
            .context("Could not parse config")
    }

    pub fn catalog_client_config(&self) -> CatalogClientConfig {
        CatalogClientConfig {
            catalog_url: self.catalog_url.clone(),
            user_agent: self.user_agent.clone(),
            ..Default::default()
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            page: self.page_request(),
            max_concurrent_fetches: self.max_concurrent_fetches,
        }
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page_offset, self.page_limit)
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use vodkit_model::IntegrationType;

use super::AppConfig;

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["vodkit.toml", "config/vodkit.toml"];

/// Environment overrides, gathered once per load.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub integration: Option<String>,
    pub storage_prefix: Option<String>,
    pub sandbox: Option<bool>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: std::env::var("VODKIT_CONFIG").ok().map(PathBuf::from),
            integration: std::env::var("VODKIT_INTEGRATION").ok(),
            storage_prefix: std::env::var("VODKIT_STORAGE_PREFIX").ok(),
            sandbox: parse_bool_var("VODKIT_SANDBOX"),
        }
    }
}

fn parse_bool_var(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|raw| parse_bool(&raw))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: AppConfig,
    /// File the configuration was read from, if any.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Load `.env`, then the configuration file, then apply environment
    /// overrides.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };
        debug!(env_file_loaded, "environment prepared");

        self.load_with_env(EnvConfig::gather())
    }

    /// Same as [`load`](Self::load) with explicit overrides and no `.env`.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, path) = self.load_file_config(&env)?;
        let config = compose(file_config.unwrap_or_default(), &env)?;
        validate(&config)?;

        info!(
            integration = ?config.integration,
            prefix = %config.storage_prefix,
            path = ?path,
            "configuration loaded"
        );
        Ok(ConfigLoad { config, path })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<AppConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self.config_path.clone().or(env.config_path.clone());

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let config = read_config(&path)?;
        Ok((Some(config), Some(path)))
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn compose(
    mut config: AppConfig,
    env: &EnvConfig,
) -> Result<AppConfig, ConfigLoadError> {
    if let Some(raw) = env.integration.as_deref() {
        config.integration = match raw.trim() {
            "" | "none" => None,
            value => Some(
                value
                    .parse::<IntegrationType>()
                    .map_err(ConfigLoadError::Invalid)?,
            ),
        };
    }

    if let Some(prefix) = env.storage_prefix.clone() {
        config.storage_prefix = prefix;
    }

    if let Some(sandbox) = env.sandbox {
        if let Some(cleeng) = config.integrations.cleeng.as_mut() {
            cleeng.use_sandbox = sandbox;
        }
        if let Some(inplayer) = config.integrations.inplayer.as_mut() {
            inplayer.use_sandbox = sandbox;
        }
    }

    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), ConfigLoadError> {
    if config.storage_prefix.trim().is_empty() {
        return Err(ConfigLoadError::Invalid(
            "storage_prefix must not be empty".into(),
        ));
    }
    if config.favorites.max_count == 0 || config.watch_history.max_count == 0 {
        return Err(ConfigLoadError::Invalid(
            "shelf max_count must be positive".into(),
        ));
    }

    match config.integration {
        Some(IntegrationType::Cleeng) => match &config.integrations.cleeng {
            Some(cleeng) if !cleeng.publisher_id.is_empty() => Ok(()),
            _ => Err(ConfigLoadError::Invalid(
                "cleeng integration selected without integrations.cleeng.publisher_id"
                    .into(),
            )),
        },
        Some(IntegrationType::InPlayer) => {
            match &config.integrations.inplayer {
                Some(inplayer) if !inplayer.client_id.is_empty() => Ok(()),
                _ => Err(ConfigLoadError::Invalid(
                    "inplayer integration selected without integrations.inplayer.client_id"
                        .into(),
                )),
            }
        }
        None => Ok(()),
    }
}

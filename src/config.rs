// ABOUTME: Configuration management for the TAL login client
// ABOUTME: Resolves platform endpoints from defaults, a YAML file, .env and environment variables

use dialoguer::{theme::ColorfulTheme, Input, Select};
use dotenv::dotenv;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::error::AppError;

pub const PASSPORT_API_BASE: &str = "https://passport.100tal.com";
pub const COURSE_API_BASE_LEDU: &str = "https://course-api-online.saasp.vdyoo.com";
pub const COURSE_API_BASE_XES: &str = "https://course-api-online.speiyou.com";
pub const CLIENT_ID_LEDU: &str = "523601";
pub const CLIENT_ID_XES: &str = "123601";
pub const DEVICE_ID: &str = "TAL";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_PLATFORM: &str = "TAL_PLATFORM";
pub const ENV_PASSPORT_URL: &str = "TAL_PASSPORT_URL";
pub const ENV_COURSE_URL: &str = "TAL_COURSE_URL";
pub const ENV_CLIENT_ID: &str = "TAL_CLIENT_ID";
pub const ENV_DEVICE_ID: &str = "TAL_DEVICE_ID";
pub const ENV_TIMEOUT_SECS: &str = "TAL_TIMEOUT_SECS";
pub const ENV_USERNAME: &str = "TAL_USERNAME";
pub const ENV_PASSWORD: &str = "TAL_PASSWORD";

const CONFIG_DIR_NAME: &str = "tal-login";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Course platform the account belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Ledu,
    Xes,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Ledu, Platform::Xes];

    pub fn course_api_base(self) -> &'static str {
        match self {
            Platform::Ledu => COURSE_API_BASE_LEDU,
            Platform::Xes => COURSE_API_BASE_XES,
        }
    }

    pub fn client_id(self) -> &'static str {
        match self {
            Platform::Ledu => CLIENT_ID_LEDU,
            Platform::Xes => CLIENT_ID_XES,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Ledu => "乐读 (Ledu)",
            Platform::Xes => "学而思培优 (Xueersi Peiyou)",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Platform::Ledu => "ledu",
            Platform::Xes => "xes",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ledu" => Ok(Platform::Ledu),
            "xes" => Ok(Platform::Xes),
            other => Err(ConfigError::UnknownPlatform(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub platform: Platform,
    pub passport_base: String,
    pub course_base: String,
    pub client_id: String,
    pub device_id: String,
    pub timeout_secs: u64,
}

/// Optional settings, as stored in the YAML file or collected from the environment.
///
/// Never holds credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown platform '{0}' (expected 'ledu' or 'xes')")]
    UnknownPlatform(String),

    #[error("Invalid integer value for environment variable {0}: {1}")]
    InvalidInteger(String, #[source] std::num::ParseIntError),

    #[error("Timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Could not determine the user configuration directory")]
    NoConfigDir,

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to write config file {0}: {1}")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Invalid config file {0}: {1}")]
    Yaml(PathBuf, #[source] serde_yaml::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("Setup prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl Default for Config {
    fn default() -> Self {
        Self::for_platform(Platform::default())
    }
}

impl Config {
    /// Built-in endpoints and identifiers for a platform
    pub fn for_platform(platform: Platform) -> Self {
        Config {
            platform,
            passport_base: PASSPORT_API_BASE.to_string(),
            course_base: platform.course_api_base().to_string(),
            client_id: platform.client_id().to_string(),
            device_id: DEVICE_ID.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Point both the passport and course APIs at a single base URL.
    ///
    /// Used to aim the client at a local mock server.
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        let base_url = base_url.into();
        Config {
            passport_base: base_url.clone(),
            course_base: base_url,
            ..Self::default()
        }
    }

    /// Load configuration from the config file, .env and environment variables
    ///
    /// An explicit platform (from the command line) beats every other source.
    pub fn load(platform: Option<Platform>) -> Result<Self, AppError> {
        let path = Self::get_config_file_path().ok();
        Self::load_from(path.as_deref(), platform, true).map_err(AppError::Config)
    }

    /// Load configuration from an optional file path, with option to skip dotenv
    pub fn load_from(
        path: Option<&Path>,
        platform: Option<Platform>,
        use_dotenv: bool,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => Self::read_file(path)?.unwrap_or_default(),
            None => ConfigOverrides::default(),
        };

        load_dotenv(use_dotenv);
        let env_overrides = ConfigOverrides::from_env()?;

        let mut merged = file.merge(env_overrides);
        if platform.is_some() {
            merged.platform = platform;
        }
        Self::from_overrides(merged)
    }

    /// Load configuration from environment variables only
    pub fn from_env_with_dotenv(use_dotenv: bool) -> Result<Self, ConfigError> {
        Self::load_from(None, None, use_dotenv)
    }

    /// Build a config from platform defaults with overrides applied on top
    pub fn from_overrides(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let platform = overrides.platform.unwrap_or_default();
        let defaults = Self::for_platform(platform);

        let timeout_secs = overrides.timeout_secs.unwrap_or(defaults.timeout_secs);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let config = Config {
            platform,
            passport_base: overrides
                .passport_url
                .map(|url| trim_base(&url))
                .unwrap_or(defaults.passport_base),
            course_base: overrides
                .course_url
                .map(|url| trim_base(&url))
                .unwrap_or(defaults.course_base),
            client_id: overrides.client_id.unwrap_or(defaults.client_id),
            device_id: overrides.device_id.unwrap_or(defaults.device_id),
            timeout_secs,
        };

        debug!(
            "Configuration resolved for platform {} (course API {})",
            config.platform, config.course_base
        );
        Ok(config)
    }

    /// Default location of the YAML config file
    pub fn get_config_file_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Read the YAML config file, returning `None` when it does not exist
    pub fn read_file(path: &Path) -> Result<Option<ConfigOverrides>, ConfigError> {
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Ok(None);
        }

        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        if contents.trim().is_empty() {
            return Ok(Some(ConfigOverrides::default()));
        }

        let overrides = serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::Yaml(path.to_path_buf(), e))?;
        debug!("Loaded config file from {}", path.display());
        Ok(Some(overrides))
    }

    /// Write settings to the YAML config file, creating parent directories
    pub fn save_file(path: &Path, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                debug!("Creating config directory: {}", parent.display());
                fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::Write(parent.to_path_buf(), e))?;
            }
        }

        let yaml = serde_yaml::to_string(overrides).map_err(ConfigError::Serialize)?;
        fs::write(path, yaml).map_err(|e| ConfigError::Write(path.to_path_buf(), e))?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Ask for platform and timeout interactively and save them to `path`
    pub fn interactive_setup(path: &Path) -> Result<Config, ConfigError> {
        let theme = ColorfulTheme::default();

        let names: Vec<&str> = Platform::ALL.iter().map(|p| p.display_name()).collect();
        let selected = Select::with_theme(&theme)
            .with_prompt("Platform")
            .items(&names)
            .default(0)
            .interact()?;
        let platform = Platform::ALL[selected];

        let timeout_secs: u64 = Input::with_theme(&theme)
            .with_prompt("Request timeout (seconds)")
            .default(DEFAULT_TIMEOUT_SECS)
            .validate_with(|value: &u64| {
                if *value == 0 {
                    Err("timeout must be greater than zero")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;

        let overrides = ConfigOverrides {
            platform: Some(platform),
            timeout_secs: Some(timeout_secs),
            ..ConfigOverrides::default()
        };
        Self::save_file(path, &overrides)?;
        Self::from_overrides(overrides)
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl ConfigOverrides {
    /// Collect overrides from `TAL_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let platform = match non_empty_env(ENV_PLATFORM) {
            Some(value) => Some(value.parse::<Platform>()?),
            None => None,
        };

        let timeout_secs = match non_empty_env(ENV_TIMEOUT_SECS) {
            Some(value) => Some(
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidInteger(ENV_TIMEOUT_SECS.to_string(), e))?,
            ),
            None => None,
        };

        Ok(ConfigOverrides {
            platform,
            passport_url: non_empty_env(ENV_PASSPORT_URL),
            course_url: non_empty_env(ENV_COURSE_URL),
            client_id: non_empty_env(ENV_CLIENT_ID),
            device_id: non_empty_env(ENV_DEVICE_ID),
            timeout_secs,
        })
    }

    /// Overlay `other` on top of `self`; values present in `other` win
    pub fn merge(self, other: ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            platform: other.platform.or(self.platform),
            passport_url: other.passport_url.or(self.passport_url),
            course_url: other.course_url.or(self.course_url),
            client_id: other.client_id.or(self.client_id),
            device_id: other.device_id.or(self.device_id),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }
}

/// Username and password from `TAL_USERNAME` / `TAL_PASSWORD`, when set
pub fn env_credentials() -> (Option<String>, Option<String>) {
    (non_empty_env(ENV_USERNAME), non_empty_env(ENV_PASSWORD))
}

fn load_dotenv(use_dotenv: bool) {
    // Check if dotenv is disabled via environment variable - useful for tests
    let dotenv_disabled = env::var("DOTENV_DISABLED").is_ok();

    if use_dotenv && !dotenv_disabled {
        match dotenv() {
            Ok(_) => debug!("Loaded configuration from .env file"),
            Err(_) => warn!("No .env file found, using environment variables only"),
        }
    } else if dotenv_disabled {
        debug!("Dotenv loading disabled by DOTENV_DISABLED environment variable");
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

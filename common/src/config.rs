// common/src/config.rs
use ::config::{Config as ConfigFile, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Central configuration for the dashboard gateway
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub web_server_addr: String,

    // External RSensorGrid backend
    pub backend: BackendConfig,

    // Realtime socket endpoint (ws:// or wss://)
    pub realtime_url: String,

    pub session: SessionConfig,

    // Static dashboard asset serving
    pub static_files: StaticFilesConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    /// Service API key sent as `x-api-key` on every backend call
    pub api_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Symmetric signing secret for session cookies.
    /// The default is for local development only.
    pub secret: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaticFilesConfig {
    pub path: String,
    pub index: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            backend: BackendConfig {
                base_url: "http://127.0.0.1:5000/api/v1".to_string(),
                api_key: "dev_api_key".to_string(),
            },
            realtime_url: "ws://127.0.0.1:5000".to_string(),
            session: SessionConfig {
                secret: "merke_dev_secret".to_string(),
            },
            static_files: StaticFilesConfig {
                path: "./static".to_string(),
                index: "index.html".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from environment variables directly (backward compatibility)
    pub fn from_env() -> Self {
        // Try to load from file first
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let defaults = Config::default();

                let web_server_addr =
                    env::var("WEB_SERVER_ADDR").unwrap_or(defaults.web_server_addr);

                let backend_base_url =
                    env::var("BACKEND_BASE_URL").unwrap_or(defaults.backend.base_url);

                let backend_api_key =
                    env::var("BACKEND_API_KEY").unwrap_or(defaults.backend.api_key);

                let realtime_url = env::var("REALTIME_URL").unwrap_or(defaults.realtime_url);

                let session_secret = env::var("SESSION_SECRET").unwrap_or(defaults.session.secret);

                let static_files_path =
                    env::var("STATIC_FILES_PATH").unwrap_or(defaults.static_files.path);

                let static_files_index =
                    env::var("STATIC_FILES_INDEX").unwrap_or(defaults.static_files.index);

                Self {
                    web_server_addr,
                    backend: BackendConfig {
                        base_url: backend_base_url,
                        api_key: backend_api_key,
                    },
                    realtime_url,
                    session: SessionConfig {
                        secret: session_secret,
                    },
                    static_files: StaticFilesConfig {
                        path: static_files_path,
                        index: static_files_index,
                    },
                }
            }
        }
    }
}

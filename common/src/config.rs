// common/src/config.rs
use config::{Config as ConfigFile, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Central configuration for the auth server and handshake client
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub auth_server_addr: String,
    /// Secret for signing session tokens
    pub jwt_secret: String,
    /// Canonical hosts a proof may bind itself to
    pub allowed_domains: Vec<String>,
    /// Optional file with one early-backer wallet address per line
    pub early_backers_path: Option<String>,

    pub handshake: HandshakeConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// Challenge lifetime; equals the client's rotation cadence
    pub challenge_ttl_secs: i64,
    /// Client-side challenge refresh interval
    pub refresh_interval_secs: u64,
    /// Accepted clock skew on proof timestamps
    pub max_skew_secs: i64,
    /// Inactivity TTL for issued sessions
    pub session_ttl_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_server_addr: "127.0.0.1:8081".to_string(),
            jwt_secret: "dev_secret".to_string(),
            allowed_domains: vec!["localhost:5173".to_string()],
            early_backers_path: None,

            handshake: HandshakeConfig {
                challenge_ttl_secs: 540,
                refresh_interval_secs: 540,
                max_skew_secs: 900,
                session_ttl_secs: 86400,
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
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
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let defaults = Config::default();

                let auth_server_addr = env::var("AUTH_SERVER_ADDR")
                    .unwrap_or(defaults.auth_server_addr);

                let jwt_secret = env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret);

                let allowed_domains = env::var("ALLOWED_DOMAINS")
                    .map(|v| {
                        v.split(',')
                            .map(|d| d.trim().to_string())
                            .filter(|d| !d.is_empty())
                            .collect()
                    })
                    .unwrap_or(defaults.allowed_domains);

                let early_backers_path = env::var("EARLY_BACKERS_PATH").ok();

                let challenge_ttl_secs = env::var("CHALLENGE_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(defaults.handshake.challenge_ttl_secs);

                let refresh_interval_secs = env::var("REFRESH_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(defaults.handshake.refresh_interval_secs);

                let max_skew_secs = env::var("MAX_SKEW_SECS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(defaults.handshake.max_skew_secs);

                let session_ttl_secs = env::var("SESSION_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(defaults.handshake.session_ttl_secs);

                Self {
                    auth_server_addr,
                    jwt_secret,
                    allowed_domains,
                    early_backers_path,
                    handshake: HandshakeConfig {
                        challenge_ttl_secs,
                        refresh_interval_secs,
                        max_skew_secs,
                        session_ttl_secs,
                    },
                }
            }
        }
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            environment: Environment::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// Deployment environment. Development responses carry internal error detail.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Email of the admin account created on first start
    pub admin_email: Option<String>,
    /// Password for the bootstrap admin account
    pub admin_password: Option<String>,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_session_cleanup_interval_secs")]
    pub session_cleanup_interval_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_email: None,
            admin_password: None,
            session_ttl_hours: default_session_ttl_hours(),
            session_cleanup_interval_secs: default_session_cleanup_interval_secs(),
        }
    }
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

fn default_session_cleanup_interval_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    /// JSON-RPC endpoint of the code execution service. Compilation is
    /// disabled when unset.
    pub endpoint: Option<String>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Delay between two submission status polls (default: 1000ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Number of status polls before giving up with a timeout (default: 30)
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    /// Language code -> numeric language id understood by the service
    #[serde(default = "default_languages")]
    pub languages: BTreeMap<String, u32>,
}

impl CompilerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolve a language code (case-insensitive) to the service's id
    pub fn language_id(&self, code: &str) -> Option<u32> {
        self.languages.get(&code.to_lowercase()).copied()
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            user: String::new(),
            password: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            languages: default_languages(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_poll_attempts() -> u32 {
    30
}

fn default_languages() -> BTreeMap<String, u32> {
    [
        ("c", 11),
        ("cpp", 1),
        ("java", 10),
        ("python", 4),
        ("python3", 116),
        ("ruby", 17),
        ("go", 114),
        ("javascript", 112),
    ]
    .into_iter()
    .map(|(code, id)| (code.to_string(), id))
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            compiler: CompilerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

//! Pipeline configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via IRODS_CONFIG or --config)
//! 3. Environment variables

use crate::negotiation::SslNegotiationPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default size of the output and copy buffers.
pub const DEFAULT_BUFFER_SIZE: i32 = 65535;

/// Default frame size for framed puts (4 MiB).
pub const DEFAULT_PUT_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Default reconnect interval (10 minutes).
pub const DEFAULT_RECONNECT_INTERVAL_MILLIS: u64 = 600_000;

/// Tunables captured by every connection when it is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfiguration {
    /// Read timeout in seconds. Zero disables it.
    pub socket_timeout_secs: u64,
    /// Per-attempt connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Number of connect attempts before giving up.
    pub connect_attempts: u32,
    /// Sleep between connect attempts in seconds.
    pub connect_retry_delay_secs: u64,
    /// Output accumulation buffer. Zero or less sends straight through.
    pub internal_cache_buffer_size: i32,
    /// Chunk size for streaming to and from the socket.
    pub copy_buffer_size: usize,
    /// Frame length for framed puts when the caller passes none.
    pub put_buffer_size: usize,
    pub encoding: String,
    /// Request restart mode and run the reconnection task.
    pub reconnect: bool,
    pub reconnect_interval_millis: u64,
    /// Flush after every header during PAM exchanges.
    pub force_pam_flush: bool,
    pub pam_time_to_live_secs: i32,
    pub negotiation_policy: SslNegotiationPolicy,
    pub tls: Option<TlsSettings>,
}

impl Default for PipelineConfiguration {
    fn default() -> Self {
        Self {
            socket_timeout_secs: 0,
            connect_timeout_secs: 10,
            connect_attempts: 3,
            connect_retry_delay_secs: 3,
            internal_cache_buffer_size: DEFAULT_BUFFER_SIZE,
            copy_buffer_size: DEFAULT_BUFFER_SIZE as usize,
            put_buffer_size: DEFAULT_PUT_BUFFER_SIZE,
            encoding: "utf-8".to_string(),
            reconnect: false,
            reconnect_interval_millis: DEFAULT_RECONNECT_INTERVAL_MILLIS,
            force_pam_flush: false,
            pam_time_to_live_secs: 0,
            negotiation_policy: SslNegotiationPolicy::NoNegotiation,
            tls: None,
        }
    }
}

impl PipelineConfiguration {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("IRODS_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: PipelineConfiguration = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Some(secs) = env_parse("IRODS_SOCKET_TIMEOUT") {
            self.socket_timeout_secs = secs;
        }
        if let Some(secs) = env_parse("IRODS_CONNECT_TIMEOUT") {
            self.connect_timeout_secs = secs;
        }
        if let Some(n) = env_parse("IRODS_CONNECT_ATTEMPTS") {
            self.connect_attempts = n;
        }
        if let Some(size) = env_parse("IRODS_OUTPUT_BUFFER_SIZE") {
            self.internal_cache_buffer_size = size;
        }
        if let Ok(flag) = std::env::var("IRODS_RECONNECT") {
            self.reconnect = parse_flag(&flag);
        }
        if let Some(ms) = env_parse("IRODS_RECONNECT_INTERVAL_MS") {
            self.reconnect_interval_millis = ms;
        }
        if let Ok(policy) = std::env::var("IRODS_NEGOTIATION_POLICY") {
            if let Ok(parsed) = policy.parse() {
                self.negotiation_policy = parsed;
            }
        }
        if let Ok(path) = std::env::var("IRODS_CA_CERT") {
            self.tls.get_or_insert_with(TlsSettings::default).ca_cert_path =
                Some(PathBuf::from(path));
        }
        if let Ok(flag) = std::env::var("IRODS_TLS_INSECURE") {
            self.tls.get_or_insert_with(TlsSettings::default).insecure = parse_flag(&flag);
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "connect_attempts must be at least 1".to_string(),
            ));
        }
        if self.copy_buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "copy_buffer_size must be positive".to_string(),
            ));
        }
        if !self.encoding.eq_ignore_ascii_case("utf-8") {
            return Err(ConfigError::ValidationError(format!(
                "unsupported encoding: {}",
                self.encoding
            )));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_connect_attempts(mut self, attempts: u32, delay: Duration) -> Self {
        self.connect_attempts = attempts.max(1);
        self.connect_retry_delay_secs = delay.as_secs();
        self
    }

    pub fn with_output_buffer_size(mut self, size: i32) -> Self {
        self.internal_cache_buffer_size = size;
        self
    }

    pub fn with_reconnect(mut self, interval: Duration) -> Self {
        self.reconnect = true;
        self.reconnect_interval_millis = interval.as_millis() as u64;
        self
    }

    pub fn with_negotiation_policy(mut self, policy: SslNegotiationPolicy) -> Self {
        self.negotiation_policy = policy;
        self
    }

    pub fn with_force_pam_flush(mut self, force: bool) -> Self {
        self.force_pam_flush = force;
        self
    }

    pub fn with_tls(mut self, tls: TlsSettings) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Read timeout, if any.
    pub fn socket_timeout(&self) -> Option<Duration> {
        (self.socket_timeout_secs > 0).then(|| Duration::from_secs(self.socket_timeout_secs))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_secs(self.connect_retry_delay_secs)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_millis)
    }
}

/// TLS settings used when a connection is upgraded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsSettings {
    /// Path to PEM-encoded CA certificate(s) for server verification.
    /// If None, the bundled web PKI roots are used.
    pub ca_cert_path: Option<PathBuf>,
    /// Skip server certificate verification (INSECURE - development only).
    pub insecure: bool,
    /// Server name for SNI (defaults to the account host).
    pub server_name: Option<String>,
}

impl TlsSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    pub fn with_insecure(mut self) -> Self {
        self.insecure = true;
        self
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {}", .0.display(), .1)]
    IoError(PathBuf, std::io::Error),

    #[error("failed to parse config file '{}': {}", .0.display(), .1)]
    ParseError(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

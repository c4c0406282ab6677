use crate::domain::AllowList;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Transport security for the upstream submission link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Implicit TLS from the first byte (port 465)
    Tls,
    /// Plain connection upgraded with STARTTLS (port 587)
    StartTls,
    /// No TLS at all; only for local relays and tests
    Plain,
}

/// Upstream SMTP submission endpoint used to check credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default = "default_smtp_security")]
    pub security: SmtpSecurity,

    /// Bound on connect plus authenticate, in seconds
    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u64,

    /// Name announced in EHLO
    #[serde(default = "default_helo_name")]
    pub helo_name: String,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_smtp_security() -> SmtpSecurity {
    SmtpSecurity::Tls
}

fn default_smtp_timeout() -> u64 {
    10
}

fn default_helo_name() -> String {
    "localhost".to_string()
}

impl Default for SmtpConfig {
    fn default() -> Self {
        SmtpConfig {
            host: default_smtp_host(),
            port: default_smtp_port(),
            security: default_smtp_security(),
            timeout_secs: default_smtp_timeout(),
            helo_name: default_helo_name(),
        }
    }
}

impl SmtpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Gateway configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen address; an IPv6 literal selects an IPv6 socket
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Shared secret for all RADIUS clients
    pub secret: String,

    /// Comma-separated list of accepted mail domains
    #[serde(default)]
    pub allowed_domains: String,

    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Audit log file path (JSON lines, optional)
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    1812
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            secret: "testing123".to_string(),
            allowed_domains: String::new(),
            smtp: SmtpConfig::default(),
            log_level: None,
            audit_log_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Socket address to bind
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr: IpAddr = self.listen_address.parse().map_err(|_| {
            ConfigError::Invalid(format!("Invalid IP address: {}", self.listen_address))
        })?;
        Ok(SocketAddr::new(addr, self.listen_port))
    }

    /// Parsed domain allow-list
    pub fn allow_list(&self) -> AllowList {
        AllowList::parse(&self.allowed_domains)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.listen_port == 0 {
            return Err(ConfigError::Invalid("Port cannot be 0".to_string()));
        }

        if self.secret.is_empty() {
            return Err(ConfigError::Invalid("Secret cannot be empty".to_string()));
        }

        if self.smtp.host.trim().is_empty() {
            return Err(ConfigError::Invalid("SMTP host cannot be empty".to_string()));
        }

        if self.smtp.port == 0 {
            return Err(ConfigError::Invalid("SMTP port cannot be 0".to_string()));
        }

        if self.smtp.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "SMTP timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }

    /// Example configuration written when none exists
    pub fn example() -> Self {
        Config {
            listen_address: "0.0.0.0".to_string(),
            listen_port: 1812,
            secret: "change-me".to_string(),
            allowed_domains: "example.com,example.org".to_string(),
            smtp: SmtpConfig::default(),
            log_level: Some("info".to_string()),
            audit_log_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen_port, 1812);
        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.smtp.security, SmtpSecurity::Tls);
        assert_eq!(config.smtp.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.secret = "".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.smtp.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.listen_address = "not-an-ip".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_socket_addr_family() {
        let mut config = Config::default();
        assert!(config.socket_addr().unwrap().is_ipv4());

        config.listen_address = "::1".to_string();
        let addr = config.socket_addr().unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 1812);
    }

    #[test]
    fn test_allow_list_parsing() {
        let mut config = Config::default();
        config.allowed_domains = " example.com, ,example.org ".to_string();
        assert_eq!(config.allow_list().domains(), ["example.com", "example.org"]);
    }

    #[test]
    fn test_from_file_minimal() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"secret": "s3cret", "allowed_domains": "example.com", "smtp": {{"security": "starttls", "port": 587}}}}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.secret, "s3cret");
        assert_eq!(config.listen_address, "0.0.0.0");
        assert_eq!(config.smtp.security, SmtpSecurity::StartTls);
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.smtp.host, "smtp.gmail.com");
    }

    #[test]
    fn test_from_file_missing_secret() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"allowed_domains": "example.com"}}"#).unwrap();
        assert!(matches!(Config::from_file(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_example_roundtrip_through_file() {
        let file = NamedTempFile::new().unwrap();
        Config::example().to_file(file.path()).unwrap();

        let loaded = Config::from_file(file.path()).unwrap();
        assert_eq!(loaded.allowed_domains, "example.com,example.org");
    }
}

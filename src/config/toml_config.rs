use crate::domain::model::{Auth, ConnectionOptions, StorageOptions};
use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub store: StoreSection,
    #[serde(default)]
    pub connection: ConnectionOptions,
    #[serde(default)]
    pub storage: StorageOptions,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    pub location: String,
    /// Size the cache is trimmed to by `reduce`.
    pub bytes_limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: Option<String>,
    pub verbose: Option<bool>,
}

const LOG_FORMATS: [&str; 2] = ["compact", "json"];

impl StoreConfig {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            store: StoreSection {
                location: location.into(),
                bytes_limit: None,
            },
            connection: ConnectionOptions::default(),
            storage: StorageOptions::default(),
            logging: None,
        }
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(StoreError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| StoreError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${HDFS_TOKEN})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| StoreError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn log_format(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .unwrap_or("compact")
    }

    pub fn verbose(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.verbose)
            .unwrap_or(false)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("store.location", &self.store.location)?;

        if let Some(limit) = self.store.bytes_limit {
            validation::validate_range("store.bytes_limit", limit, 1, u64::MAX)?;
        }

        if let Some(host) = &self.connection.host {
            validation::validate_host("connection.host", host)?;
        }

        if let Some(port) = self.connection.port {
            validation::validate_range("connection.port", port, 1, u16::MAX)?;
        }

        if let Some(user) = &self.connection.user {
            validation::validate_non_empty_string("connection.user", user)?;
        }

        if self.connection.token.is_some() && self.connection.ticket_cache.is_some() {
            tracing::warn!(
                "Both token and ticket_cache are set; the delegation token takes precedence"
            );
        }
        if let Auth::TicketCache(cache) = self.connection.auth() {
            validation::validate_path("connection.ticket_cache", cache)?;
        }

        let format = self.log_format();
        if !LOG_FORMATS.contains(&format) {
            return Err(StoreError::InvalidConfigValueError {
                field: "logging.format".to_string(),
                value: format.to_string(),
                reason: format!("Unsupported format. Valid formats: {}", LOG_FORMATS.join(", ")),
            });
        }

        Ok(())
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[store]
location = "/data"
bytes_limit = 1048576

[connection]
host = "namenode.example.com"
port = 9870
user = "alice"
connect = false

[connection.pars]
doas = "etl"

[storage]
compress = true
mmap_mode = "r"

[logging]
format = "json"
"#;

        let config = StoreConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.store.location, "/data");
        assert_eq!(config.store.bytes_limit, Some(1048576));
        assert_eq!(config.connection.host.as_deref(), Some("namenode.example.com"));
        assert_eq!(config.connection.port, Some(9870));
        assert!(!config.connection.connect);
        assert_eq!(config.connection.pars.get("doas").map(String::as_str), Some("etl"));
        assert!(config.storage.compress);
        assert_eq!(config.storage.mmap_mode.as_deref(), Some("r"));
        assert_eq!(config.log_format(), "json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = StoreConfig::from_toml_str("[store]\nlocation = \"cache\"\n").unwrap();

        assert!(config.connection.connect);
        assert!(config.connection.host.is_none());
        assert!(!config.storage.compress);
        assert!(config.storage.mmap_mode.is_none());
        assert_eq!(config.log_format(), "compact");
        assert!(!config.verbose());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("HDFS_STORE_TEST_TOKEN", "dt-from-env");

        let toml_content = r#"
[store]
location = "/data"

[connection]
token = "${HDFS_STORE_TEST_TOKEN}"
user = "${HDFS_STORE_TEST_UNSET_USER}"
"#;

        let config = StoreConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.connection.token.as_deref(), Some("dt-from-env"));
        assert_eq!(
            config.connection.user.as_deref(),
            Some("${HDFS_STORE_TEST_UNSET_USER}")
        );

        std::env::remove_var("HDFS_STORE_TEST_TOKEN");
    }

    #[test]
    fn test_debug_output_hides_token() {
        let mut config = StoreConfig::new("/data");
        config.connection.token = Some("dt-SECRET-123".to_string());

        let rendered = format!("{:?}", config);
        assert!(rendered.contains("/data"));
        assert!(!rendered.contains("dt-SECRET-123"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = StoreConfig::new("/data");
        assert!(config.validate().is_ok());

        config.connection.host = Some("http://namenode:9870".to_string());
        assert!(config.validate().is_err());

        config.connection.host = Some("namenode".to_string());
        config.connection.port = Some(0);
        assert!(config.validate().is_err());

        config.connection.port = Some(9870);
        config.logging = Some(LoggingConfig {
            format: Some("xml".to_string()),
            verbose: None,
        });
        assert!(config.validate().is_err());

        assert!(StoreConfig::new("").validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = StoreConfig::from_toml_str("[store\nlocation = ");
        assert!(matches!(result, Err(StoreError::ConfigError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[store]
location = "/warehouse/cache"

[connection]
host = "10.1.2.3"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = StoreConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.store.location, "/warehouse/cache");
        assert_eq!(config.connection.host.as_deref(), Some("10.1.2.3"));
    }
}

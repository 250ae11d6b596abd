use std::env;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_DESCRIPTOR_NAME: &str = "pom.xml";
pub const DEFAULT_CENTRAL_URL: &str = "https://repo1.maven.org/maven2/";
pub const DEFAULT_TEST_PLUGIN: &str = "maven-surefire-plugin";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_MODULE_DEPTH: usize = 64;
const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 4_194_304; // 4MB

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone)]
pub struct PomtreeConfig {
    pub descriptor_name: String,
    pub central_url: String,
    pub test_plugin: String,
    pub max_module_depth: usize,
    pub max_file_size_bytes: usize,
    pub log_level: String,
}

impl Default for PomtreeConfig {
    fn default() -> Self {
        let descriptor_name = env::var("POMTREE_DESCRIPTOR_NAME")
            .unwrap_or_else(|_| DEFAULT_DESCRIPTOR_NAME.to_string());

        let central_url =
            env::var("POMTREE_CENTRAL_URL").unwrap_or_else(|_| DEFAULT_CENTRAL_URL.to_string());

        let test_plugin =
            env::var("POMTREE_TEST_PLUGIN").unwrap_or_else(|_| DEFAULT_TEST_PLUGIN.to_string());

        let max_module_depth = env::var("POMTREE_MAX_MODULE_DEPTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_MODULE_DEPTH);

        let max_file_size_bytes = env::var("POMTREE_MAX_FILE_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_BYTES);

        let log_level = env::var("POMTREE_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            descriptor_name,
            central_url,
            test_plugin,
            max_module_depth,
            max_file_size_bytes,
            log_level,
        }
    }
}

impl PomtreeConfig {
    /// Reads the environment and rejects values the builder cannot run with.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(raw) = env::var("POMTREE_MAX_MODULE_DEPTH") {
            raw.parse::<usize>().map_err(|e| ConfigError::ParseError {
                field: "POMTREE_MAX_MODULE_DEPTH".to_string(),
                error: e.to_string(),
            })?;
        }
        if let Ok(raw) = env::var("POMTREE_MAX_FILE_SIZE") {
            raw.parse::<usize>().map_err(|e| ConfigError::ParseError {
                field: "POMTREE_MAX_FILE_SIZE".to_string(),
                error: e.to_string(),
            })?;
        }

        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.descriptor_name.trim();
        if name.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Descriptor name cannot be empty".to_string(),
            ));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(ConfigError::ValidationFailed(format!(
                "Descriptor name must be a plain file name: {}",
                self.descriptor_name
            )));
        }

        if !(self.central_url.starts_with("http://") || self.central_url.starts_with("https://"))
        {
            return Err(ConfigError::ValidationFailed(format!(
                "Central repository URL must be http(s): {}",
                self.central_url
            )));
        }

        if self.test_plugin.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Test plugin artifact cannot be empty".to_string(),
            ));
        }

        if self.max_module_depth == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max module depth must be at least 1".to_string(),
            ));
        }
        if self.max_module_depth > 1024 {
            return Err(ConfigError::ValidationFailed(
                "Max module depth cannot exceed 1024".to_string(),
            ));
        }

        if self.max_file_size_bytes < 1024 {
            return Err(ConfigError::ValidationFailed(
                "Max file size must be at least 1KB".to_string(),
            ));
        }
        if self.max_file_size_bytes > 67_108_864 {
            return Err(ConfigError::ValidationFailed(
                "Max file size cannot exceed 64MB".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Central repository URL with the trailing slash every repository entry carries.
    pub fn central_repository(&self) -> String {
        if self.central_url.ends_with('/') {
            self.central_url.clone()
        } else {
            format!("{}/", self.central_url)
        }
    }

    pub fn to_display_map(&self) -> std::collections::BTreeMap<String, String> {
        let mut map = std::collections::BTreeMap::new();

        map.insert("descriptor_name".to_string(), self.descriptor_name.clone());
        map.insert("central_url".to_string(), self.central_url.clone());
        map.insert("test_plugin".to_string(), self.test_plugin.clone());
        map.insert(
            "max_module_depth".to_string(),
            self.max_module_depth.to_string(),
        );
        map.insert(
            "max_file_size_bytes".to_string(),
            self.max_file_size_bytes.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for PomtreeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pomtree Configuration:")?;
        writeln!(f, "  Descriptor Name: {}", self.descriptor_name)?;
        writeln!(f, "  Central Repository: {}", self.central_url)?;
        writeln!(f, "  Test Plugin: {}", self.test_plugin)?;
        writeln!(f, "  Max Module Depth: {}", self.max_module_depth)?;
        writeln!(f, "  Max File Size: {} bytes", self.max_file_size_bytes)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

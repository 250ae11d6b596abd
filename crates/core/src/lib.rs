//! Shared plumbing for pomtree: filesystem access, configuration and logging.

pub mod config;
pub mod fs;
pub mod logging;

pub use config::{ConfigError, PomtreeConfig};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use logging::{config_from_env, init_logging, LoggingConfig};

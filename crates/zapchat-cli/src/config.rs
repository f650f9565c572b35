//! CLI configuration loaded from environment variables.
//!
//! Everything has a default so the shell starts with zero configuration.

use std::path::PathBuf;

/// Shell configuration.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Store directory override.
    /// Env: `ZAPCHAT_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Email to sign in as on startup.
    /// Env: `ZAPCHAT_EMAIL`
    /// Default: none (start signed out).
    pub auto_login: Option<String>,
}

impl CliConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("ZAPCHAT_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(email) = std::env::var("ZAPCHAT_EMAIL") {
            if !email.is_empty() {
                config.auto_login = Some(email);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.data_dir.is_none());
        assert!(config.auto_login.is_none());
    }
}

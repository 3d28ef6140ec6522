// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Configuration file layout.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString, EnumVariantNames, IntoStaticStr};
use url::Url;

/// Default location of the configuration file, before tilde expansion.
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/settee/settee.toml";

/// Prefix for environment variable overrides, e.g.
/// `SETTEE__CLOUDANT__PASSWORD=abc`.
pub const ENV_PREFIX: &str = "SETTEE_";

/// Placeholder printed instead of secrets.
const REDACTED: &str = "********";

/// How command output is printed.
#[derive(AsRefStr, IntoStaticStr, EnumVariantNames, EnumString, Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    /// One compact JSON value per line.
    #[strum(serialize = "json")]
    Json,
    /// Indented JSON.
    #[strum(serialize = "pretty")]
    Pretty,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Pretty
    }
}

/// Used for the `config` subcommand and for connecting.
#[derive(Debug, Deserialize, Serialize)]
pub struct CompleteAppConfig {
    pub cloudant: CloudantConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CloudantConfig {
    /// Account or server URL, e.g. `https://account.cloudant.com`.
    pub url: Url,
    pub username: String,
    pub password: String,
    /// Request timeout in seconds.
    pub timeout: Option<u64>,
}

impl CompleteAppConfig {
    /// Copy of the config safe to print.
    pub fn redacted(&self) -> Self {
        let mut cloudant = self.cloudant.clone();
        cloudant.password = REDACTED.to_owned();
        Self { cloudant }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use config::{Config, File, FileFormat};

    use super::*;

    const FULL_CONFIG: &str = r#"
[cloudant]
url = "https://account.cloudant.com"
username = "account"
password = "hunter2"
timeout = 12
"#;

    const PARTIAL_CONFIG: &str = r#"
[cloudant]
url = "http://localhost:5984"
username = "admin"
password = "pass"
"#;

    fn load(contents: &str) -> CompleteAppConfig {
        let mut settings = Config::default();
        settings
            .merge(File::from_str(contents, FileFormat::Toml))
            .unwrap();
        settings.try_into().unwrap()
    }

    #[test]
    fn test_full_config() {
        let config = load(FULL_CONFIG);

        assert_eq!(config.cloudant.url.as_str(), "https://account.cloudant.com/");
        assert_eq!(config.cloudant.username, "account");
        assert_eq!(config.cloudant.password, "hunter2");
        assert_eq!(config.cloudant.timeout, Some(12));
    }

    #[test]
    fn test_partial_config() {
        let config = load(PARTIAL_CONFIG);

        assert_eq!(config.cloudant.url.host_str(), Some("localhost"));
        assert_eq!(config.cloudant.url.port(), Some(5984));
        assert!(config.cloudant.timeout.is_none());
    }

    #[test]
    fn test_override_with_set() {
        let mut settings = Config::default();
        settings
            .merge(File::from_str(PARTIAL_CONFIG, FileFormat::Toml))
            .unwrap();
        settings.set("cloudant.password", "so secret").unwrap();

        let config: CompleteAppConfig = settings.try_into().unwrap();
        assert_eq!(config.cloudant.password, "so secret");
    }

    #[test]
    fn test_missing_url() {
        let mut settings = Config::default();
        settings.set("cloudant.username", "admin").unwrap();
        settings.set("cloudant.password", "pass").unwrap();

        let error = settings
            .try_into::<CompleteAppConfig>()
            .expect_err("Expected error due to missing url");
        assert!(error.to_string().contains("url"));
    }

    #[test]
    fn test_redacted_hides_password() {
        let config = load(FULL_CONFIG).redacted();

        assert_eq!(config.cloudant.password, REDACTED);
        assert_eq!(config.cloudant.username, "account");
        let printed = toml::to_string(&config).unwrap();
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::default().as_ref(), "pretty");
        assert!(OutputFormat::from_str("yaml").is_err());
    }
}

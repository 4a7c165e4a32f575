use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::error::{Result, WidgetError};
use crate::types::{Position, WidgetVariant};

pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:8000/api/chat";
pub const DEFAULT_WELCOME_MESSAGE: &str = "Hello! How can I help you today?";

/// Immutable configuration for one embedded widget.
///
/// Built once at mount time from the page's options object. Field names are
/// camelCase so the in-page object deserializes verbatim; unset options fall
/// back to the defaults below and unknown options are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetConfig {
    /// Chat API the conversation exchange POSTs to.
    pub api_endpoint: String,
    /// Short display name shown in the header.
    pub bot_name: String,
    /// Long display name shown on the connect screen.
    pub full_bot_name: String,
    /// Page edge the trigger is anchored to.
    pub position: Position,
    /// First assistant turn in the classic variant.
    pub welcome_message: String,
    /// Widget flavour to mount.
    pub variant: WidgetVariant,
    /// Upper bound on one message round-trip, in seconds.
    pub request_timeout_secs: u64,
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,
    #[serde(flatten)]
    pub theme: ThemeConfig,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            bot_name: "Anti".to_string(),
            full_bot_name: "Antigravity".to_string(),
            position: Position::default(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            variant: WidgetVariant::default(),
            request_timeout_secs: 30,
            log_level: "info".to_string(),
            theme: ThemeConfig::default(),
        }
    }
}

/// Color theme. Opaque to the widget core; passed through to rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemeConfig {
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            primary_color: "#06d6a0".to_string(),
            secondary_color: "#118ab2".to_string(),
            accent_color: "#ef476f".to_string(),
        }
    }
}

impl WidgetConfig {
    /// Resolve the page's options object against the defaults.
    ///
    /// `null` (no options object on the page) yields the defaults.
    pub fn from_options(options: serde_json::Value) -> Result<Self> {
        let config: WidgetConfig = if options.is_null() {
            WidgetConfig::default()
        } else {
            serde_json::from_value(options)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse options given as a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: serde_json::Value = serde_json::from_str(json)?;
        Self::from_options(options)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WidgetConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Widget configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load widget config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Check the values that the core depends on.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_endpoint)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(WidgetError::Config(format!(
                "apiEndpoint must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(WidgetError::Config(
                "requestTimeoutSecs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

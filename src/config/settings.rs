use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::{ConfigError, ConfigResult};
use crate::bridge::{LoadTimeout, PageRequest};

/// Default base URL of the catalog REST API.
pub const DEFAULT_CATALOG_URL: &str = "https://api.music.apple.com/v1/";

const DEFAULT_APP_NAME: &str = "musicbridge";
const DEFAULT_LOG_LEVEL: &str = "info";

/// One layer of bridge settings.
///
/// Every field is optional so layers (defaults, user file, command line)
/// can be merged with [`merge_settings`](super::merge_settings).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSettings {
    pub developer_token: Option<String>,
    pub app_name: Option<String>,
    pub app_build: Option<String>,
    /// Origin the runtime page is served from. Must have a host.
    pub app_url: Option<String>,
    pub icon_url: Option<String>,
    pub load_timeout_secs: Option<u64>,
    pub enhanced_error_logging: Option<bool>,
    pub catalog_url: Option<String>,
    pub log_level: Option<String>,
}

impl BridgeSettings {
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load_from_path(path: &Path) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Build the page request for [`Bridge::load`](crate::bridge::Bridge::load).
    pub fn page_request(&self) -> ConfigResult<PageRequest> {
        let developer_token = self
            .developer_token
            .clone()
            .ok_or(ConfigError::MissingField("developer_token"))?;
        let app_url = self
            .app_url
            .as_deref()
            .ok_or(ConfigError::MissingField("app_url"))?;
        let base_url = parse_url("app_url", app_url)?;
        let icon_url = self
            .icon_url
            .as_deref()
            .map(|icon| parse_url("icon_url", icon))
            .transpose()?;

        Ok(PageRequest {
            developer_token,
            app_name: self
                .app_name
                .clone()
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            app_build: self
                .app_build
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            base_url,
            icon_url,
        })
    }

    /// Configured load timeout, or the default when unset. Out-of-range
    /// values are an error rather than clamped.
    pub fn load_timeout(&self) -> ConfigResult<LoadTimeout> {
        match self.load_timeout_secs {
            Some(secs) => LoadTimeout::new(Duration::from_secs(secs)),
            None => Ok(LoadTimeout::default()),
        }
    }

    pub fn enhanced_error_logging(&self) -> bool {
        self.enhanced_error_logging.unwrap_or(false)
    }

    /// Base URL catalog endpoints are resolved against.
    pub fn catalog_url(&self) -> ConfigResult<Url> {
        parse_url(
            "catalog_url",
            self.catalog_url.as_deref().unwrap_or(DEFAULT_CATALOG_URL),
        )
    }

    /// Default `env_logger` filter; `RUST_LOG` still wins.
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

fn parse_url(field: &'static str, value: &str) -> ConfigResult<Url> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
developer_token = "eyJhbGciOiJFUzI1NiJ9"
app_name = "Player"
app_build = "1.2"
app_url = "https://player.example.com"
load_timeout_secs = 20
enhanced_error_logging = true
"#;

    #[test]
    fn parses_toml_layer() {
        let settings = BridgeSettings::from_toml_str(SAMPLE).unwrap();

        assert_eq!(settings.app_name.as_deref(), Some("Player"));
        assert_eq!(settings.load_timeout().unwrap().as_secs(), 20);
        assert!(settings.enhanced_error_logging());
        assert_eq!(settings.log_level(), "info");
    }

    #[test]
    fn page_request_requires_token_and_url() {
        let missing = BridgeSettings::default().page_request().unwrap_err();
        assert!(matches!(missing, ConfigError::MissingField("developer_token")));

        let page = BridgeSettings::from_toml_str(SAMPLE)
            .unwrap()
            .page_request()
            .unwrap();
        assert_eq!(page.base_url.host_str(), Some("player.example.com"));
        assert_eq!(page.app_build, "1.2");
        assert_eq!(page.icon_url, None);
    }

    #[test]
    fn invalid_url_names_the_field() {
        let settings = BridgeSettings {
            developer_token: Some("t".to_string()),
            app_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            settings.page_request(),
            Err(ConfigError::InvalidUrl { field: "app_url", .. })
        ));
    }

    #[test]
    fn out_of_range_timeout_is_rejected() {
        let settings = BridgeSettings {
            load_timeout_secs: Some(600),
            ..Default::default()
        };
        assert!(matches!(
            settings.load_timeout(),
            Err(ConfigError::InvalidLoadTimeout { secs: 600, .. })
        ));
    }

    #[test]
    fn catalog_url_defaults_to_public_api() {
        let url = BridgeSettings::default().catalog_url().unwrap();
        assert_eq!(url.as_str(), DEFAULT_CATALOG_URL);
    }

    #[test]
    fn load_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = BridgeSettings::load_from_path(file.path()).unwrap();
        assert_eq!(settings.app_url.as_deref(), Some("https://player.example.com"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = BridgeSettings::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }

    #[test]
    fn toml_output_parses_back() {
        let settings = BridgeSettings::from_toml_str(SAMPLE).unwrap();
        let text = settings.to_toml_string().unwrap();
        assert_eq!(BridgeSettings::from_toml_str(&text).unwrap(), settings);
    }
}

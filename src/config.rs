pub mod settings;
pub mod store;
pub mod user;

use std::path::PathBuf;

use thiserror::Error;

pub use settings::{BridgeSettings, DEFAULT_CATALOG_URL};
pub use store::SettingsStore;
pub use user::{load_user_config, user_config_path};

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("missing required setting `{0}`")]
    MissingField(&'static str),

    #[error("invalid URL for `{field}` ({value}): {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("load timeout of {secs}s is outside the allowed range {min}..={max}s")]
    InvalidLoadTimeout { secs: u64, min: u64, max: u64 },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Merge multiple settings layers in order.
/// Later layers have higher precedence.
pub fn merge_all(layers: &[Option<BridgeSettings>]) -> Option<BridgeSettings> {
    layers.iter().cloned().reduce(merge_settings).flatten()
}

/// Merge two settings layers, preferring values from `primary` over `fallback`
pub fn merge_settings(
    fallback: Option<BridgeSettings>,
    primary: Option<BridgeSettings>,
) -> Option<BridgeSettings> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) | (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(BridgeSettings {
            developer_token: primary.developer_token.or(fallback.developer_token),
            app_name: primary.app_name.or(fallback.app_name),
            app_build: primary.app_build.or(fallback.app_build),
            app_url: primary.app_url.or(fallback.app_url),
            icon_url: primary.icon_url.or(fallback.icon_url),
            load_timeout_secs: primary.load_timeout_secs.or(fallback.load_timeout_secs),
            enhanced_error_logging: primary
                .enhanced_error_logging
                .or(fallback.enhanced_error_logging),
            catalog_url: primary.catalog_url.or(fallback.catalog_url),
            log_level: primary.log_level.or(fallback.log_level),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_token(token: &str) -> BridgeSettings {
        BridgeSettings {
            developer_token: Some(token.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn primary_wins_field_by_field() {
        let fallback = BridgeSettings {
            app_name: Some("fallback".to_string()),
            load_timeout_secs: Some(30),
            ..with_token("old")
        };
        let primary = BridgeSettings {
            load_timeout_secs: Some(5),
            ..with_token("new")
        };

        let merged = merge_settings(Some(fallback), Some(primary)).unwrap();

        assert_eq!(merged.developer_token.as_deref(), Some("new"));
        assert_eq!(merged.app_name.as_deref(), Some("fallback"));
        assert_eq!(merged.load_timeout_secs, Some(5));
    }

    #[test]
    fn merge_with_one_side_missing_returns_other() {
        assert_eq!(
            merge_settings(None, Some(with_token("a"))),
            Some(with_token("a"))
        );
        assert_eq!(
            merge_settings(Some(with_token("b")), None),
            Some(with_token("b"))
        );
        assert_eq!(merge_settings(None, None), None);
    }

    #[test]
    fn merge_all_applies_layers_in_order() {
        let merged = merge_all(&[
            Some(with_token("defaults")),
            None,
            Some(with_token("override")),
        ])
        .unwrap();
        assert_eq!(merged.developer_token.as_deref(), Some("override"));
    }
}

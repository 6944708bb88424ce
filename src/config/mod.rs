//! Configuration loading and management
//!
//! ```yaml
//! base_path: /api/v1
//! strict: true
//! log_registered_routes: false
//! ```

use crate::core::error::ConfigError;
use crate::server::composition::RegisterRoutesOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline settings read from YAML
///
/// Unset keys keep their default, which lets several files be layered with
/// [`PipelineConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Prefix of every registered route (default: empty)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Reject configuration gaps at startup (default: false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,

    /// Log every registered route at info level (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_registered_routes: Option<bool>,
}

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|err| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: err.to_string(),
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Layer configurations; for each key the last one that sets it wins
    pub fn merge(configs: impl IntoIterator<Item = PipelineConfig>) -> Self {
        configs
            .into_iter()
            .fold(Self::default(), |merged, next| Self {
                base_path: next.base_path.or(merged.base_path),
                strict: next.strict.or(merged.strict),
                log_registered_routes: next.log_registered_routes.or(merged.log_registered_routes),
            })
    }

    pub fn base_path(&self) -> &str {
        self.base_path.as_deref().unwrap_or("")
    }

    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    pub fn logs_registered_routes(&self) -> bool {
        self.log_registered_routes.unwrap_or(true)
    }

    /// Route registration options carried by this configuration
    pub fn register_options(&self) -> RegisterRoutesOptions {
        RegisterRoutesOptions::new(self.base_path()).strict(self.is_strict())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.base_path(), "");
        assert!(!config.is_strict());
        assert!(config.logs_registered_routes());
    }

    #[test]
    fn test_from_yaml_str() {
        let config = PipelineConfig::from_yaml_str("base_path: /api/v1\nstrict: true\n").unwrap();
        assert_eq!(config.base_path(), "/api/v1");
        assert!(config.is_strict());
        assert!(config.logs_registered_routes());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(PipelineConfig::from_yaml_str("  \n").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let err = PipelineConfig::from_yaml_str("base_pth: /api").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { file: None, .. }));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_path: /api/v2").unwrap();
        writeln!(file, "log_registered_routes: false").unwrap();

        let config = PipelineConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.base_path(), "/api/v2");
        assert!(!config.logs_registered_routes());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_yaml_file(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_malformed_file_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "strict: [not, a, bool]").unwrap();

        let err = PipelineConfig::from_yaml_file(file.path()).unwrap_err();
        match err {
            ConfigError::ParseError { file: Some(name), .. } => {
                assert!(name.ends_with(&*file.path().file_name().unwrap().to_string_lossy()));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_later_wins_per_key() {
        let base = PipelineConfig::from_yaml_str("base_path: /api\nstrict: true").unwrap();
        let overlay = PipelineConfig::from_yaml_str("base_path: /api/v1").unwrap();

        let merged = PipelineConfig::merge(vec![base, overlay]);
        assert_eq!(merged.base_path(), "/api/v1");
        assert!(merged.is_strict());
    }

    #[test]
    fn test_register_options() {
        let config = PipelineConfig::from_yaml_str("base_path: /api\nstrict: true").unwrap();
        let options = config.register_options();
        assert_eq!(options.base_path, "/api");
        assert!(options.strict);
        assert!(options.global_middlewares.is_empty());
    }
}

use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

use crate::{error::DocweaveError, properties::SourceLanguage};

/// Behavior switches for one build. Every flag defaults to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Curate articles nothing else curates under the module when the bundle has exactly one.
    pub auto_curate_articles_under_single_module: bool,
    /// Turn extended-symbol containers whose children are all curated elsewhere into virtual nodes.
    pub trim_empty_extension_containers: bool,
    /// Resolve relative links in an article against its first curation parent once curated.
    pub resolve_relative_to_curation_parent: bool,
    pub validate_alternate_representations: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        FeatureFlags {
            auto_curate_articles_under_single_module: true,
            trim_empty_extension_containers: true,
            resolve_relative_to_curation_parent: true,
            validate_alternate_representations: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfiguration {
    pub bundle_identifier: String,
    /// Name of the articles namespace root.
    pub bundle_display_name: String,
    pub canonical_language: SourceLanguage,
    /// Size of the worker pool; 0 means one worker per CPU.
    pub worker_count: usize,
    pub features: FeatureFlags,
}

impl Default for ContextConfiguration {
    fn default() -> Self {
        ContextConfiguration {
            bundle_identifier: "org.docweave.bundle".to_string(),
            bundle_display_name: "Documentation".to_string(),
            canonical_language: SourceLanguage::Swift,
            worker_count: 0,
            features: FeatureFlags::default(),
        }
    }
}

impl ContextConfiguration {
    pub fn new(
        bundle_identifier: impl Into<String>,
        bundle_display_name: impl Into<String>,
    ) -> ContextConfiguration {
        ContextConfiguration {
            bundle_identifier: bundle_identifier.into(),
            bundle_display_name: bundle_display_name.into(),
            ..ContextConfiguration::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<ContextConfiguration, DocweaveError> {
        let config: ContextConfiguration = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, DocweaveError> {
        Ok(toml::to_string(self)?)
    }

    /// Reads a configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<ContextConfiguration, DocweaveError> {
        tracing::debug!("Attempting to read configuration from: {:?}", path);
        if !path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(ContextConfiguration::default());
        }
        let content = read_to_string(path)?;
        ContextConfiguration::from_toml_str(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), DocweaveError> {
        tracing::debug!("Attempting to write configuration to: {:?}", path);
        write(path, self.to_toml_string()?)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), DocweaveError> {
        if self.bundle_identifier.trim().is_empty() {
            return Err(DocweaveError::InvalidConfiguration(
                "bundle_identifier must not be empty".to_string(),
            ));
        }
        if self.bundle_display_name.contains('/') {
            return Err(DocweaveError::InvalidConfiguration(format!(
                "bundle_display_name '{}' must not contain '/'",
                self.bundle_display_name
            )));
        }
        Ok(())
    }
}

/// Conventional location of the configuration file inside a bundle directory.
pub fn default_config_path(bundle_root: &Path) -> PathBuf {
    bundle_root.join("docweave.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ContextConfiguration::from_toml_str(
            r#"
            bundle_identifier = "com.example.MyKit"
            canonical_language = "ObjectiveC"

            [features]
            trim_empty_extension_containers = false
            "#,
        )
        .unwrap();
        assert_eq!(config.bundle_identifier, "com.example.MyKit");
        assert_eq!(config.bundle_display_name, "Documentation");
        assert_eq!(config.canonical_language, SourceLanguage::ObjectiveC);
        assert!(!config.features.trim_empty_extension_containers);
        assert!(config.features.auto_curate_articles_under_single_module);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(
            ContextConfiguration::from_toml_str("bundle_identifier = \"\""),
            Err(DocweaveError::InvalidConfiguration(_))
        ));
        assert!(ContextConfiguration::from_toml_str("worker_count = \"many\"").is_err());
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_config_path(dir.path());
        assert_eq!(
            ContextConfiguration::load(&path).unwrap(),
            ContextConfiguration::default()
        );

        let mut config = ContextConfiguration::new("com.example.MyKit", "MyKit");
        config.worker_count = 2;
        config.save(&path).unwrap();
        assert_eq!(ContextConfiguration::load(&path).unwrap(), config);
    }
}

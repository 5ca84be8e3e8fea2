//! Effective configuration resolution
//!
//! One `EffectiveConfig` is built per run by merging an optional JSON config
//! file with explicit command-line overrides. Precedence, highest first:
//! explicit CLI flag, config-file value, built-in default. The config is
//! immutable for the remainder of the run.
//!
//! Mirroring the ledger's policy, a config file that is designated but absent
//! from disk degrades to defaults with a warning only; a file that exists but
//! cannot be used is an error.

use crate::error::BoxerError;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Default template suffix: joined onto `download-url-prefix`, and used alone
/// when no URL construction field is configured anywhere
pub const DEFAULT_URL_SUFFIX: &str = "{name}-{version}-{provider}.box";

/// The optional external config file
///
/// Unknown keys are rejected rather than silently ignored, so a typo in a
/// field name surfaces immediately.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct ConfigFile {
    vm_name: String,

    #[serde(default)]
    version: u32,

    url_template: Option<String>,

    download_url_prefix: Option<String>,
}

/// Explicit command-line overrides, all optional
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base_name: Option<String>,
    pub major_version: Option<u32>,
    pub url_template: Option<String>,
    pub url_prefix: Option<String>,
    pub url_suffix: Option<String>,
}

/// The merged configuration a run operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    /// Base name of the box artifact family
    pub vm_name: String,

    /// Major version used when the ledger has no active version
    pub major_version: u32,

    /// URL template with `{name}`/`{version}`/`{provider}` placeholders
    pub url_template: String,

    /// Stable identifier for this box family in the release metadata
    pub boxer_id: String,
}

/// Merge the config file (if designated and present) with CLI overrides
pub fn resolve_config(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> Result<EffectiveConfig, BoxerError> {
    let file = match config_path {
        Some(path) if path.exists() => Some(load_config_file(path)?),
        Some(path) => {
            warn!(
                "Config file {} not found; continuing with defaults",
                path.display()
            );
            None
        }
        None => None,
    };

    let vm_name = overrides
        .base_name
        .clone()
        .or_else(|| file.as_ref().map(|f| f.vm_name.clone()))
        .ok_or(BoxerError::MissingRequiredConfig)?;

    let major_version = overrides
        .major_version
        .or_else(|| file.as_ref().map(|f| f.version))
        .unwrap_or(0);

    let url_template = resolve_url_template(overrides, file.as_ref());

    let config = EffectiveConfig {
        boxer_id: vm_name.clone(),
        vm_name,
        major_version,
        url_template,
    };
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<ConfigFile, BoxerError> {
    let content = std::fs::read_to_string(path).map_err(|e| BoxerError::InvalidInput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let file: ConfigFile =
        serde_json::from_str(&content).map_err(|e| BoxerError::InvalidInput {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    // Exactly one way to construct URLs may come from the file
    if file.url_template.is_some() && file.download_url_prefix.is_some() {
        return Err(BoxerError::InvalidInput {
            path: path.to_path_buf(),
            reason: "\"url-template\" and \"download-url-prefix\" are mutually exclusive"
                .to_string(),
        });
    }
    if file.url_template.is_none() && file.download_url_prefix.is_none() {
        return Err(BoxerError::InvalidInput {
            path: path.to_path_buf(),
            reason: "one of \"url-template\" or \"download-url-prefix\" is required".to_string(),
        });
    }

    Ok(file)
}

/// Pick the URL template, highest precedence first: CLI template, CLI prefix
/// plus suffix, file template, file prefix plus suffix, bare default suffix
fn resolve_url_template(overrides: &CliOverrides, file: Option<&ConfigFile>) -> String {
    let suffix = overrides
        .url_suffix
        .as_deref()
        .unwrap_or(DEFAULT_URL_SUFFIX);

    if let Some(template) = &overrides.url_template {
        return template.clone();
    }
    if let Some(prefix) = &overrides.url_prefix {
        return format!("{prefix}{suffix}");
    }
    if let Some(file) = file {
        if let Some(template) = &file.url_template {
            return template.clone();
        }
        if let Some(prefix) = &file.download_url_prefix {
            return format!("{prefix}{suffix}");
        }
    }
    suffix.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, value: serde_json::Value) -> std::path::PathBuf {
        let path = dir.path().join("boxer.json");
        std::fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_file_only_resolution() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            json!({
                "vm-name": "web",
                "version": 2,
                "url-template": "http://x/{name}-{version}-{provider}.box"
            }),
        );

        let config = resolve_config(Some(&path), &CliOverrides::default()).unwrap();
        assert_eq!(config.vm_name, "web");
        assert_eq!(config.boxer_id, "web");
        assert_eq!(config.major_version, 2);
        assert_eq!(config.url_template, "http://x/{name}-{version}-{provider}.box");
    }

    #[test]
    fn test_cli_overrides_beat_file_values() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            json!({
                "vm-name": "web",
                "version": 2,
                "url-template": "http://file/{name}.box"
            }),
        );

        let overrides = CliOverrides {
            base_name: Some("db".to_string()),
            major_version: Some(7),
            url_template: Some("http://cli/{name}.box".to_string()),
            ..Default::default()
        };

        let config = resolve_config(Some(&path), &overrides).unwrap();
        assert_eq!(config.vm_name, "db");
        assert_eq!(config.major_version, 7);
        assert_eq!(config.url_template, "http://cli/{name}.box");
    }

    #[test]
    fn test_prefix_joined_with_default_suffix() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            json!({
                "vm-name": "web",
                "download-url-prefix": "http://boxes.example.com/"
            }),
        );

        let config = resolve_config(Some(&path), &CliOverrides::default()).unwrap();
        assert_eq!(
            config.url_template,
            "http://boxes.example.com/{name}-{version}-{provider}.box"
        );
        assert_eq!(config.major_version, 0);
    }

    #[test]
    fn test_cli_prefix_with_cli_suffix() {
        let overrides = CliOverrides {
            base_name: Some("web".to_string()),
            url_prefix: Some("http://cli/".to_string()),
            url_suffix: Some("{name}.box".to_string()),
            ..Default::default()
        };

        let config = resolve_config(None, &overrides).unwrap();
        assert_eq!(config.url_template, "http://cli/{name}.box");
    }

    #[test]
    fn test_missing_designated_file_degrades_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");

        let overrides = CliOverrides {
            base_name: Some("web".to_string()),
            ..Default::default()
        };

        let config = resolve_config(Some(&path), &overrides).unwrap();
        assert_eq!(config.vm_name, "web");
        assert_eq!(config.major_version, 0);
        assert_eq!(config.url_template, DEFAULT_URL_SUFFIX);
    }

    #[test]
    fn test_no_base_name_anywhere_is_an_error() {
        assert!(matches!(
            resolve_config(None, &CliOverrides::default()),
            Err(BoxerError::MissingRequiredConfig)
        ));
    }

    #[test]
    fn test_both_url_fields_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            json!({
                "vm-name": "web",
                "url-template": "http://x/{name}.box",
                "download-url-prefix": "http://x/"
            }),
        );

        assert!(matches!(
            resolve_config(Some(&path), &CliOverrides::default()),
            Err(BoxerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_neither_url_field_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, json!({"vm-name": "web"}));

        assert!(matches!(
            resolve_config(Some(&path), &CliOverrides::default()),
            Err(BoxerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            json!({
                "vm-name": "web",
                "url-template": "http://x/{name}.box",
                "vm-nmae": "typo"
            }),
        );

        assert!(matches!(
            resolve_config(Some(&path), &CliOverrides::default()),
            Err(BoxerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_missing_vm_name_in_present_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, json!({"url-template": "http://x/{name}.box"}));

        assert!(matches!(
            resolve_config(Some(&path), &CliOverrides::default()),
            Err(BoxerError::InvalidInput { .. })
        ));
    }
}

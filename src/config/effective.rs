//! Effective configuration with full provenance
//!
//! The effective config captures the merged configuration plus
//! information about where each value came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::emit::Format;

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "sbx/effective_config@1";

/// Upper bound for each combination limit
const MAX_COMBINATION_LIMIT: usize = 1000;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Project,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,

    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

/// Limits for combination export
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CombinationLimits {
    pub max_printers: usize,
    pub max_filaments: usize,
    pub max_prints: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct BundleSection {
    header: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSettings {
    profiles_path: PathBuf,
    vendor: String,
    output_dir: PathBuf,
    formats: Vec<Format>,
    bundle: BundleSection,
    combinations: CombinationLimits,
    report: bool,
}

/// Typed view of the effective configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub profiles_path: PathBuf,
    pub vendor: String,
    pub output_dir: PathBuf,
    pub formats: Vec<Format>,
    pub header: String,
    pub combinations: CombinationLimits,
    pub report: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            profiles_path: PathBuf::from(defaults.profiles_path),
            vendor: defaults.vendor,
            output_dir: PathBuf::from(defaults.output_dir),
            formats: vec![Format::Ini, Format::Metadata],
            header: defaults.bundle_header,
            combinations: CombinationLimits {
                max_printers: defaults.max_printers,
                max_filaments: defaults.max_filaments,
                max_prints: defaults.max_prints,
            },
            report: defaults.report,
        }
    }
}

impl EffectiveConfig {
    /// Build effective config from layers
    pub fn build(
        host_config_path: Option<&Path>,
        project_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        // Layers 2 and 3: host and project files, skipped when absent
        for (origin, path) in [
            (ConfigOrigin::Host, host_config_path),
            (ConfigOrigin::Project, project_config_path),
        ] {
            if let Some(path) = path.filter(|p| p.exists()) {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        // Layer 4: CLI overrides
        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let config = Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
        };

        // Validate eagerly so a bad layer fails at load time
        config.settings()?;
        Ok(config)
    }

    /// Default host config path (~/.config/sbx/export.toml)
    pub fn default_host_path() -> Option<PathBuf> {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".config/sbx/export.toml"))
    }

    /// Default project config path (.sbx/export.toml)
    pub fn default_project_path() -> PathBuf {
        PathBuf::from(".sbx/export.toml")
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    /// Convert TOML Value to JSON Value
    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    /// Typed, validated settings
    pub fn settings(&self) -> Result<ExportSettings, ConfigError> {
        let raw: RawSettings = serde_json::from_value(self.config.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if raw.vendor.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "vendor must not be empty".to_string(),
            ));
        }

        if raw.formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "formats must list at least one of: ini, metadata".to_string(),
            ));
        }

        for (name, value) in [
            ("combinations.max_printers", raw.combinations.max_printers),
            ("combinations.max_filaments", raw.combinations.max_filaments),
            ("combinations.max_prints", raw.combinations.max_prints),
        ] {
            if value == 0 || value > MAX_COMBINATION_LIMIT {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be in [1, {}]",
                    name, MAX_COMBINATION_LIMIT
                )));
            }
        }

        // Keep the first occurrence of each format
        let mut seen = HashSet::new();
        let mut formats = raw.formats;
        formats.retain(|format| seen.insert(*format));

        Ok(ExportSettings {
            profiles_path: raw.profiles_path,
            vendor: raw.vendor,
            output_dir: raw.output_dir,
            formats,
            header: raw.bundle.header,
            combinations: raw.combinations,
            report: raw.report,
        })
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let config = EffectiveConfig::build(None, None, None).unwrap();

        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.get("vendor"), Some(&serde_json::json!("BBL")));
        assert_eq!(config.get("combinations.max_prints"), Some(&serde_json::json!(5)));
        assert!(config.get("combinations.nope").is_none());

        let settings = config.settings().unwrap();
        assert_eq!(settings, ExportSettings::default());
    }

    #[test]
    fn test_build_with_cli_override() {
        let cli = serde_json::json!({
            "vendor": "Prusa",
            "formats": ["ini"]
        });

        let settings = EffectiveConfig::build(None, None, Some(cli))
            .unwrap()
            .settings()
            .unwrap();

        assert_eq!(settings.vendor, "Prusa");
        assert_eq!(settings.formats, vec![Format::Ini]);
    }

    #[test]
    fn test_validation_empty_formats() {
        let cli = serde_json::json!({"formats": []});
        let err = EffectiveConfig::build(None, None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("formats"));
    }

    #[test]
    fn test_validation_unknown_format() {
        let cli = serde_json::json!({"formats": ["stl"]});
        let err = EffectiveConfig::build(None, None, Some(cli)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_repeated_formats_keep_first_occurrence() {
        let cli = serde_json::json!({"formats": ["ini", "metadata", "ini", "orca_printer"]});
        let config = EffectiveConfig::build(None, None, Some(cli)).unwrap();
        assert_eq!(
            config.settings().unwrap().formats,
            vec![Format::Ini, Format::Metadata]
        );
    }

    #[test]
    fn test_write_to_file_round_trips() {
        let config = EffectiveConfig::build(None, None, None).unwrap();
        let file = NamedTempFile::new().unwrap();
        config.write_to_file(file.path()).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let back: EffectiveConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.config, config.config);
        assert_eq!(back.schema_id, SCHEMA_ID);
    }

    #[test]
    fn test_validation_combination_limit() {
        let cli = serde_json::json!({"combinations": {"max_prints": 0}});
        let err = EffectiveConfig::build(None, None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("combinations.max_prints"));
    }

    #[test]
    fn test_validation_empty_vendor() {
        let cli = serde_json::json!({"vendor": "  "});
        assert!(EffectiveConfig::build(None, None, Some(cli)).is_err());
    }

    #[test]
    fn test_load_toml_files_in_order() {
        let mut host = NamedTempFile::new().unwrap();
        writeln!(host, "vendor = \"Creality\"").unwrap();
        writeln!(host, "output_dir = \"host-out\"").unwrap();

        let mut project = NamedTempFile::new().unwrap();
        writeln!(project, "output_dir = \"project-out\"").unwrap();
        writeln!(project, "[combinations]").unwrap();
        writeln!(project, "max_printers = 2").unwrap();

        let config =
            EffectiveConfig::build(Some(host.path()), Some(project.path()), None).unwrap();
        let settings = config.settings().unwrap();

        assert_eq!(settings.vendor, "Creality");
        assert_eq!(settings.output_dir, PathBuf::from("project-out"));
        assert_eq!(settings.combinations.max_printers, 2);
        assert_eq!(settings.combinations.max_prints, 5);

        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[1].origin, ConfigOrigin::Host);
        assert_eq!(config.sources[2].origin, ConfigOrigin::Project);
        assert_eq!(config.sources[2].digest.as_ref().map(|d| d.len()), Some(64));
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let config = EffectiveConfig::build(
            Some(Path::new("/nonexistent/export.toml")),
            None,
            None,
        )
        .unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_invalid_toml() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "vendor = ").unwrap();
        let err = EffectiveConfig::build(None, Some(temp.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}

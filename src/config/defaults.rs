//! Built-in export defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Root of the vendor directories (default: "resources/profiles")
    pub profiles_path: String,

    /// Vendor scope (default: "BBL")
    pub vendor: String,

    /// Output directory (default: "exported_profiles")
    pub output_dir: String,

    /// Formats written by single and batch export
    pub formats: Vec<String>,

    /// Comment line at the top of flat-text files
    pub bundle_header: String,

    pub max_printers: usize,
    pub max_filaments: usize,
    pub max_prints: usize,

    /// Write export_report.json after batch runs (default: true)
    pub report: bool,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            profiles_path: "resources/profiles".to_string(),
            vendor: "BBL".to_string(),
            output_dir: "exported_profiles".to_string(),
            formats: vec!["ini".to_string(), "metadata".to_string()],
            bundle_header: "generated by sbx (SliceBeam export)".to_string(),
            max_printers: 4,
            max_filaments: 10,
            max_prints: 5,
            report: true,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "profiles_path": self.profiles_path,
            "vendor": self.vendor,
            "output_dir": self.output_dir,
            "formats": self.formats,
            "bundle": {
                "header": self.bundle_header
            },
            "combinations": {
                "max_printers": self.max_printers,
                "max_filaments": self.max_filaments,
                "max_prints": self.max_prints
            },
            "report": self.report
        })
    }
}

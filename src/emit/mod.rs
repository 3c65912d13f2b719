//! Output formats for resolved profiles and bundles.
//!
//! Both emitters are stateless and total: any value the normalizer produces
//! can be rendered.

mod ini;
mod metadata;

pub use ini::{escape_value, IniEmitter};
pub use metadata::{MetadataDocument, METADATA_VERSION};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use sbx_profile::Kind;

/// Output format for single-profile export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Flat `key = value` text
    Ini,
    /// JSON printer/profile document
    #[serde(alias = "orca_printer")]
    Metadata,
}

impl Format {
    /// File extension written for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Ini => "ini",
            Format::Metadata => "orca_printer",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Ini => f.write_str("ini"),
            Format::Metadata => f.write_str("metadata"),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ini" => Ok(Format::Ini),
            "metadata" | "orca_printer" => Ok(Format::Metadata),
            other => Err(format!("unknown format '{}' (expected ini or metadata)", other)),
        }
    }
}

/// Profile document fields that are not settings, per kind
pub fn skip_keys(kind: Kind) -> &'static [&'static str] {
    match kind {
        Kind::Machine => &[
            "type",
            "name",
            "inherits",
            "from",
            "instantiation",
            "setting_id",
            "default_filament_profile",
            "default_print_profile",
            "upward_compatible_machine",
        ],
        Kind::Print => &[
            "type",
            "name",
            "inherits",
            "from",
            "instantiation",
            "setting_id",
            "compatible_printers",
            "compatible_printers_condition",
        ],
        Kind::Filament => &[
            "type",
            "name",
            "inherits",
            "from",
            "instantiation",
            "setting_id",
            "compatible_printers",
            "compatible_printers_condition",
            "compatible_prints",
            "compatible_prints_condition",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!("ini".parse::<Format>().unwrap(), Format::Ini);
        assert_eq!("orca_printer".parse::<Format>().unwrap(), Format::Metadata);
        assert!("yaml".parse::<Format>().is_err());
        assert_eq!(Format::Metadata.extension(), "orca_printer");
    }

    #[test]
    fn test_format_serde_alias() {
        let formats: Vec<Format> =
            serde_json::from_value(serde_json::json!(["ini", "orca_printer", "metadata"])).unwrap();
        assert_eq!(formats, vec![Format::Ini, Format::Metadata, Format::Metadata]);
    }

    #[test]
    fn test_filament_skips_superset_of_print() {
        for key in skip_keys(Kind::Print) {
            assert!(skip_keys(Kind::Filament).contains(key));
        }
        assert!(skip_keys(Kind::Machine).contains(&"default_print_profile"));
    }
}

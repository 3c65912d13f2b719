//! JSON metadata (`.orca_printer`) emitter.

use serde::Serialize;
use std::collections::BTreeMap;

use sbx_profile::{Kind, NormalizedValue, ResolvedProfile};

use super::skip_keys;

/// Document format version understood by SliceBeam
pub const METADATA_VERSION: &str = "1.0.0";

/// A setting lifted out of `config` into a top-level field.
struct Descriptor {
    key: &'static str,
    default: Option<fn() -> NormalizedValue>,
}

const MACHINE_DESCRIPTORS: &[Descriptor] = &[
    Descriptor {
        key: "printer_model",
        default: Some(empty_scalar),
    },
    Descriptor {
        key: "printer_variant",
        default: Some(empty_scalar),
    },
    Descriptor {
        key: "nozzle_diameter",
        default: Some(default_nozzle),
    },
    Descriptor {
        key: "printer_technology",
        default: Some(default_technology),
    },
];

const PRINT_DESCRIPTORS: &[Descriptor] = &[Descriptor {
    key: "layer_height",
    default: None,
}];

const FILAMENT_DESCRIPTORS: &[Descriptor] = &[
    Descriptor {
        key: "filament_type",
        default: None,
    },
    Descriptor {
        key: "filament_diameter",
        default: None,
    },
];

fn empty_scalar() -> NormalizedValue {
    NormalizedValue::Scalar(String::new())
}

fn default_nozzle() -> NormalizedValue {
    NormalizedValue::List {
        items: vec!["0.4".to_string()],
        separator: ';',
    }
}

fn default_technology() -> NormalizedValue {
    NormalizedValue::Scalar("FFF".to_string())
}

fn descriptors(kind: Kind) -> &'static [Descriptor] {
    match kind {
        Kind::Machine => MACHINE_DESCRIPTORS,
        Kind::Print => PRINT_DESCRIPTORS,
        Kind::Filament => FILAMENT_DESCRIPTORS,
    }
}

/// Structured document for one resolved profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataDocument {
    pub version: String,

    /// Kind tag: printer, print or filament
    #[serde(rename = "type")]
    pub kind: String,

    /// Display name
    pub name: String,

    pub vendor: String,

    /// Hardware/material descriptors pulled out of the settings
    #[serde(flatten)]
    pub descriptors: BTreeMap<String, NormalizedValue>,

    /// Remaining flattened settings
    pub config: BTreeMap<String, NormalizedValue>,
}

impl MetadataDocument {
    /// Build the document for a resolved profile.
    pub fn from_profile(profile: &ResolvedProfile) -> Self {
        let skip = skip_keys(profile.kind);
        let table = descriptors(profile.kind);

        let mut descriptors = BTreeMap::new();
        for descriptor in table {
            let value = profile
                .get(descriptor.key)
                .cloned()
                .or_else(|| descriptor.default.map(|make| make()));
            if let Some(value) = value {
                descriptors.insert(descriptor.key.to_string(), value);
            }
        }

        let config = profile
            .settings
            .iter()
            .filter(|(key, _)| {
                !skip.contains(&key.as_str()) && !table.iter().any(|d| d.key == key.as_str())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            version: METADATA_VERSION.to_string(),
            kind: profile.kind.section_tag().to_string(),
            name: profile.name.clone(),
            vendor: profile.vendor.clone(),
            descriptors,
            config,
        }
    }

    /// Pretty JSON with two-space indentation
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

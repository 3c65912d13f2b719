//! Setting value normalization.
//!
//! Settings that are lists (either stored as arrays or as delimited strings
//! under a known multi-value key) become token sequences so each emitter can
//! choose its own representation. Everything else, G-code blocks included,
//! passes through untouched.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::profile::RawValue;

/// Separator used for values that were arrays in the source document.
const DEFAULT_SEPARATOR: char = ';';

/// Keys whose string values are delimited lists.
pub const LIST_SETTINGS: &[&str] = &[
    "bed_exclude_area",
    "compatible_printers",
    "compatible_prints",
    "extruder_clearance_area",
    "extruder_offset",
    "head_wrap_detect_zone",
    "machine_max_acceleration_e",
    "machine_max_acceleration_extruding",
    "machine_max_acceleration_retracting",
    "machine_max_acceleration_travel",
    "machine_max_acceleration_x",
    "machine_max_acceleration_y",
    "machine_max_acceleration_z",
    "machine_max_jerk_e",
    "machine_max_jerk_x",
    "machine_max_jerk_y",
    "machine_max_jerk_z",
    "machine_max_speed_e",
    "machine_max_speed_x",
    "machine_max_speed_y",
    "machine_max_speed_z",
    "machine_min_extruding_rate",
    "machine_min_travel_rate",
    "nozzle_diameter",
    "printable_area",
    "thumbnails",
    "wipe_tower_x",
    "wipe_tower_y",
];

/// A setting value in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedValue {
    /// Opaque string, byte-for-byte as given.
    Scalar(String),
    /// Ordered tokens plus the separator they were joined with.
    List { items: Vec<String>, separator: char },
}

impl NormalizedValue {
    /// Flat-text representation: scalars as-is, lists rejoined with their
    /// separator.
    pub fn to_flat_text(&self) -> String {
        match self {
            NormalizedValue::Scalar(s) => s.clone(),
            NormalizedValue::List { items, separator } => {
                let mut sep = [0u8; 4];
                items.join(separator.encode_utf8(&mut sep))
            }
        }
    }

    /// JSON representation: scalars as strings, lists as arrays of strings.
    pub fn to_json(&self) -> Value {
        match self {
            NormalizedValue::Scalar(s) => Value::String(s.clone()),
            NormalizedValue::List { items, .. } => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            NormalizedValue::Scalar(s) => Some(s),
            NormalizedValue::List { .. } => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            NormalizedValue::Scalar(_) => None,
            NormalizedValue::List { items, .. } => Some(items),
        }
    }

    /// First token of a list, or the scalar itself.
    pub fn first(&self) -> Option<&str> {
        match self {
            NormalizedValue::Scalar(s) => Some(s),
            NormalizedValue::List { items, .. } => items.first().map(|s| s.as_str()),
        }
    }
}

impl Serialize for NormalizedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NormalizedValue::Scalar(s) => serializer.serialize_str(s),
            NormalizedValue::List { items, .. } => items.serialize(serializer),
        }
    }
}

/// Normalize one raw setting value.
///
/// Never fails: values that are not recognized lists are returned as opaque
/// scalars. Multi-line values are never tokenized.
pub fn normalize(key: &str, raw: &RawValue) -> NormalizedValue {
    match raw {
        RawValue::List(items) => NormalizedValue::List {
            items: items.clone(),
            separator: DEFAULT_SEPARATOR,
        },
        RawValue::Text(text) => {
            if text.contains('\n') || text.contains('\r') || !LIST_SETTINGS.contains(&key) {
                return NormalizedValue::Scalar(text.clone());
            }
            let separator = if text.contains(';') {
                ';'
            } else if text.contains(',') {
                ','
            } else {
                DEFAULT_SEPARATOR
            };
            let items = if text.is_empty() {
                Vec::new()
            } else {
                text.split(separator).map(str::to_string).collect()
            };
            NormalizedValue::List { items, separator }
        }
    }
}

//! Raw profile documents.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::kind::Kind;

/// Document keys that describe the profile itself rather than a setting.
const STRUCTURAL_KEYS: &[&str] = &["name", "inherits", "instantiation"];

/// A setting value as it appears in a profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A scalar, numeric or delimited string.
    Text(String),
    /// A value the document already stores as an array.
    List(Vec<String>),
}

impl RawValue {
    /// Convert a JSON value from a profile document.
    ///
    /// Booleans become `"1"`/`"0"`, numbers their decimal text and `null` the
    /// empty string. Nested objects are kept as opaque JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => RawValue::List(items.iter().map(scalar_text).collect()),
            other => RawValue::Text(scalar_text(other)),
        }
    }

    /// True for an empty string or an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Text(s) => s.is_empty(),
            RawValue::List(items) => items.is_empty(),
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(items: Vec<String>) -> Self {
        RawValue::List(items)
    }
}

impl From<&[&str]> for RawValue {
    fn from(items: &[&str]) -> Self {
        RawValue::List(items.iter().map(|s| s.to_string()).collect())
    }
}

/// A named configuration document of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Unique within its kind and vendor
    pub name: String,

    pub kind: Kind,

    /// Parent names in declaration order (empty for a root)
    pub inherits: Vec<String>,

    pub settings: BTreeMap<String, RawValue>,

    /// Abstract base that is never exported directly
    pub is_template: bool,
}

/// Errors parsing a profile document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Profile document is not a JSON object")]
    NotAnObject,

    #[error("Profile document has no 'name' string")]
    MissingName,

    #[error("Profile '{name}': 'inherits' must be a string or a list of strings")]
    InvalidInherits { name: String },
}

impl Profile {
    /// Create an empty instantiation profile.
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            inherits: Vec::new(),
            settings: BTreeMap::new(),
            is_template: false,
        }
    }

    /// Append a parent reference.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.inherits.push(parent.into());
        self
    }

    /// Set a setting value.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Mark as an abstract base profile.
    pub fn template(mut self) -> Self {
        self.is_template = true;
        self
    }

    /// Whether this profile is a concrete export target.
    pub fn is_instantiation(&self) -> bool {
        !self.is_template
    }

    /// Parse an OrcaSlicer-style profile document.
    ///
    /// `instantiation` of `"true"` (or `true`) marks a concrete profile;
    /// anything else, including absence, marks a template. An empty
    /// `inherits` string means no parent.
    pub fn from_json(kind: Kind, doc: &Value) -> Result<Self, ProfileError> {
        let map = doc.as_object().ok_or(ProfileError::NotAnObject)?;

        let name = map
            .get("name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or(ProfileError::MissingName)?
            .to_string();

        let inherits = match map.get("inherits") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) if s.is_empty() => Vec::new(),
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => {
                let mut parents = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_str() {
                        Some("") => {}
                        Some(s) => parents.push(s.to_string()),
                        None => return Err(ProfileError::InvalidInherits { name }),
                    }
                }
                parents
            }
            Some(_) => return Err(ProfileError::InvalidInherits { name }),
        };

        let is_template = !match map.get("instantiation") {
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            Some(Value::Bool(b)) => *b,
            _ => false,
        };

        let settings = map
            .iter()
            .filter(|(k, _)| !STRUCTURAL_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), RawValue::from_json(v)))
            .collect();

        Ok(Self {
            name,
            kind,
            inherits,
            settings,
            is_template,
        })
    }

    /// Parse a profile document from JSON text.
    pub fn from_json_str(kind: Kind, text: &str) -> Result<Self, ProfileError> {
        let doc: Value =
            serde_json::from_str(text).map_err(|e| ProfileError::InvalidJson(e.to_string()))?;
        Self::from_json(kind, &doc)
    }
}

//! Profile kind discriminator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The category of a profile. Each kind has its own namespace and its own
/// inheritance graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Printer hardware definition.
    Machine,
    /// Print process (layer height, speeds, walls).
    Print,
    /// Filament material.
    Filament,
}

impl Kind {
    /// All kinds, in section order of a bundle.
    pub const ALL: [Kind; 3] = [Kind::Machine, Kind::Print, Kind::Filament];

    /// Canonical lowercase keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Machine => "machine",
            Kind::Print => "print",
            Kind::Filament => "filament",
        }
    }

    /// Directory holding this kind's documents inside a vendor directory.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Kind::Machine => "machine",
            Kind::Print => "process",
            Kind::Filament => "filament",
        }
    }

    /// Tag used by SliceBeam in section headers and the `presets` section.
    pub fn section_tag(&self) -> &'static str {
        match self {
            Kind::Machine => "printer",
            Kind::Print => "print",
            Kind::Filament => "filament",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown profile kind: '{0}' (expected machine, print or filament)")]
pub struct ParseKindError(pub String);

impl FromStr for Kind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "machine" | "printer" => Ok(Kind::Machine),
            "print" | "process" => Ok(Kind::Print),
            "filament" => Ok(Kind::Filament),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

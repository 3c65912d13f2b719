//! Bundle composition
//!
//! A bundle groups independently resolved machine, print and filament
//! profiles under one container, with a `presets` record naming the default
//! of each kind. Setting values are never read or merged here.

mod filename;
mod select;

pub use filename::{bundle_file_name, safe_name, BUNDLE_NAME_DELIMITER};
pub use select::{pick_default, DefaultRule, Fallback, ProfileSelector, SelectorError};

use serde::{Deserialize, Serialize};

use sbx_profile::{Kind, ResolvedProfile};

/// Errors for bundle composition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BundleError {
    #[error("Default {kind} profile '{name}' is not part of the bundle")]
    InvalidDefault { kind: Kind, name: String },

    #[error("Duplicate {kind} profile in bundle: '{name}'")]
    DuplicateProfileName { kind: Kind, name: String },

    #[error("Profile '{name}' is a {actual} profile, expected {expected}")]
    KindMismatch {
        name: String,
        expected: Kind,
        actual: Kind,
    },

    #[error("Bundle has no {0} profile")]
    MissingKind(Kind),

    #[error("{kind} profile name cannot be written as a section header: {name:?}")]
    UnrepresentableName { kind: Kind, name: String },
}

/// Default profile name for each kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presets {
    pub machine: String,
    pub print: String,
    pub filament: String,
}

impl Presets {
    pub fn new(
        machine: impl Into<String>,
        print: impl Into<String>,
        filament: impl Into<String>,
    ) -> Self {
        Self {
            machine: machine.into(),
            print: print.into(),
            filament: filament.into(),
        }
    }

    /// Default name for a kind
    pub fn name(&self, kind: Kind) -> &str {
        match kind {
            Kind::Machine => &self.machine,
            Kind::Print => &self.print,
            Kind::Filament => &self.filament,
        }
    }
}

/// Resolved profiles of all three kinds plus default selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    machines: Vec<ResolvedProfile>,
    prints: Vec<ResolvedProfile>,
    filaments: Vec<ResolvedProfile>,
    presets: Presets,
}

impl Bundle {
    /// Compose a single-combination bundle.
    ///
    /// Each argument must be of the matching kind, and `defaults` must name
    /// exactly the supplied profiles.
    pub fn compose(
        machine: ResolvedProfile,
        print: ResolvedProfile,
        filament: ResolvedProfile,
        defaults: Presets,
    ) -> Result<Self, BundleError> {
        for (expected, profile) in [
            (Kind::Machine, &machine),
            (Kind::Print, &print),
            (Kind::Filament, &filament),
        ] {
            if profile.kind != expected {
                return Err(BundleError::KindMismatch {
                    name: profile.name.clone(),
                    expected,
                    actual: profile.kind,
                });
            }
        }

        let mut builder = BundleBuilder::new();
        builder.add(machine)?;
        builder.add(print)?;
        builder.add(filament)?;
        builder.build(defaults)
    }

    /// Profiles of one kind, in registration order
    pub fn profiles(&self, kind: Kind) -> &[ResolvedProfile] {
        match kind {
            Kind::Machine => &self.machines,
            Kind::Print => &self.prints,
            Kind::Filament => &self.filaments,
        }
    }

    pub fn presets(&self) -> &Presets {
        &self.presets
    }

    /// Look up a bundled profile by kind and name
    pub fn get(&self, kind: Kind, name: &str) -> Option<&ResolvedProfile> {
        self.profiles(kind).iter().find(|p| p.name == name)
    }

    /// Total number of bundled profiles
    pub fn len(&self) -> usize {
        self.machines.len() + self.prints.len() + self.filaments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Incrementally registers profiles for a multi-profile bundle
#[derive(Debug, Clone, Default)]
pub struct BundleBuilder {
    machines: Vec<ResolvedProfile>,
    prints: Vec<ResolvedProfile>,
    filaments: Vec<ResolvedProfile>,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: Kind) -> &mut Vec<ResolvedProfile> {
        match kind {
            Kind::Machine => &mut self.machines,
            Kind::Print => &mut self.prints,
            Kind::Filament => &mut self.filaments,
        }
    }

    /// Register a resolved profile under its own name and kind.
    pub fn add(&mut self, profile: ResolvedProfile) -> Result<&mut Self, BundleError> {
        if !header_safe(profile.kind, &profile.name) {
            return Err(BundleError::UnrepresentableName {
                kind: profile.kind,
                name: profile.name,
            });
        }
        let slot = self.slot(profile.kind);
        if slot.iter().any(|p| p.name == profile.name) {
            return Err(BundleError::DuplicateProfileName {
                kind: profile.kind,
                name: profile.name,
            });
        }
        slot.push(profile);
        Ok(self)
    }

    /// Number of registered profiles of a kind
    pub fn count(&self, kind: Kind) -> usize {
        match kind {
            Kind::Machine => self.machines.len(),
            Kind::Print => self.prints.len(),
            Kind::Filament => self.filaments.len(),
        }
    }

    /// Registered names of a kind, in registration order
    pub fn names(&self, kind: Kind) -> Vec<&str> {
        let profiles = match kind {
            Kind::Machine => &self.machines,
            Kind::Print => &self.prints,
            Kind::Filament => &self.filaments,
        };
        profiles.iter().map(|p| p.name.as_str()).collect()
    }

    /// Finish the bundle. Every kind needs at least one profile, and each
    /// default must name a registered profile of its kind.
    pub fn build(self, defaults: Presets) -> Result<Bundle, BundleError> {
        for kind in Kind::ALL {
            if self.count(kind) == 0 {
                return Err(BundleError::MissingKind(kind));
            }
            let name = defaults.name(kind);
            if !self.names(kind).contains(&name) {
                return Err(BundleError::InvalidDefault {
                    kind,
                    name: name.to_string(),
                });
            }
        }

        Ok(Bundle {
            machines: self.machines,
            prints: self.prints,
            filaments: self.filaments,
            presets: defaults,
        })
    }
}

/// Names end up on one header line; filament names are also quoted.
fn header_safe(kind: Kind, name: &str) -> bool {
    if name.contains(&['\n', '\r', ']'][..]) {
        return false;
    }
    kind != Kind::Filament || !name.contains('"')
}

//! Profile storage.
//!
//! Profiles live in an arena indexed by `(kind, name)`, so inheritance is
//! expressed purely through names.

use std::collections::HashMap;

use crate::kind::Kind;
use crate::profile::Profile;

/// Read access to the profiles of one vendor.
pub trait ProfileStore {
    /// Vendor scope of this store.
    fn vendor(&self) -> &str;

    /// Look up a profile. `None` means the name is absent from the kind's
    /// namespace.
    fn get(&self, kind: Kind, name: &str) -> Option<&Profile>;

    /// All profile names of a kind, sorted.
    fn names(&self, kind: Kind) -> Vec<&str>;
}

/// Errors building a store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate {kind} profile: '{name}'")]
    DuplicateProfile { kind: Kind, name: String },
}

/// In-memory store for one vendor.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    vendor: String,
    profiles: Vec<Profile>,
    index: HashMap<(Kind, String), usize>,
}

impl MemoryStore {
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            profiles: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a profile. Names must be unique within a kind.
    pub fn insert(&mut self, profile: Profile) -> Result<(), StoreError> {
        let key = (profile.kind, profile.name.clone());
        if self.index.contains_key(&key) {
            return Err(StoreError::DuplicateProfile {
                kind: profile.kind,
                name: profile.name,
            });
        }
        self.index.insert(key, self.profiles.len());
        self.profiles.push(profile);
        Ok(())
    }

    /// Build a store from profiles, failing on the first duplicate.
    pub fn from_profiles(
        vendor: impl Into<String>,
        profiles: impl IntoIterator<Item = Profile>,
    ) -> Result<Self, StoreError> {
        let mut store = Self::new(vendor);
        for profile in profiles {
            store.insert(profile)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Number of profiles of one kind.
    pub fn count(&self, kind: Kind) -> usize {
        self.profiles.iter().filter(|p| p.kind == kind).count()
    }

    /// Exportable profiles of a kind, sorted by name.
    pub fn instantiations(&self, kind: Kind) -> Vec<&Profile> {
        let mut found: Vec<&Profile> = self
            .profiles
            .iter()
            .filter(|p| p.kind == kind && p.is_instantiation())
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }
}

impl ProfileStore for MemoryStore {
    fn vendor(&self) -> &str {
        &self.vendor
    }

    fn get(&self, kind: Kind, name: &str) -> Option<&Profile> {
        self.index
            .get(&(kind, name.to_string()))
            .map(|&i| &self.profiles[i])
    }

    fn names(&self, kind: Kind) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .profiles
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

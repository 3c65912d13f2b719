//! Inheritance resolution.
//!
//! Merge semantics, applied root to leaf:
//! - Parents merge in declaration order, later parents overriding earlier ones
//! - The profile's own settings are written last
//! - Override is by presence: an empty value still replaces an inherited one
//! - A parent name missing from the store is treated as an implicit root

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::kind::Kind;
use crate::normalize::{normalize, NormalizedValue};
use crate::profile::{Profile, RawValue};
use crate::store::ProfileStore;

type FlatSettings = BTreeMap<String, RawValue>;

/// Errors resolving a profile
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Profile not found: {kind} '{name}'")]
    ProfileNotFound { kind: Kind, name: String },

    #[error("Cyclic inheritance in {kind} profiles: {}", chain.join(" -> "))]
    CyclicInheritance { kind: Kind, chain: Vec<String> },
}

/// A fully flattened profile. Parent relationships are no longer observable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedProfile {
    pub name: String,
    pub kind: Kind,
    pub vendor: String,
    pub settings: BTreeMap<String, NormalizedValue>,
}

impl ResolvedProfile {
    pub fn get(&self, key: &str) -> Option<&NormalizedValue> {
        self.settings.get(key)
    }

    /// Scalar value of a setting, if it is a scalar.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_scalar())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.settings.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

/// Request-scoped cache of flattened ancestors.
///
/// Shared bases are resolved once per batch. Entries are keyed by vendor,
/// kind and name, so one cache may span stores of different vendors.
#[derive(Debug, Default)]
pub struct ResolveCache {
    entries: HashMap<(String, Kind, String), Arc<FlatSettings>>,
    hits: usize,
}

impl ResolveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups served from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    fn get(&mut self, vendor: &str, kind: Kind, name: &str) -> Option<Arc<FlatSettings>> {
        let hit = self
            .entries
            .get(&(vendor.to_string(), kind, name.to_string()))
            .cloned();
        if hit.is_some() {
            self.hits += 1;
        }
        hit
    }

    fn insert(&mut self, vendor: &str, kind: Kind, name: &str, flat: Arc<FlatSettings>) {
        self.entries
            .entry((vendor.to_string(), kind, name.to_string()))
            .or_insert(flat);
    }
}

/// Resolves profiles against a store.
pub struct Resolver<'a, S: ProfileStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ProfileStore + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve one profile with a throwaway cache.
    pub fn resolve(&self, name: &str, kind: Kind) -> Result<ResolvedProfile, ResolveError> {
        self.resolve_cached(name, kind, &mut ResolveCache::new())
    }

    /// Resolve one profile, reusing and filling a batch cache.
    pub fn resolve_cached(
        &self,
        name: &str,
        kind: Kind,
        cache: &mut ResolveCache,
    ) -> Result<ResolvedProfile, ResolveError> {
        let profile = self
            .store
            .get(kind, name)
            .ok_or_else(|| ResolveError::ProfileNotFound {
                kind,
                name: name.to_string(),
            })?;

        let mut path = Vec::new();
        let flat = self.flatten(profile, &mut path, cache)?;

        let settings = flat
            .iter()
            .map(|(key, raw)| (key.clone(), normalize(key, raw)))
            .collect();

        Ok(ResolvedProfile {
            name: profile.name.clone(),
            kind,
            vendor: self.store.vendor().to_string(),
            settings,
        })
    }

    /// The chain from the profile up to its roots, nearest first. Each name
    /// appears once; missing parents are omitted.
    pub fn ancestry(&self, name: &str, kind: Kind) -> Result<Vec<String>, ResolveError> {
        let profile = self
            .store
            .get(kind, name)
            .ok_or_else(|| ResolveError::ProfileNotFound {
                kind,
                name: name.to_string(),
            })?;

        let mut out = Vec::new();
        let mut path = Vec::new();
        self.walk(profile, &mut path, &mut out)?;
        Ok(out)
    }

    fn walk(
        &self,
        profile: &'a Profile,
        path: &mut Vec<String>,
        out: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        check_cycle(profile, path)?;
        if !out.contains(&profile.name) {
            out.push(profile.name.clone());
        }
        path.push(profile.name.clone());
        for parent in &profile.inherits {
            if let Some(p) = self.store.get(profile.kind, parent) {
                self.walk(p, path, out)?;
            }
        }
        path.pop();
        Ok(())
    }

    fn flatten(
        &self,
        profile: &'a Profile,
        path: &mut Vec<String>,
        cache: &mut ResolveCache,
    ) -> Result<Arc<FlatSettings>, ResolveError> {
        check_cycle(profile, path)?;

        let vendor = self.store.vendor();
        if let Some(hit) = cache.get(vendor, profile.kind, &profile.name) {
            debug!(kind = %profile.kind, name = %profile.name, "ancestor cache hit");
            return Ok(hit);
        }

        path.push(profile.name.clone());
        let mut merged = FlatSettings::new();
        for parent in &profile.inherits {
            match self.store.get(profile.kind, parent) {
                Some(p) => {
                    let inherited = self.flatten(p, path, cache)?;
                    for (key, value) in inherited.iter() {
                        merged.insert(key.clone(), value.clone());
                    }
                }
                None => {
                    debug!(
                        kind = %profile.kind,
                        name = %profile.name,
                        parent = %parent,
                        "parent not in store, treating as root"
                    );
                }
            }
        }
        for (key, value) in &profile.settings {
            merged.insert(key.clone(), value.clone());
        }
        path.pop();

        let merged = Arc::new(merged);
        cache.insert(vendor, profile.kind, &profile.name, Arc::clone(&merged));
        Ok(merged)
    }
}

fn check_cycle(profile: &Profile, path: &[String]) -> Result<(), ResolveError> {
    if let Some(start) = path.iter().position(|n| *n == profile.name) {
        let mut chain = path[start..].to_vec();
        chain.push(profile.name.clone());
        return Err(ResolveError::CyclicInheritance {
            kind: profile.kind,
            chain,
        });
    }
    Ok(())
}

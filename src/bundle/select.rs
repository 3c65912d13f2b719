//! Profile selection for multi-profile exports.
//!
//! Selects instantiation profiles by glob patterns over their names, and
//! picks the default of each kind for the `presets` section.

use globset::{Glob, GlobSet, GlobSetBuilder};

use sbx_profile::{Kind, ProfileStore};

/// Errors building a selector
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Include/exclude glob filter over profile names
#[derive(Debug, Clone, Default)]
pub struct ProfileSelector {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl ProfileSelector {
    /// Selector matching every name
    pub fn all() -> Self {
        Self::default()
    }

    /// Build from include and exclude patterns. An empty include list
    /// matches every name.
    pub fn new<I, E>(include: I, exclude: E) -> Result<Self, SelectorError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self {
            include: build_set(include)?,
            exclude: build_set(exclude)?,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        let included = self.include.as_ref().map_or(true, |set| set.is_match(name));
        let excluded = self.exclude.as_ref().map_or(false, |set| set.is_match(name));
        included && !excluded
    }

    /// Matching instantiation profile names of a kind, sorted
    pub fn select<S: ProfileStore + ?Sized>(&self, store: &S, kind: Kind) -> Vec<String> {
        store
            .names(kind)
            .into_iter()
            .filter(|name| {
                store
                    .get(kind, name)
                    .map_or(false, |p| p.is_instantiation())
            })
            .filter(|name| self.matches(name))
            .map(str::to_string)
            .collect()
    }
}

fn build_set<I>(patterns: I) -> Result<Option<GlobSet>, SelectorError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut builder = GlobSetBuilder::new();
    let mut count = 0;
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = Glob::new(pattern).map_err(|source| SelectorError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        builder.add(glob);
        count += 1;
    }
    if count == 0 {
        return Ok(None);
    }
    let set = builder.build().map_err(|source| SelectorError::InvalidPattern {
        pattern: "<set>".to_string(),
        source,
    })?;
    Ok(Some(set))
}

/// How to pick a kind's default when no name matches the preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    #[default]
    First,
    Middle,
}

/// Default-selection rule for one kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultRule {
    /// Substring the default's name should contain
    pub preference: Option<String>,
    pub fallback: Fallback,
}

impl DefaultRule {
    pub fn prefer(preference: impl Into<String>) -> Self {
        Self {
            preference: Some(preference.into()),
            fallback: Fallback::First,
        }
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }
}

/// Pick a default name: the first containing the preference, else the
/// fallback position. `None` only for an empty list.
pub fn pick_default<'n>(names: &'n [String], rule: &DefaultRule) -> Option<&'n str> {
    if let Some(preference) = rule.preference.as_deref() {
        if let Some(found) = names.iter().find(|n| n.contains(preference)) {
            return Some(found.as_str());
        }
    }
    let index = match rule.fallback {
        Fallback::First => 0,
        Fallback::Middle => names.len() / 2,
    };
    names.get(index).map(|s| s.as_str())
}

//! Inheritance resolution for slicer configuration profiles.
//!
//! Profiles of three independent kinds (machine, print, filament) inherit
//! settings from zero or more parents. The resolver flattens a profile's
//! ancestor chain into one self-contained mapping, and the normalizer turns
//! raw setting values into scalar or list form for the emitters.

mod kind;
mod normalize;
mod profile;
mod resolve;
mod store;

pub use kind::{Kind, ParseKindError};
pub use normalize::{normalize, NormalizedValue, LIST_SETTINGS};
pub use profile::{Profile, ProfileError, RawValue};
pub use resolve::{ResolveCache, ResolveError, ResolvedProfile, Resolver};
pub use store::{MemoryStore, ProfileStore, StoreError};

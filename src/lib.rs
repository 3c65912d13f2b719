//! SliceBeam profile export
//!
//! This crate converts an OrcaSlicer vendor profile tree into files that
//! SliceBeam can import: resolved flat-text profiles, `.orca_printer` style
//! metadata documents, and bundles that group printer, print and filament
//! profiles with a default selection.
//!
//! Inheritance resolution and value normalization live in `sbx-profile`;
//! this crate adds directory loading, layered configuration, the emitters and
//! the exporter driving them.

pub mod bundle;
pub mod config;
pub mod emit;
pub mod export;
pub mod store;

pub use bundle::{Bundle, BundleBuilder, BundleError, Presets, ProfileSelector};
pub use config::{EffectiveConfig, ExportSettings};
pub use emit::{Format, IniEmitter, MetadataDocument};
pub use export::{ExportEntry, ExportError, ExportReport, Exporter, MasterSelection};
pub use store::{list_vendors, load_vendor, LoadError, LoadedVendor};

pub use sbx_profile::{
    normalize, Kind, MemoryStore, NormalizedValue, Profile, ProfileStore, RawValue,
    ResolveError, ResolvedProfile, Resolver,
};

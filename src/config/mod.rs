//! Export configuration
//!
//! Implements the 4-layer configuration merge:
//! 1. Built-in defaults
//! 2. Host/user config (~/.config/sbx/export.toml)
//! 3. Project config (.sbx/export.toml)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{
    CombinationLimits, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, ExportSettings,
};
pub use merge::{deep_merge, merge_layers};

//! Flat-text (`.ini`) emitter.
//!
//! One `key = value` line per setting, keys in sorted order. Bundles get one
//! bracketed section per profile and a trailing `[presets]` section that
//! SliceBeam reads to pick the defaults at import time.

use std::borrow::Cow;

use sbx_profile::{Kind, ResolvedProfile};

use super::skip_keys;
use crate::bundle::Bundle;

/// Renders resolved profiles and bundles as flat text
#[derive(Debug, Clone, Default)]
pub struct IniEmitter {
    comments: Vec<String>,
}

impl IniEmitter {
    /// Emitter with a leading `# header` comment
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            comments: vec![header.into()],
        }
    }

    /// Emitter with no comment lines
    pub fn bare() -> Self {
        Self::default()
    }

    /// Add another comment line below the header
    pub fn with_comment(mut self, line: impl Into<String>) -> Self {
        self.comments.push(line.into());
        self
    }

    /// Render one resolved profile.
    pub fn render_profile(&self, profile: &ResolvedProfile) -> String {
        let mut out = String::new();
        self.write_comments(&mut out);
        write_settings(&mut out, profile);
        out
    }

    /// Render a bundle: printer sections, then print, then filament, then
    /// the presets section.
    pub fn render_bundle(&self, bundle: &Bundle) -> String {
        let mut out = String::new();
        self.write_comments(&mut out);

        for kind in Kind::ALL {
            for profile in bundle.profiles(kind) {
                out.push_str(&section_header(kind, &profile.name));
                out.push('\n');
                write_settings(&mut out, profile);
                out.push('\n');
            }
        }

        let presets = bundle.presets();
        out.push_str("[presets]\n");
        for kind in [Kind::Print, Kind::Machine, Kind::Filament] {
            out.push_str(kind.section_tag());
            out.push_str(" = ");
            out.push_str(&preset_value(kind, presets.name(kind)));
            out.push('\n');
        }
        out
    }

    fn write_comments(&self, out: &mut String) {
        if self.comments.is_empty() {
            return;
        }
        for line in &self.comments {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
}

fn write_settings(out: &mut String, profile: &ResolvedProfile) {
    let skip = skip_keys(profile.kind);
    for (key, value) in &profile.settings {
        if skip.contains(&key.as_str()) {
            continue;
        }
        out.push_str(key);
        out.push_str(" = ");
        out.push_str(&escape_value(&value.to_flat_text()));
        out.push('\n');
    }
}

/// Section header for a profile, e.g. `[printer:Bambu Lab A1 mini 0.4 nozzle]`.
/// Filament names are quoted.
pub(crate) fn section_header(kind: Kind, name: &str) -> String {
    format!("[{}:{}]", kind.section_tag(), preset_value(kind, name))
}

fn preset_value(kind: Kind, name: &str) -> String {
    match kind {
        Kind::Filament => format!("\"{}\"", name),
        _ => name.to_string(),
    }
}

/// Escape a value so it stays on one line: `\` → `\\`, LF → `\n`, CR → `\r`.
pub fn escape_value(value: &str) -> Cow<'_, str> {
    if !value.contains(&['\\', '\n', '\r'][..]) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

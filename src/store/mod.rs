//! Vendor directory loading
//!
//! Reads an OrcaSlicer profile tree laid out as
//! `<profiles_path>/<vendor>/{machine,process,filament}/**/*.json` into an
//! in-memory [`MemoryStore`]. Unreadable, malformed or duplicate documents
//! are skipped and reported, never fatal.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use sbx_profile::{Kind, MemoryStore, Profile};

/// Errors loading a vendor tree
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Profiles path not found: {0}")]
    ProfilesPathNotFound(PathBuf),

    #[error("Vendor directory not found: {0}")]
    VendorNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A profile document that was not loaded
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of loading one vendor
#[derive(Debug)]
pub struct LoadedVendor {
    pub store: MemoryStore,
    pub skipped: Vec<SkippedFile>,
}

/// Load every profile document of a vendor.
pub fn load_vendor(profiles_path: &Path, vendor: &str) -> Result<LoadedVendor, LoadError> {
    if !profiles_path.is_dir() {
        return Err(LoadError::ProfilesPathNotFound(profiles_path.to_path_buf()));
    }
    let vendor_dir = profiles_path.join(vendor);
    if !vendor_dir.is_dir() {
        return Err(LoadError::VendorNotFound(vendor_dir));
    }

    let mut store = MemoryStore::new(vendor);
    let mut skipped = Vec::new();

    for kind in Kind::ALL {
        let kind_dir = vendor_dir.join(kind.dir_name());
        if !kind_dir.is_dir() {
            debug!(vendor, kind = %kind, "no {} directory", kind.dir_name());
            continue;
        }

        for path in json_files(&kind_dir)? {
            let outcome = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|text| Profile::from_json_str(kind, &text).map_err(|e| e.to_string()))
                .and_then(|profile| store.insert(profile).map_err(|e| e.to_string()));

            if let Err(reason) = outcome {
                warn!(path = %path.display(), %reason, "skipping profile document");
                skipped.push(SkippedFile { path, reason });
            }
        }
    }

    debug!(vendor, profiles = store.len(), skipped = skipped.len(), "vendor loaded");
    Ok(LoadedVendor { store, skipped })
}

/// Vendors that ship at least one machine profile document, sorted.
pub fn list_vendors(profiles_path: &Path) -> Result<Vec<String>, LoadError> {
    if !profiles_path.is_dir() {
        return Err(LoadError::ProfilesPathNotFound(profiles_path.to_path_buf()));
    }

    let mut vendors = Vec::new();
    for entry in fs::read_dir(profiles_path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || !entry.file_type()?.is_dir() {
            continue;
        }
        let machine_dir = entry.path().join(Kind::Machine.dir_name());
        if machine_dir.is_dir() && !json_files(&machine_dir)?.is_empty() {
            vendors.push(name);
        }
    }
    vendors.sort();
    Ok(vendors)
}

/// `*.json` files below a directory, in sorted path order
fn json_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry?;
        let is_json = entry.path().extension().map_or(false, |ext| ext == "json");
        if entry.file_type().is_file() && is_json {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

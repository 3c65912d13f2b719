//! Export runs
//!
//! Resolves profiles against a store, renders them with the emitters and
//! writes the results to the output directory. Batch operations record a
//! per-item outcome and keep going after a failure.

mod report;

pub use report::{
    EntryStatus, ExportEntry, ExportReport, WrittenFile, REPORT_FILE_NAME, SCHEMA_ID,
    SCHEMA_VERSION,
};

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use sbx_profile::{Kind, ProfileStore, ResolveCache, ResolveError, ResolvedProfile, Resolver};

use crate::bundle::{
    bundle_file_name, pick_default, safe_name, Bundle, BundleBuilder, BundleError, DefaultRule,
    Fallback, Presets, ProfileSelector,
};
use crate::config::{CombinationLimits, ExportSettings};
use crate::emit::{Format, IniEmitter, MetadataDocument};

/// Errors for a single export item
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output file '{file}' was already written for {previous} in this run")]
    FileNameCollision { file: String, previous: String },
}

/// A rendered document not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub file_name: String,
    pub contents: String,
}

/// Profile selection and default rule for one kind
#[derive(Debug, Clone, Default)]
pub struct KindSelection {
    pub selector: ProfileSelector,
    pub default: DefaultRule,
}

/// Which profiles go into master and combination exports
#[derive(Debug, Clone)]
pub struct MasterSelection {
    pub machine: KindSelection,
    pub print: KindSelection,
    pub filament: KindSelection,
}

impl Default for MasterSelection {
    fn default() -> Self {
        Self {
            machine: KindSelection {
                selector: ProfileSelector::all(),
                default: DefaultRule::prefer("0.4 nozzle"),
            },
            print: KindSelection {
                selector: ProfileSelector::all(),
                default: DefaultRule::prefer("0.20mm Standard").with_fallback(Fallback::Middle),
            },
            filament: KindSelection {
                selector: ProfileSelector::all(),
                default: DefaultRule::prefer("PLA Basic"),
            },
        }
    }
}

impl MasterSelection {
    pub fn get(&self, kind: Kind) -> &KindSelection {
        match kind {
            Kind::Machine => &self.machine,
            Kind::Print => &self.print,
            Kind::Filament => &self.filament,
        }
    }
}

/// Runs exports against one store
pub struct Exporter<'a, S: ProfileStore + ?Sized> {
    store: &'a S,
    output_dir: PathBuf,
    header: String,
    cache: ResolveCache,
    /// Paths written in this run and the item that wrote each
    written: HashMap<PathBuf, String>,
}

impl<'a, S: ProfileStore + ?Sized> Exporter<'a, S> {
    pub fn new(store: &'a S, settings: &ExportSettings) -> Self {
        Self {
            store,
            output_dir: settings.output_dir.clone(),
            header: settings.header.clone(),
            cache: ResolveCache::new(),
            written: HashMap::new(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Resolve through the run's ancestor cache
    pub fn resolve(&mut self, kind: Kind, name: &str) -> Result<ResolvedProfile, ResolveError> {
        Resolver::new(self.store).resolve_cached(name, kind, &mut self.cache)
    }

    /// Render one profile in one format
    pub fn render_profile(
        &mut self,
        kind: Kind,
        name: &str,
        format: Format,
    ) -> Result<RenderedFile, ExportError> {
        let profile = self.resolve(kind, name)?;
        self.render_resolved(&profile, format)
    }

    fn render_resolved(
        &self,
        profile: &ResolvedProfile,
        format: Format,
    ) -> Result<RenderedFile, ExportError> {
        let contents = match format {
            Format::Ini => IniEmitter::new(self.header.as_str()).render_profile(profile),
            Format::Metadata => MetadataDocument::from_profile(profile).to_json()?,
        };
        Ok(RenderedFile {
            file_name: format!("{}.{}", safe_name(&profile.name), format.extension()),
            contents,
        })
    }

    /// Resolve one profile and write it in each format
    pub fn export_profile(&mut self, kind: Kind, name: &str, formats: &[Format]) -> ExportEntry {
        match self.try_export_profile(kind, name, formats) {
            Ok(files) => ExportEntry::ok(name, Some(kind), files),
            Err(e) => {
                warn!(kind = %kind, name, error = %e, "export failed");
                ExportEntry::failed(name, Some(kind), e)
            }
        }
    }

    fn try_export_profile(
        &mut self,
        kind: Kind,
        name: &str,
        formats: &[Format],
    ) -> Result<Vec<WrittenFile>, ExportError> {
        let profile = self.resolve(kind, name)?;
        let owner = format!("{} profile '{}'", kind, name);
        let mut files = Vec::with_capacity(formats.len());
        for format in formats {
            let rendered = self.render_resolved(&profile, *format)?;
            files.push(self.write(&owner, &rendered)?);
        }
        Ok(files)
    }

    /// Export every selected instantiation profile of a kind
    pub fn batch(
        &mut self,
        kind: Kind,
        selector: &ProfileSelector,
        formats: &[Format],
    ) -> ExportReport {
        let mut report = ExportReport::new(self.store.vendor());
        for name in selector.select(self.store, kind) {
            report.push(self.export_profile(kind, &name, formats));
        }
        report
    }

    /// Compose a single printer/print/filament bundle
    pub fn compose_bundle(
        &mut self,
        printer: &str,
        print: &str,
        filament: &str,
    ) -> Result<Bundle, ExportError> {
        let machine = self.resolve(Kind::Machine, printer)?;
        let process = self.resolve(Kind::Print, print)?;
        let material = self.resolve(Kind::Filament, filament)?;
        let defaults = Presets::new(&machine.name, &process.name, &material.name);
        Ok(Bundle::compose(machine, process, material, defaults)?)
    }

    /// Write a bundle to `<printer>--<filament>--<print>.ini`
    pub fn export_bundle(&mut self, printer: &str, print: &str, filament: &str) -> ExportEntry {
        let file_name = bundle_file_name(printer, print, filament);
        let owner = format!("bundle '{}' + '{}' + '{}'", printer, filament, print);
        let result = self.compose_bundle(printer, print, filament).and_then(|bundle| {
            let emitter = IniEmitter::new(self.header.as_str())
                .with_comment(format!("Printer: {}", printer))
                .with_comment(format!("Filament: {}", filament))
                .with_comment(format!("Process: {}", print));
            self.write(
                &owner,
                &RenderedFile {
                    file_name: file_name.clone(),
                    contents: emitter.render_bundle(&bundle),
                },
            )
        });

        match result {
            Ok(file) => ExportEntry::ok(file_name, None, vec![file]),
            Err(e) => {
                warn!(file = %file_name, error = %e, "bundle export failed");
                ExportEntry::failed(file_name, None, e)
            }
        }
    }

    /// Selected instantiation names for each kind
    pub fn select(&self, selection: &MasterSelection) -> [Vec<String>; 3] {
        Kind::ALL.map(|kind| selection.get(kind).selector.select(self.store, kind))
    }

    /// Compose one bundle holding every selected profile. Profiles that fail
    /// to resolve, or whose names cannot be written as a section header, are
    /// left out and returned as warnings.
    pub fn compose_master(
        &mut self,
        selection: &MasterSelection,
    ) -> Result<(Bundle, Vec<String>), ExportError> {
        let mut builder = BundleBuilder::new();
        let mut warnings = Vec::new();
        let mut defaults = Vec::with_capacity(3);

        for (kind, names) in Kind::ALL.into_iter().zip(self.select(selection)) {
            let mut added = Vec::new();
            for name in names {
                match self.resolve(kind, &name) {
                    Ok(profile) => match builder.add(profile) {
                        Ok(_) => added.push(name),
                        Err(e @ BundleError::UnrepresentableName { .. }) => {
                            warn!(kind = %kind, name = %name, error = %e, "left out of master bundle");
                            warnings.push(e.to_string());
                        }
                        Err(e) => return Err(e.into()),
                    },
                    Err(e) => {
                        warn!(kind = %kind, name = %name, error = %e, "left out of master bundle");
                        warnings.push(e.to_string());
                    }
                }
            }
            let default = pick_default(&added, &selection.get(kind).default)
                .ok_or(BundleError::MissingKind(kind))?;
            defaults.push(default.to_string());
        }

        let [machine, print, filament]: [String; 3] = defaults
            .try_into()
            .map_err(|_| BundleError::MissingKind(Kind::Machine))?;
        let bundle = builder.build(Presets::new(machine, print, filament))?;
        Ok((bundle, warnings))
    }

    /// Write a master bundle to `file_name` in the output directory
    pub fn export_master(&mut self, selection: &MasterSelection, file_name: &str) -> ExportEntry {
        let result = self.compose_master(selection).and_then(|(bundle, warnings)| {
            let emitter = IniEmitter::new(self.header.as_str()).with_comment(format!(
                "{} printers, {} prints, {} filaments",
                bundle.profiles(Kind::Machine).len(),
                bundle.profiles(Kind::Print).len(),
                bundle.profiles(Kind::Filament).len(),
            ));
            let file = self.write(
                "the master bundle",
                &RenderedFile {
                    file_name: file_name.to_string(),
                    contents: emitter.render_bundle(&bundle),
                },
            )?;
            Ok((file, warnings))
        });

        match result {
            Ok((file, warnings)) => {
                ExportEntry::ok(file_name, None, vec![file]).with_warnings(warnings)
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "master bundle export failed");
                ExportEntry::failed(file_name, None, e)
            }
        }
    }

    /// One bundle per printer × filament × print combination, each list
    /// truncated to its limit.
    pub fn export_combinations(
        &mut self,
        selection: &MasterSelection,
        limits: &CombinationLimits,
    ) -> ExportReport {
        let [mut printers, mut prints, mut filaments] = self.select(selection);
        printers.truncate(limits.max_printers);
        prints.truncate(limits.max_prints);
        filaments.truncate(limits.max_filaments);

        let mut report = ExportReport::new(self.store.vendor());
        for printer in &printers {
            for filament in &filaments {
                for print in &prints {
                    report.push(self.export_bundle(printer, print, filament));
                }
            }
        }
        report
    }

    /// Write one rendered file. A path may be rewritten by the item that
    /// first wrote it, never by a different one.
    fn write(&mut self, owner: &str, rendered: &RenderedFile) -> Result<WrittenFile, ExportError> {
        let path = self.output_dir.join(&rendered.file_name);
        if let Some(previous) = self.written.get(&path) {
            if previous != owner {
                return Err(ExportError::FileNameCollision {
                    file: rendered.file_name.clone(),
                    previous: previous.clone(),
                });
            }
        }

        fs::create_dir_all(&self.output_dir)?;
        fs::write(&path, rendered.contents.as_bytes())?;
        self.written.insert(path.clone(), owner.to_string());

        let digest = hex::encode(Sha256::digest(rendered.contents.as_bytes()));
        info!(path = %path.display(), bytes = rendered.contents.len(), "wrote");

        Ok(WrittenFile {
            path: path.to_string_lossy().to_string(),
            bytes: rendered.contents.len() as u64,
            sha256: digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbx_profile::{MemoryStore, Profile};
    use tempfile::TempDir;

    fn store() -> MemoryStore {
        MemoryStore::from_profiles(
            "BBL",
            vec![
                Profile::new("fdm_common", Kind::Machine)
                    .template()
                    .with_setting("printable_height", "180"),
                Profile::new("A1 mini 0.4 nozzle", Kind::Machine).with_parent("fdm_common"),
                Profile::new("A1 mini 0.2 nozzle", Kind::Machine).with_parent("fdm_common"),
                Profile::new("0.20mm Standard", Kind::Print).with_setting("layer_height", "0.2"),
                Profile::new("PLA Basic", Kind::Filament),
                Profile::new("Loop", Kind::Filament).with_parent("Loop"),
            ],
        )
        .unwrap()
    }

    fn exporter<'a>(store: &'a MemoryStore, dir: &Path) -> Exporter<'a, MemoryStore> {
        Exporter::new(store, &ExportSettings::default()).with_output_dir(dir)
    }

    #[test]
    fn test_render_profile_file_names() {
        let store = store();
        let temp = TempDir::new().unwrap();
        let mut exporter = exporter(&store, temp.path());

        let ini = exporter
            .render_profile(Kind::Machine, "A1 mini 0.4 nozzle", Format::Ini)
            .unwrap();
        assert_eq!(ini.file_name, "A1_mini_0_4_nozzle.ini");
        assert!(ini.contents.contains("printable_height = 180\n"));

        let meta = exporter
            .render_profile(Kind::Machine, "A1 mini 0.4 nozzle", Format::Metadata)
            .unwrap();
        assert_eq!(meta.file_name, "A1_mini_0_4_nozzle.orca_printer");
    }

    #[test]
    fn test_export_profile_writes_and_digests() {
        let store = store();
        let temp = TempDir::new().unwrap();
        let mut exporter = exporter(&store, temp.path());

        let entry = exporter.export_profile(
            Kind::Print,
            "0.20mm Standard",
            &[Format::Ini, Format::Metadata],
        );
        assert!(entry.is_ok());
        assert_eq!(entry.files.len(), 2);

        let ini = fs::read(temp.path().join("0_20mm_Standard.ini")).unwrap();
        assert_eq!(entry.files[0].bytes, ini.len() as u64);
        assert_eq!(entry.files[0].sha256, hex::encode(Sha256::digest(&ini)));
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let store = store();
        let temp = TempDir::new().unwrap();
        let mut exporter = exporter(&store, temp.path());

        let report = exporter.batch(Kind::Filament, &ProfileSelector::all(), &[Format::Ini]);
        assert_eq!(report.total(), 2);
        assert_eq!(report.failed(), 1);
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.target, "Loop");
        assert!(failure.error.as_deref().unwrap().contains("Cyclic inheritance"));
        assert!(temp.path().join("PLA_Basic.ini").exists());
    }

    #[test]
    fn test_export_bundle_file() {
        let store = store();
        let temp = TempDir::new().unwrap();
        let mut exporter = exporter(&store, temp.path());

        let entry = exporter.export_bundle("A1 mini 0.4 nozzle", "0.20mm Standard", "PLA Basic");
        assert!(entry.is_ok(), "{:?}", entry.error);
        assert_eq!(
            entry.target,
            "A1_mini_0_4_nozzle--PLA_Basic--0_20mm_Standard.ini"
        );

        let text = fs::read_to_string(temp.path().join(&entry.target)).unwrap();
        assert!(text.contains("[printer:A1 mini 0.4 nozzle]\n"));
        assert!(text.contains("[presets]\nprint = 0.20mm Standard\n"));
        assert!(text.contains("# Filament: PLA Basic\n"));
    }

    #[test]
    fn test_export_bundle_missing_profile() {
        let store = store();
        let temp = TempDir::new().unwrap();
        let mut exporter = exporter(&store, temp.path());

        let entry = exporter.export_bundle("A1 mini 0.4 nozzle", "0.12mm Fine", "PLA Basic");
        assert!(!entry.is_ok());
        assert!(entry.error.unwrap().contains("Profile not found"));
    }

    #[test]
    fn test_master_bundle_defaults_and_warnings() {
        let store = store();
        let temp = TempDir::new().unwrap();
        let mut exporter = exporter(&store, temp.path());

        let (bundle, warnings) = exporter.compose_master(&MasterSelection::default()).unwrap();
        assert_eq!(bundle.profiles(Kind::Machine).len(), 2);
        assert_eq!(bundle.presets().machine, "A1 mini 0.4 nozzle");
        assert_eq!(bundle.presets().print, "0.20mm Standard");
        assert_eq!(bundle.presets().filament, "PLA Basic");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Loop"));
    }

    #[test]
    fn test_master_skips_unrepresentable_names() {
        let store = MemoryStore::from_profiles(
            "BBL",
            vec![
                Profile::new("A1 mini 0.4 nozzle", Kind::Machine),
                Profile::new("0.20mm Standard", Kind::Print),
                Profile::new("PLA \"Silk\"", Kind::Filament),
                Profile::new("PLA Basic", Kind::Filament),
            ],
        )
        .unwrap();
        let temp = TempDir::new().unwrap();
        let mut exporter = exporter(&store, temp.path());

        let entry = exporter.export_master(&MasterSelection::default(), "master.ini");
        assert!(entry.is_ok(), "{:?}", entry.error);
        assert_eq!(entry.warnings.len(), 1);
        assert!(entry.warnings[0].contains("section header"));

        let text = fs::read_to_string(temp.path().join("master.ini")).unwrap();
        assert_eq!(text.matches("[filament:").count(), 1);
    }

    #[test]
    fn test_combinations_respect_limits() {
        let store = store();
        let temp = TempDir::new().unwrap();
        let mut exporter = exporter(&store, temp.path());

        let mut selection = MasterSelection::default();
        selection.filament.selector = ProfileSelector::new(["PLA*"], Vec::<&str>::new()).unwrap();
        let limits = CombinationLimits {
            max_printers: 1,
            max_filaments: 10,
            max_prints: 10,
        };

        let report = exporter.export_combinations(&selection, &limits);
        assert_eq!(report.total(), 1);
        assert!(report.is_success());
        assert!(temp
            .path()
            .join("A1_mini_0_2_nozzle--PLA_Basic--0_20mm_Standard.ini")
            .exists());
    }

    fn colliding_store() -> MemoryStore {
        MemoryStore::from_profiles(
            "BBL",
            vec![
                Profile::new("A1+ mini", Kind::Machine),
                Profile::new("A1/ mini", Kind::Machine),
                Profile::new("0.20mm Standard", Kind::Print),
                Profile::new("PLA+ Basic", Kind::Filament).with_setting("filament_type", "PLA+"),
                Profile::new("PLA/ Basic", Kind::Filament).with_setting("filament_type", "PLA"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_batch_reports_file_name_collision() {
        let store = colliding_store();
        let temp = TempDir::new().unwrap();
        let mut exporter = exporter(&store, temp.path());

        let report = exporter.batch(Kind::Filament, &ProfileSelector::all(), &[Format::Ini]);
        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded(), 1);

        let failure = report.failures().next().unwrap();
        assert_eq!(failure.target, "PLA/ Basic");
        let error = failure.error.as_deref().unwrap();
        assert!(error.contains("PLA__Basic.ini"), "{}", error);
        assert!(error.contains("'PLA+ Basic'"), "{}", error);

        // The surviving file is the one the ok entry describes
        let ok = report.entries.iter().find(|e| e.is_ok()).unwrap();
        let on_disk = fs::read(temp.path().join("PLA__Basic.ini")).unwrap();
        assert_eq!(ok.files[0].sha256, hex::encode(Sha256::digest(&on_disk)));
        assert!(String::from_utf8(on_disk).unwrap().contains("filament_type = PLA+\n"));
    }

    #[test]
    fn test_same_profile_may_rewrite_its_file() {
        let store = colliding_store();
        let temp = TempDir::new().unwrap();
        let mut exporter = exporter(&store, temp.path());

        assert!(exporter
            .export_profile(Kind::Filament, "PLA+ Basic", &[Format::Ini, Format::Ini])
            .is_ok());
        assert!(exporter
            .export_profile(Kind::Filament, "PLA+ Basic", &[Format::Ini])
            .is_ok());
    }

    #[test]
    fn test_combinations_report_file_name_collision() {
        let store = colliding_store();
        let temp = TempDir::new().unwrap();
        let mut exporter = exporter(&store, temp.path());

        let mut selection = MasterSelection::default();
        selection.filament.selector = ProfileSelector::new(["PLA+*"], Vec::<&str>::new()).unwrap();
        let limits = CombinationLimits {
            max_printers: 10,
            max_filaments: 10,
            max_prints: 10,
        };

        let report = exporter.export_combinations(&selection, &limits);
        assert_eq!(report.total(), 2);
        assert_eq!(report.failed(), 1);
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.target, "A1__mini--PLA__Basic--0_20mm_Standard.ini");
        assert!(failure
            .error
            .as_deref()
            .unwrap()
            .contains("already written for bundle 'A1+ mini'"));
    }
}

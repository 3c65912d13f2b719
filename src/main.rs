//! SliceBeam export CLI
//!
//! Entry point for the `sbx` command-line tool.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slicebeam_export::bundle::{DefaultRule, ProfileSelector};
use slicebeam_export::config::{EffectiveConfig, ExportSettings};
use slicebeam_export::export::{ExportReport, Exporter, MasterSelection, REPORT_FILE_NAME};
use slicebeam_export::{list_vendors, load_vendor, Format, Kind, LoadedVendor};

/// Effective config written alongside the export report
const CONFIG_FILE_NAME: &str = "effective_config.json";

#[derive(Parser)]
#[command(name = "sbx")]
#[command(about = "Export OrcaSlicer profiles for SliceBeam", version)]
struct Cli {
    /// Path to project config file (default: .sbx/export.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Root of the OrcaSlicer vendor profile directories
    #[arg(long, global = true)]
    profiles_path: Option<PathBuf>,

    /// Vendor directory to export from
    #[arg(long, global = true)]
    vendor: Option<String>,

    /// Directory to write exported files to
    #[arg(long, short = 'o', global = true)]
    output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List vendors with their printer profile counts
    Vendors,

    /// List exportable profiles
    Profiles {
        /// Only list one kind (machine, print, filament)
        #[arg(long, short = 'k')]
        kind: Option<Kind>,
    },

    /// Export one resolved profile
    Export {
        /// Profile name
        #[arg(long, short = 'p')]
        profile: String,

        /// Profile kind (machine, print, filament)
        #[arg(long, short = 'k', default_value = "machine")]
        kind: Kind,

        /// Output format (default: configured formats)
        #[arg(long, short = 'f', value_enum)]
        format: Option<FormatChoice>,
    },

    /// Export every matching profile of a kind
    Batch {
        /// Profile kind (machine, print, filament)
        #[arg(long, short = 'k', default_value = "machine")]
        kind: Kind,

        /// Glob over profile names to include (repeatable)
        #[arg(long)]
        include: Vec<String>,

        /// Glob over profile names to exclude (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Output format (default: configured formats)
        #[arg(long, short = 'f', value_enum)]
        format: Option<FormatChoice>,
    },

    /// Export a printer/print/filament bundle
    Bundle {
        #[arg(long)]
        printer: String,

        #[arg(long)]
        print: String,

        #[arg(long)]
        filament: String,
    },

    /// Export one bundle holding every selected profile
    Master {
        #[command(flatten)]
        select: SelectArgs,

        /// Bundle file name inside the output directory
        #[arg(long, default_value = "slicebeam_master_bundle.ini")]
        output: String,
    },

    /// Export one bundle per printer/filament/print combination
    Combos {
        #[command(flatten)]
        select: SelectArgs,
    },

    /// Print the effective configuration
    Config {
        /// Print one value by dot-separated path (e.g. combinations.max_prints)
        #[arg(long)]
        key: Option<String>,
    },
}

#[derive(Args)]
struct SelectArgs {
    /// Glob over printer names (repeatable)
    #[arg(long)]
    printers: Vec<String>,

    /// Glob over print names (repeatable)
    #[arg(long)]
    prints: Vec<String>,

    /// Glob over filament names (repeatable)
    #[arg(long)]
    filaments: Vec<String>,

    /// Substring the default printer should contain
    #[arg(long)]
    default_printer: Option<String>,

    /// Substring the default print should contain
    #[arg(long)]
    default_print: Option<String>,

    /// Substring the default filament should contain
    #[arg(long)]
    default_filament: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatChoice {
    Ini,
    Metadata,
    Both,
}

impl FormatChoice {
    fn formats(self) -> Vec<Format> {
        match self {
            FormatChoice::Ini => vec![Format::Ini],
            FormatChoice::Metadata => vec![Format::Metadata],
            FormatChoice::Both => vec![Format::Ini, Format::Metadata],
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (config, settings) = load_config(&cli);

    match cli.command {
        Commands::Vendors => run_vendors(&settings),
        Commands::Profiles { kind } => run_profiles(&settings, kind),
        Commands::Export {
            profile,
            kind,
            format,
        } => run_export(&settings, kind, &profile, format),
        Commands::Batch {
            kind,
            include,
            exclude,
            format,
        } => run_batch(&config, &settings, kind, &include, &exclude, format),
        Commands::Bundle {
            printer,
            print,
            filament,
        } => run_bundle(&settings, &printer, &print, &filament),
        Commands::Master { select, output } => run_master(&settings, &select, &output),
        Commands::Combos { select } => run_combos(&config, &settings, &select),
        Commands::Config { key } => run_config(&config, key.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();
}

/// CLI flags as the top config layer
fn cli_overrides(cli: &Cli) -> Option<Value> {
    let mut map = Map::new();
    if let Some(ref path) = cli.profiles_path {
        map.insert("profiles_path".into(), json!(path.to_string_lossy()));
    }
    if let Some(ref vendor) = cli.vendor {
        map.insert("vendor".into(), json!(vendor));
    }
    if let Some(ref dir) = cli.output_dir {
        map.insert("output_dir".into(), json!(dir.to_string_lossy()));
    }
    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

fn load_config(cli: &Cli) -> (EffectiveConfig, ExportSettings) {
    let host = EffectiveConfig::default_host_path();
    let project = cli
        .config
        .clone()
        .unwrap_or_else(EffectiveConfig::default_project_path);

    if let Some(ref path) = cli.config {
        if !path.exists() {
            eprintln!("Config file not found: {}", path.display());
            process::exit(1);
        }
    }

    let config = match EffectiveConfig::build(
        host.as_deref(),
        Some(project.as_path()),
        cli_overrides(cli),
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };
    match config.settings() {
        Ok(settings) => (config, settings),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    }
}

fn load_store(settings: &ExportSettings) -> LoadedVendor {
    match load_vendor(&settings.profiles_path, &settings.vendor) {
        Ok(loaded) => {
            if !loaded.skipped.is_empty() {
                eprintln!(
                    "Warning: {} profile document(s) skipped in {}",
                    loaded.skipped.len(),
                    settings.vendor
                );
            }
            loaded
        }
        Err(e) => {
            eprintln!("Error loading profiles: {}", e);
            process::exit(1);
        }
    }
}

fn run_vendors(settings: &ExportSettings) {
    let vendors = match list_vendors(&settings.profiles_path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error listing vendors: {}", e);
            process::exit(1);
        }
    };

    if vendors.is_empty() {
        println!("No vendors found in {}", settings.profiles_path.display());
        return;
    }

    println!("Vendors ({} total):\n", vendors.len());
    for vendor in vendors {
        match load_vendor(&settings.profiles_path, &vendor) {
            Ok(loaded) => println!(
                "  {} ({} printers)",
                vendor,
                loaded.store.instantiations(Kind::Machine).len()
            ),
            Err(e) => println!("  {} (unreadable: {})", vendor, e),
        }
    }
}

fn run_profiles(settings: &ExportSettings, kind: Option<Kind>) {
    let loaded = load_store(settings);
    let kinds: Vec<Kind> = match kind {
        Some(k) => vec![k],
        None => Kind::ALL.to_vec(),
    };

    for kind in kinds {
        let profiles = loaded.store.instantiations(kind);
        println!("{} profiles ({}):", kind, profiles.len());
        for profile in profiles {
            println!("  {}", profile.name);
        }
        println!();
    }
}

fn run_export(settings: &ExportSettings, kind: Kind, name: &str, format: Option<FormatChoice>) {
    let loaded = load_store(settings);
    let formats = format.map_or_else(|| settings.formats.clone(), FormatChoice::formats);

    let mut exporter = Exporter::new(&loaded.store, settings);
    let entry = exporter.export_profile(kind, name, &formats);

    if let Some(ref error) = entry.error {
        eprintln!("Export failed: {}", error);
        process::exit(1);
    }
    for file in &entry.files {
        println!("{}", file.path);
    }
}

fn run_config(config: &EffectiveConfig, key: Option<&str>) {
    let output = match key {
        Some(key) => match config.get(key) {
            Some(value) => serde_json::to_string_pretty(value),
            None => {
                eprintln!("Config key not found: {}", key);
                process::exit(1);
            }
        },
        None => config.to_json(),
    };
    match output {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            process::exit(1);
        }
    }
}

fn run_batch(
    config: &EffectiveConfig,
    settings: &ExportSettings,
    kind: Kind,
    include: &[String],
    exclude: &[String],
    format: Option<FormatChoice>,
) {
    let selector = match ProfileSelector::new(include, exclude) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let loaded = load_store(settings);
    let formats = format.map_or_else(|| settings.formats.clone(), FormatChoice::formats);

    let mut exporter = Exporter::new(&loaded.store, settings);
    eprintln!("Exporting {} profiles from {}...", kind, settings.vendor);
    let report = exporter.batch(kind, &selector, &formats);
    finish(config, settings, &report);
}

fn run_bundle(settings: &ExportSettings, printer: &str, print: &str, filament: &str) {
    let loaded = load_store(settings);
    let mut exporter = Exporter::new(&loaded.store, settings);

    let entry = exporter.export_bundle(printer, print, filament);
    if let Some(ref error) = entry.error {
        eprintln!("Bundle export failed: {}", error);
        process::exit(1);
    }
    for file in &entry.files {
        println!("{}", file.path);
    }
}

fn build_selection(args: &SelectArgs) -> MasterSelection {
    let mut selection = MasterSelection::default();

    for (slot, patterns, preference) in [
        (&mut selection.machine, &args.printers, &args.default_printer),
        (&mut selection.print, &args.prints, &args.default_print),
        (&mut selection.filament, &args.filaments, &args.default_filament),
    ] {
        slot.selector = match ProfileSelector::new(patterns, Vec::<&str>::new()) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        };
        if let Some(preference) = preference {
            slot.default = DefaultRule::prefer(preference.as_str())
                .with_fallback(slot.default.fallback);
        }
    }
    selection
}

fn run_master(settings: &ExportSettings, args: &SelectArgs, output: &str) {
    let selection = build_selection(args);
    let loaded = load_store(settings);
    let mut exporter = Exporter::new(&loaded.store, settings);

    let entry = exporter.export_master(&selection, output);
    for warning in &entry.warnings {
        eprintln!("Warning: {}", warning);
    }
    if let Some(ref error) = entry.error {
        eprintln!("Master bundle export failed: {}", error);
        process::exit(1);
    }
    for file in &entry.files {
        println!("{}", file.path);
    }
}

fn run_combos(config: &EffectiveConfig, settings: &ExportSettings, args: &SelectArgs) {
    let selection = build_selection(args);
    let loaded = load_store(settings);
    let mut exporter = Exporter::new(&loaded.store, settings);

    let limits = &settings.combinations;
    eprintln!(
        "Exporting combinations (up to {} printers, {} filaments, {} prints)...",
        limits.max_printers, limits.max_filaments, limits.max_prints
    );
    let report = exporter.export_combinations(&selection, limits);
    finish(config, settings, &report);
}

/// Print the summary, write the report and the effective config next to
/// it, and exit 1 when any item failed
fn finish(config: &EffectiveConfig, settings: &ExportSettings, report: &ExportReport) {
    for entry in report.failures() {
        eprintln!(
            "  FAILED {}: {}",
            entry.target,
            entry.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!(
        "Total: {}, succeeded: {}, failed: {}",
        report.total(),
        report.succeeded(),
        report.failed()
    );

    if settings.report {
        let path = settings.output_dir.join(REPORT_FILE_NAME);
        let config_path = settings.output_dir.join(CONFIG_FILE_NAME);
        let written = std::fs::create_dir_all(&settings.output_dir)
            .and_then(|_| report.write_to_file(&path))
            .and_then(|_| config.write_to_file(&config_path));
        match written {
            Ok(()) => println!("Report: {}", path.display()),
            Err(e) => {
                eprintln!("Error writing report: {}", e);
                process::exit(1);
            }
        }
    }

    if !report.is_success() {
        process::exit(1);
    }
}

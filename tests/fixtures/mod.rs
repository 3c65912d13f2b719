//! Test fixtures for end-to-end export tests
//!
//! Lays out a small OrcaSlicer-style vendor tree in a temporary directory:
//! template bases, concrete printers for two nozzle sizes, a few processes
//! and filaments, plus one cyclic filament pair.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const VENDOR: &str = "BBL";

/// Bed polygon shared by the A1 mini machine profiles
pub const A1M_PRINTABLE_AREA: &str = "0x0;180x0;180x180;0x180";

/// Start G-code kept verbatim through resolution
pub const START_GCODE: &str = "G28 ; home\nM104 S[nozzle_temperature]\nG1 Z0.2 F600";

/// A vendor profile tree inside a temporary directory
pub struct VendorTree {
    dir: TempDir,
}

impl VendorTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Tree populated with the standard A1 mini fixture set
    pub fn a1_mini() -> Self {
        let tree = Self::new();

        tree.machine(
            "common/fdm_machine_common.json",
            json!({
                "name": "fdm_machine_common",
                "instantiation": "false",
                "printer_technology": "FFF",
                "machine_max_speed_x": "500,200",
                "retraction_length": ["0.8"],
                "z_hop": "0.4"
            }),
        );
        tree.machine(
            "common/fdm_bbl_3dp_001_common.json",
            json!({
                "name": "fdm_bbl_3dp_001_common",
                "inherits": "fdm_machine_common",
                "instantiation": "false",
                "printable_area": A1M_PRINTABLE_AREA,
                "printable_height": "180",
                "machine_start_gcode": START_GCODE
            }),
        );
        tree.machine(
            "Bambu Lab A1 mini 0.4 nozzle.json",
            json!({
                "name": "Bambu Lab A1 mini 0.4 nozzle",
                "inherits": "fdm_bbl_3dp_001_common",
                "instantiation": "true",
                "printer_model": "Bambu Lab A1 mini",
                "printer_variant": "0.4",
                "nozzle_diameter": ["0.4"],
                "default_print_profile": "0.20mm Standard @BBL A1M"
            }),
        );
        tree.machine(
            "Bambu Lab A1 mini 0.2 nozzle.json",
            json!({
                "name": "Bambu Lab A1 mini 0.2 nozzle",
                "inherits": "fdm_bbl_3dp_001_common",
                "instantiation": "true",
                "printer_model": "Bambu Lab A1 mini",
                "printer_variant": "0.2",
                "nozzle_diameter": ["0.2"],
                "z_hop": null
            }),
        );

        tree.process(
            "fdm_process_common.json",
            json!({
                "name": "fdm_process_common",
                "instantiation": "false",
                "layer_height": "0.2",
                "wall_loops": 2,
                "enable_support": false
            }),
        );
        for (name, layer_height) in [
            ("0.12mm Fine @BBL A1M", "0.12"),
            ("0.20mm Standard @BBL A1M", "0.2"),
            ("0.28mm Extra Draft @BBL A1M", "0.28"),
        ] {
            tree.process(
                &format!("{}.json", name),
                json!({
                    "name": name,
                    "inherits": "fdm_process_common",
                    "instantiation": "true",
                    "layer_height": layer_height,
                    "compatible_printers": ["Bambu Lab A1 mini 0.4 nozzle"]
                }),
            );
        }

        tree.filament(
            "base/fdm_filament_pla.json",
            json!({
                "name": "fdm_filament_pla",
                "inherits": "fdm_filament_common",
                "instantiation": "false",
                "filament_type": ["PLA"],
                "filament_diameter": ["1.75"],
                "nozzle_temperature": ["220"]
            }),
        );
        tree.filament(
            "Bambu PLA Basic @BBL A1M.json",
            json!({
                "name": "Bambu PLA Basic @BBL A1M",
                "inherits": "fdm_filament_pla",
                "instantiation": "true",
                "filament_vendor": ["Bambu Lab"]
            }),
        );
        tree.filament(
            "Loop A.json",
            json!({"name": "Loop A", "inherits": "Loop B", "instantiation": "true"}),
        );
        tree.filament(
            "Loop B.json",
            json!({"name": "Loop B", "inherits": "Loop A", "instantiation": "false"}),
        );

        tree
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Directory exports are written to
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn machine(&self, rel: &str, doc: Value) {
        self.write("machine", rel, doc);
    }

    pub fn process(&self, rel: &str, doc: Value) {
        self.write("process", rel, doc);
    }

    pub fn filament(&self, rel: &str, doc: Value) {
        self.write("filament", rel, doc);
    }

    /// Write raw text below the vendor directory
    pub fn write_raw(&self, rel: &str, text: &str) {
        let path = self.dir.path().join(VENDOR).join(rel);
        fs::create_dir_all(path.parent().expect("path has parent")).expect("create dirs");
        fs::write(path, text).expect("write fixture");
    }

    fn write(&self, kind_dir: &str, rel: &str, doc: Value) {
        let text = serde_json::to_string_pretty(&doc).expect("serialize fixture");
        self.write_raw(&format!("{}/{}", kind_dir, rel), &text);
    }
}

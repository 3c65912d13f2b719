//! Export report
//!
//! Records the outcome of every item in an export run: the files written
//! with their sizes and digests, or the failure message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use sbx_profile::Kind;

/// Schema version for export_report.json
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "sbx/export_report@1";

/// File name of the report inside the output directory
pub const REPORT_FILE_NAME: &str = "export_report.json";

/// Status of one export item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Ok,
    Failed,
}

/// A file written by the exporter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: String,
    pub bytes: u64,
    /// SHA-256 of the file contents, hex encoded
    pub sha256: String,
}

/// Outcome of one export item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportEntry {
    /// Profile name, or the combination label for bundles
    pub target: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,

    pub status: EntryStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<WrittenFile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Non-fatal problems, e.g. profiles left out of a master bundle
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ExportEntry {
    pub fn ok(target: impl Into<String>, kind: Option<Kind>, files: Vec<WrittenFile>) -> Self {
        Self {
            target: target.into(),
            kind,
            status: EntryStatus::Ok,
            files,
            error: None,
            warnings: Vec::new(),
        }
    }

    pub fn failed(target: impl Into<String>, kind: Option<Kind>, error: impl ToString) -> Self {
        Self {
            target: target.into(),
            kind,
            status: EntryStatus::Failed,
            files: Vec::new(),
            error: Some(error.to_string()),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == EntryStatus::Ok
    }
}

/// Report for one export run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,
    pub vendor: String,
    pub entries: Vec<ExportEntry>,
}

impl ExportReport {
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            vendor: vendor.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: ExportEntry) {
        self.entries.push(entry);
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// True when no item failed
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Failed entries, in run order
    pub fn failures(&self) -> impl Iterator<Item = &ExportEntry> {
        self.entries.iter().filter(|e| !e.is_ok())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut report = ExportReport::new("BBL");
        report.push(ExportEntry::ok("A1 mini 0.4", Some(Kind::Machine), Vec::new()));
        report.push(ExportEntry::failed("ghost", Some(Kind::Machine), "Profile not found"));

        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert_eq!(report.failures().next().unwrap().target, "ghost");
    }

    #[test]
    fn test_serialization_shape() {
        let mut report = ExportReport::new("BBL");
        report.push(ExportEntry::ok(
            "PLA Basic",
            Some(Kind::Filament),
            vec![WrittenFile {
                path: "out/PLA_Basic.ini".to_string(),
                bytes: 12,
                sha256: "ab".repeat(32),
            }],
        ));
        report.push(
            ExportEntry::failed("bundle", None, "boom").with_warnings(vec!["w".to_string()]),
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["schema_id"], SCHEMA_ID);
        assert_eq!(json["entries"][0]["status"], "ok");
        assert_eq!(json["entries"][0]["kind"], "filament");
        assert!(json["entries"][0].get("error").is_none());
        assert_eq!(json["entries"][1]["status"], "failed");
        assert!(json["entries"][1].get("kind").is_none());
        assert_eq!(json["entries"][1]["warnings"][0], "w");

        let back: ExportReport = serde_json::from_value(json).unwrap();
        assert_eq!(back.entries, report.entries);
    }
}

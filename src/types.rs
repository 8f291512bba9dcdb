//! Shared data types for crawled jobs and the variant matrix.
//!
//! Jobs are the raw evidence gathered by the crawl; variants, cells and
//! entries are the folded view handed to the report.
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Final outcome of a prow job as reported by its `finished.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum JobResult {
    #[default]
    Unknown,
    Success,
    Failure,
    /// Any other lowercased label (`aborted`, `error`, ...).
    Other(String),
}

impl JobResult {
    /// Classify a raw result label; matching is case-insensitive.
    pub fn from_label(label: &str) -> Self {
        let lowered = label.trim().to_lowercase();
        if lowered.is_empty() {
            JobResult::Unknown
        } else if lowered == "success" {
            JobResult::Success
        } else if lowered == "failure" {
            JobResult::Failure
        } else {
            JobResult::Other(lowered)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobResult::Unknown => "unknown",
            JobResult::Success => "success",
            JobResult::Failure => "failure",
            JobResult::Other(label) => label,
        }
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Installer outcome read from `install-status.txt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
    #[default]
    Unknown,
    Success,
    Failure,
}

impl InstallStatus {
    /// Interpret the body of an install-status artifact.
    ///
    /// The body is an integer exit code: zero is success, any other integer
    /// is failure, anything that does not parse leaves the status unknown.
    pub fn from_status_text(text: &str) -> Self {
        match text.trim().parse::<i64>() {
            Ok(0) => InstallStatus::Success,
            Ok(_) => InstallStatus::Failure,
            Err(_) => InstallStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstallStatus::Unknown => "unknown",
            InstallStatus::Success => "success",
            InstallStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything a cell can hold; only success latches.
pub trait Outcome {
    fn is_success(&self) -> bool;
}

impl Outcome for JobResult {
    fn is_success(&self) -> bool {
        matches!(self, JobResult::Success)
    }
}

impl Outcome for InstallStatus {
    fn is_success(&self) -> bool {
        matches!(self, InstallStatus::Success)
    }
}

/// One CI job execution discovered on a payload-run page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProwJob {
    pub name: String,
    /// Identity of the record.
    pub job_page_url: String,
    pub result_url: String,
    pub result: JobResult,
    pub install_status_url: Option<String>,
    pub install_status: InstallStatus,
}

impl ProwJob {
    pub fn new(name: String, job_page_url: String, result_url: String) -> Self {
        Self {
            name,
            job_page_url,
            result_url,
            ..Self::default()
        }
    }
}

/// Test dimensions a variant can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Serial,
    Parallel,
    Csi,
    UpgradeFromCurrent,
    UpgradeFromPrevious,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Serial,
        Dimension::Parallel,
        Dimension::Csi,
        Dimension::UpgradeFromCurrent,
        Dimension::UpgradeFromPrevious,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Serial => "serial",
            Dimension::Parallel => "parallel",
            Dimension::Csi => "csi",
            Dimension::UpgradeFromCurrent => "upgrade_from_current",
            Dimension::UpgradeFromPrevious => "upgrade_from_previous",
        }
    }

    /// Column heading used by the report.
    pub fn title(&self) -> &'static str {
        match self {
            Dimension::Serial => "Serial",
            Dimension::Parallel => "Parallel",
            Dimension::Csi => "CSI",
            Dimension::UpgradeFromCurrent => "Upgrade (current)",
            Dimension::UpgradeFromPrevious => "Upgrade (previous)",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named installation configuration and the dimensions its jobs exercise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub serial: bool,
    pub parallel: bool,
    pub csi: bool,
    pub upgrade_from_current: bool,
    pub upgrade_from_previous: bool,
}

impl Variant {
    pub fn enables(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Serial => self.serial,
            Dimension::Parallel => self.parallel,
            Dimension::Csi => self.csi,
            Dimension::UpgradeFromCurrent => self.upgrade_from_current,
            Dimension::UpgradeFromPrevious => self.upgrade_from_previous,
        }
    }

    pub fn set(&mut self, dimension: Dimension, enabled: bool) {
        match dimension {
            Dimension::Serial => self.serial = enabled,
            Dimension::Parallel => self.parallel = enabled,
            Dimension::Csi => self.csi = enabled,
            Dimension::UpgradeFromCurrent => self.upgrade_from_current = enabled,
            Dimension::UpgradeFromPrevious => self.upgrade_from_previous = enabled,
        }
    }

    pub fn enabled_dimensions(&self) -> impl Iterator<Item = Dimension> + '_ {
        Dimension::ALL.into_iter().filter(|dim| self.enables(*dim))
    }
}

/// Evidence for one dimension of one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cell<R> {
    pub source_url: Option<String>,
    pub result: R,
}

impl<R: Outcome> Cell<R> {
    pub fn new(source_url: Option<String>, result: R) -> Self {
        Self { source_url, result }
    }

    /// Replace this cell only when it has not seen success and `incoming` is
    /// a success. Returns whether the cell changed.
    pub fn latch(&mut self, incoming: Cell<R>) -> bool {
        if self.result.is_success() || !incoming.result.is_success() {
            return false;
        }
        *self = incoming;
        true
    }
}

/// One matrix row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub variant: String,
    pub install_success: Cell<InstallStatus>,
    /// Only dimensions enabled on the variant have a cell.
    pub cells: BTreeMap<Dimension, Cell<JobResult>>,
}

impl Entry {
    pub fn cell(&self, dimension: Dimension) -> Option<&Cell<JobResult>> {
        self.cells.get(&dimension)
    }
}

/// Variant name to row, ordered for stable rendering.
pub type Matrix = BTreeMap<String, Entry>;

//! Canonical finding severity and the normalizer that maps source-specific
//! severity strings onto it.

use serde::{Deserialize, Serialize};

/// Canonical severity shared by every finding type the platform ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// The source value was missing from the table below.
    Unknown,
    /// Informational; no action expected.
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Returns the display label written into connector objects.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Unknown => "Unknown",
            Severity::Info => "Info",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a source severity string onto the canonical [`Severity`].
///
/// Matching is case-insensitive and ignores surrounding whitespace. Both the
/// SARIF levels GitHub reports on rules (`error`, `warning`, `note`, `none`)
/// and the security-severity levels (`critical`, `high`, `medium`, `low`) are
/// recognised. Any other value yields [`Severity::Unknown`].
pub fn normalize_finding_severity(raw: &str) -> Severity {
    match raw.trim().to_ascii_lowercase().as_str() {
        "critical" => Severity::Critical,
        "high" | "error" => Severity::High,
        "medium" | "moderate" | "warning" => Severity::Medium,
        "low" | "note" => Severity::Low,
        "info" | "informational" | "none" => Severity::Info,
        _ => Severity::Unknown,
    }
}

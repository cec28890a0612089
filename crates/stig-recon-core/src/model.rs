use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

/// Group title used when a `Group` has no `title` child.
pub const DEFAULT_GROUP_TITLE: &str = "No Title";
/// Rule version (the STIG id) used when a `Rule` has no `version` child.
pub const DEFAULT_RULE_VERSION: &str = "No Version";
/// Rule title used when a `Rule` has no `title` child.
pub const DEFAULT_RULE_TITLE: &str = "No Rule Title";
/// Placeholder for fields the other side of a reconciliation could not supply.
pub const NOT_AVAILABLE: &str = "N/A";
/// Hostname used when a `ReportHost` carries no hostname tag.
pub const DEFAULT_HOSTNAME: &str = "";

/// One rule group read from the manual checklist document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCheckRecord {
    pub group_id: String,
    pub group_title: String,
    pub rule_id: String,
    pub severity: String,
    pub stig_id: String,
    pub rule_title: String,
}

impl NormalizedCheckRecord {
    /// Join key, or `None` when the version text is empty.
    pub fn join_key(&self) -> Option<&str> {
        non_empty(Some(&self.stig_id))
    }
}

/// Metadata pulled out of a single `<item>`/`<custom_item>` block of an audit export.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmbeddedMetadataRecord {
    pub stig_id: Option<String>,
    pub cat: Option<String>,
    pub nist_control_id: Option<String>,
}

impl EmbeddedMetadataRecord {
    pub fn join_key(&self) -> Option<&str> {
        non_empty(self.stig_id.as_ref())
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Outcome of pairing a manual record with an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MatchStatus {
    #[serde(rename = "Found in both")]
    FoundInBoth,
    #[serde(rename = "Only in Manual")]
    OnlyInManual,
    #[serde(rename = "Only in Audit")]
    OnlyInAudit,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FoundInBoth => "Found in both",
            Self::OnlyInManual => "Only in Manual",
            Self::OnlyInAudit => "Only in Audit",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the compare-and-export report. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledRecord {
    #[serde(rename = "Group ID")]
    pub group_id: String,
    #[serde(rename = "Group Title")]
    pub group_title: String,
    #[serde(rename = "Rule ID")]
    pub rule_id: String,
    #[serde(rename = "Severity")]
    pub severity: String,
    #[serde(rename = "Version (Stig-ID)")]
    pub stig_id: String,
    #[serde(rename = "Rule Title")]
    pub rule_title: String,
    #[serde(rename = "CAT")]
    pub cat: String,
    #[serde(rename = "800-53")]
    pub nist_control_id: String,
    #[serde(rename = "Status")]
    pub status: MatchStatus,
}

/// Canonical compliance result classes. Ordering is only used for map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ResultClass {
    Passed,
    Failed,
    Warning,
    Error,
    Unknown,
}

impl ResultClass {
    /// Map a raw `compliance-result` value onto a result class. Total: anything
    /// missing or unrecognized becomes [`ResultClass::Unknown`].
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Unknown;
        };
        match raw.trim().to_lowercase().as_str() {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "warning" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ResultClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence gathered for a single NIST control across every host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlEvidence {
    hosts: BTreeMap<ResultClass, BTreeSet<String>>,
    stig_ids: BTreeSet<String>,
}

impl ControlEvidence {
    pub fn hosts(&self, result: ResultClass) -> Option<&BTreeSet<String>> {
        self.hosts.get(&result)
    }

    pub fn has(&self, result: ResultClass) -> bool {
        self.hosts.contains_key(&result)
    }

    pub fn stig_ids(&self) -> &BTreeSet<String> {
        &self.stig_ids
    }
}

/// Per-control aggregate keyed by NIST control id, iterated in sorted key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlAggregate {
    controls: BTreeMap<String, ControlEvidence>,
}

impl ControlAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `host` produced `result` for `control`, with `stig_id` contributing.
    pub fn record(&mut self, control: &str, result: ResultClass, host: &str, stig_id: &str) {
        let evidence = self.controls.entry(control.to_string()).or_default();
        evidence
            .hosts
            .entry(result)
            .or_default()
            .insert(host.to_string());
        evidence.stig_ids.insert(stig_id.to_string());
    }

    pub fn get(&self, control: &str) -> Option<&ControlEvidence> {
        self.controls.get(control)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ControlEvidence)> {
        self.controls.iter().map(|(id, ev)| (id.as_str(), ev))
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

/// A single non-passing check, as listed in the checklist/detail report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NonPassingCheckDetail {
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "NIST Control ID")]
    pub nist_control_id: String,
    #[serde(rename = "Result")]
    pub result: ResultClass,
    #[serde(rename = "Stig ID")]
    pub stig_id: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Actual Value")]
    pub actual_value: String,
    #[serde(rename = "Solution")]
    pub solution: String,
}

/// Row of the per-control summary report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "NIST Compliance ID")]
    pub nist_control_id: String,
    #[serde(rename = "Result")]
    pub result: ResultClass,
    #[serde(rename = "Affected Hosts")]
    pub affected_hosts: String,
    #[serde(rename = "Stig IDs")]
    pub stig_ids: String,
}

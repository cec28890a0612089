use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, warn};

use super::Extractor;
use crate::error::{ExtractError, XmlValueError};
use crate::model::{ControlAggregate, NonPassingCheckDetail, ResultClass, DEFAULT_HOSTNAME};
use crate::xml::{self, XmlElement};

/// Namespace of the `cm:compliance-*` fields on a `ReportItem`.
pub const COMPLIANCE_NAMESPACE: &str = "http://www.nessus.org/cm";

static NIST_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"800-53\|([^,]+)").expect("NIST reference pattern is valid"));
static CHECK_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)\s+-\s+(.*)").expect("check name pattern is valid"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Everything pulled out of one scan-results document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplianceExtraction {
    pub aggregate: ControlAggregate,
    pub details: Vec<NonPassingCheckDetail>,
}

/// Fields of a single `ReportItem` that carries at least one NIST reference.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CheckEvidence {
    result: ResultClass,
    controls: Vec<String>,
    stig_id: String,
    description: String,
    actual_value: String,
    solution: String,
}

/// Reads per-host compliance results out of a `.nessus` report.
#[derive(Debug, Clone, Default)]
pub struct ComplianceExtractor;

impl ComplianceExtractor {
    pub fn new() -> Self {
        Self
    }

    /// `Ok(None)` when the item has no usable `800-53` reference.
    fn read_item(&self, item: &XmlElement) -> Result<Option<CheckEvidence>, XmlValueError> {
        let result = ResultClass::normalize(cm_text(item, "compliance-result")?.as_deref());

        let reference = cm_text(item, "compliance-reference")?.unwrap_or_default();
        let controls = nist_controls(&reference);
        if controls.is_empty() {
            return Ok(None);
        }

        let check_name = collapse_whitespace(&cm_text(item, "compliance-check-name")?.unwrap_or_default());
        let (stig_id, description) = split_check_name(&check_name);

        Ok(Some(CheckEvidence {
            result,
            controls,
            stig_id,
            description,
            actual_value: collapse_whitespace(
                &cm_text(item, "compliance-actual-value")?.unwrap_or_default(),
            ),
            solution: collapse_whitespace(&cm_text(item, "compliance-solution")?.unwrap_or_default()),
        }))
    }
}

impl Extractor for ComplianceExtractor {
    type Output = ComplianceExtraction;

    #[instrument(name = "extract_compliance", skip(self, text), fields(input_len = text.len()))]
    fn extract(&self, origin: &str, text: &str) -> Result<Self::Output, ExtractError> {
        let root = xml::parse_document(origin, text)?;
        let report = root
            .child(None, "Report")
            .ok_or_else(|| ExtractError::MissingContainer {
                origin: origin.to_string(),
                element: "Report".to_string(),
            })?;

        let mut extraction = ComplianceExtraction::default();
        for host in report.children_named(None, "ReportHost") {
            let hostname = hostname(host);
            let mut checks = 0usize;
            for item in host.children_named(None, "ReportItem") {
                match self.read_item(item) {
                    Ok(Some(evidence)) => {
                        checks += 1;
                        record(&mut extraction, &hostname, evidence);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        let plugin_id = item.attr("pluginID").ok().flatten().unwrap_or_default();
                        warn!(host = %hostname, %plugin_id, error = %err, "skipping report item");
                    }
                }
            }
            debug!(host = %hostname, checks, "host processed");
        }
        debug!(
            controls = extraction.aggregate.len(),
            non_passing = extraction.details.len(),
            "compliance report extracted"
        );
        Ok(extraction)
    }
}

fn record(extraction: &mut ComplianceExtraction, host: &str, evidence: CheckEvidence) {
    for control in &evidence.controls {
        extraction
            .aggregate
            .record(control, evidence.result, host, &evidence.stig_id);
        if evidence.result != ResultClass::Passed {
            extraction.details.push(NonPassingCheckDetail {
                host: host.to_string(),
                nist_control_id: control.clone(),
                result: evidence.result,
                stig_id: evidence.stig_id.clone(),
                description: evidence.description.clone(),
                actual_value: evidence.actual_value.clone(),
                solution: evidence.solution.clone(),
            });
        }
    }
}

fn hostname(host: &XmlElement) -> String {
    let tag = host
        .child(None, "HostProperties")
        .and_then(|props| props.child_where(None, "tag", "name", "hostname"));
    match tag.map(XmlElement::text) {
        Some(Ok(name)) => name,
        Some(Err(err)) => {
            warn!(error = %err, "unreadable hostname tag");
            DEFAULT_HOSTNAME.to_string()
        }
        None => DEFAULT_HOSTNAME.to_string(),
    }
}

fn cm_text(item: &XmlElement, name: &str) -> Result<Option<String>, XmlValueError> {
    item.child(Some(COMPLIANCE_NAMESPACE), name)
        .map(XmlElement::text)
        .transpose()
}

/// Every control id following an `800-53|` marker, in order, duplicates kept.
pub fn nist_controls(reference: &str) -> Vec<String> {
    NIST_REFERENCE
        .captures_iter(reference)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Replace every whitespace run with one space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Split `"<stig-id> - <description>"`; both halves are empty when the name
/// does not have that shape.
pub fn split_check_name(check_name: &str) -> (String, String) {
    match CHECK_NAME.captures(check_name) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (String::new(), String::new()),
    }
}

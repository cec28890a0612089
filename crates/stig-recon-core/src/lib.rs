//! Reconciliation of STIG compliance findings across audit exports, manual
//! checklists and scan results.

pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod source;
pub mod summary;
pub mod xml;

pub use error::{ExtractError, ReportError, XmlValueError};
pub use extract::{
    audit::AuditExtractor,
    checklist::{ChecklistExtractor, XCCDF_NAMESPACE},
    compliance::{ComplianceExtraction, ComplianceExtractor},
    Extractor,
};
pub use model::{
    ControlAggregate, ControlEvidence, EmbeddedMetadataRecord, MatchStatus, NonPassingCheckDetail,
    NormalizedCheckRecord, ReconciledRecord, ResultClass, SummaryRow,
};
pub use pipeline::{Pipeline, SummaryOutput};
pub use reconcile::{reconcile, ReconcileSummary};
pub use report::OutputFormat;
pub use source::{DocumentSource, FileDocumentSource};
pub use summary::summarize;

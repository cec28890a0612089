use tracing::{info, instrument};

use crate::error::ExtractError;
use crate::extract::audit::AuditExtractor;
use crate::extract::checklist::ChecklistExtractor;
use crate::extract::compliance::ComplianceExtractor;
use crate::extract::Extractor;
use crate::model::{NonPassingCheckDetail, ReconciledRecord, SummaryRow};
use crate::reconcile::reconcile;
use crate::source::DocumentSource;
use crate::summary::summarize;

/// Output of the summary mode: one set of rows per report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryOutput {
    pub summary: Vec<SummaryRow>,
    pub details: Vec<NonPassingCheckDetail>,
}

/// Wires sources through the extractors into reconciled or summarized rows.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    checklist: ChecklistExtractor,
    audit: AuditExtractor,
    compliance: ComplianceExtractor,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checklist(mut self, checklist: ChecklistExtractor) -> Self {
        self.checklist = checklist;
        self
    }

    /// Reconcile an audit export against a manual checklist. Both sources must
    /// extract successfully before any join happens.
    #[instrument(name = "compare", skip_all, fields(audit = %audit.describe(), manual = %manual.describe()))]
    pub async fn compare(
        &self,
        audit: &dyn DocumentSource,
        manual: &dyn DocumentSource,
    ) -> Result<Vec<ReconciledRecord>, ExtractError> {
        let audit_records = self.audit.extract(&audit.describe(), &audit.load().await?)?;
        let manual_records = self
            .checklist
            .extract(&manual.describe(), &manual.load().await?)?;
        info!(
            audit = audit_records.len(),
            manual = manual_records.len(),
            "sources extracted"
        );
        Ok(reconcile(&manual_records, &audit_records))
    }

    /// Aggregate a compliance scan into summary rows and non-passing details.
    #[instrument(name = "summarize", skip_all, fields(report = %report.describe()))]
    pub async fn summarize(&self, report: &dyn DocumentSource) -> Result<SummaryOutput, ExtractError> {
        let extraction = self
            .compliance
            .extract(&report.describe(), &report.load().await?)?;
        let summary = summarize(&extraction.aggregate);
        info!(
            controls = extraction.aggregate.len(),
            summary_rows = summary.len(),
            non_passing = extraction.details.len(),
            "scan results aggregated"
        );
        Ok(SummaryOutput {
            summary,
            details: extraction.details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchStatus, ResultClass};
    use async_trait::async_trait;

    struct StaticSource {
        name: &'static str,
        content: Option<&'static str>,
    }

    #[async_trait]
    impl DocumentSource for StaticSource {
        fn describe(&self) -> String {
            self.name.to_string()
        }

        async fn load(&self) -> Result<String, ExtractError> {
            self.content
                .map(str::to_string)
                .ok_or_else(|| ExtractError::Io {
                    path: self.name.into(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                })
        }
    }

    const MANUAL: &str = r#"<Benchmark xmlns="http://checklists.nist.gov/xccdf/1.1">
  <Group id="V-1"><title>g1</title><Rule id="r1" severity="high"><version>SV-1</version><title>t1</title></Rule></Group>
  <Group id="V-2"><title>g2</title></Group>
</Benchmark>"#;

    const AUDIT: &str = "<custom_item>STIG-ID|SV-1,CAT|I,800-53|AC-1,</custom_item>\n\
                         <custom_item>STIG-ID|SV-9,CAT|II,800-53|AU-2,</custom_item>";

    #[tokio::test]
    async fn compare_reconciles_both_sources() {
        let rows = Pipeline::new()
            .compare(
                &StaticSource { name: "a.audit", content: Some(AUDIT) },
                &StaticSource { name: "m.xml", content: Some(MANUAL) },
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stig_id, "SV-1");
        assert_eq!(rows[0].status, MatchStatus::FoundInBoth);
        assert_eq!((rows[0].cat.as_str(), rows[0].nist_control_id.as_str()), ("I", "AC-1"));
        assert_eq!(rows[1].stig_id, "SV-9");
        assert_eq!(rows[1].status, MatchStatus::OnlyInAudit);
    }

    #[tokio::test]
    async fn compare_refuses_partial_sources() {
        let err = Pipeline::new()
            .compare(
                &StaticSource { name: "a.audit", content: Some(AUDIT) },
                &StaticSource { name: "m.xml", content: Some("<Benchmark><Group>") },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::DocumentParse { .. }));

        let err = Pipeline::new()
            .compare(
                &StaticSource { name: "gone.audit", content: None },
                &StaticSource { name: "m.xml", content: Some(MANUAL) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[tokio::test]
    async fn summarize_applies_failure_precedence() {
        let report = r#"<NessusClientData_v2 xmlns:cm="http://www.nessus.org/cm"><Report>
  <ReportHost><HostProperties><tag name="hostname">h1</tag></HostProperties>
    <ReportItem pluginID="1"><cm:compliance-result>FAILED</cm:compliance-result><cm:compliance-reference>800-53|AC-1,</cm:compliance-reference><cm:compliance-check-name>SV-1 - x</cm:compliance-check-name></ReportItem>
  </ReportHost>
  <ReportHost><HostProperties><tag name="hostname">h2</tag></HostProperties>
    <ReportItem pluginID="1"><cm:compliance-result>PASSED</cm:compliance-result><cm:compliance-reference>800-53|AC-1,</cm:compliance-reference><cm:compliance-check-name>SV-1 - x</cm:compliance-check-name></ReportItem>
  </ReportHost>
</Report></NessusClientData_v2>"#;
        let output = Pipeline::new()
            .summarize(&StaticSource { name: "scan.nessus", content: Some(report) })
            .await
            .unwrap();
        assert_eq!(output.summary.len(), 1);
        assert_eq!(output.summary[0].result, ResultClass::Failed);
        assert_eq!(output.summary[0].affected_hosts, "h1");
        assert_eq!(output.details.len(), 1);
    }
}

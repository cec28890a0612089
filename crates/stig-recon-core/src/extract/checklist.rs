use tracing::{debug, instrument, warn};

use super::Extractor;
use crate::error::{ExtractError, XmlValueError};
use crate::model::{
    NormalizedCheckRecord, DEFAULT_GROUP_TITLE, DEFAULT_RULE_TITLE, DEFAULT_RULE_VERSION,
};
use crate::xml::{self, XmlElement};

/// Default namespace of XCCDF 1.1 manual checklists.
pub const XCCDF_NAMESPACE: &str = "http://checklists.nist.gov/xccdf/1.1";

/// Reads `Group`/`Rule` pairs out of an XCCDF manual checklist.
#[derive(Debug, Clone)]
pub struct ChecklistExtractor {
    namespace: String,
}

impl Default for ChecklistExtractor {
    fn default() -> Self {
        Self::with_namespace(XCCDF_NAMESPACE)
    }
}

impl ChecklistExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    fn ns(&self) -> Option<&str> {
        Some(self.namespace.as_str())
    }

    /// `Ok(None)` when the group carries no `Rule`.
    fn read_group(&self, group: &XmlElement) -> Result<Option<NormalizedCheckRecord>, XmlValueError> {
        let group_id = group.attr("id")?.unwrap_or_default();
        let group_title = self.child_text(group, "title", DEFAULT_GROUP_TITLE)?;

        let Some(rule) = group.child(self.ns(), "Rule") else {
            return Ok(None);
        };

        Ok(Some(NormalizedCheckRecord {
            group_id,
            group_title,
            rule_id: rule.attr("id")?.unwrap_or_default(),
            severity: rule.attr("severity")?.unwrap_or_default(),
            stig_id: self.child_text(rule, "version", DEFAULT_RULE_VERSION)?,
            rule_title: self.child_text(rule, "title", DEFAULT_RULE_TITLE)?,
        }))
    }

    fn child_text(
        &self,
        parent: &XmlElement,
        name: &str,
        default: &str,
    ) -> Result<String, XmlValueError> {
        match parent.child(self.ns(), name) {
            Some(element) => element.text(),
            None => Ok(default.to_string()),
        }
    }
}

impl Extractor for ChecklistExtractor {
    type Output = Vec<NormalizedCheckRecord>;

    #[instrument(name = "extract_checklist", skip(self, text), fields(input_len = text.len()))]
    fn extract(&self, origin: &str, text: &str) -> Result<Self::Output, ExtractError> {
        let root = xml::parse_document(origin, text)?;
        let groups = root.descendants_named(self.ns(), "Group");

        let mut records = Vec::new();
        for group in &groups {
            match self.read_group(group) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(err) => {
                    let group_id = group
                        .attr("id")
                        .ok()
                        .flatten()
                        .unwrap_or_else(|| "<unreadable>".to_string());
                    warn!(%group_id, error = %err, "skipping group");
                }
            }
        }
        debug!(groups = groups.len(), records = records.len(), "checklist extracted");
        Ok(records)
    }
}

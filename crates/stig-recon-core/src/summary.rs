use std::collections::BTreeSet;

use crate::model::{ControlAggregate, ControlEvidence, ResultClass, SummaryRow};

const LIST_SEPARATOR: &str = ", ";

/// Emit summary rows for every control, in sorted control-id order.
///
/// Any Failed evidence yields a single Failed row listing the failing hosts,
/// and suppresses the Passed row. A Passed row (with no hosts) is emitted only
/// when the control has no Failed, Warning or Error evidence. Warning and
/// Error each get their own row whenever present. Unknown evidence is never
/// summarized.
pub fn summarize(aggregate: &ControlAggregate) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    for (control, evidence) in aggregate.iter() {
        let stig_ids = join(evidence.stig_ids());
        let row = |result: ResultClass, affected_hosts: String| SummaryRow {
            nist_control_id: control.to_string(),
            result,
            affected_hosts,
            stig_ids: stig_ids.clone(),
        };

        if let Some(failed) = evidence.hosts(ResultClass::Failed) {
            rows.push(row(ResultClass::Failed, join(failed)));
        } else if passed_cleanly(evidence) {
            rows.push(row(ResultClass::Passed, String::new()));
        }

        for result in [ResultClass::Warning, ResultClass::Error] {
            if let Some(hosts) = evidence.hosts(result) {
                rows.push(row(result, join(hosts)));
            }
        }
    }
    rows
}

fn passed_cleanly(evidence: &ControlEvidence) -> bool {
    evidence.has(ResultClass::Passed)
        && ![ResultClass::Failed, ResultClass::Warning, ResultClass::Error]
            .into_iter()
            .any(|result| evidence.has(result))
}

fn join(values: &BTreeSet<String>) -> String {
    values
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

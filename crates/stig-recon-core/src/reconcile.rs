use std::collections::HashMap;

use tracing::info;

use crate::model::{
    EmbeddedMetadataRecord, MatchStatus, NormalizedCheckRecord, ReconciledRecord, NOT_AVAILABLE,
};

/// Row counts per [`MatchStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub found_in_both: usize,
    pub only_in_manual: usize,
    pub only_in_audit: usize,
}

impl ReconcileSummary {
    pub fn from_rows(rows: &[ReconciledRecord]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            match row.status {
                MatchStatus::FoundInBoth => summary.found_in_both += 1,
                MatchStatus::OnlyInManual => summary.only_in_manual += 1,
                MatchStatus::OnlyInAudit => summary.only_in_audit += 1,
            }
        }
        summary
    }
}

/// Records keyed by join key. A repeated key keeps the position of its first
/// occurrence and the value of its last.
struct KeyedRecords<'a, T> {
    entries: Vec<(&'a str, &'a T)>,
    positions: HashMap<&'a str, usize>,
}

impl<'a, T> KeyedRecords<'a, T> {
    fn build(records: &'a [T], key: impl Fn(&'a T) -> Option<&'a str>) -> Self {
        let mut keyed = Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        };
        for record in records {
            let Some(k) = key(record) else { continue };
            match keyed.positions.get(k) {
                Some(&pos) => keyed.entries[pos].1 = record,
                None => {
                    keyed.positions.insert(k, keyed.entries.len());
                    keyed.entries.push((k, record));
                }
            }
        }
        keyed
    }

    fn get(&self, key: &str) -> Option<&'a T> {
        self.positions.get(key).map(|&pos| self.entries[pos].1)
    }

    fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    fn iter(&self) -> impl Iterator<Item = (&'a str, &'a T)> + '_ {
        self.entries.iter().copied()
    }
}

/// Join manual checklist records with audit metadata by STIG id.
///
/// Manual-keyed rows come first in manual order, followed by audit-only rows
/// in audit order. Records without a join key take no part.
pub fn reconcile(
    manual: &[NormalizedCheckRecord],
    audit: &[EmbeddedMetadataRecord],
) -> Vec<ReconciledRecord> {
    let manual_by_key = KeyedRecords::build(manual, NormalizedCheckRecord::join_key);
    let audit_by_key = KeyedRecords::build(audit, EmbeddedMetadataRecord::join_key);

    let mut rows = Vec::with_capacity(manual_by_key.entries.len() + audit_by_key.entries.len());
    for (key, entry) in manual_by_key.iter() {
        let (cat, nist_control_id, status) = match audit_by_key.get(key) {
            Some(found) => (
                or_not_available(&found.cat),
                or_not_available(&found.nist_control_id),
                MatchStatus::FoundInBoth,
            ),
            None => (
                NOT_AVAILABLE.to_string(),
                NOT_AVAILABLE.to_string(),
                MatchStatus::OnlyInManual,
            ),
        };
        rows.push(ReconciledRecord {
            group_id: entry.group_id.clone(),
            group_title: entry.group_title.clone(),
            rule_id: entry.rule_id.clone(),
            severity: entry.severity.clone(),
            stig_id: entry.stig_id.clone(),
            rule_title: entry.rule_title.clone(),
            cat,
            nist_control_id,
            status,
        });
    }

    for (key, entry) in audit_by_key.iter() {
        if manual_by_key.contains(key) {
            continue;
        }
        rows.push(ReconciledRecord {
            group_id: NOT_AVAILABLE.to_string(),
            group_title: NOT_AVAILABLE.to_string(),
            rule_id: NOT_AVAILABLE.to_string(),
            severity: NOT_AVAILABLE.to_string(),
            stig_id: key.to_string(),
            rule_title: NOT_AVAILABLE.to_string(),
            cat: or_not_available(&entry.cat),
            nist_control_id: or_not_available(&entry.nist_control_id),
            status: MatchStatus::OnlyInAudit,
        });
    }

    let summary = ReconcileSummary::from_rows(&rows);
    info!(
        found_in_both = summary.found_in_both,
        only_in_manual = summary.only_in_manual,
        only_in_audit = summary.only_in_audit,
        "reconciliation complete"
    );
    rows
}

fn or_not_available(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

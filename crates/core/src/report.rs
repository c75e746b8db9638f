//! Reconciliation report and its text rendering.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;

use crate::key::FlatKey;

/// Outcome of deleting one orphaned key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeletionResult {
    Deleted,
    Failed { reason: String },
}

/// A key paired with its deletion outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyOutcome {
    pub key: FlatKey,
    #[serde(flatten)]
    pub result: DeletionResult,
}

/// Everything a reconciliation run found and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub dry_run: bool,
    /// Leaf keys produced by flattening the hierarchical listing.
    pub reference_count: usize,
    /// Keys returned by the flat listing.
    pub flat_count: usize,
    /// Flat keys with no hierarchical counterpart, in listing order.
    pub orphans: Vec<FlatKey>,
    /// One entry per orphan in live mode; empty in dry-run.
    pub outcomes: Vec<KeyOutcome>,
    /// Orphans that match a hierarchical leaf up to a leading `/`.
    pub convention_mismatches: usize,
}

impl Report {
    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.result == DeletionResult::Deleted)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.deleted_count()
    }

    /// Write the line-oriented report: a three-line summary, a blank line,
    /// then one line per orphan.
    ///
    /// Deleted keys are printed double-quoted with C-style escapes; other
    /// lines show invalid UTF-8 bytes as `\xNN`.
    pub fn render_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{self}")
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# v2 keys in total: {}", self.reference_count)?;
        writeln!(f, "# v3 keys in total: {}", self.flat_count)?;
        writeln!(
            f,
            "# v3 keys not present in v2 (total: {}):",
            self.orphan_count()
        )?;
        writeln!(f)?;

        if self.dry_run {
            writeln!(f, "# List of keys that would be deleted:")?;
            for key in &self.orphans {
                writeln!(f, "{key}")?;
            }
            return Ok(());
        }

        for outcome in &self.outcomes {
            match &outcome.result {
                DeletionResult::Deleted => writeln!(f, "{} key deleted", outcome.key.quoted())?,
                DeletionResult::Failed { reason } => {
                    writeln!(f, "Unable to delete key {}: {reason}", outcome.key)?
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(dry_run: bool) -> Report {
        Report {
            dry_run,
            reference_count: 4,
            flat_count: 6,
            orphans: vec!["/k1".into(), "/k2".into()],
            outcomes: if dry_run {
                Vec::new()
            } else {
                vec![
                    KeyOutcome {
                        key: "/k1".into(),
                        result: DeletionResult::Deleted,
                    },
                    KeyOutcome {
                        key: "/k2".into(),
                        result: DeletionResult::Failed {
                            reason: "permission denied".into(),
                        },
                    },
                ]
            },
            convention_mismatches: 0,
        }
    }

    #[test]
    fn dry_run_text_lists_bare_keys() {
        assert_eq!(
            sample(true).to_string(),
            "# v2 keys in total: 4\n\
             # v3 keys in total: 6\n\
             # v3 keys not present in v2 (total: 2):\n\
             \n\
             # List of keys that would be deleted:\n\
             /k1\n\
             /k2\n"
        );
    }

    #[test]
    fn live_text_has_one_outcome_line_per_key() {
        assert_eq!(
            sample(false).to_string(),
            "# v2 keys in total: 4\n\
             # v3 keys in total: 6\n\
             # v3 keys not present in v2 (total: 2):\n\
             \n\
             \"/k1\" key deleted\n\
             Unable to delete key /k2: permission denied\n"
        );
    }

    #[test]
    fn deleted_keys_are_quoted_with_escapes() {
        let report = Report {
            dry_run: false,
            reference_count: 0,
            flat_count: 2,
            orphans: vec![FlatKey::from(&b"/a\0\x7f"[..]), FlatKey::from(vec![b'/', 0xff])],
            outcomes: vec![
                KeyOutcome {
                    key: FlatKey::from(&b"/a\0\x7f"[..]),
                    result: DeletionResult::Deleted,
                },
                KeyOutcome {
                    key: FlatKey::from(vec![b'/', 0xff]),
                    result: DeletionResult::Failed {
                        reason: "denied".into(),
                    },
                },
            ],
            convention_mismatches: 0,
        };

        assert!(report
            .to_string()
            .ends_with("\"/a\\x00\\x7f\" key deleted\nUnable to delete key /\\xff: denied\n"));
    }

    #[test]
    fn dry_run_escapes_invalid_utf8() {
        let report = Report {
            dry_run: true,
            reference_count: 0,
            flat_count: 1,
            orphans: vec![FlatKey::from(vec![b'/', 0xff])],
            outcomes: Vec::new(),
            convention_mismatches: 0,
        };
        assert!(report.to_string().ends_with("# List of keys that would be deleted:\n/\\xff\n"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["orphans"], serde_json::json!([r"/\xff"]));
    }

    #[test]
    fn counts_split_deleted_and_failed() {
        let report = sample(false);
        assert_eq!(report.orphan_count(), 2);
        assert_eq!(report.deleted_count(), 1);
        assert_eq!(report.failed_count(), 1);
    }

    #[test]
    fn json_tags_outcomes_by_status() {
        let json = serde_json::to_value(sample(false)).unwrap();
        assert_eq!(json["outcomes"][0], serde_json::json!({"key": "/k1", "status": "deleted"}));
        assert_eq!(
            json["outcomes"][1],
            serde_json::json!({"key": "/k2", "status": "failed", "reason": "permission denied"})
        );
        assert_eq!(json["flat_count"], 6);
    }

    #[test]
    fn render_text_matches_display() {
        let report = sample(true);
        let mut buf = Vec::new();
        report.render_text(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), report.to_string());
    }
}

// src/report.rs
// =============================================================================
// Turns the annotated records into something a human (or a CI job) reads.
//
// Human output has two sections:
//
//   docs/guide.md
//   - https://example.com/gone
//   - #missing-heading
//
//   The link 'https://example.com/gone' at the file 'docs/guide.md' failed because of:
//     reason: unexpected status code
//     status: 404
//
// Files are sorted, links inside a file are sorted, and only files holding
// at least one invalid link are shown. The detail section only lists links
// whose validator attached a FailureDetail.
//
// JSON output is every annotated record, valid ones included.
//
// Rust concepts used:
// - BTreeMap: a map that iterates in key order, so grouping also sorts
// - fmt::Write: building a String with write!/writeln! like we would print
// =============================================================================

use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::link::LinkRecord;

pub struct Reporter {
    root: PathBuf,
}

impl Reporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // Prints the report and tells whether any link was invalid
    pub fn print(&self, records: &[LinkRecord], json: bool) -> Result<bool> {
        if json {
            println!("{}", serde_json::to_string_pretty(records)?);
        } else if let Some(report) = self.render(records) {
            print!("{}", report);
        }
        Ok(has_invalid(records))
    }

    // The human report, or None when there is nothing to complain about
    pub fn render(&self, records: &[LinkRecord]) -> Option<String> {
        let files: Vec<(&Path, Vec<&LinkRecord>)> = group(records)
            .into_iter()
            .filter(|(_, links)| links.iter().any(|link| link.is_invalid()))
            .collect();
        if files.is_empty() {
            return None;
        }

        let mut out = String::new();

        for (path, links) in &files {
            let _ = write!(out, "{}", self.relative(path).bold());
            for link in links.iter().filter(|link| link.is_invalid()) {
                let _ = write!(out, "\n{} {}", "-".dimmed().bold(), link.target);
            }
            out.push_str("\n\n");
        }

        for (path, links) in &files {
            let details = links
                .iter()
                .filter(|link| link.is_invalid())
                .filter_map(|link| link.failure.as_ref().map(|detail| (link, detail)));
            for (link, detail) in details {
                let _ = writeln!(
                    out,
                    "The link '{}' at the file '{}' failed because of:",
                    link.target.bold(),
                    self.relative(path).bold()
                );
                let _ = writeln!(out, "{}", detail);
            }
        }

        Some(out)
    }

    // Paths are shown relative to the documentation root when possible
    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|relative| relative.display().to_string())
            .unwrap_or_else(|_| path.display().to_string())
    }
}

pub fn has_invalid(records: &[LinkRecord]) -> bool {
    records.iter().any(|record| record.is_invalid())
}

// Records grouped by source file; files and the links inside them sorted
fn group(records: &[LinkRecord]) -> BTreeMap<&Path, Vec<&LinkRecord>> {
    let mut files: BTreeMap<&Path, Vec<&LinkRecord>> = BTreeMap::new();
    for record in records {
        files.entry(record.source.as_path()).or_default().push(record);
    }
    for links in files.values_mut() {
        links.sort_by(|a, b| a.target.cmp(&b.target));
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{FailureDetail, Verdict};

    fn record(source: &str, target: &str, valid: bool) -> LinkRecord {
        LinkRecord::new(source, target).annotate(Verdict::from_bool(valid))
    }

    fn reporter() -> Reporter {
        colored::control::set_override(false);
        Reporter::new("/docs")
    }

    #[test]
    fn test_nothing_to_report_when_all_valid() {
        let records = vec![record("/docs/a.md", "https://ok", true)];
        assert_eq!(reporter().render(&records), None);
        assert!(!has_invalid(&records));
    }

    #[test]
    fn test_unknown_records_are_not_invalid() {
        let records = vec![LinkRecord::new("/docs/a.md", "x")];
        assert!(!has_invalid(&records));
    }

    #[test]
    fn test_groups_sorted_and_relative() {
        let records = vec![
            record("/docs/z.md", "b-link", false),
            record("/docs/guide/a.md", "zeta", false),
            record("/docs/guide/a.md", "alpha", false),
            record("/docs/guide/a.md", "fine", true),
            record("/docs/ok.md", "fine", true),
        ];

        let report = reporter().render(&records).unwrap();
        assert_eq!(report, "guide/a.md\n- alpha\n- zeta\n\nz.md\n- b-link\n\n");
        assert!(has_invalid(&records));
    }

    #[test]
    fn test_failure_details_follow_the_list() {
        let records = vec![
            LinkRecord::new("/docs/a.md", "https://gone").annotate(Verdict::invalid_because(
                FailureDetail::new("unexpected status code").with_status(404),
            )),
            record("/docs/a.md", "#missing", false),
        ];

        let report = reporter().render(&records).unwrap();
        assert!(report.starts_with("a.md\n- #missing\n- https://gone\n\n"));
        assert!(report.contains("The link 'https://gone' at the file 'a.md' failed because of:\n"));
        assert!(report.contains("  status: 404"));
        assert!(!report.contains("The link '#missing'"));
    }

    #[test]
    fn test_paths_outside_the_root_stay_absolute() {
        let records = vec![record("/elsewhere/a.md", "x", false)];
        let report = reporter().render(&records).unwrap();
        assert!(report.starts_with("/elsewhere/a.md\n"));
    }
}

use crate::models::{Group, ResultSet};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

fn group_header(group: &Group) -> String {
    format!(
        "[#] {} hosts: status {}, length {}",
        group.count(),
        group.signature.status_code,
        group.signature.content_length
    )
}

/// Likely matches: groups at or below the unique depth, with their hosts.
pub fn render_likely(results: &[ResultSet]) -> String {
    let mut out = String::new();
    for result in results {
        let likely = result.likely_groups();
        let _ = writeln!(
            out,
            "\n[+] Most likely matches on {} with a unique count of {} or less ({} found):",
            result.target,
            result.unique_depth,
            likely.iter().map(|g| g.count()).sum::<usize>()
        );
        for group in likely {
            for host in group.hosts() {
                let _ = writeln!(
                    out,
                    "\t[>] {} (status {}, length {})",
                    host, group.signature.status_code, group.signature.content_length
                );
            }
        }
        push_summary(&mut out, result);
    }
    out
}

/// Clusters the fuzzy pass built out of more than one exact group.
pub fn render_fuzzy(results: &[ResultSet]) -> String {
    let mut out = String::new();
    for result in results.iter().filter(|r| r.fuzzy_applied) {
        let _ = writeln!(out, "\n[+] Match similarity using fuzzy logic on {}:", result.target);
        let merged: Vec<&Group> = result.groups.iter().filter(|g| g.is_fuzzy_merge()).collect();
        if merged.is_empty() {
            let _ = writeln!(out, "\t[-] No near-identical responses across distinct signatures");
        }
        for group in merged {
            let _ = writeln!(out, "\t{}", group_header(group));
            let lengths: Vec<String> = group
                .merged_signatures
                .iter()
                .map(|s| format!("{}/{}", s.status_code, s.content_length))
                .collect();
            let _ = writeln!(out, "\t    merged signatures: {}", lengths.join(", "));
            for host in group.hosts() {
                let _ = writeln!(out, "\t    [>] {}", host);
            }
        }
    }
    out
}

/// Every group in presentation order, followed by failed probes.
pub fn render_normal(results: &[ResultSet]) -> String {
    let mut out = String::new();
    for result in results {
        let _ = writeln!(out, "[+] Target: {}", result.target);
        for group in &result.groups {
            let _ = writeln!(out, "{}", group_header(group));
            for member in &group.members {
                let _ = writeln!(out, "    {}", member.host);
            }
        }
        let errors: Vec<_> = result.errors().collect();
        if !errors.is_empty() {
            let _ = writeln!(out, "[!] Failed probes:");
            for rec in errors {
                if let Some(e) = rec.error() {
                    let _ = writeln!(out, "    {} ({})", rec.host, e);
                }
            }
        }
        push_summary(&mut out, result);
        out.push('\n');
    }
    out
}

fn push_summary(out: &mut String, result: &ResultSet) {
    let _ = writeln!(
        out,
        "[*] scanned {}, grouped {}, filtered {}, failed {}{}",
        result.scanned(),
        result.grouped_count(),
        result.filtered_count,
        result.error_count(),
        if result.cancelled { " (scan interrupted)" } else { "" }
    );
}

pub fn write_normal(path: &Path, results: &[ResultSet]) -> anyhow::Result<()> {
    fs::write(path, render_normal(results))?;
    Ok(())
}

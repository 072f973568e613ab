// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render analysis results for users.

use crate::util::plural;
use anyhow::Result;
use console::{StyledObject, style};
use dyncheck_metadata::{Diagnostic, FileReport, Severity};
use std::fmt::Write;

fn styled_severity(severity: Severity) -> StyledObject<String> {
    let tag = format!("{severity}:");
    match severity {
        Severity::Error => style(tag).bold().red(),
        Severity::Warning => style(tag).bold().magenta(),
        Severity::Note => style(tag).bold().cyan(),
    }
}

fn headline(diag: &Diagnostic) -> String {
    format!(
        "{} {} {}",
        style(format!("{}:", diag.location)).bold(),
        styled_severity(diag.severity),
        style(&diag.message).bold()
    )
}

/// Each diagnostic followed by the source line it points to and a caret under its column.
pub fn regular(report: &FileReport, src: &str) -> String {
    let lines: Vec<&str> = src.lines().collect();
    let mut out = String::new();
    for diag in &report.diagnostics {
        let _ = writeln!(out, "{}", headline(diag));
        let index = (diag.location.line as usize).checked_sub(1);
        let Some(line) = index.and_then(|index| lines.get(index)) else {
            continue;
        };
        // Keep tabs so the caret lines up with the source.
        let padding: String = line
            .chars()
            .take(diag.location.column.saturating_sub(1) as usize)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        let number = diag.location.line.to_string();
        let gutter = " ".repeat(number.len());
        let _ = writeln!(out, "{number:>5} | {line}");
        let _ = writeln!(out, "{gutter:>5} | {padding}{}", style("^").bold().green());
    }
    out
}

/// One line per diagnostic.
pub fn terse(report: &FileReport) -> String {
    report.diagnostics.iter().map(|diag| format!("{}\n", headline(diag))).collect()
}

/// The reports of every file, as a JSON array.
pub fn json(reports: &[&FileReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}

/// `1 warning and 2 errors generated.`, or nothing if there are no warnings nor errors.
pub fn summary<'a>(reports: impl IntoIterator<Item = &'a FileReport>) -> Option<String> {
    let (warnings, errors) = reports.into_iter().fold((0, 0), |(warnings, errors), report| {
        (warnings + report.count(Severity::Warning), errors + report.count(Severity::Error))
    });
    let counts = match (warnings, errors) {
        (0, 0) => return None,
        (warnings, 0) => plural(warnings, "warning"),
        (0, errors) => plural(errors, "error"),
        (warnings, errors) => {
            format!("{} and {}", plural(warnings, "warning"), plural(errors, "error"))
        }
    };
    Some(format!("{counts} generated."))
}

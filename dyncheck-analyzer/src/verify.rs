// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compare the diagnostics of a translation unit with the ones its comments expect.
//!
//! Expectations are written in comments next to the code that triggers them:
//!
//! ```c
//! dynamic_check(false); // expected-warning {{dynamic check will always fail}}
//! // expected-warning@+1 2 {{always fail}}
//! dynamic_check(0); dynamic_check(0);
//! ```
//!
//! `@+N` and `@-N` move the expected line relative to the comment, `@N` names it directly. An
//! optional count asks for that many diagnostics. The text between `{{` and `}}` must be part of
//! the diagnostic message. A file with no expected diagnostic says so with
//! `expected-no-diagnostics`.

use crate::lexer::Comment;
use dyncheck_metadata::{Diagnostic, FileReport, Severity};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

static DIRECTIVE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"expected-(error|warning|note|no-diagnostics)\b").unwrap());

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^expected-(error|warning|note)(?:@([+-]?)(\d+))?(?:\s+(\d+))?\s*\{\{(.*?)\}\}")
        .unwrap()
});

/// One `expected-*` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub severity: Severity,
    /// Line the diagnostic must be reported on.
    pub line: u32,
    /// Number of matching diagnostics still expected.
    pub count: u32,
    pub text: String,
}

/// A directive that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed {
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub file: String,
    pub not_seen: Vec<Expectation>,
    pub unexpected: Vec<Diagnostic>,
    pub malformed: Vec<Malformed>,
}

impl VerifyOutcome {
    pub fn is_success(&self) -> bool {
        self.not_seen.is_empty() && self.unexpected.is_empty() && self.malformed.is_empty()
    }

    /// Mismatches grouped the way `clang -verify` reports them, one message per group.
    pub fn messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self
            .malformed
            .iter()
            .map(|malformed| format!("{}:{}: {}", self.file, malformed.line, malformed.message))
            .collect();
        for severity in [Severity::Error, Severity::Warning, Severity::Note] {
            let not_seen: Vec<String> = self
                .not_seen
                .iter()
                .filter(|expected| expected.severity == severity)
                .map(|expected| {
                    format!("  File {} Line {}: {}", self.file, expected.line, expected.text)
                })
                .collect();
            if !not_seen.is_empty() {
                messages.push(format!(
                    "'{severity}' diagnostics expected but not seen:\n{}",
                    not_seen.join("\n")
                ));
            }
            let unexpected: Vec<String> = self
                .unexpected
                .iter()
                .filter(|diag| diag.severity == severity)
                .map(|diag| {
                    let location = &diag.location;
                    format!("  File {} Line {}: {}", location.file, location.line, diag.message)
                })
                .collect();
            if !unexpected.is_empty() {
                messages.push(format!(
                    "'{severity}' diagnostics seen but not expected:\n{}",
                    unexpected.join("\n")
                ));
            }
        }
        messages
    }
}

/// Check the diagnostics of `report` against the directives found in `comments`.
pub fn verify(report: &FileReport, comments: &[Comment]) -> VerifyOutcome {
    let mut expectations = Vec::new();
    let mut malformed = Vec::new();
    let mut no_diagnostics = None;
    for comment in comments {
        parse_directives(comment, &mut expectations, &mut malformed, &mut no_diagnostics);
    }
    debug!(file = %report.file, expectations = expectations.len(), "verify");

    match no_diagnostics {
        Some(line) if !expectations.is_empty() => malformed.push(Malformed {
            line,
            message: "expected-no-diagnostics directive cannot follow other expected directives"
                .to_string(),
        }),
        None if expectations.is_empty() && malformed.is_empty() => malformed.push(Malformed {
            line: 1,
            message: "no expected directives found: consider use of 'expected-no-diagnostics'"
                .to_string(),
        }),
        _ => {}
    }

    let mut unexpected = Vec::new();
    for diag in &report.diagnostics {
        let matched = expectations.iter_mut().find(|expected| {
            expected.count > 0
                && expected.severity == diag.severity
                && expected.line == diag.location.line
                && diag.message.contains(&expected.text)
        });
        match matched {
            Some(expected) => expected.count -= 1,
            None => unexpected.push(diag.clone()),
        }
    }
    let not_seen = expectations.into_iter().filter(|expected| expected.count > 0).collect();

    VerifyOutcome { file: report.file.clone(), not_seen, unexpected, malformed }
}

fn parse_directives(
    comment: &Comment,
    expectations: &mut Vec<Expectation>,
    malformed: &mut Vec<Malformed>,
    no_diagnostics: &mut Option<u32>,
) {
    let text = &comment.text;
    for start in DIRECTIVE_START.find_iter(text) {
        // Directives on later lines of a block comment belong to those lines.
        let line = comment.line + text[..start.start()].matches('\n').count() as u32;
        if start.as_str() == "expected-no-diagnostics" {
            no_diagnostics.get_or_insert(line);
            continue;
        }
        let Some(captures) = DIRECTIVE.captures(&text[start.start()..]) else {
            malformed.push(Malformed {
                line,
                message: format!(
                    "cannot find start ('{{{{') of expected string in `{}`",
                    start.as_str()
                ),
            });
            continue;
        };
        let Ok(severity) = Severity::from_str(&captures[1]) else {
            continue;
        };
        let offset = captures.get(3).map(|offset| offset.as_str().parse::<u32>());
        let target = match (captures.get(2).map(|sign| sign.as_str()), offset) {
            (_, None) => Some(line),
            (Some("+"), Some(Ok(offset))) => line.checked_add(offset),
            (Some("-"), Some(Ok(offset))) => line.checked_sub(offset),
            (_, Some(Ok(absolute))) => Some(absolute),
            (_, Some(Err(_))) => None,
        };
        let Some(target) = target.filter(|target| *target > 0) else {
            let message = "invalid line in expected directive".into();
            malformed.push(Malformed { line, message });
            continue;
        };
        let count = match captures.get(4).map(|count| count.as_str().parse::<u32>()) {
            None => 1,
            Some(Ok(count)) if count > 0 => count,
            Some(_) => {
                let message = "invalid count in expected directive".into();
                malformed.push(Malformed { line, message });
                continue;
            }
        };
        expectations.push(Expectation {
            severity,
            line: target,
            count,
            text: captures[5].trim().to_string(),
        });
    }
}

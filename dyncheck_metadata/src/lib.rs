// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data shared between the dyncheck static analyzer and its driver.
//!
//! The types in this crate form the JSON schema emitted by `dyncheck --output-format json`.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub use diagnostic::{Diagnostic, Severity};
pub use site::{CheckSite, CheckVerdict};

mod diagnostic;
mod site;

/// A position in a source file. Lines and columns start at 1.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Location { file: file.into(), line, column }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Everything the analyzer found in one translation unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileReport {
    /// The file name as given to the analyzer.
    pub file: String,
    /// Every call to a check function, in source order.
    pub sites: Vec<CheckSite>,
    /// Diagnostics sorted by location.
    pub diagnostics: Vec<Diagnostic>,
}

impl FileReport {
    pub fn new(file: impl Into<String>) -> Self {
        FileReport { file: file.into(), ..Default::default() }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|diag| diag.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_location_display() {
        let loc = Location::new("tests/simple.c", 14, 3);
        assert_eq!(loc.to_string(), "tests/simple.c:14:3");
    }

    #[test]
    fn check_location_order() {
        let first = Location::new("a.c", 2, 10);
        let second = Location::new("a.c", 3, 1);
        let third = Location::new("a.c", 3, 5);
        assert!(first < second);
        assert!(second < third);
    }

    #[test]
    fn check_report_json_schema() {
        let mut report = FileReport::new("a.c");
        let location = Location::new("a.c", 4, 3);
        report.sites.push(CheckSite {
            location: location.clone(),
            callee: "dynamic_check".to_string(),
            condition: "false".to_string(),
            verdict: CheckVerdict::AlwaysFails,
        });
        report.diagnostics.push(Diagnostic::warning(location, "dynamic check will always fail"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sites"][0]["verdict"], "always_fails");
        assert_eq!(json["diagnostics"][0]["severity"], "warning");
        assert_eq!(json["diagnostics"][0]["location"]["line"], 4);
        let back: FileReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.count(Severity::Warning), 1);
        assert!(!back.has_errors());
    }
}

// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Static companion of the `dynamic_check` runtime primitive.
//!
//! A failed dynamic check aborts the program, so a check whose condition is a constant false is
//! almost always a mistake. The analyzer finds the calls to the check functions of a C
//! translation unit, folds their condition and reports the ones that will always fail:
//!
//! ```
//! use dyncheck_analyzer::{CheckerConfig, StaticChecker};
//!
//! let checker = StaticChecker::new(CheckerConfig::default()).unwrap();
//! let report = checker.check_source("main.c", "int main(void) { dynamic_check(0); }").unwrap();
//! assert_eq!(report.diagnostics[0].message, "dynamic check will always fail");
//! ```
//!
//! The analysis is advisory: it never changes what happens at runtime.

mod defines;
mod error;
mod eval;
mod expr;
mod lexer;
mod machine_model;
mod parser;
mod types;

pub mod checker;
pub mod verify;

pub use checker::{Analysis, CheckerConfig, StaticChecker, WarningLevel};
pub use error::{AnalyzerError, Result};
pub use lexer::Comment;
pub use machine_model::DataModel;
pub use verify::VerifyOutcome;

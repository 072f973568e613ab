// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use dyncheck_metadata::Location;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Failures that prevent the analysis of a translation unit.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("{location}: {message}")]
    Lex { location: Location, message: String },

    #[error("invalid definition `{definition}`: {reason}")]
    Define { definition: String, reason: String },
}

impl AnalyzerError {
    pub(crate) fn lex(location: Location, message: impl Into<String>) -> Self {
        AnalyzerError::Lex { location, message: message.into() }
    }
}

/// Why an expression could not be parsed. Never fatal: the check it belongs to is simply
/// considered unknown.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{message} at token {index}")]
pub struct ParseError {
    pub index: usize,
    pub message: String,
}

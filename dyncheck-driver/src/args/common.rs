// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Arguments that control how much the driver tells about itself.
use crate::args::ValidateArgs;
use clap::error::{Error, ErrorKind};
use std::str::FromStr;
use tracing_subscriber::filter::Directive;

#[derive(Debug, Default, clap::Args)]
pub struct CommonArgs {
    /// Produce full debug information
    #[arg(long)]
    pub debug: bool,
    /// Produces no output, just an exit code; overrides --verbose
    #[arg(long, short)]
    pub quiet: bool,
    /// Output processing stages, along with minor debug information
    #[arg(long, short, default_value_if("debug", "true", Some("true")))]
    pub verbose: bool,
    /// Enable logs matching the given filter, e.g., `debug` or `dyncheck_analyzer=trace`.
    /// Logs are also controlled by the `DYNCHECK_LOG` environment variable.
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
    /// Print logs as JSON objects instead of a tree
    #[arg(long)]
    pub json_logs: bool,
}

impl CommonArgs {
    /// Whether progress messages should be printed.
    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// The log filter given on the command line, if any. `--debug` enables debug logs.
    pub fn log_directive(&self) -> Option<&str> {
        self.log_level.as_deref().or(self.debug.then_some("debug"))
    }
}

impl ValidateArgs for CommonArgs {
    fn validate(&self) -> Result<(), Error> {
        if let Some(level) = &self.log_level
            && let Err(err) = Directive::from_str(level)
        {
            return Err(Error::raw(
                ErrorKind::ValueValidation,
                format!("invalid `--log-level` filter `{level}`: {err}"),
            ));
        }
        Ok(())
    }
}

// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Module that defines the `dyncheck` command line interface.

pub mod common;

use self::common::CommonArgs;
use clap::builder::{PossibleValue, TypedValueParser};
use clap::error::{ContextKind, ContextValue, Error, ErrorKind};
use clap::ValueEnum;
use dyncheck_analyzer::checker::DEFAULT_CHECK_FUNCTIONS;
use dyncheck_analyzer::{CheckerConfig, DataModel, WarningLevel};
use std::path::PathBuf;
use std::str::FromStr;
use strum::VariantNames;

/// Trait used to perform extra validation after parsing.
pub trait ValidateArgs {
    /// Perform post-parsing validation but do not abort.
    fn validate(&self) -> Result<(), Error>;
}

/// Validate a set of arguments and ensure they are in a valid state.
/// This method will abort execution with a user friendly error message if the state is invalid.
pub fn check_is_valid<T>(command: &T)
where
    T: clap::Parser + ValidateArgs,
{
    if let Err(error) = command.validate() {
        error.format(&mut T::command()).exit()
    }
}

#[derive(Debug, clap::Parser)]
#[command(
    version,
    name = "dyncheck",
    about = "Report the dynamic checks of C sources that will always fail",
    args_override_self = true
)]
pub struct DyncheckArgs {
    /// C source files to check
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Compare the diagnostics with the `expected-*` directives written in the source comments
    #[arg(long)]
    pub verify: bool,

    /// Format of the reported diagnostics
    #[arg(long, value_enum, default_value_t = OutputFormat::Regular)]
    pub output_format: OutputFormat,

    /// Define an object-like macro, as `NAME` or `NAME=VALUE`
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Treat calls to this function as dynamic checks. Replaces the default
    /// `dynamic_check` and `_Dynamic_check` names.
    #[arg(long = "check-fn", value_name = "NAME")]
    pub check_functions: Vec<String>,

    /// Also report checks that can never fail
    #[arg(long)]
    pub report_redundant: bool,

    /// Suppress all warnings
    #[arg(short = 'w')]
    pub no_warnings: bool,

    /// Report warnings as errors
    #[arg(long)]
    pub werror: bool,

    /// Data model of the target, which sets the width of `long` and pointers
    #[arg(
        long,
        default_value = "lp64",
        value_parser = DataModelValueParser::new(DataModel::VARIANTS)
    )]
    pub data_model: DataModel,

    /// Read flags from this file instead of the `dyncheck.toml` found in the current directory or
    /// one of its parents
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Do not read flags from a configuration file
    #[arg(long, conflicts_with = "config")]
    pub no_config: bool,

    #[command(flatten)]
    pub common_args: CommonArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    /// Diagnostics with the source line they point to, and a summary
    Regular,
    /// One line per diagnostic
    Terse,
    /// The reports of every file as a JSON array
    Json,
}

impl DyncheckArgs {
    pub fn checker_config(&self) -> CheckerConfig {
        let check_functions = if self.check_functions.is_empty() {
            DEFAULT_CHECK_FUNCTIONS.iter().map(|name| name.to_string()).collect()
        } else {
            self.check_functions.clone()
        };
        let warnings = match (self.no_warnings, self.werror) {
            (true, _) => WarningLevel::Allow,
            (false, true) => WarningLevel::Deny,
            (false, false) => WarningLevel::Warn,
        };
        CheckerConfig {
            check_functions,
            defines: self.defines.clone(),
            report_redundant: self.report_redundant,
            warnings,
            data_model: self.data_model,
        }
    }
}

fn is_identifier(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && name.chars().all(|c| c == '_' || c.is_ascii_alphanumeric())
}

impl ValidateArgs for DyncheckArgs {
    fn validate(&self) -> Result<(), Error> {
        self.common_args.validate()?;
        if self.no_warnings && self.werror {
            return Err(Error::raw(
                ErrorKind::ArgumentConflict,
                "`-w` suppresses the warnings that `--werror` would turn into errors. \
                 Use only one of them.",
            ));
        }
        if self.verify && self.output_format == OutputFormat::Json {
            return Err(Error::raw(
                ErrorKind::ArgumentConflict,
                "`--verify` reports mismatches as text and cannot be used with \
                 `--output-format json`.",
            ));
        }
        if let Some(name) = self.check_functions.iter().find(|name| !is_identifier(name)) {
            return Err(Error::raw(
                ErrorKind::ValueValidation,
                format!("`--check-fn` expects a C identifier, found `{name}`"),
            ));
        }
        Ok(())
    }
}

/// clap parser for `DataModel`
#[derive(Clone, Debug)]
pub struct DataModelValueParser(Vec<PossibleValue>);

impl DataModelValueParser {
    pub fn new(values: impl Into<DataModelValueParser>) -> Self {
        values.into()
    }
}

impl TypedValueParser for DataModelValueParser {
    type Value = DataModel;

    fn parse_ref(
        &self,
        cmd: &clap::builder::Command,
        arg: Option<&clap::builder::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::error::Error> {
        let value = value.to_string_lossy();
        let mut err = clap::Error::new(ErrorKind::InvalidValue).with_cmd(cmd);
        if let Some(arg) = arg {
            err.insert(ContextKind::InvalidArg, ContextValue::String(arg.to_string()));
        }
        err.insert(ContextKind::InvalidValue, ContextValue::String(value.to_string()));
        err.insert(
            ContextKind::ValidValue,
            ContextValue::Strings(DataModel::VARIANTS.iter().map(|v| v.to_string()).collect()),
        );
        DataModel::from_str(&value).map_err(|_| err)
    }

    /// Used for the help message
    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue> + '_>> {
        Some(Box::new(self.0.iter().cloned()))
    }
}

impl<I, T> From<I> for DataModelValueParser
where
    I: IntoIterator<Item = T>,
    T: Into<PossibleValue>,
{
    fn from(values: I) -> Self {
        Self(values.into_iter().map(|t| t.into()).collect())
    }
}

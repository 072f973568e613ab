// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flags read from a `dyncheck.toml` configuration file.
//!
//! ```toml
//! [dyncheck.flags]
//! report-redundant = true
//! data-model = "ilp32"
//! define = ["DEBUG", "LIMIT=16"]
//! ```

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use toml::Value;
use toml::value::Table;
use tracing::debug;

/// Name of the file searched from the current directory upwards.
pub const CONFIG_FILE: &str = "dyncheck.toml";

/// Table that holds the flags.
const FLAGS_TABLE: &str = "dyncheck.flags";

/// Insert the flags of the configuration file before the command line arguments, so the latter
/// take precedence.
pub fn join_args(input_args: Vec<OsString>) -> Result<Vec<OsString>> {
    let Some(config) = config_file(&input_args)? else {
        return Ok(input_args);
    };
    let tomldata = std::fs::read_to_string(&config)
        .with_context(|| format!("failed to read configuration file `{}`", config.display()))?;
    let config_args = toml_to_args(&tomldata)
        .with_context(|| format!("invalid configuration file `{}`", config.display()))?;
    debug!(config = %config.display(), ?config_args, "join_args");

    let mut input_args = input_args.into_iter();
    let mut args: Vec<OsString> = input_args.next().into_iter().collect();
    args.extend(config_args);
    args.extend(input_args);
    Ok(args)
}

/// Look for `--config` and `--no-config` ahead of argument parsing. Without them, search for
/// the default file in the current directory and its ancestors.
fn config_file(args: &[OsString]) -> Result<Option<PathBuf>> {
    let mut explicit = None;
    let mut args = args.iter().skip(1);
    while let Some(arg) = args.next() {
        let arg = arg.to_string_lossy();
        match arg.as_ref() {
            "--" => break,
            "--no-config" => return Ok(None),
            "--config" => match args.next() {
                Some(path) => explicit = Some(PathBuf::from(path)),
                None => bail!("`--config` requires a path"),
            },
            _ => {
                if let Some(path) = arg.strip_prefix("--config=") {
                    explicit = Some(PathBuf::from(path));
                }
            }
        }
    }
    if explicit.is_some() {
        return Ok(explicit);
    }
    let current_dir = std::env::current_dir().context("failed to read the current directory")?;
    Ok(find_config(&current_dir))
}

/// The closest `dyncheck.toml` in `dir` or one of its ancestors.
fn find_config(dir: &Path) -> Option<PathBuf> {
    dir.ancestors().map(|dir| dir.join(CONFIG_FILE)).find(|path| path.is_file())
}

/// Parse a config toml string and extract the arguments it sets.
fn toml_to_args(tomldata: &str) -> Result<Vec<OsString>> {
    let config = tomldata.parse::<Table>()?;
    let Some(flags) = get_table(&config, FLAGS_TABLE) else {
        return Ok(Vec::new());
    };
    // Stable ordering of flags for a given input.
    let flags: BTreeMap<&String, &Value> = flags.iter().collect();

    let mut args = Vec::new();
    for (flag, value) in flags {
        if matches!(flag.as_str(), "config" | "no-config") {
            bail!("`{flag}` cannot be set from a configuration file");
        }
        insert_arg_from_toml(flag, value, &mut args)?;
    }
    Ok(args)
}

/// Translates one toml entry (flag, value) into arguments and inserts it into `args`.
fn insert_arg_from_toml(flag: &str, value: &Value, args: &mut Vec<OsString>) -> Result<()> {
    match value {
        Value::Boolean(true) => args.push(format!("--{flag}").into()),
        // Every boolean flag is off by default.
        Value::Boolean(false) => {}
        Value::String(s) => {
            args.push(format!("--{flag}").into());
            args.push(s.into());
        }
        Value::Array(values) => {
            for value in values {
                let Some(value) = value.as_str() else {
                    bail!("flag `{flag}` contains non-string values");
                };
                args.push(format!("--{flag}").into());
                args.push(value.into());
            }
        }
        _ => bail!("flag `{flag}` must be a boolean, a string or an array of strings"),
    }
    Ok(())
}

/// The table at the dotted path `table`, e.g., `dyncheck.flags`.
fn get_table<'a>(start: &'a Table, table: &str) -> Option<&'a Table> {
    let mut current = start;
    for key in table.split('.') {
        current = current.get(key)?.as_table()?;
    }
    Some(current)
}

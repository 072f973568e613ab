// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use args::{DyncheckArgs, OutputFormat, check_is_valid};
use args_toml::join_args;

use clap::Parser;
use dyncheck_analyzer::{Analysis, StaticChecker, verify::verify};
use rayon::prelude::*;
use tracing::debug;

mod args;
mod args_toml;
mod render;
mod session;
mod util;

/// The main function for the `dyncheck` command.
fn main() -> ExitCode {
    match dyncheck_main(Vec::from_iter(std::env::args_os())) {
        Ok(code) => code,
        Err(error) => {
            debug!(?error, "main_failure");
            util::error(&format!("{error:#}"));
            ExitCode::FAILURE
        }
    }
}

/// A source file and what the analyzer found in it.
struct CheckedFile {
    src: String,
    analysis: Analysis,
}

fn dyncheck_main(input_args: Vec<OsString>) -> Result<ExitCode> {
    let input_args = join_args(input_args)?;
    let args = DyncheckArgs::parse_from(input_args);
    check_is_valid(&args);
    session::init_session(&args.common_args)?;
    debug!(?args, "dyncheck_main");

    let checker = StaticChecker::new(args.checker_config())?;
    if !args.common_args.quiet {
        for path in args.input.iter().filter(|path| !is_c_source(path)) {
            util::warning(&format!("`{}` does not look like a C source file", path.display()));
        }
    }

    // Files are analyzed in parallel, results keep the input order.
    let files = args
        .input
        .par_iter()
        .map(|path| check_file(&checker, path))
        .collect::<Result<Vec<_>>>()?;

    let success =
        if args.verify { verify_files(&args, &files) } else { report_files(&args, &files)? };
    if args.common_args.is_verbose() {
        let status = if success { "succeeded" } else { "failed" };
        let files = util::plural(files.len(), "file");
        util::info_operation("Finished", &format!("{files} {status}"));
    }
    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn is_c_source(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "c" || ext == "h")
}

fn check_file(checker: &StaticChecker, path: &Path) -> Result<CheckedFile> {
    let name = path.display().to_string();
    let src =
        std::fs::read_to_string(path).with_context(|| format!("failed to read `{name}`"))?;
    let analysis =
        checker.analyze(&name, &src).with_context(|| format!("failed to analyze `{name}`"))?;
    Ok(CheckedFile { src, analysis })
}

/// Print the diagnostics of every file. Fails if any file has errors.
fn report_files(args: &DyncheckArgs, files: &[CheckedFile]) -> Result<bool> {
    let reports: Vec<_> = files.iter().map(|file| &file.analysis.report).collect();
    let success = !reports.iter().any(|report| report.has_errors());
    if args.common_args.quiet {
        return Ok(success);
    }
    match args.output_format {
        OutputFormat::Json => println!("{}", render::json(&reports)?),
        OutputFormat::Terse => {
            files.iter().for_each(|file| print!("{}", render::terse(&file.analysis.report)))
        }
        OutputFormat::Regular => {
            for file in files {
                if args.common_args.is_verbose() {
                    util::info_operation("Checked", &file.analysis.report.file);
                }
                print!("{}", render::regular(&file.analysis.report, &file.src));
            }
            if let Some(summary) = render::summary(reports.iter().copied()) {
                println!("{summary}");
            }
        }
    }
    Ok(success)
}

/// Compare the diagnostics of every file with the directives in its comments.
fn verify_files(args: &DyncheckArgs, files: &[CheckedFile]) -> bool {
    let mut failures = 0;
    for file in files {
        let outcome = verify(&file.analysis.report, &file.analysis.comments);
        debug!(file = %outcome.file, success = outcome.is_success(), "verify_files");
        let messages = outcome.messages();
        failures += messages.len();
        if !args.common_args.quiet {
            messages.iter().for_each(|message| util::error(message));
        }
    }
    if failures > 0 && !args.common_args.quiet {
        println!("{} generated.", util::plural(failures, "error"));
    }
    failures == 0
}

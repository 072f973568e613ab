// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Module used to configure a driver session.

use crate::args::common::CommonArgs;
use anyhow::{Context, Result};
use std::panic;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing_subscriber::{EnvFilter, Registry, filter::Directive, layer::SubscriberExt};
use tracing_tree::HierarchicalLayer;

/// Environment variable used to control this session log tracing.
const LOG_ENV_VAR: &str = "DYNCHECK_LOG";

// Custom panic hook.
#[allow(clippy::type_complexity)]
static PANIC_HOOK: LazyLock<Box<dyn Fn(&panic::PanicHookInfo<'_>) + Sync + Send + 'static>> =
    LazyLock::new(|| {
        let hook = panic::take_hook();
        panic::set_hook(Box::new(|info| {
            // Print stack trace.
            (*PANIC_HOOK)(info);
            eprintln!();
            eprintln!("dyncheck unexpectedly panicked while analyzing the input files.");
            eprintln!(
                "If you are seeing this message, please report it together with the input that \
                 triggered it. Rerunning with `{LOG_ENV_VAR}=debug` shows the last analyzed call \
                 site."
            );
        }));
        hook
    });

/// Initialize driver session.
pub fn init_session(args: &CommonArgs) -> Result<()> {
    init_panic_hook();
    init_logger(args)
}

/// Initialize the logger using the DYNCHECK_LOG environment variable and the --log-level argument.
fn init_logger(args: &CommonArgs) -> Result<()> {
    let filter = EnvFilter::from_env(LOG_ENV_VAR);
    let filter = match args.log_directive() {
        Some(directive) => filter.add_directive(
            Directive::from_str(directive)
                .with_context(|| format!("invalid log filter `{directive}`"))?,
        ),
        None => filter,
    };

    if args.json_logs { json_logs(filter) } else { hier_logs(filter) }
}

/// Configure global logger to use a json logger.
fn json_logs(filter: EnvFilter) -> Result<()> {
    use tracing_subscriber::fmt::layer;
    let subscriber =
        Registry::default().with(filter).with(layer().json().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber).context("failed to install the logger")
}

/// Configure global logger to use a hierarchical view. Logs go to stderr so they never mix with
/// the reports.
fn hier_logs(filter: EnvFilter) -> Result<()> {
    let use_colors = console::Term::stderr().features().colors_supported();
    let subscriber = Registry::default().with(filter);
    let subscriber = subscriber.with(
        HierarchicalLayer::default()
            .with_writer(std::io::stderr)
            .with_indent_lines(true)
            .with_ansi(use_colors)
            .with_targets(true)
            .with_verbose_exit(true)
            .with_indent_amount(4),
    );
    tracing::subscriber::set_global_default(subscriber).context("failed to install the logger")
}

fn init_panic_hook() {
    // Install panic hook
    LazyLock::force(&PANIC_HOOK);
}

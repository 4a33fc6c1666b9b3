//! CLI entry point for the plan risk analyzer.
//!
//! The pipeline is designed to be deterministic end to end: identical plan
//! and configuration bytes produce byte-identical reports, so CI gates can
//! diff output across runs. All diagnostics go to stderr; stdout carries
//! only the report.

use clap::Parser;

mod analysis;
mod cli;
mod commands;
mod config;
mod contracts;
mod errors;
mod explain;
mod graph;
mod ingest;
mod policy;
mod report;

use cli::{Command, PolicyCommand, ReportCommand, RootArgs};
use errors::exit;

fn main() {
    init_tracing();

    let args = match RootArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version print to stdout and exit clean; anything else
            // is a usage error, which the CI contract maps to exit 1.
            let is_usage_error = err.use_stderr();
            let _ = err.print();
            std::process::exit(if is_usage_error {
                exit::RUNTIME_ERROR
            } else {
                exit::SUCCESS
            });
        }
    };

    let code = match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            exit::RUNTIME_ERROR
        }
    };
    std::process::exit(code);
}

fn run(args: RootArgs) -> errors::Result<i32> {
    match args.command {
        Command::Analyze(args) => commands::run_analyze(args),
        Command::Explain(args) => commands::run_explain(args),
        Command::Summary(args) => commands::run_summary(args),
        Command::Policy(PolicyCommand::Check(args)) => commands::run_policy_check(args),
        Command::Report(ReportCommand::Markdown(args)) => commands::run_report_markdown(args),
        Command::Report(ReportCommand::Artifact(args)) => commands::run_report_artifact(args),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

//! dsflint CLI
//!
//! Lints a DSF process-plugin archive or exploded project directory and
//! renders the report as human-readable text, JSON, or HTML.
//!
//! Exit codes: 0 success (or forced pass via --no-fail), 1 errors present,
//! 2 internal failure.

mod output;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::error;

use dsflint_core::{init_tracing, ExitDisposition, LintContext, LintTarget};
use dsflint_rules::Linter;

use crate::output::ReportRenderer;

#[derive(Parser)]
#[command(name = "dsflint")]
#[command(about = "Static linter for DSF process-plugin archives")]
#[command(version = dsflint_core::VERSION)]
#[command(
    long_about = "dsflint checks a packaged DSF process plugin (JAR) or an exploded\n\
project directory: it discovers the plugin definition, resolves the BPMN\n\
and FHIR resources it declares, and evaluates the DSF rule catalogue.\n\
\n\
Examples:\n  \
dsflint target/my-plugin.jar                # lint an archive\n  \
dsflint . --json --report-dir target        # also write lint-report.json\n  \
dsflint my-plugin.jar --no-fail             # never fail the build"
)]
struct Cli {
    /// Plugin archive (JAR) or exploded project directory
    path: PathBuf,

    /// Write an HTML report (lint-report.html)
    #[arg(long)]
    html: bool,

    /// Write a JSON report (lint-report.json)
    #[arg(long)]
    json: bool,

    /// Directory the report files are written to
    #[arg(long, default_value = ".")]
    report_dir: PathBuf,

    /// Exit with code 0 even when errors were reported
    #[arg(long)]
    no_fail: bool,

    /// Abort rule phases after this many seconds and report partially
    #[arg(long)]
    timeout: Option<u64>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Verbose logging (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    match lint(&cli) {
        Ok(exit) => exit,
        Err(err) => {
            error!(%err, "lint run failed");
            eprintln!("dsflint: {err}");
            2
        }
    }
}

fn lint(cli: &Cli) -> anyhow::Result<i32> {
    let target = LintTarget::detect(&cli.path)?;
    let deadline = cli
        .timeout
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let ctx = LintContext::new()?.with_deadline(deadline);

    let report = Linter::new(ctx).run(&target)?;

    let renderer = ReportRenderer::new(!cli.no_color);
    renderer.print_human(&report);

    if cli.json || cli.html {
        std::fs::create_dir_all(&cli.report_dir)?;
    }
    if cli.json {
        let path = cli.report_dir.join("lint-report.json");
        std::fs::write(&path, renderer.to_json(&report)?)?;
        eprintln!("JSON report written to {}", path.display());
    }
    if cli.html {
        let path = cli.report_dir.join("lint-report.html");
        std::fs::write(&path, renderer.to_html(&report))?;
        eprintln!("HTML report written to {}", path.display());
    }

    Ok(match report.disposition(cli.no_fail) {
        ExitDisposition::Ok => 0,
        ExitDisposition::ErrorsPresent => 1,
    })
}

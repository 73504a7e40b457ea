mod aggregate;
mod config;
mod flags;
mod legacy;
mod locate;
mod output;
mod pipeline;
mod reader;
mod record;
mod xcresulttool;

use clap::{ArgAction, Parser};
use pipeline::PipelineError;
use std::path::PathBuf;
use std::process::ExitCode;
use xcresulttool::XcResultTool;

const USAGE: &str = "\
Prints performance result test data from test runs captured in Apple .xcresult bundles.

USAGE: xcresult-extract [--config <FILE>] [--verbose] [--legacy-logs] -project <path> -scheme <scheme> [other flags...]

xcresult-extract finds the result bundle associated with an xcodebuild
invocation. Pass your entire xcodebuild command-line as arguments and it will
read the bundle of the most recent invocation, print the averaged performance
metrics of each test and write them to data.txt.
";

/// Extract performance-test metrics from the newest .xcresult bundle of an
/// xcodebuild invocation.
///
/// Own options are long-only and must come before the xcodebuild flags, so
/// single-dash xcodebuild flags pass through untouched.
#[derive(Parser, Debug)]
#[command(
    name = "xcresult-extract",
    version,
    about,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Config file path (default: ./xcresult-extract.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging (paths searched, xcresulttool invocations)
    #[arg(long)]
    verbose: bool,

    /// Print the plain-text logs of a pre-Xcode 11 bundle instead of metrics
    #[arg(long)]
    legacy_logs: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Print version
    #[arg(long, action = ArgAction::Version)]
    version: Option<bool>,

    /// The xcodebuild command-line (e.g. -project X.xcodeproj -scheme S test)
    #[arg(
        value_name = "XCODEBUILD_ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    xcodebuild_args: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.xcodebuild_args.is_empty() {
        print!("{USAGE}");
        return ExitCode::from(1);
    }

    init_tracing(cli.verbose);
    tracing::debug!(?cli, "parsed CLI arguments");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "run failed");
            eprintln!("error: {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "xcresult_extract=debug"
    } else {
        "xcresult_extract=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<(), PipelineError> {
    let cwd = std::env::current_dir()?;
    let config = config::load_config(cli.config.as_deref(), &cwd)?;

    let flags = flags::XcodebuildFlags::parse(cli.xcodebuild_args.as_slice());
    tracing::debug!(?flags, "recognized xcodebuild flags");
    if flags.is_empty() {
        tracing::warn!("no -project, -scheme or -resultBundlePath among the xcodebuild flags");
    }

    let bundle = pipeline::resolve_bundle(&flags, &config)?;
    tracing::info!(bundle = %bundle.display(), "reading result bundle");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if cli.legacy_logs {
        let files = legacy::find_legacy_log_files(&bundle)?;
        legacy::cat_files(&files, &mut out)?;
        return Ok(());
    }

    let tool = XcResultTool::from_config(&config.xcresulttool);
    let results = pipeline::extract(&tool, &bundle, config.metrics.labels.as_slice(), &mut out)?;
    output::write_data_file(&config.output.file, &results)?;
    Ok(())
}

//! Boxer - packages versioned VM boxes and maintains their release metadata
//!
//! The binary is a thin shell: parse flags, initialize tracing, hand a
//! `RunOptions` to the core release cycle, and report the outcome.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use boxer_core::config::CliOverrides;
use boxer_core::packager::CommandPackager;
use boxer_core::release::{run_release, RunOptions};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "boxer",
    about = "Package a VM box and record its versioned release metadata",
    version
)]
struct Cli {
    /// Path to the external packaging tool
    #[clap(long, default_value = "boxer-package")]
    boxer_path: PathBuf,

    /// Artifact file the packaging tool writes (default: <base>.box)
    #[clap(long)]
    output: Option<PathBuf>,

    /// Advance the version (increment its final segment) before packaging
    #[clap(long)]
    bump: bool,

    /// Reuse an already-present artifact instead of repackaging
    #[clap(long)]
    keep: bool,

    /// Config file path; a missing file degrades to defaults with a warning
    #[clap(long, default_value = "boxer.json")]
    config: PathBuf,

    /// Release metadata (ledger) file path
    #[clap(long, default_value = "boxes.json")]
    metadata: PathBuf,

    /// Base name of the box (overrides the config file's vm-name)
    #[clap(long)]
    base: Option<String>,

    /// URL template with {name}/{version}/{provider} placeholders
    #[clap(long, conflicts_with = "url_prefix")]
    url_template: Option<String>,

    /// URL prefix, joined with the suffix to form the template
    #[clap(long)]
    url_prefix: Option<String>,

    /// URL suffix joined onto --url-prefix (default: {name}-{version}-{provider}.box)
    #[clap(long)]
    url_suffix: Option<String>,

    /// Major version used when the metadata file has no active version
    #[clap(long)]
    box_version: Option<u32>,

    /// Shorthand for --log-level debug
    #[clap(short, long)]
    verbose: bool,

    /// Set log level
    #[clap(long, default_value = "info")]
    log_level: LogLevel,
}

/// Configure logging from CLI flags; all output goes to stderr
fn initialize_tracing(log_level: &LogLevel, verbose: bool) {
    let directive = if verbose {
        "debug"
    } else {
        log_level.to_filter_directive()
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.verbose);

    let opts = RunOptions {
        config_path: Some(cli.config),
        metadata_path: cli.metadata,
        output: cli.output,
        bump: cli.bump,
        keep_existing: cli.keep,
        overrides: CliOverrides {
            base_name: cli.base,
            major_version: cli.box_version,
            url_template: cli.url_template,
            url_prefix: cli.url_prefix,
            url_suffix: cli.url_suffix,
        },
    };

    let packager = CommandPackager::new(cli.boxer_path);

    match run_release(&opts, &packager).await {
        Ok(report) => {
            println!("box      {}", report.boxer_id);
            println!("released {}", report.version);
            println!("url      {}", report.url);
            println!("sha1     {}", report.checksum);
            println!("artifact {}", report.artifact.display());
            Ok(())
        }
        Err(e) => {
            error!("Release failed: {:#}", anyhow::Error::from(e));
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_map_to_overrides() {
        let cli = Cli::parse_from([
            "boxer",
            "--base",
            "web",
            "--box-version",
            "2",
            "--bump",
            "--keep",
            "--url-prefix",
            "http://x/",
        ]);
        assert_eq!(cli.base.as_deref(), Some("web"));
        assert_eq!(cli.box_version, Some(2));
        assert!(cli.bump);
        assert!(cli.keep);
        assert_eq!(cli.url_prefix.as_deref(), Some("http://x/"));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["boxer", "--no-such-flag"]).is_err());
    }

    #[test]
    fn test_flag_missing_value_rejected() {
        assert!(Cli::try_parse_from(["boxer", "--base"]).is_err());
    }
}

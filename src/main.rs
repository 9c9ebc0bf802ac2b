mod config;
mod epg;
mod programme;
mod xmltv;

use crate::config::{API_BASE_ENV, CALENDAR_JSON_ENV, DEFAULT_OUTPUT, EpgConfig};
use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LONG_RANGE_DAYS: u32 = 30;
const FAILURE_EXIT_CODE: i32 = 1;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Generate the Ligue 1+ XMLTV programme guide",
    after_help = usage_env()
)]
struct Args {
    /// Number of days to fetch, starting today
    #[arg(short, long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..))]
    days: u32,

    #[arg(short, long, value_name = "PATH", help = format!("Output file (default: {DEFAULT_OUTPUT})"))]
    output: Option<PathBuf>,

    /// Debug logging and a per-programme summary
    #[arg(short, long)]
    verbose: bool,
}

fn usage_env() -> String {
    format!(
        "Environment:
  {CALENDAR_JSON_ENV}   Path to a local calendar JSON snapshot (skips the API)
  {API_BASE_ENV}        Calendar API base URL (default https://ma-api.ligue1.fr)
  RUST_LOG                   Log filter, overrides --verbose"
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::try_parse().unwrap_or_else(|e| {
        // Help and version go to stdout and still exit 0.
        if !e.use_stderr() {
            e.exit();
        }
        let _ = e.print();
        std::process::exit(usage_exit_code(&e))
    });

    setup_logging(args.verbose)?;

    if args.days > LONG_RANGE_DAYS {
        warn!("Fetching {} days, more than {LONG_RANGE_DAYS} may take a while", args.days);
    }

    let mut config = EpgConfig::load();
    if let Some(output) = args.output {
        config.output = output;
    }

    info!("=== Generating {} EPG ===", config.channel.name);
    let listing = epg::generate(&config, args.days, Utc::now())
        .await
        .context("EPG generation failed")?;

    info!("=== EPG written to {} ===", config.output.display());
    info!(
        "{} matches, {} programmes ({} multiplex)",
        listing.match_count,
        listing.programmes.len(),
        listing.multiplex_count()
    );

    if args.verbose && !listing.programmes.is_empty() {
        info!("=== Programmes ===");
        for programme in &listing.programmes {
            info!(
                "  {} - {}",
                programme.start_time().format("%d/%m %H:%M"),
                programme.title()
            );
            if programme.matches().len() > 1 {
                for m in programme.matches() {
                    info!("      {}", m.fixture());
                }
            }
        }
    }

    Ok(())
}

/// Bad arguments fail like any other run failure rather than with clap's 2.
fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() { FAILURE_EXIT_CODE } else { 0 }
}

fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let default_filter = if verbose {
        "info,ligue1_epg=debug,ligue1_api=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Also installs the `log` bridge, which is what both crates log through.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["ligue1-epg"]).unwrap();
        assert_eq!(args.days, 7);
        assert!(args.output.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn short_flags() {
        let args = Args::try_parse_from(["ligue1-epg", "-d", "14", "-o", "my_epg.xml", "-v"]).unwrap();
        assert_eq!(args.days, 14);
        assert_eq!(args.output, Some(PathBuf::from("my_epg.xml")));
        assert!(args.verbose);
    }

    #[test]
    fn days_must_be_positive() {
        assert!(Args::try_parse_from(["ligue1-epg", "--days", "0"]).is_err());
        assert!(Args::try_parse_from(["ligue1-epg", "--days", "-3"]).is_err());
        assert!(Args::try_parse_from(["ligue1-epg", "--days", "31"]).is_ok());
    }

    #[test]
    fn bad_arguments_exit_with_one() {
        for argv in [
            vec!["ligue1-epg", "--days", "0"],
            vec!["ligue1-epg", "--days", "soon"],
            vec!["ligue1-epg", "--bogus"],
        ] {
            let err = Args::try_parse_from(argv.iter().copied()).unwrap_err();
            assert_eq!(usage_exit_code(&err), 1, "{argv:?}");
        }
    }

    #[test]
    fn help_and_version_still_exit_zero() {
        for flag in ["--help", "--version"] {
            let err = Args::try_parse_from(["ligue1-epg", flag]).unwrap_err();
            assert_eq!(usage_exit_code(&err), 0, "{flag}");
        }
    }
}

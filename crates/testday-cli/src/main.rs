// testday entry point.
//
// Startup sequence:
// 1. Parse arguments, initialize tracing (stderr)
// 2. Load and validate the mapping config
// 3. Resolve every source, score categories, assemble the report
// 4. Write the report JSON, creating parent directories

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use testday_core::{build_report, load_config, Report, SystemClock};
use tracing::info;

const DEFAULT_CONFIG: &str = "scripts/mapping.json";
const DEFAULT_OUTPUT: &str = "data/converted/report.json";

#[derive(Parser, Debug)]
#[command(
    name = "testday",
    version,
    about = "Convert athletic-testing CSV exports into a scored JSON report"
)]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG, help = "Path to the mapping config (JSON or TOML)")]
    config: PathBuf,
    #[arg(long, default_value = DEFAULT_OUTPUT, help = "Output JSON file path")]
    output: PathBuf,
    #[arg(long, help = "Write compact JSON instead of pretty-printed")]
    compact: bool,
    #[arg(short, long, help = "Log debug detail to stderr")]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    info!(
        "Config loaded: {} sources, {} categories, {} sections",
        config.sources.len(),
        config.categories.len(),
        config.sections.len()
    );

    let report = build_report(&config, &SystemClock).context("failed to build report")?;

    write_report(&report, &cli.output, cli.compact)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    info!("Wrote {} players to {}", report.players.len(), cli.output.display());
    println!("Wrote {}", cli.output.display());
    Ok(())
}

fn write_report(report: &Report, path: &Path, compact: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = if compact {
        serde_json::to_string(report)?
    } else {
        serde_json::to_string_pretty(report)?
    };
    std::fs::write(path, json)?;
    Ok(())
}

/// Initialize tracing to stderr so stdout stays clean for the summary line.
fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose {
        "testday_core=debug,testday_cli=debug,warn"
    } else {
        "testday_core=info,testday_cli=info,warn"
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied() {
        let cli = Cli::try_parse_from(["testday"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG));
        assert_eq!(cli.output, PathBuf::from(DEFAULT_OUTPUT));
        assert!(!cli.compact);
        assert!(!cli.verbose);
    }

    #[test]
    fn explicit_paths() {
        let cli = Cli::try_parse_from([
            "testday",
            "--config",
            "cfg/mapping.toml",
            "--output",
            "out/r.json",
            "--compact",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("cfg/mapping.toml"));
        assert_eq!(cli.output, PathBuf::from("out/r.json"));
        assert!(cli.compact);
        assert!(cli.verbose);
    }
}

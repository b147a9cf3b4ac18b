use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::Scenario;

#[derive(Parser, Debug)]
#[command(name = "arch-sim", about = "Simulate request traffic through a system architecture")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a scenario for a number of ticks and print the results.
    Run(RunArgs),
    /// Validate a scenario and print what was parsed.
    ShowConfig(ScenarioArgs),
    /// Print the supported node types.
    ListNodeTypes,
}

#[derive(Args, Debug)]
pub struct ScenarioArgs {
    /// Scenario file (.toml or .json).
    #[arg(long)]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    #[arg(long, default_value_t = 100)]
    pub ticks: u64,
    #[arg(long, help = "Override the scenario seed; omit both for a random seed")]
    pub seed: Option<u64>,
    #[arg(long, help = "Override the scenario tick interval in milliseconds")]
    pub tick_ms: Option<u64>,
    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    pub format: FormatArg,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Human,
    Summary,
    Json,
}

/// A fully resolved `run` invocation.
#[derive(Debug)]
pub struct RunConfig {
    pub scenario: Scenario,
    pub ticks: u64,
    pub format: FormatArg,
}

pub fn parse_args() -> Result<Cli> {
    Cli::try_parse().map_err(|e| Error::Cli(e.to_string()))
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err))),
        "" => Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => Err(Error::UnsupportedConfigFormat(ext.to_string())),
    }
}

/// Loads the scenario and applies command-line overrides on top of it.
pub fn build_run_config(args: RunArgs) -> Result<RunConfig> {
    if args.ticks == 0 {
        return Err(Error::TicksZero);
    }

    let mut scenario = load_scenario(&args.scenario.config)?;
    if let Some(seed) = args.seed {
        scenario.simulation.seed = Some(seed);
    }
    if let Some(tick_ms) = args.tick_ms {
        scenario.simulation.tick_interval_ms = tick_ms;
    }

    Ok(RunConfig {
        scenario,
        ticks: args.ticks,
        format: args.format,
    })
}

use arch_sim::config::{self, Command, FormatArg};
use arch_sim::engine;
use arch_sim::error::Result;
use arch_sim::graph::ArchitectureGraph;
use arch_sim::models::NodeKind;
use arch_sim::output::{self, Formatter, HumanFormatter, JsonFormatter, SummaryFormatter};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = config::parse_args()?;

    match cli.command {
        Command::Run(args) => {
            let run = config::build_run_config(args)?;
            let report = engine::run_scenario(&run.scenario, run.ticks)?;
            print!("{}", formatter_for(run.format).write(&report));
        }
        Command::ShowConfig(args) => {
            let scenario = config::load_scenario(&args.config)?;
            engine::validate_settings(&scenario.simulation)?;
            ArchitectureGraph::from_scenario(&scenario).validate()?;
            print!("{}", output::describe_scenario(&scenario));
        }
        Command::ListNodeTypes => {
            for label in NodeKind::LABELS {
                println!("{}", label);
            }
        }
    }

    Ok(())
}

fn formatter_for(format: FormatArg) -> Box<dyn Formatter> {
    match format {
        FormatArg::Human => Box::new(HumanFormatter),
        FormatArg::Summary => Box::new(SummaryFormatter),
        FormatArg::Json => Box::new(JsonFormatter),
    }
}

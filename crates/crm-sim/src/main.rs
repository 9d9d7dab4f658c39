use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use crm_sim::{run_simulator, scenario, SimulatorConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SimulatorConfig> {
    let Some(path) = path else {
        return Ok(SimulatorConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config = SimulatorConfig::from_toml_str(&raw)
        .with_context(|| format!("parsing {}", path.display()))?;
    config
        .pipeline
        .validate()
        .with_context(|| format!("invalid pipeline settings in {}", path.display()))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("crm-sim")
        .version(crm_sim::VERSION)
        .about("Lead pipeline invariant simulator")
        .subcommand_required(true)
        .subcommand(
            Command::new("simulate")
                .about("Run seeded random pipeline actions and check invariants")
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to simulate [default: 1000]"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility [default: 42]"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML simulator configuration"),
                ),
        )
        .subcommand(Command::new("scenario").about("Run the scripted change property scenario"));

    let matches = cli.get_matches();
    init_tracing();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let mut config = load_config(args.get_one::<PathBuf>("config"))?;
            if let Some(operations) = args.get_one::<u64>("operations") {
                config.total_operations = *operations;
            }
            if let Some(seed) = args.get_one::<u64>("seed") {
                config.seed = *seed;
            }
            if args.get_flag("stop-on-violation") {
                config.stop_on_first_violation = true;
            }

            println!("Running lead pipeline simulator...");
            println!("Operations: {}", config.total_operations);
            println!("Seed: {}", config.seed);
            println!();

            let report = run_simulator(config).await;
            println!("{}", report.generate_text());

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("scenario", _)) => {
            let report = scenario::change_property()
                .await
                .context("scenario could not run")?;
            println!("{}", report.generate_text());

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        _ => Ok(()),
    }
}

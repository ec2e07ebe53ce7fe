use anyhow::Context;
use clap::{Arg, ArgMatches, Command, value_parser};
use common::config::Settings;
use pipeline::logging::init_logging;

const DEFAULT_CONFIG: &str = "config/pipeline.toml";

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .default_value(DEFAULT_CONFIG)
        .help("Sets a custom config file")
}

fn load_settings(matches: &ArgMatches) -> anyhow::Result<Settings> {
    let path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_CONFIG);
    let settings = Settings::new(path).with_context(|| format!("Failed to load config from {}", path))?;
    init_logging(&settings.logging)?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("School Meals Pipeline")
        .version("1.0")
        .about("Validates, explores and summarizes the school meals dataset")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("trend")
                .about("Check today's record count against the historical baseline")
                .arg(config_arg())
                .arg(
                    Arg::new("count")
                        .long("count")
                        .value_name("N")
                        .value_parser(value_parser!(u64))
                        .help("Use this record count instead of fetching the dataset"),
                ),
        )
        .subcommand(
            Command::new("explore")
                .about("Profile the raw dataset and write a quality report")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("etl")
                .about("Clean, filter and aggregate the dataset into a monthly summary")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("all")
                .about("Run the trend, exploration and ETL pipelines concurrently")
                .arg(config_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("trend", sub)) => {
            let settings = load_settings(sub)?;
            let count = sub.get_one::<u64>("count").copied();
            let outcome = pipeline::run_trend_pipeline(&settings, count)
                .await
                .context("Trend pipeline failed")?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Some(("explore", sub)) => {
            let settings = load_settings(sub)?;
            let report = pipeline::run_exploration_pipeline(&settings)
                .await
                .context("Exploration pipeline failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(("etl", sub)) => {
            let settings = load_settings(sub)?;
            let outcome = pipeline::run_etl_pipeline(&settings)
                .await
                .context("ETL pipeline failed")?;
            if let Some(path) = outcome.output {
                println!("Summary written to {}", path.display());
            }
        }
        Some(("all", sub)) => {
            let settings = load_settings(sub)?;
            let outcome = pipeline::run_all_pipelines(&settings)
                .await
                .context("Pipeline run failed")?;
            println!("{}", serde_json::to_string_pretty(&outcome.trend)?);
        }
        _ => anyhow::bail!("No subcommand specified. Use --help for usage information."),
    }

    Ok(())
}

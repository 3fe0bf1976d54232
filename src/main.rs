use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

use tensile::app_logic;

fn cli() -> Command {
    let config_arg = Arg::new("config")
        .short('c')
        .long("config")
        .help("Test configuration (YAML, or TOML with a .toml extension)")
        .required(true);

    Command::new("Tensile")
        .version("0.1.0")
        .about("Mechanical properties from tensile test force/extension data")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("analyze")
                .about("Analyse recorded tests (CSV: time,force,extension[,displacement])")
                .arg(config_arg.clone())
                .arg(
                    Arg::new("samples")
                        .help("One CSV file per specimen")
                        .required(true)
                        .action(ArgAction::Append)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("replay")
                .about("Feed a captured controller log through a live test session")
                .arg(config_arg)
                .arg(
                    Arg::new("frames")
                        .help("Line-oriented controller log with DATA frames")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .after_help("Results are written to stdout as JSON. Set RUST_LOG=info for progress output.")
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("analyze", sub)) => {
            let config = sub.get_one::<String>("config").context("missing --config")?;
            let files: Vec<PathBuf> = sub.get_many::<PathBuf>("samples").into_iter().flatten().cloned().collect();
            let report = app_logic::run_analyze(config, &files)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(("replay", sub)) => {
            let config = sub.get_one::<String>("config").context("missing --config")?;
            let frames = sub.get_one::<PathBuf>("frames").context("missing frame log")?;
            let result = app_logic::run_replay(config, frames)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}

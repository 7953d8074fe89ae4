pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "fuelquote",
    about = "Fuelquote operator CLI",
    long_about = "Operate the fuel quote service: migrations, config inspection, readiness checks, and price previews.",
    after_help = "Examples:\n  fuelquote doctor --json\n  fuelquote config\n  fuelquote price --gallons 1500 --in-state"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity, and schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Preview the unit price and total for a quote without storing anything")]
    Price {
        #[arg(long, help = "Gallons requested (must be greater than zero)")]
        gallons: u32,
        #[arg(long, help = "Price as an in-state delivery")]
        in_state: bool,
        #[arg(long, help = "Price as a customer with prior quotes")]
        has_history: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Price { gallons, in_state, has_history } => {
            commands::price::run(gallons, in_state, has_history)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "motorpool",
    about = "Motorpool operator CLI",
    long_about = "Operate motorpool store migrations, admin seeding, and readiness checks.",
    after_help = "Examples:\n  motorpool migrate\n  motorpool seed --demo\n  motorpool doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Seed the default admin, optionally with a demo vehicle set")]
    Seed {
        #[arg(long, help = "Also insert a small set of demo vehicles")]
        demo: bool,
    },
    #[command(about = "Validate config and store connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed { demo } => commands::seed::run(demo),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

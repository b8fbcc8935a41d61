/*!
 * ZELA Administrative CLI Utility
 *
 * Command-line interface for administrative management of a zela-api
 * instance's SQLite database: user accounts, the school registry and
 * password resets, operating through the same ORM functions as the API
 * so data access stays consistent.
 *
 * For detailed usage information and available commands, run with --help.
 */

use clap::{Parser, Subcommand};

mod admin_cli;

use admin_cli::school_commands::{SchoolAction, handle_school_command_with_conn};
use admin_cli::user_commands::{UserAction, handle_user_command_with_conn};
use admin_cli::utils::establish_connection;

#[derive(Parser)]
#[command(name = "zela-admin")]
#[command(about = "Administrative CLI for ZELA database management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    School {
        #[command(subcommand)]
        action: SchoolAction,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut conn = establish_connection()?;

    match cli.command {
        Commands::User { action } => handle_user_command_with_conn(&mut conn, action)?,
        Commands::School { action } => handle_school_command_with_conn(&mut conn, action)?,
    }

    Ok(())
}

mod allocator;
mod capacity;
mod catalog;
mod clash;
mod data;
mod error;
mod loader;
mod report;
mod server;
mod slot;
mod solver;

use clap::{Parser, Subcommand, ValueEnum};
use data::{Mode, SeatingRequest};
use error::SeatingError;
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seat-allocator")]
#[command(about = "Assigns exam students to rooms slot by slot and reports clashes and shortfalls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which part of the report to write.
#[derive(Clone, Copy, ValueEnum)]
enum View {
    Full,
    Overall,
    Vacancy,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate seats from CSV inputs and write the report as JSON.
    Allocate {
        #[arg(long)]
        timetable: PathBuf,
        #[arg(long)]
        rosters: PathBuf,
        #[arg(long)]
        names: PathBuf,
        #[arg(long)]
        rooms: PathBuf,
        /// Seats withheld in every room
        #[arg(long, allow_negative_numbers = true)]
        buffer: i64,
        /// Sparse or Dense
        #[arg(long)]
        mode: Mode,
        /// Report path; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "full")]
        view: View,
        /// Process slots on worker threads
        #[arg(long)]
        concurrent: bool,
    },

    /// Serve the allocation endpoint over HTTP.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), SeatingError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Allocate {
            timetable,
            rosters,
            names,
            rooms,
            buffer,
            mode,
            output,
            view,
            concurrent,
        } => {
            let inputs = loader::load_all(&timetable, &rosters, &names, &rooms)?;
            let request = SeatingRequest {
                buffer,
                mode,
                rosters: inputs.rosters(),
                timetable: inputs.timetable,
                names: inputs.names,
                rooms: inputs.rooms,
            };

            let report = if concurrent {
                solver::solve_concurrent(request).await?
            } else {
                solver::solve(&request)?
            };

            let json = match view {
                View::Full => serde_json::to_string_pretty(&report)?,
                View::Overall => serde_json::to_string_pretty(&report.overall_rows())?,
                View::Vacancy => serde_json::to_string_pretty(&report.vacancy_by_room())?,
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    info!("Report written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Commands::Serve { addr } => server::run_server(&addr).await?,
    }

    Ok(())
}

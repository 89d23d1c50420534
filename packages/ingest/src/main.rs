#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the ledger import tool.

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use geopark_database::db;
use geopark_ingest::mapping::COLUMN_MAP;
use geopark_tuban_models::NewEvent;

#[derive(Parser)]
#[command(name = "geopark_ingest", about = "Geopark tuban ledger import tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV ledger into the database named by `DATABASE_PATH`
    Import {
        /// Path to the ledger CSV file
        path: PathBuf,
    },
    /// List the recognized ledger columns and the field each maps to
    Columns,
    /// Register an inspection event and print its ID
    AddEvent {
        /// Event name shown in the map filter
        name: String,
        /// Event kind
        #[arg(long = "type")]
        event_type: Option<String>,
        /// Issue date (YYYY-MM-DD)
        #[arg(long)]
        issue_date: Option<NaiveDate>,
        /// Free-text description
        #[arg(long)]
        description: Option<String>,
    },
    /// Hide an event from the map filter choices
    RetireEvent {
        /// Event ID
        id: i64,
    },
    /// Link a tuban to an existing inspection event
    Link {
        /// Tuban ID
        tuban_id: i64,
        /// Event ID
        event_id: i64,
    },
    /// Soft-delete a tuban so it drops out of every report
    Delete {
        /// Tuban ID
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Import { path } => {
            let store = db::connect_from_env().await?;
            let start = Instant::now();
            let summary = geopark_ingest::import_csv_path(&store, &path).await?;
            log::info!(
                "Ledger import complete: {} rows in {:.1}s",
                summary.total(),
                start.elapsed().as_secs_f64()
            );
            println!("inserted:         {}", summary.inserted);
            println!("skipped_existing: {}", summary.skipped_existing);
            println!("skipped_invalid:  {}", summary.skipped_invalid);
        }
        Commands::Columns => {
            println!("{:<20} FIELD", "COLUMN");
            println!("{}", "-".repeat(50));
            for (header, field) in COLUMN_MAP {
                println!("{header:<20} {field} ({})", field.coercion());
            }
        }
        Commands::AddEvent {
            name,
            event_type,
            issue_date,
            description,
        } => {
            let store = db::connect_from_env().await?;
            let id = store
                .create_event(&NewEvent {
                    event_name: name,
                    event_type,
                    issue_date,
                    description,
                })
                .await?;
            log::info!("Created event {id}");
            println!("{id}");
        }
        Commands::RetireEvent { id } => {
            let store = db::connect_from_env().await?;
            if store.set_event_active(id, false).await? {
                log::info!("Retired event {id}");
            } else {
                log::warn!("No event with id {id}");
            }
        }
        Commands::Link { tuban_id, event_id } => {
            let store = db::connect_from_env().await?;
            store.link_event(tuban_id, event_id).await?;
            log::info!("Linked tuban {tuban_id} to event {event_id}");
        }
        Commands::Delete { id } => {
            let store = db::connect_from_env().await?;
            if store.soft_delete(id).await? {
                log::info!("Deleted tuban {id}");
            } else {
                log::warn!("No live tuban with id {id}");
            }
        }
    }

    Ok(())
}

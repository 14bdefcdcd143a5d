use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use ulid::Ulid;

use fleetplan::config::EngineConfig;
use fleetplan::engine::Engine;
use fleetplan::model::{MINUTE_MS, Ms};
use fleetplan::principal::Principal;
use fleetplan::source::{InMemoryStore, Snapshot, Sources};

/// Query a fleet snapshot for availability, conflicts and preparation windows.
#[derive(Debug, Parser)]
#[command(name = "fleetplan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON snapshot of vehicles, bookings, maintenance and planning events.
    snapshot: PathBuf,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "FLEETPLAN_METRICS_PORT")]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Conflicts for a candidate booking window.
    Check { vehicle: Ulid, start_ms: Ms, end_ms: Ms },
    /// Earliest free instant at or after `from_ms`.
    Next { vehicle: Ulid, from_ms: Ms },
    /// Free sub-spans of the window.
    Free {
        vehicle: Ulid,
        start_ms: Ms,
        end_ms: Ms,
        /// Only report slots at least this long.
        min_minutes: Option<Ms>,
    },
    /// Calendar entries for the window.
    Timeline { vehicle: Ulid, start_ms: Ms, end_ms: Ms },
    /// Agency vehicles free for the whole window.
    Available { agency: Ulid, start_ms: Ms, end_ms: Ms },
    /// Register a preparation window after a checkout and save it to the snapshot.
    Prepare {
        booking: Ulid,
        vehicle: Ulid,
        agency: Ulid,
        checkout_ms: Ms,
        prep_minutes: i64,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    fleetplan::observability::init(cli.metrics_port)?;

    let snapshot: Snapshot = serde_json::from_str(&std::fs::read_to_string(&cli.snapshot)?)?;
    let store = Arc::new(InMemoryStore::from_snapshot(snapshot));
    let config = EngineConfig::from_env();
    info!("loaded {} vehicles from {}", store.vehicle_count(), cli.snapshot.display());
    info!("  maintenance default: {} min", config.default_maintenance_duration_ms / MINUTE_MS);
    info!("  fetch timeout: {:?}", config.fetch_timeout);

    let engine = Engine::new(Sources::from_store(store.clone()), config);
    let principal = Principal::super_admin();

    match cli.command {
        Commands::Check { vehicle, start_ms, end_ms } => {
            let result = engine
                .check_availability(&principal, vehicle, start_ms, end_ms)
                .await?;
            print_json(&result)?;
        }
        Commands::Next { vehicle, from_ms } => {
            let next = engine.next_availability(&principal, vehicle, from_ms).await?;
            print_json(&next)?;
        }
        Commands::Free { vehicle, start_ms, end_ms, min_minutes } => {
            let min_duration = match min_minutes {
                Some(m) => Some(m.checked_mul(MINUTE_MS).ok_or("min_minutes out of range")?),
                None => None,
            };
            let slots = engine
                .free_slots(&principal, vehicle, start_ms, end_ms, min_duration)
                .await?;
            print_json(&slots)?;
        }
        Commands::Timeline { vehicle, start_ms, end_ms } => {
            let entries = engine.timeline(&principal, vehicle, start_ms, end_ms).await?;
            print_json(&entries)?;
        }
        Commands::Available { agency, start_ms, end_ms } => {
            let vehicles = engine
                .available_vehicles(&principal, agency, start_ms, end_ms)
                .await?;
            print_json(&vehicles)?;
        }
        Commands::Prepare { booking, vehicle, agency, checkout_ms, prep_minutes } => {
            let window = engine
                .create_preparation_time(&principal, booking, vehicle, agency, checkout_ms, prep_minutes)
                .await?;
            // The CLI's store is the snapshot file; write the new planning event back.
            std::fs::write(&cli.snapshot, serde_json::to_string_pretty(&store.snapshot())?)?;
            print_json(&window)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_prepare_with_ids() {
        let booking = Ulid::new();
        let vehicle = Ulid::new();
        let agency = Ulid::new();
        let (b, v, a) = (booking.to_string(), vehicle.to_string(), agency.to_string());
        let cli = Cli::try_parse_from([
            "fleetplan",
            "fleet.json",
            "prepare",
            b.as_str(),
            v.as_str(),
            a.as_str(),
            "1767225600000",
            "60",
        ])
        .unwrap();
        assert_eq!(cli.snapshot, PathBuf::from("fleet.json"));
        match cli.command {
            Commands::Prepare { booking: b, prep_minutes, .. } => {
                assert_eq!(b, booking);
                assert_eq!(prep_minutes, 60);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_vehicle_id() {
        assert!(Cli::try_parse_from(["fleetplan", "fleet.json", "next", "not-a-ulid", "0"]).is_err());
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use deskslot::config::EngineConfig;
use deskslot::dataset::{resolve_resource, Dataset};
use deskslot::engine::{Engine, EngineError, SuggestionRequest};
use deskslot::model::{BookingRequest, Span};
use deskslot::notify::NotifyHub;
use deskslot::source::DataSource;

/// Booking suggestions and conflict checks over a coworking dataset.
#[derive(Parser)]
#[command(name = "deskslot", version)]
struct Cli {
    /// JSON dataset with `resources` and `bookings`.
    #[arg(long, env = "DESKSLOT_DATA", default_value = "./deskslot.json")]
    data: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank free slots across every resource for a day.
    Suggest {
        /// Day to search, `YYYY-MM-DD`.
        #[arg(long)]
        date: String,
        /// Slot length in whole hours.
        #[arg(long)]
        hours: i64,
        /// Minimum seats.
        #[arg(long)]
        capacity: Option<u32>,
        /// Wanted amenity; repeat for several.
        #[arg(long = "amenity")]
        amenities: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Check whether a booking would overlap existing ones.
    Check {
        /// Resource id or name.
        #[arg(long)]
        resource: String,
        /// RFC 3339 start, e.g. `2024-06-10T10:00:00Z`.
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    let metrics_port: Option<u16> = std::env::var("DESKSLOT_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    deskslot::observability::init(metrics_port)?;

    let config = EngineConfig::from_env();
    info!("deskslot loading {}", cli.data.display());
    info!("  hours: {:02}:00-{:02}:00", config.hours.open, config.hours.close);
    info!("  precision: {:?}", config.precision);

    let store = Dataset::load(&cli.data)?
        .into_store(Arc::new(NotifyHub::new()))
        .await?;
    info!("  resources: {}", store.resource_count());
    let engine = Engine::new(Arc::new(store), config);

    match cli.command {
        Command::Suggest {
            date,
            hours,
            capacity,
            amenities,
            limit,
        } => {
            let mut request = SuggestionRequest::parse(&date, hours)?
                .with_amenities(amenities)
                .with_limit(limit.unwrap_or(engine.config().suggestion_limit));
            if let Some(capacity) = capacity {
                request = request.with_capacity(capacity);
            }
            let suggestions = engine.generate_booking_suggestions(&request).await?;
            if suggestions.is_empty() {
                info!("no availability on {date}");
            }
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
        }
        Command::Check {
            resource,
            start,
            end,
        } => {
            let resources = engine.source().fetch_resources().await?;
            let resource_id = resolve_resource(&resources, &resource)?;
            let span = Span::try_new(start.timestamp_millis(), end.timestamp_millis())
                .ok_or_else(|| EngineError::InvalidInput(format!("{start} is not before {end}")))?;
            let candidate = BookingRequest::new(resource_id, span);
            match engine.detect_conflicts(&candidate).await? {
                None => println!("{}", serde_json::json!({ "conflict": false })),
                Some(resolution) => println!("{}", serde_json::to_string_pretty(&resolution)?),
            }
        }
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use student_housing::analytics::StatsClient;
use student_housing::api::{self, AppState};
use student_housing::config::Config;
use student_housing::importers::{
    export_csv, BanGeocoder, CsvImporter, ImportPipeline, ImporterTrait, PartnerFeedImporter,
};
use student_housing::models::{Source, StatsPeriod};
use student_housing::storage::{Database, DatabaseConfig, TerritoryFile};

#[derive(Parser)]
#[command(name = "student-housing")]
#[command(about = "Student housing search backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API until Ctrl+C or SIGTERM
    Serve,

    /// Apply pending database migrations
    Migrate,

    /// Upsert academies, departments and cities from a JSON file
    LoadTerritories {
        file: PathBuf,
    },

    /// Import listings from a CSV file or a partner feed
    Import {
        /// csv, crous, clef, arpej or ibail
        source: Source,
        /// CSV path for `csv`, feed URL otherwise
        location: String,
    },

    /// Export published listings as CSV
    Export {
        file: PathBuf,
    },

    /// Pull an analytics snapshot and store it
    SyncStats {
        #[arg(long, default_value = "month")]
        period: StatsPeriod,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    let db = Database::new(DatabaseConfig::from_config(&config))
        .await
        .with_context(|| format!("Failed to open database {}", config.database))?;

    match cli.command {
        Commands::Serve => {
            let state = AppState::new(db.clone(), config).await?;
            api::serve(state).await.context("Server failed")?;
        }
        Commands::Migrate => {
            db.migrate().await.context("Migration failed")?;
            let status = db.migration_status().await?;
            info!("Schema at version {}", status.current_version);
        }
        Commands::LoadTerritories { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let territories: TerritoryFile =
                serde_json::from_str(&raw).context("Invalid territory file")?;
            let summary = db.load_territories(&territories).await?;
            println!(
                "{} academies, {} departments, {} cities",
                summary.academies, summary.departments, summary.cities
            );
        }
        Commands::Import { source, location } => {
            let importer: Box<dyn ImporterTrait> = match source {
                Source::Csv => Box::new(CsvImporter::new(&location)),
                partner => Box::new(PartnerFeedImporter::new(partner, location)?),
            };
            let geocoder = BanGeocoder::new(&config.geocoder_url)?;
            let summary = ImportPipeline::new(db.clone(), geocoder)
                .run(importer.as_ref())
                .await
                .with_context(|| format!("Import from {source} failed"))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Export { file } => {
            let count = export_csv(&db, &file)
                .await
                .with_context(|| format!("Failed to export to {}", file.display()))?;
            println!("Exported {count} accommodations to {}", file.display());
        }
        Commands::SyncStats { period, from, to } => {
            let client = StatsClient::from_config(&config)?;
            let (stats, events) = client.sync(&db, period, from, to).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
    }

    db.close().await;
    Ok(())
}

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use spark_dwh_etl::config::AppConfig;
use spark_dwh_etl::db::DbGateway;
use spark_dwh_etl::logging::{init_logging, OperationTimer};
use spark_dwh_etl::{pipeline, views};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full ETL pipeline
    Run {
        /// Drop and recreate all warehouse objects before loading
        #[arg(long)]
        drop_existing: bool,

        /// Directory holding the monitoring view definitions
        #[arg(long)]
        views_dir: Option<PathBuf>,
    },
    /// Initialise the warehouse schema and the restricted analyst account
    InitSchema {
        /// Drop all prior warehouse objects first
        #[arg(long)]
        drop_existing: bool,
    },
    /// Create the monitoring views from their query directory
    CreateViews {
        /// Directory holding the monitoring view definitions
        #[arg(long)]
        views_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let mut config = AppConfig::load()?;

    // Initialize logging; the guard keeps the file writer alive
    let _guard = init_logging(
        Some(&config.get_log_level()),
        &config.logging.format,
        config.logging.file_path.as_deref().map(Path::new),
    )?;

    info!("Starting spark-dwh-etl");

    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            drop_existing,
            views_dir,
        } => {
            if let Some(dir) = views_dir {
                config.views.query_dir = dir.display().to_string();
            }
            let timer = OperationTimer::new("pipeline_run");
            let summary = pipeline::run(&config, drop_existing).await?;
            timer.finish();
            if summary.succeeded() {
                info!("Pipeline finished without failed records");
            } else {
                warn!(
                    users_failed = summary.users.failed,
                    subscriptions_failed = summary.subscriptions.failed,
                    messages_failed = summary.messages.failed,
                    "Pipeline finished with failed records"
                );
            }
        }
        Commands::InitSchema { drop_existing } => {
            let mut gateway = DbGateway::new(config.database.clone(), config.analyst.clone());
            gateway.wait_until_available().await?;
            gateway.init_schema(drop_existing).await?;
            gateway.close().await?;
        }
        Commands::CreateViews { views_dir } => {
            let dir =
                views_dir.unwrap_or_else(|| PathBuf::from(&config.views.query_dir));
            let mut gateway = DbGateway::new(config.database.clone(), config.analyst.clone());
            gateway.connect(Some(&config.database.database)).await?;
            let created = views::create_monitoring_views(&mut gateway, &dir).await?;
            info!(created, "Monitoring views created");
            gateway.close().await?;
        }
    }

    Ok(())
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use drive_catalogue::derived::DEFAULT_SCAN_ROOT;
use drive_catalogue::ingest::Ingestor;
use drive_catalogue::orchestrator::{DriveScanOrchestrator, ScanOptions};
use drive_catalogue::scanner::CommandScanner;
use drive_catalogue::store::CatalogueStore;
use drive_catalogue::{summary, walk};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "drive-catalogue")]
#[command(about = "Incremental metadata catalogue for removable drives")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a drive from the manifest and ingest the results
    Scan {
        /// Drive label in the manifest (e.g. Ext-10)
        #[arg(long)]
        drive: String,
        #[arg(long, default_value = "catalogue")]
        store: PathBuf,
        #[arg(long, default_value = "drive_manifest.csv")]
        manifest: PathBuf,
        #[arg(long, default_value = "output")]
        outdir: PathBuf,
        /// Directory holding the container extraction scripts
        #[arg(long, default_value = "scripts")]
        scripts: PathBuf,
        /// Re-scan even if the drive is already indexed
        #[arg(long)]
        force: bool,
    },
    /// Ingest any new batch CSVs from a directory
    Ingest {
        #[arg(long, default_value = "catalogue")]
        store: PathBuf,
        #[arg(long, default_value = "output")]
        dir: PathBuf,
    },
    /// Walk a mounted path and write a files batch CSV
    Walk {
        #[arg(long)]
        root: PathBuf,
        #[arg(long, default_value = "output")]
        outdir: PathBuf,
    },
    /// Show the latest scan per drive as JSON lines
    Summary {
        #[arg(long, default_value = "catalogue")]
        store: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Scan {
            drive,
            store,
            manifest,
            outdir,
            scripts,
            force,
        } => {
            let options = ScanOptions {
                store_dir: store,
                manifest_path: manifest,
                outdir,
                scan_root: DEFAULT_SCAN_ROOT.to_string(),
                force,
            };
            let orchestrator = DriveScanOrchestrator::new(CommandScanner::new(scripts), options);
            let outcome = orchestrator.run(&drive)?;
            info!(?outcome, drive = %drive, "run recorded");
            println!("Drive '{drive}' recorded with status '{}'.", outcome.status);
        }
        Command::Ingest { store, dir } => {
            let store = CatalogueStore::open(store)?;
            let ingested = Ingestor::new(&store)?.ingest_dir(&dir)?;
            println!("Ingestion complete. New files ingested: {ingested}");
        }
        Command::Walk { root, outdir } => {
            let csv = walk::scan_to_csv(&root, &outdir)?;
            println!("Wrote {}", csv.display());
        }
        Command::Summary { store } => {
            let store = CatalogueStore::open_existing(store)?;
            for row in summary::last_scan_per_drive(&store)? {
                println!("{}", serde_json::to_string(&row)?);
            }
        }
    }
    Ok(())
}

mod commands;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// photodex — photo corpus indexer and faceted query engine
#[derive(Parser)]
#[command(name = "photodex", version, about)]
struct Cli {
    /// Path to the catalogue database
    #[arg(long, global = true, default_value_os_t = default_catalogue_path())]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a directory and index every photo found into the catalogue
    Index {
        /// Root directory to walk
        root: PathBuf,
        /// Worker pool size
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Emit per-stage timings in the final report
        #[arg(long)]
        perf_stats: bool,
    },
    /// Recompute burst groups and duplicate clusters over the whole catalogue
    Analyze {
        /// Duplicate clustering radius (max Hamming distance)
        #[arg(long, default_value_t = 15)]
        hamming_threshold: u32,
    },
    /// Run a faceted query against the catalogue
    Query {
        /// Query-string filters, e.g. "year=2024&color=red"
        #[arg(default_value = "")]
        filters: String,
    },
    /// Print every catalogued field of one photo
    Show {
        /// Photo id
        id: i64,
    },
    /// Write a photo's thumbnail to a file
    Thumbnail {
        /// Photo id
        id: i64,
        /// Thumbnail size: 64, 256, 512, or 1024
        #[arg(long, default_value_t = 256)]
        size: u32,
        /// Output file path
        out: PathBuf,
    },
    /// Print aggregate catalogue statistics
    Stats,
    /// Check the catalogue's referential and invariant constraints
    Verify,
    /// Serve the HTTP explorer
    Explore {
        /// Address to bind the HTTP server to
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}

fn default_catalogue_path() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".photodex")
        .join("catalogue.db")
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Index { root, workers, perf_stats } => {
            commands::index::run(&cli.catalog, &root, workers, perf_stats)
        }
        Commands::Analyze { hamming_threshold } => {
            commands::analyze::run(&cli.catalog, hamming_threshold)
        }
        Commands::Query { filters } => commands::query::run(&cli.catalog, &filters),
        Commands::Show { id } => commands::show::run(&cli.catalog, id),
        Commands::Thumbnail { id, size, out } => {
            commands::thumbnail::run(&cli.catalog, id, size, &out)
        }
        Commands::Stats => commands::stats::run(&cli.catalog),
        Commands::Verify => commands::verify::run(&cli.catalog),
        Commands::Explore { bind } => commands::explore::run(&cli.catalog, bind),
    }
}

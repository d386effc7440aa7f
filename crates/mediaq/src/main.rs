mod cli;

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::{error, info};

use mediaq::config::load_config;
use mediaq::db::{Database, JobRepository};
use mediaq::error::{ConfigError, MediaqError, Result};
use mediaq::logging::init_logging;
use mediaq::server::AppState;
use mediaq::{Config, Driver, Engine};

use crate::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_format) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(cli) {
        error!("Application error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Arc::new(load_config(&cli.config)?);
    info!("Loaded configuration from {}", cli.config.display());

    let db = open_database(&config)?;

    match cli.command {
        Commands::Worker => run_worker(config, db),
        Commands::Serve { bind } => run_server(config, db, bind),
        Commands::Import { file } => {
            let report = mediaq::import::import_file(db.as_ref(), &config, &file, Utc::now())?;
            println!(
                "Imported {} of {} ({} already imported, {} malformed)",
                report.added,
                report.total(),
                report.duplicates,
                report.malformed.len()
            );
            for line in &report.malformed {
                println!("  line {}: {}", line.line, line.content);
            }
            Ok(())
        }
        Commands::Status => {
            let counts = db.counts()?;
            println!("total:       {}", counts.total());
            println!("queued:      {}", counts.queued);
            println!("in progress: {}", counts.in_progress);
            println!("downloaded:  {}", counts.downloaded);
            println!("done:        {}", counts.done());
            println!("failed:      {}", counts.failed);
            Ok(())
        }
    }
}

fn open_database(config: &Config) -> Result<Arc<Database>> {
    let path = config.database_path().ok_or_else(|| ConfigError::Validation {
        message: "No database path configured and no home directory found".to_string(),
    })?;
    Ok(Arc::new(Database::open(&path)?))
}

fn run_worker(config: Arc<Config>, db: Arc<Database>) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received Ctrl-C, finishing current job...");
        flag.store(true, Ordering::Relaxed);
    })
    .map_err(|e| MediaqError::Server(format!("Failed to install Ctrl-C handler: {}", e)))?;

    let engine = Engine::from_config(config, db)?;
    Driver::new(engine, shutdown).run()?;
    Ok(())
}

fn run_server(config: Arc<Config>, db: Arc<Database>, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let state = AppState {
        repo: db,
        config,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| MediaqError::Server(format!("Failed to start runtime: {}", e)))?;

    runtime.block_on(mediaq::server::serve(state, &bind))
}

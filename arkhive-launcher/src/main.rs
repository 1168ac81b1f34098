//! arkhive launcher
//!
//! Synchronizes the local artifact mirror against a signed remote
//! catalog and provisions whatever it resolves to.

mod config;
mod logger;
mod subsystems;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use arkhive_engine::controller::{Controller, LoggingSink, Subsystem};
use subsystems::{CatalogSubsystem, IdentitySubsystem, ProvisionSubsystem};

#[derive(Debug, Parser)]
#[command(name = "arkhive-launcher", about = "Synchronizes and provisions the local artifact mirror")]
struct Cli {
    /// Override the configuration file search path.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let resolved = config::resolve(cli.config.as_deref()).unwrap_or_else(|err| {
        eprintln!("arkhive-launcher: cannot resolve configuration: {err}");
        std::process::exit(1);
    });

    logger::init(&resolved.log_level);

    let root = std::env::current_dir().unwrap_or_else(|err| {
        log::error!("cannot determine working directory: {err}");
        std::process::exit(1);
    });

    let system_dir = root.join("system");
    if let Err(err) = std::fs::create_dir_all(&system_dir) {
        log::error!("cannot create system directory: {err}");
        std::process::exit(1);
    }

    let db_path = system_dir.join(arkhive_store::DATABASE_FILE_NAME);
    let connection = arkhive_store::open_database(&db_path).unwrap_or_else(|err| {
        log::error!("cannot open store at {}: {err}", db_path.display());
        std::process::exit(1);
    });

    let (catalog, connection_rx) = CatalogSubsystem::new(root.clone(), connection);
    let decrypted_rx = catalog.subscribe_decrypted();
    let identity = IdentitySubsystem::new(system_dir);
    let provision = ProvisionSubsystem::new(root, decrypted_rx, connection_rx);

    let subsystems: Vec<Option<Arc<dyn Subsystem>>> = vec![
        Some(catalog as Arc<dyn Subsystem>),
        Some(identity as Arc<dyn Subsystem>),
        Some(provision as Arc<dyn Subsystem>),
    ];

    let controller = Controller::new(subsystems, Arc::new(LoggingSink));
    controller.boot().await;

    std::process::exit(0);
}

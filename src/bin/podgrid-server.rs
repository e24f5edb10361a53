/// PodGrid Session Server
///
/// Standalone server that exposes one PodGrid session over a WebSocket.
/// Point PODGRID_DATA at a data file to serve it; without it the server
/// starts on the built-in sample table.

use std::path::Path;

use log::warn;

use podgrid::provider::ProviderChain;
use podgrid::server::run_server;
use podgrid::session::Session;
use podgrid::interpreter::{InterpreterEngine, TableSet};
use podgrid::overlay::MemoryStorage;
use podgrid::upload::Upload;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Get host and port from environment or use defaults
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .expect("PORT must be a number");

    let mut session = Session::new(Box::new(MemoryStorage::new()));
    session.attach_engine(open_engine());
    if let Err(err) = session.load() {
        warn!("initial load failed: {}", err);
    }

    // Start the server
    run_server(&host, port, session).await
}

/// Open PODGRID_DATA through the provider chain, or fall back to the sample
/// table when it is unset or unreadable.
fn open_engine() -> Box<dyn podgrid::engine::QueryExecutor + Send> {
    if let Ok(path) = std::env::var("PODGRID_DATA") {
        match std::fs::read(&path) {
            Ok(bytes) => {
                let name = Path::new(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.clone());
                let upload = Upload::new(name, bytes);
                match ProviderChain::standard().open(&upload) {
                    Ok(outcome) => return outcome.engine,
                    Err(err) => warn!("could not open {}: {}", path, err),
                }
            }
            Err(err) => warn!("could not read {}: {}", path, err),
        }
    }
    Box::new(InterpreterEngine::new(TableSet::sample()))
}

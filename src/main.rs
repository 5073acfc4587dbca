use k10power::cli::Configuration;
use k10power::protocol;
use k10power::sensor::Registry;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::io;

fn main() -> Result<(), k10power::Error> {
    // stdout belongs to the host, so the logger writes to stderr and stays
    // quiet unless RUST_LOG says otherwise
    SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()
        .expect("Failed to initialise logger");

    let config = Configuration::from_args();
    info!("Configuration: {config:?}");

    let mut registry = Registry::new(config);
    protocol::serve(&mut registry, io::stdin().lock(), io::stdout().lock())
}

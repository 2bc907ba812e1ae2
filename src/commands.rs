pub mod convert;
pub mod datasets;
pub mod extract;
mod output;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;

use geoextract::config::RegionConfig;
use geoextract::{DiskStore, Region};

use crate::cli::Cli;

/// Install the stderr log subscriber: warn by default, each `-v` one level more.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Region and store shared by every command.
pub struct Session {
    pub region: Region,
    pub store: DiskStore,
}

impl Session {
    pub fn open(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => RegionConfig::from_json_file(path)
                .with_context(|| format!("[session] Failed to read region config {}", path.display()))?,
            None => RegionConfig::default(),
        };
        debug!("region {} with candidates {:?}", config.name, config.candidate_epsgs);

        let max_bytes = config.max_document_bytes;
        let region = Region::load(config).context("[session] Failed to load region boundaries")?;
        let store = DiskStore::open(&cli.store, max_bytes)
            .with_context(|| format!("[session] Failed to open store {}", cli.store.display()))?;
        Ok(Self { region, store })
    }
}

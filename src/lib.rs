pub mod backend;
pub mod config;
pub mod coordinator;
pub mod query;
pub mod state;
pub mod storage;

use log::LevelFilter;

/// Warn globally; `verbose` turns on debug output for this crate.
/// `RUST_LOG` overrides both.
pub fn init_logging(verbose: bool) {
    let own_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("nas_scanner_lib", own_level)
        .filter_module("nas_scanner", own_level)
        .parse_default_env()
        .try_init();
}

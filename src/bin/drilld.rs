//! drilld - drill repetition counting service
//!
//! This daemon:
//! 1. Loads `EngineConfig` (`DRILL_CONFIG` file + environment)
//! 2. Serves the measurement API
//! 3. Stops cleanly on Ctrl-C

use anyhow::Result;
use std::sync::{mpsc, Arc};

use drill_counter::{
    api::{ApiConfig, ApiServer},
    config::EngineConfig,
    DrillEngine,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EngineConfig::load()?;
    let api_config = ApiConfig {
        addr: config.api_addr.clone(),
        expire_interval: (config.pairing_timeout / 4).max(std::time::Duration::from_millis(10)),
    };
    log::info!(
        "pairing timeout {:?}, at most {} pending frames per session",
        config.pairing_timeout,
        config.max_pending_frames
    );
    for (drill, overrides) in &config.tuning {
        log::info!("{}: tuning override {:?}", drill, overrides);
    }

    let engine = Arc::new(DrillEngine::new(config));
    let api_handle = ApiServer::new(api_config, engine.clone()).spawn()?;
    log::info!("measurement api listening on {}", api_handle.addr);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("drilld waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;
    log::info!("{} sessions open at shutdown", engine.session_count()?);

    Ok(())
}

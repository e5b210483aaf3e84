// 📝 Logging
// tracing-subscriber setup; RUST_LOG overrides the level passed in

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Console logging (server, scan command)
pub fn init_logging(level: &str) {
    let _ = fmt()
        .with_env_filter(env_filter(level))
        .with_target(false)
        .try_init();
}

/// File logging, for when stdout belongs to the terminal UI
pub fn init_file_logging(path: &Path, level: &str) -> std::io::Result<()> {
    let file = File::create(path)?;

    let _ = fmt()
        .with_env_filter(env_filter(level))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();

    Ok(())
}

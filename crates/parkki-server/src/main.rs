//! `parkki-server [CONFIG_PATH]`
//!
//! The config path comes from the first argument, then `PARKKI_CONFIG_PATH`,
//! then `config.toml` in the working directory.

use parkki_server::config::{self, LoggingConfig};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn config_path() -> (String, &'static str) {
    let non_blank = |value: &String| !value.trim().is_empty();
    if let Some(path) = std::env::args().nth(1).filter(non_blank) {
        return (path, "argument");
    }
    if let Some(path) = std::env::var("PARKKI_CONFIG_PATH").ok().filter(non_blank) {
        return (path, "PARKKI_CONFIG_PATH");
    }
    ("config.toml".to_string(), "default")
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        fmt.json().init();
    } else {
        fmt.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let (path, source) = config_path();
    let config = match config::load_config(Some(&path)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("parkki-server: cannot load {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging);
    tracing::info!(%path, source, "configuration loaded");

    match parkki_server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("parkki server stopped: {}", err);
            ExitCode::FAILURE
        }
    }
}

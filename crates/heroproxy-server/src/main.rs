use std::env;

use heroproxy_server::config::load_config;
use heroproxy_server::{observability, server};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From HEROPROXY_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (heroproxy.toml, optional)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (HEROPROXY_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

fn resolve_config_path() -> (Option<String>, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (Some(path), ConfigSource::CliArgument);
            }
        }
    }
    if let Ok(path) = env::var("HEROPROXY_CONFIG") {
        return (Some(path), ConfigSource::EnvironmentVariable);
    }
    (None, ConfigSource::Default)
}

#[tokio::main]
async fn main() {
    // Environment variables from .env are optional local-development sugar.
    let _ = dotenvy::dotenv();

    let (config_path, source) = resolve_config_path();

    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {e}");
        std::process::exit(2);
    }

    observability::init_tracing(&config.logging.level);
    tracing::info!(
        path = config_path.as_deref().unwrap_or("heroproxy.toml"),
        source = %source,
        "Configuration loaded"
    );

    if let Err(e) = server::run(config).await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

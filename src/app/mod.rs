pub mod config;
pub mod initialization;
pub mod logging_system;
pub mod service;

pub use config::{Config, ConfigError, LogLevel, SendMode};
pub use initialization::{InitializationError, LogDirective};
pub use logging_system::{LoggingSystem, setup_logging_safe};
pub use service::{ForwardingService, RunReport};

use clap::Parser;
use std::process;
use tracing::{error, info};

pub struct App {
    service: ForwardingService,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, Box<dyn std::error::Error + Send + Sync>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::from_args_and_env(args)?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        setup_logging_safe(config.log_level, &config.log_directives)?;

        info!("Starting trap-forwarder v{}", get_version());
        info!(
            "Configuration: server={}:{}, mode={:?}, max_per_connection={:?}, sent_log={:?}",
            config.server, config.port, config.mode, config.max_per_connection, config.sent_log
        );

        let service = ForwardingService::new(config)?;
        Ok(Self { service })
    }

    pub async fn run(mut self) -> Result<RunReport, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.service.run().await?)
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Main entry point for the application
pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && (args[1] == "--version" || args[1] == "-V") {
        println!("trap-forwarder {}", get_version());
        return Ok(());
    }

    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        Config::parse_from(["trap-forwarder", "--help"]);
        return Ok(());
    }

    let app = match App::from_args(args) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    match app.run().await {
        Ok(report) => {
            let code = report.exit_code();
            if code != 0 {
                process::exit(code);
            }
        }
        Err(e) => {
            error!("Forwarding error: {}", e);
            process::exit(1);
        }
    }

    Ok(())
}

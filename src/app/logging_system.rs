use super::config::LogLevel;
use super::initialization::{InitializationError, LogDirective};
use parking_lot::RwLock;
use std::sync::{Arc, Once, OnceLock};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Targets that are too chatty at the application's level.
const QUIET_TARGETS: &[(&str, LogLevel)] = &[("tokio", LogLevel::Warn), ("mio", LogLevel::Warn)];

pub struct LoggingSystem {
    directives: Arc<RwLock<Vec<LogDirective>>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Adds a `target=level` directive. Malformed directives are reported on
    /// stderr and skipped.
    pub fn add_directive(&self, directive_str: &str) -> Result<(), InitializationError> {
        match LogDirective::parse(directive_str) {
            Ok(directive) => {
                self.directives.write().push(directive);
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                eprintln!("Warning: {e}, skipping directive");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn add_default_directives(&self) {
        let mut directives = self.directives.write();
        for (target, level) in QUIET_TARGETS {
            directives.push(LogDirective::new(*target, *level));
        }
    }

    /// Installs the global subscriber, writing compact lines to stderr.
    pub fn initialize_tracing(&self, default_level: LogLevel) -> Result<(), InitializationError> {
        let filter_string = self.build_filter_string(default_level);

        let env_filter = EnvFilter::try_new(&filter_string).map_err(|e| {
            InitializationError::LoggingInitFailed {
                details: format!("Failed to create EnvFilter with '{filter_string}'"),
                source: Box::new(e),
            }
        })?;

        let subscriber = tracing_subscriber::registry().with(env_filter).with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .compact(),
        );

        tracing::subscriber::set_global_default(subscriber).map_err(|e| {
            InitializationError::LoggingInitFailed {
                details: "Failed to set global tracing subscriber".to_string(),
                source: Box::new(e),
            }
        })
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));

        filter_parts.join(",")
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets up logging once per process; later calls report the first outcome.
///
/// `directives` are `target=level` overrides applied after the built-in ones.
pub fn setup_logging_safe(
    level: LogLevel,
    directives: &[String],
) -> Result<(), InitializationError> {
    static INIT: Once = Once::new();
    static INIT_ERROR: OnceLock<String> = OnceLock::new();

    INIT.call_once(|| {
        let logging_system = LoggingSystem::new();
        logging_system.add_default_directives();

        let result = directives
            .iter()
            .try_for_each(|directive| logging_system.add_directive(directive))
            .and_then(|()| logging_system.initialize_tracing(level));

        if let Err(e) = result {
            let _ = INIT_ERROR.set(e.to_string());
        }
    });

    match INIT_ERROR.get() {
        None => Ok(()),
        Some(details) => Err(InitializationError::LoggingInitFailed {
            details: details.clone(),
            source: Box::new(std::io::Error::other("Logging initialization error")),
        }),
    }
}

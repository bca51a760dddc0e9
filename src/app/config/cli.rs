use super::serde_helpers::{load_env_path_opt, load_env_string, load_env_var, load_env_var_opt};
use super::{ConfigError, LogLevel, SendMode};
use crate::sender::{DEFAULT_PORT, DEFAULT_SERVER, SenderConfig};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding a whole TOML configuration.
pub const INLINE_CONFIG_ENV: &str = "TRAP_CONFIG";

#[derive(Parser, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[command(name = "trap-forwarder", author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Trap server host name or address
    #[arg(long, env = "TRAP_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Trap server port
    #[arg(long, env = "TRAP_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Timeout for connect, write and each read, in seconds
    #[arg(long, env = "TRAP_TIMEOUT_SECS", default_value = "5")]
    pub timeout_secs: u64,

    /// Log the batch that was sent whenever the server rejects points
    #[arg(long, env = "TRAP_VERBOSE")]
    pub verbose: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Per-target level overrides, e.g. `trap_forwarder::sender=debug`
    #[arg(long = "log-directive", env = "TRAP_LOG_DIRECTIVES", value_delimiter = ',')]
    pub log_directives: Vec<String>,

    /// File with one `host key [clock] value` line per point, `-` for stdin
    #[arg(long, env = "TRAP_INPUT_FILE")]
    pub input_file: Option<PathBuf>,

    /// Host for --key/--value and for `-` hosts in the input file
    #[arg(long)]
    pub host: Option<String>,

    /// Item key of a single point to send
    #[arg(long)]
    pub key: Option<String>,

    /// Value of a single point to send
    #[arg(long)]
    pub value: Option<String>,

    /// Unix timestamp of the single point
    #[arg(long)]
    pub clock: Option<i64>,

    /// Input lines carry a clock column: `host key clock value`
    #[arg(long, env = "TRAP_WITH_TIMESTAMPS")]
    pub with_timestamps: bool,

    /// Packet-level clock for points without their own
    #[arg(long)]
    pub packet_clock: Option<i64>,

    /// Use the current time as the packet clock
    #[arg(long)]
    pub now: bool,

    /// Maximum points per connection (unbounded when unset)
    #[arg(long, env = "TRAP_MAX_PER_CONNECTION")]
    pub max_per_connection: Option<usize>,

    /// Batch or one-by-one sending
    #[arg(long, env = "TRAP_MODE", default_value = "batch")]
    pub mode: SendMode,

    /// Ledger of delivered samples used to skip re-sends
    #[arg(long, env = "TRAP_SENT_LOG")]
    pub sent_log: Option<PathBuf>,

    /// Lines kept in the ledger after each run
    #[arg(long, env = "TRAP_SENT_LOG_KEEP", default_value = "5000")]
    pub sent_log_keep: usize,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived from `timeout_secs`
    #[serde(skip)]
    #[arg(skip)]
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            timeout_secs: 5,
            verbose: false,
            log_level: LogLevel::Info,
            log_directives: Vec::new(),
            input_file: None,
            host: None,
            key: None,
            value: None,
            clock: None,
            with_timestamps: false,
            packet_clock: None,
            now: false,
            max_per_connection: None,
            mode: SendMode::Batch,
            sent_log: None,
            sent_log_keep: 5000,
            config_file: None,
            timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::try_parse_from(args)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(inline) = std::env::var(INLINE_CONFIG_ENV) {
            return Self::from_inline_env(&inline);
        }

        let mut config = Config::default();

        load_env_string("TRAP_SERVER", &mut config.server);
        load_env_var("TRAP_PORT", &mut config.port)?;
        load_env_var("TRAP_TIMEOUT_SECS", &mut config.timeout_secs)?;
        load_env_var("TRAP_VERBOSE", &mut config.verbose)?;
        load_env_var("LOG_LEVEL", &mut config.log_level)?;
        if let Ok(directives) = std::env::var("TRAP_LOG_DIRECTIVES") {
            config.log_directives = directives
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        load_env_path_opt("TRAP_INPUT_FILE", &mut config.input_file);
        load_env_var("TRAP_WITH_TIMESTAMPS", &mut config.with_timestamps)?;
        load_env_var_opt("TRAP_MAX_PER_CONNECTION", &mut config.max_per_connection)?;
        load_env_var("TRAP_MODE", &mut config.mode)?;
        load_env_path_opt("TRAP_SENT_LOG", &mut config.sent_log);
        load_env_var("TRAP_SENT_LOG_KEEP", &mut config.sent_log_keep)?;
        load_env_path_opt("CONFIG_FILE", &mut config.config_file);

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    /// CLI arguments (with their env fallbacks) layered over a TOML base.
    ///
    /// The base comes from `TRAP_CONFIG` when set, else from `--config-file`.
    /// A value still at its default after argument parsing is taken from the
    /// base.
    pub fn from_args_and_env<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::try_parse_from(args)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        let base = if let Ok(inline) = std::env::var(INLINE_CONFIG_ENV) {
            Some(toml::from_str::<Config>(&inline)?)
        } else if let Some(path) = &config.config_file {
            Some(toml::from_str::<Config>(&std::fs::read_to_string(path)?)?)
        } else {
            None
        };

        if let Some(base) = base {
            config.inherit_from(base);
        }

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_inline_env(inline: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(inline)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    fn inherit_from(&mut self, base: Config) {
        let defaults = Config::default();

        inherit(&mut self.server, defaults.server, base.server);
        inherit(&mut self.port, defaults.port, base.port);
        inherit(&mut self.timeout_secs, defaults.timeout_secs, base.timeout_secs);
        inherit(&mut self.verbose, defaults.verbose, base.verbose);
        inherit(&mut self.log_level, defaults.log_level, base.log_level);
        inherit(&mut self.log_directives, defaults.log_directives, base.log_directives);
        inherit(&mut self.input_file, defaults.input_file, base.input_file);
        inherit(&mut self.host, defaults.host, base.host);
        inherit(&mut self.key, defaults.key, base.key);
        inherit(&mut self.value, defaults.value, base.value);
        inherit(&mut self.clock, defaults.clock, base.clock);
        inherit(&mut self.with_timestamps, defaults.with_timestamps, base.with_timestamps);
        inherit(&mut self.packet_clock, defaults.packet_clock, base.packet_clock);
        inherit(&mut self.now, defaults.now, base.now);
        inherit(
            &mut self.max_per_connection,
            defaults.max_per_connection,
            base.max_per_connection,
        );
        inherit(&mut self.mode, defaults.mode, base.mode);
        inherit(&mut self.sent_log, defaults.sent_log, base.sent_log);
        inherit(&mut self.sent_log_keep, defaults.sent_log_keep, base.sent_log_keep);
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.timeout = Duration::from_secs(self.timeout_secs);
        Ok(())
    }

    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            server: self.server.clone(),
            port: self.port,
            timeout: self.timeout,
            verbose: self.verbose,
        }
    }

    /// The configured host, or this machine's hostname.
    pub fn resolved_host(&self) -> Result<String, ConfigError> {
        if let Some(host) = &self.host {
            return Ok(host.clone());
        }
        let name = hostname::get().map_err(|e| {
            ConfigError::InvalidConfig(format!(
                "Could not determine hostname ({e}). Please use --host"
            ))
        })?;
        Ok(name.to_string_lossy().into_owned())
    }

    /// Packet clock to send with batches; `--now` wins over a fixed value.
    pub fn effective_packet_clock(&self) -> Option<i64> {
        if self.now {
            Some(chrono::Utc::now().timestamp())
        } else {
            self.packet_clock
        }
    }
}

fn inherit<T: PartialEq>(value: &mut T, default: T, base: T) {
    if *value == default {
        *value = base;
    }
}

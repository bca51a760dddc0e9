use super::{Config, ConfigError};

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("Server must not be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "Port must be greater than 0".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_per_connection == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "Max per connection must be greater than 0 when set".to_string(),
            ));
        }

        if self.key.is_some() != self.value.is_some() {
            return Err(ConfigError::InvalidConfig(
                "--key and --value must be given together".to_string(),
            ));
        }

        if self.clock.is_some() && self.key.is_none() {
            return Err(ConfigError::InvalidConfig(
                "--clock applies to --key/--value only".to_string(),
            ));
        }

        if self.input_file.is_none() && self.key.is_none() {
            return Err(ConfigError::InvalidConfig(
                "Nothing to send: use --input-file or --key/--value".to_string(),
            ));
        }

        if self.now && self.packet_clock.is_some() {
            return Err(ConfigError::InvalidConfig(
                "--now and --packet-clock are mutually exclusive".to_string(),
            ));
        }

        if self.sent_log_keep == 0 {
            return Err(ConfigError::InvalidConfig(
                "Sent log keep must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

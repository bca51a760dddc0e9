use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataPointError {
    #[error("host must not be empty")]
    EmptyHost,
    #[error("key must not be empty")]
    EmptyKey,
}

/// A single sample addressed to a trapper item on the monitoring server.
///
/// The value is always carried as text; the server interprets it according to
/// the item's configured type. When `clock` is `None` the server stamps the
/// sample with the packet clock or its own receipt time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataPoint {
    pub host: String,
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<i64>,
}

impl DataPoint {
    /// Builds a validated data point. Host and key must be non-empty.
    pub fn new(
        host: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        clock: Option<i64>,
    ) -> Result<Self, DataPointError> {
        let point = Self {
            host: host.into(),
            key: key.into(),
            value: value.into(),
            clock,
        };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<(), DataPointError> {
        if self.host.is_empty() {
            return Err(DataPointError::EmptyHost);
        }
        if self.key.is_empty() {
            return Err(DataPointError::EmptyKey);
        }
        Ok(())
    }
}

impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host={} key={} value={}", self.host, self.key, self.value)?;
        if let Some(clock) = self.clock {
            write!(f, " clock={clock}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_host_and_key() {
        assert_eq!(
            DataPoint::new("", "k", "1", None).unwrap_err(),
            DataPointError::EmptyHost
        );
        assert_eq!(
            DataPoint::new("h", "", "1", None).unwrap_err(),
            DataPointError::EmptyKey
        );
    }

    #[test]
    fn test_serialization_omits_missing_clock() {
        let without = DataPoint::new("h1", "k1", "5", None).unwrap();
        assert_eq!(
            serde_json::to_string(&without).unwrap(),
            r#"{"host":"h1","key":"k1","value":"5"}"#
        );

        let with = DataPoint::new("h1", "k1", "5", Some(1000)).unwrap();
        assert_eq!(
            serde_json::to_string(&with).unwrap(),
            r#"{"host":"h1","key":"k1","value":"5","clock":1000}"#
        );
    }

    #[test]
    fn test_display() {
        let point = DataPoint::new("web01", "cpu.load", "0.42", Some(1_700_000_000)).unwrap();
        assert_eq!(
            point.to_string(),
            "host=web01 key=cpu.load value=0.42 clock=1700000000"
        );
    }
}

use crate::{Error, Result};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where a batch goes back into the queue after a failed delivery.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequeuePosition {
    /// Before anything tracked while the delivery was in flight.
    Head,

    /// After anything tracked while the delivery was in flight.
    #[default]
    Tail,
}

/// Batching policy for a [`Tracker`](crate::Tracker).
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Queue length at which a flush is triggered.
    pub batch_size: usize,

    /// Period of the flush timer, in milliseconds.
    #[serde(rename = "flushInterval")]
    pub flush_interval_ms: u64,

    /// Queue length beyond which the oldest events are dropped.
    pub max_queue_len: usize,

    /// Requeue policy for failed batches.
    pub requeue: RequeuePosition,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            flush_interval_ms: 5000,
            max_queue_len: 10_000,
            requeue: RequeuePosition::Tail,
        }
    }
}

impl TrackerConfig {
    /// Parses a TOML document. Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// This function will return an error if the document cannot be parsed
    /// or the resulting config does not validate.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;

        Ok(config)
    }

    /// Checks that the config can drive a tracker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a size or interval is zero, or the
    /// queue cap is smaller than a batch.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".into()));
        }

        if self.flush_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "flush interval must be positive".into(),
            ));
        }

        if self.max_queue_len < self.batch_size {
            return Err(Error::InvalidConfig(format!(
                "max queue length {} is smaller than batch size {}",
                self.max_queue_len, self.batch_size
            )));
        }

        Ok(())
    }

    /// The flush timer period.
    #[must_use]
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();

        assert_eq!(config.batch_size, 10);
        assert_eq!(config.flush_interval(), Duration::from_secs(5));
        assert_eq!(config.max_queue_len, 10_000);
        assert_eq!(config.requeue, RequeuePosition::Tail);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parses_camel_case_json() {
        let config: TrackerConfig = serde_json::from_str(
            r#"{ "batchSize": 3, "flushInterval": 250, "maxQueueLen": 30, "requeue": "head" }"#,
        )
        .unwrap();

        assert_eq!(
            config,
            TrackerConfig {
                batch_size: 3,
                flush_interval_ms: 250,
                max_queue_len: 30,
                requeue: RequeuePosition::Head,
            }
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: TrackerConfig = serde_json::from_str(r#"{ "batchSize": 25 }"#).unwrap();

        assert_eq!(config.batch_size, 25);
        assert_eq!(config.flush_interval_ms, 5000);
        assert_eq!(config.requeue, RequeuePosition::Tail);
    }

    #[test]
    fn test_parses_toml() {
        let config = TrackerConfig::from_toml_str(
            r#"
            batchSize = 50
            flushInterval = 1000
            requeue = "tail"
            "#,
        )
        .unwrap();

        assert_eq!(config.batch_size, 50);
        assert_eq!(config.flush_interval_ms, 1000);
        assert_eq!(config.max_queue_len, 10_000);
    }

    #[test]
    fn test_toml_errors() {
        assert!(matches!(
            TrackerConfig::from_toml_str("batchSize = \"ten\""),
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            TrackerConfig::from_toml_str("batchSize = 0"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validation() {
        let zero_interval = TrackerConfig {
            flush_interval_ms: 0,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            zero_interval.validate(),
            Err(Error::InvalidConfig(_))
        ));

        let small_cap = TrackerConfig {
            batch_size: 10,
            max_queue_len: 9,
            ..TrackerConfig::default()
        };
        assert!(matches!(small_cap.validate(), Err(Error::InvalidConfig(_))));
    }
}

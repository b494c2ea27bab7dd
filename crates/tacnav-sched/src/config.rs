use std::time::Duration;

use crate::error::SchedulerError;

/// Admission limits and time budgets of a [`Scheduler`](crate::Scheduler).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    /// Requests allowed in the processing set at once.
    pub max_concurrent: usize,
    /// Wall time a tick may spend running searches.
    pub time_slice: Duration,
    /// How long finished requests stay queryable.
    pub result_retention: Duration,
    /// Timeout of requests submitted without one.
    pub default_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            time_slice: Duration::from_millis(2),
            result_retention: Duration::from_secs(5),
            default_timeout: Duration::from_secs(10),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.max_concurrent == 0 {
            return Err(SchedulerError::NoConcurrency);
        }
        if self.default_timeout.is_zero() {
            return Err(SchedulerError::ZeroTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert_eq!(SchedulerConfig::default().validate(), Ok(()));
        let cfg = SchedulerConfig {
            max_concurrent: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(SchedulerError::NoConcurrency));
        let cfg = SchedulerConfig {
            default_timeout: Duration::ZERO,
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(SchedulerError::ZeroTimeout));
        assert_eq!(
            SchedulerError::NoConcurrency.to_string(),
            "max_concurrent must be at least 1"
        );
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn partial_record() {
        let cfg: SchedulerConfig = serde_json::from_str(r#"{"max_concurrent": 8}"#).unwrap();
        assert_eq!(cfg.max_concurrent, 8);
        assert_eq!(cfg.time_slice, Duration::from_millis(2));
    }
}

use crate::core::errors::{KernelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Largest table the coordinator accepts
pub const MAX_PHILOSOPHERS: usize = 16;

/// Deadlock-avoidance discipline used by the dining coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Every philosopher takes the lower-numbered fork first
    GlobalOrder,
    /// An admission gate lets at most `permits` philosophers reach for forks
    Butler { permits: usize },
}

impl Strategy {
    /// Butler with one seat always empty
    pub fn butler_for(philosophers: usize) -> Self {
        Strategy::Butler {
            permits: philosophers.saturating_sub(1),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::GlobalOrder => "global_order",
            Strategy::Butler { .. } => "butler",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::GlobalOrder => write!(f, "global_order"),
            Strategy::Butler { permits } => write!(f, "butler(permits={})", permits),
        }
    }
}

/// Timing of the simulated square computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FutureConfig {
    /// Lower bound of the artificial delay (inclusive)
    pub min_delay_ms: u64,
    /// Upper bound of the artificial delay (exclusive)
    pub max_delay_ms: u64,
}

impl Default for FutureConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 100,
            max_delay_ms: 500,
        }
    }
}

impl FutureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(KernelError::configuration_field(
                "min_delay_ms cannot exceed max_delay_ms",
                "min_delay_ms",
            ));
        }
        Ok(())
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Dining table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiningConfig {
    /// Number of philosophers, and therefore forks, around the table
    pub philosophers: usize,
    /// Think/eat rounds each philosopher completes before leaving
    pub rounds: usize,
    pub strategy: Strategy,
    /// Wall-clock budget for a whole run; expiry is reported, never retried
    pub watchdog_ms: u64,
}

impl Default for DiningConfig {
    fn default() -> Self {
        Self {
            philosophers: 5,
            rounds: 3,
            strategy: Strategy::GlobalOrder,
            watchdog_ms: 60_000,
        }
    }
}

impl DiningConfig {
    /// Create a new builder for DiningConfig
    pub fn builder() -> DiningConfigBuilder {
        DiningConfigBuilder::new()
    }

    /// Five philosophers behind a butler with four permits
    pub fn with_butler() -> Self {
        Self {
            strategy: Strategy::butler_for(5),
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.philosophers < 2 {
            return Err(KernelError::configuration_field(
                "at least 2 philosophers are needed to share forks",
                "philosophers",
            ));
        }
        if self.philosophers > MAX_PHILOSOPHERS {
            return Err(KernelError::configuration_field(
                format!("philosophers cannot exceed {}", MAX_PHILOSOPHERS),
                "philosophers",
            ));
        }
        if self.rounds == 0 {
            return Err(KernelError::configuration_field(
                "rounds must be greater than 0",
                "rounds",
            ));
        }
        if let Strategy::Butler { permits } = self.strategy {
            if permits == 0 || permits >= self.philosophers {
                return Err(KernelError::configuration_field(
                    format!(
                        "butler permits must be between 1 and {} for {} philosophers",
                        self.philosophers - 1,
                        self.philosophers
                    ),
                    "strategy.permits",
                ));
            }
        }
        if self.watchdog_ms == 0 {
            return Err(KernelError::configuration_field(
                "watchdog_ms must be greater than 0",
                "watchdog_ms",
            ));
        }
        Ok(())
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }
}

/// Builder for DiningConfig
pub struct DiningConfigBuilder {
    config: DiningConfig,
}

impl DiningConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: DiningConfig::default(),
        }
    }

    pub fn philosophers(mut self, philosophers: usize) -> Self {
        self.config.philosophers = philosophers;
        self
    }

    pub fn rounds(mut self, rounds: usize) -> Self {
        self.config.rounds = rounds;
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn watchdog(mut self, watchdog: Duration) -> Self {
        self.config.watchdog_ms = watchdog.as_millis() as u64;
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<DiningConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for DiningConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level configuration for both demonstrations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub futures: FutureConfig,
    pub dining: DiningConfig,
}

impl KernelConfig {
    /// Parse a YAML document; missing sections fall back to defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: KernelConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.futures.validate()?;
        self.dining.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = KernelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dining.philosophers, 5);
        assert_eq!(config.dining.rounds, 3);
        assert_eq!(config.futures.min_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_butler_permits_must_leave_a_seat_empty() {
        let err = DiningConfig::builder()
            .strategy(Strategy::Butler { permits: 5 })
            .build()
            .unwrap_err();
        assert_eq!(err.category(), "configuration");

        let config = DiningConfig::builder()
            .strategy(Strategy::butler_for(5))
            .build()
            .unwrap();
        assert_eq!(config.strategy, Strategy::Butler { permits: 4 });
    }

    #[test]
    fn test_table_size_bounds() {
        assert!(DiningConfig::builder().philosophers(1).build().is_err());
        assert!(DiningConfig::builder()
            .philosophers(MAX_PHILOSOPHERS + 1)
            .build()
            .is_err());
        assert!(DiningConfig::builder().rounds(0).build().is_err());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
futures:
  min_delay_ms: 10
  max_delay_ms: 20
dining:
  rounds: 2
  strategy:
    kind: butler
    permits: 3
"#;
        let config = KernelConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.futures.max_delay_ms, 20);
        assert_eq!(config.dining.philosophers, 5);
        assert_eq!(config.dining.rounds, 2);
        assert_eq!(config.dining.strategy, Strategy::Butler { permits: 3 });
    }

    #[test]
    fn test_from_yaml_rejects_invalid_range() {
        let yaml = "futures:\n  min_delay_ms: 900\n  max_delay_ms: 100\n";
        assert!(KernelConfig::from_yaml_str(yaml).is_err());
    }
}

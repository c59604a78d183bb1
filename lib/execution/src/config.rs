//! Simulator configuration.

use crate::strategy::OrderStrategyKind;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulatorConfig {
    /// Shortest simulated node run, in milliseconds.
    #[serde(default = "default_min_node_delay_ms")]
    pub min_node_delay_ms: u64,

    /// Longest simulated node run, in milliseconds.
    #[serde(default = "default_max_node_delay_ms")]
    pub max_node_delay_ms: u64,

    /// Delay after a run before node statuses return to idle.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Probability in `[0, 1]` that a node fails.
    #[serde(default)]
    pub failure_rate: f64,

    /// Retry budget recorded on new executions.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Node visiting order.
    #[serde(default)]
    pub order: OrderStrategyKind,
}

fn default_min_node_delay_ms() -> u64 {
    800
}

fn default_max_node_delay_ms() -> u64 {
    2000
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_max_retries() -> u32 {
    3
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            min_node_delay_ms: default_min_node_delay_ms(),
            max_node_delay_ms: default_max_node_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            failure_rate: 0.0,
            max_retries: default_max_retries(),
            order: OrderStrategyKind::default(),
        }
    }
}

impl SimulatorConfig {
    #[must_use]
    pub fn node_delay_range(&self) -> (Duration, Duration) {
        let min = self.min_node_delay_ms.min(self.max_node_delay_ms);
        let max = self.min_node_delay_ms.max(self.max_node_delay_ms);
        (Duration::from_millis(min), Duration::from_millis(max))
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: SimulatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SimulatorConfig::default());
        assert_eq!(
            config.node_delay_range(),
            (Duration::from_millis(800), Duration::from_millis(2000))
        );
        assert_eq!(config.order, OrderStrategyKind::Collection);
    }

    #[test]
    fn inverted_range_is_normalized() {
        let config = SimulatorConfig {
            min_node_delay_ms: 500,
            max_node_delay_ms: 100,
            ..SimulatorConfig::default()
        };
        assert_eq!(
            config.node_delay_range(),
            (Duration::from_millis(100), Duration::from_millis(500))
        );
    }
}

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Consistency guarantee currently offered by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    Strong,
    Causal,
    Eventual,
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsistencyLevel::Strong => "Strong",
            ConsistencyLevel::Causal => "Causal",
            ConsistencyLevel::Eventual => "Eventual",
        };
        write!(f, "{name}")
    }
}

/// Selects the global consistency level from the worst observed metric.
///
/// Latency above 250 ms or an error rate above 0.08 forces Eventual;
/// above 100 ms or 0.03, Causal; otherwise Strong.
#[derive(Debug, Clone)]
pub struct ConsistencyOrchestrator {
    pub current_level: ConsistencyLevel,
    pub last_latency: Duration,
    pub error_rate: f64,
}

impl ConsistencyOrchestrator {
    pub fn new() -> Self {
        ConsistencyOrchestrator {
            current_level: ConsistencyLevel::Strong,
            last_latency: Duration::ZERO,
            error_rate: 0.0,
        }
    }

    /// Re-evaluate the level against fresh network observations.
    pub fn evaluate_network(&mut self, latency: Duration, error_rate: f64) {
        self.last_latency = latency;
        self.error_rate = error_rate;

        self.current_level = if latency > Duration::from_millis(250) || error_rate > 0.08 {
            ConsistencyLevel::Eventual
        } else if latency > Duration::from_millis(100) || error_rate > 0.03 {
            ConsistencyLevel::Causal
        } else {
            ConsistencyLevel::Strong
        };
    }

    /// Status report: level, last latency, last error rate.
    pub fn format_status(&self) -> String {
        format!(
            "=== Consistency Orchestrator ===\n\
             Current Level: {}\n\
             Last Latency: {:?}\n\
             Last Error Rate: {:.2}\n",
            self.current_level, self.last_latency, self.error_rate
        )
    }
}

impl Default for ConsistencyOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

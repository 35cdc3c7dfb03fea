// === Vector-Clock Ordered Network Telemetry ===
pub mod capacity;
pub mod consistency;
pub mod vector_clock;

// === Re-exports for broader ecosystem access ===
pub use capacity::{
    AdaptiveCapacityManager, AdaptiveCapacityPolicy, DefaultAdaptivePolicy, NetworkMetrics,
};
pub use consistency::{ConsistencyLevel, ConsistencyOrchestrator};
pub use vector_clock::VectorClock;

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;

use crate::vector_clock::VectorClock;

/// Observed network performance for one node at one point in time.
///
/// A metrics message may carry the sender's vector clock snapshot so the
/// receiver can merge it for causal ordering.
#[derive(Debug, Clone)]
pub struct NetworkMetrics {
    pub node_id: String,
    pub latency: Duration,
    pub throughput: f64,
    pub error_rate: f64,
    pub timestamp: DateTime<Utc>,
    pub vector_clock: Option<HashMap<String, u64>>,
}

impl NetworkMetrics {
    pub fn new(node_id: &str, latency: Duration, throughput: f64, error_rate: f64) -> Self {
        NetworkMetrics {
            node_id: node_id.to_string(),
            latency,
            throughput,
            error_rate,
            timestamp: Utc::now(),
            vector_clock: None,
        }
    }
}

/// How a node's operating capacity responds to observed conditions.
pub trait AdaptiveCapacityPolicy: Send + Sync {
    fn adjust_capacity(&self, metrics: &NetworkMetrics) -> f64;

    /// Capacity reported for nodes with no recorded metrics.
    fn base_capacity(&self) -> f64;
}

/// Default policy: capacity degrades linearly with latency and, more
/// aggressively, with the error rate; the result is clamped to
/// [0, max_capacity].
pub struct DefaultAdaptivePolicy {
    base_capacity: f64,
    max_capacity: f64,
    latency_factor: f64,
    error_factor: f64,
}

impl DefaultAdaptivePolicy {
    pub fn new() -> Self {
        DefaultAdaptivePolicy {
            base_capacity: 100.0,
            max_capacity: 1000.0,
            latency_factor: 0.5,
            error_factor: 2.0,
        }
    }
}

impl Default for DefaultAdaptivePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveCapacityPolicy for DefaultAdaptivePolicy {
    fn adjust_capacity(&self, metrics: &NetworkMetrics) -> f64 {
        let mut capacity = self.base_capacity;

        let latency_ms = metrics.latency.as_millis() as f64;
        capacity -= self.latency_factor * latency_ms / 100.0;

        capacity -= self.error_factor * metrics.error_rate * self.base_capacity;

        capacity.clamp(0.0, self.max_capacity)
    }

    fn base_capacity(&self) -> f64 {
        self.base_capacity
    }
}

struct CapacityState {
    node_capacities: HashMap<String, f64>,
    node_last_update: HashMap<String, DateTime<Utc>>,
    metric_history: HashMap<String, VecDeque<NetworkMetrics>>,
    history_limit: usize,
    policy: Box<dyn AdaptiveCapacityPolicy>,
}

impl CapacityState {
    fn record(&mut self, metrics: NetworkMetrics, last_update: DateTime<Utc>) {
        let history = self
            .metric_history
            .entry(metrics.node_id.clone())
            .or_default();
        history.push_back(metrics.clone());
        if history.len() > self.history_limit {
            history.pop_front();
        }

        let capacity = self.policy.adjust_capacity(&metrics);
        debug!("node {} capacity adjusted to {capacity:.1}", metrics.node_id);
        self.node_capacities.insert(metrics.node_id.clone(), capacity);
        self.node_last_update.insert(metrics.node_id, last_update);
    }
}

/// Tracks per-node operating capacity derived from vector-clock ordered
/// metric updates. All mutations go through the write side of a single
/// read/write lock; reads take the read side.
pub struct AdaptiveCapacityManager {
    state: RwLock<CapacityState>,
    vector_clock: VectorClock,
}

impl AdaptiveCapacityManager {
    pub fn new() -> Self {
        AdaptiveCapacityManager {
            state: RwLock::new(CapacityState {
                node_capacities: HashMap::new(),
                node_last_update: HashMap::new(),
                metric_history: HashMap::new(),
                history_limit: 100,
                policy: Box::new(DefaultAdaptivePolicy::new()),
            }),
            vector_clock: VectorClock::new(),
        }
    }

    /// Record locally observed metrics: tick the vector clock under the
    /// reporting node, merge any carried clock, append to the bounded
    /// history and recompute the node's capacity.
    pub fn record_metrics(&self, metrics: NetworkMetrics) {
        let mut state = self.state.write().unwrap();

        self.vector_clock.update(&metrics.node_id);
        if let Some(carried) = &metrics.vector_clock {
            self.vector_clock.merge_snapshot(carried);
        }

        state.record(metrics, Utc::now());
    }

    /// Current capacity for a node; unknown nodes report the policy's
    /// base capacity.
    pub fn get_node_capacity(&self, node_id: &str) -> f64 {
        let state = self.state.read().unwrap();
        state
            .node_capacities
            .get(node_id)
            .copied()
            .unwrap_or_else(|| state.policy.base_capacity())
    }

    /// Adopt peer-supplied metrics that are strictly newer than the local
    /// record, and merge the peer's vector clock.
    pub fn sync_with_peer(
        &self,
        peer_metrics: HashMap<String, NetworkMetrics>,
        peer_clock: Option<&VectorClock>,
    ) {
        let mut state = self.state.write().unwrap();

        if let Some(clock) = peer_clock {
            self.vector_clock.merge(clock);
        }

        for (node_id, metrics) in peer_metrics {
            let newer = match state.node_last_update.get(&node_id) {
                Some(last) => metrics.timestamp > *last,
                None => true,
            };
            if newer {
                let stamp = metrics.timestamp;
                state.record(metrics, stamp);
            }
        }
    }

    /// Snapshot of the node → capacity mapping.
    pub fn get_global_view(&self) -> HashMap<String, f64> {
        self.state.read().unwrap().node_capacities.clone()
    }

    /// Clone of the manager's vector clock.
    pub fn get_vector_clock(&self) -> VectorClock {
        self.vector_clock.clone()
    }

    /// Swap the capacity policy.
    pub fn set_policy(&self, policy: Box<dyn AdaptiveCapacityPolicy>) {
        self.state.write().unwrap().policy = policy;
    }
}

impl Default for AdaptiveCapacityManager {
    fn default() -> Self {
        Self::new()
    }
}

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// How a dispatched request ended, from the metrics point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A query ran and returned rows (possibly none).
    Executed,
    /// A sentinel answer was produced without touching the graph.
    Sentinel,
    /// The request failed (graph, embedding or precondition error).
    Failed,
}

#[derive(Debug, Clone, Default)]
struct RequestMetrics {
    total_requests: u64,
    executed: u64,
    sentinels: u64,
    failures: u64,
    empty_results: u64,
    resolution_misses: u64,
    per_intent: BTreeMap<String, u64>,
    latencies: VecDeque<u64>, // microseconds
}

#[derive(Clone)]
pub struct MetricsCollector {
    state: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    requests: RequestMetrics,
    max_history: usize,
}

impl MetricsCollector {
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MetricsState {
                requests: RequestMetrics::default(),
                max_history: max_history.max(1),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        // Counters stay usable even if a recording thread panicked.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_request(
        &self,
        intent: &str,
        outcome: RequestOutcome,
        row_count: usize,
        latency_us: u64,
    ) {
        let mut state = self.lock();
        let max_history = state.max_history;
        let r = &mut state.requests;

        r.total_requests += 1;
        *r.per_intent.entry(intent.to_string()).or_insert(0) += 1;
        match outcome {
            RequestOutcome::Executed => {
                r.executed += 1;
                if row_count == 0 {
                    r.empty_results += 1;
                }
            }
            RequestOutcome::Sentinel => r.sentinels += 1,
            RequestOutcome::Failed => r.failures += 1,
        }

        r.latencies.push_back(latency_us);
        if r.latencies.len() > max_history {
            r.latencies.pop_front();
        }
    }

    pub fn record_resolution_misses(&self, count: usize) {
        self.lock().requests.resolution_misses += count as u64;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.lock();
        let r = &state.requests;

        let mut sorted_latencies: Vec<u64> = r.latencies.iter().copied().collect();
        sorted_latencies.sort_unstable();

        MetricsSnapshot {
            total_requests: r.total_requests,
            executed: r.executed,
            sentinels: r.sentinels,
            failures: r.failures,
            empty_results: r.empty_results,
            resolution_misses: r.resolution_misses,
            per_intent: r.per_intent.clone(),
            p50: percentile(&sorted_latencies, 50.0),
            p95: percentile(&sorted_latencies, 95.0),
            p99: percentile(&sorted_latencies, 99.0),
            history_count: r.latencies.len(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(1_000)
    }
}

fn percentile(sorted: &[u64], p: f32) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((p / 100.0) * (sorted.len() as f32)).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub executed: u64,
    pub sentinels: u64,
    pub failures: u64,
    pub empty_results: u64,
    pub resolution_misses: u64,
    pub per_intent: BTreeMap<String, u64>,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub history_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_counts_outcomes_per_kind() {
        let metrics = MetricsCollector::new(10);
        metrics.record_request("Player_Stats", RequestOutcome::Executed, 1, 100);
        metrics.record_request("Player_Stats", RequestOutcome::Executed, 0, 200);
        metrics.record_request("General_Chat", RequestOutcome::Sentinel, 0, 5);
        metrics.record_request("Team_Stats", RequestOutcome::Failed, 0, 50);
        metrics.record_resolution_misses(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 4);
        assert_eq!(snapshot.executed, 2);
        assert_eq!(snapshot.empty_results, 1);
        assert_eq!(snapshot.sentinels, 1);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.resolution_misses, 2);
        assert_eq!(snapshot.per_intent.get("Player_Stats"), Some(&2));
    }

    #[test]
    fn latency_history_is_bounded_and_percentiles_are_ordered() {
        let metrics = MetricsCollector::new(5);
        for latency in 1..=20 {
            metrics.record_request("Top_Ranked", RequestOutcome::Executed, 3, latency);
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.history_count, 5);
        assert_eq!(snapshot.p50, 18);
        assert!(snapshot.p95 >= snapshot.p50);
        assert!(snapshot.p99 >= snapshot.p95);
    }
}

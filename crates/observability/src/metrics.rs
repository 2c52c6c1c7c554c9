//! Data provider 指标收集模块
//!
//! 记录 tick、actor 生命周期、批量 spawn 与 frame barrier 的运行指标。

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::ActorKind;
use metrics::{counter, gauge, histogram};

/// 记录一次 tick 刷新
pub fn record_tick(cached_actors: usize) {
    counter!("scenario_provider_ticks_total").increment(1);
    gauge!("scenario_provider_cached_actors").set(cached_actors as f64);
}

/// 记录 actor spawn
pub fn record_actor_spawned(kind: ActorKind) {
    counter!(
        "scenario_provider_actors_spawned_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// 记录 actor 销毁
pub fn record_actor_destroyed(kind: ActorKind) {
    counter!(
        "scenario_provider_actors_destroyed_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Pool size after an insert or removal
pub fn record_pool_size(size: usize) {
    gauge!("scenario_provider_pool_size").set(size as f64);
}

/// 记录批量 spawn 中被丢弃的条目
///
/// `stage` is one of `spawn`, `controller`, `walker_speed`, `navigation`.
pub fn record_batch_failure(stage: &'static str) {
    counter!(
        "scenario_provider_batch_failures_total",
        "stage" => stage
    )
    .increment(1);
}

/// 记录 frame barrier 等待时间
pub fn record_barrier_wait(waited: Duration) {
    histogram!("scenario_provider_barrier_wait_ms").record(waited.as_secs_f64() * 1000.0);
}

pub fn record_traffic_lights(count: usize) {
    gauge!("scenario_provider_traffic_lights").set(count as f64);
}

/// Provider 指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct ProviderStatsAggregator {
    /// 总 tick 数
    pub total_ticks: u64,

    /// Batches run
    pub total_batches: u64,

    /// Actors requested across all batches
    pub requested: u64,

    /// Actors materialized across all batches
    pub materialized: u64,

    /// Items dropped across all batches
    pub dropped: u64,

    /// Tick duration (ms)
    pub tick_stats: RunningStats,

    /// Barrier wait (ms)
    pub barrier_stats: RunningStats,

    /// Spawned actors per kind
    pub spawned: BTreeMap<String, u64>,
}

impl ProviderStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&mut self, elapsed: Duration) {
        self.total_ticks += 1;
        self.tick_stats.push(elapsed.as_secs_f64() * 1000.0);
    }

    /// Account for one finished batch
    pub fn record_batch(
        &mut self,
        requested: usize,
        kinds: impl IntoIterator<Item = ActorKind>,
        dropped: usize,
        elapsed: Duration,
    ) {
        self.total_batches += 1;
        self.requested += requested as u64;
        self.dropped += dropped as u64;
        for kind in kinds {
            self.materialized += 1;
            *self.spawned.entry(kind.as_str().to_string()).or_insert(0) += 1;
        }
        self.barrier_stats.push(elapsed.as_secs_f64() * 1000.0);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> ProviderSummary {
        ProviderSummary {
            total_ticks: self.total_ticks,
            total_batches: self.total_batches,
            requested: self.requested,
            materialized: self.materialized,
            dropped: self.dropped,
            yield_rate: if self.requested > 0 {
                self.materialized as f64 / self.requested as f64 * 100.0
            } else {
                0.0
            },
            tick_ms: StatsSummary::from(&self.tick_stats),
            batch_ms: StatsSummary::from(&self.barrier_stats),
            spawned: self.spawned.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct ProviderSummary {
    pub total_ticks: u64,
    pub total_batches: u64,
    pub requested: u64,
    pub materialized: u64,
    pub dropped: u64,
    pub yield_rate: f64,
    pub tick_ms: StatsSummary,
    pub batch_ms: StatsSummary,
    pub spawned: BTreeMap<String, u64>,
}

impl std::fmt::Display for ProviderSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Provider Summary ===")?;
        writeln!(f, "Ticks: {}", self.total_ticks)?;
        writeln!(f, "Batches: {}", self.total_batches)?;
        writeln!(
            f,
            "Actors materialized: {}/{} ({:.2}%)",
            self.materialized, self.requested, self.yield_rate
        )?;
        writeln!(f, "Dropped items: {}", self.dropped)?;
        writeln!(f, "Tick time (ms): {}", self.tick_ms)?;
        writeln!(f, "Batch time (ms): {}", self.batch_ms)?;

        if !self.spawned.is_empty() {
            writeln!(f, "Spawned by kind:")?;
            for (kind, count) in &self.spawned {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_batches() {
        let mut aggregator = ProviderStatsAggregator::new();
        aggregator.record_batch(
            4,
            [ActorKind::Vehicle, ActorKind::Vehicle, ActorKind::Vehicle],
            1,
            Duration::from_millis(3),
        );
        aggregator.record_batch(2, [ActorKind::Walker], 1, Duration::from_millis(5));
        aggregator.record_tick(Duration::from_millis(1));

        let summary = aggregator.summary();
        assert_eq!(summary.total_batches, 2);
        assert_eq!(summary.materialized, 4);
        assert_eq!(summary.dropped, 2);
        assert!((summary.yield_rate - 100.0 * 4.0 / 6.0).abs() < 1e-9);
        assert_eq!(summary.spawned.get("vehicle"), Some(&3));
        assert_eq!(summary.tick_ms.count, 1);

        aggregator.reset();
        assert_eq!(aggregator.summary().total_batches, 0);
    }

    #[test]
    fn test_summary_display() {
        let summary = ProviderSummary {
            total_ticks: 100,
            requested: 20,
            materialized: 15,
            yield_rate: 75.0,
            ..Default::default()
        };

        let output = format!("{}", summary);
        assert!(output.contains("Ticks: 100"));
        assert!(output.contains("15/20 (75.00%)"));
        assert!(output.contains("Tick time (ms): N/A"));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // no recorder installed: calls are no-ops
        record_tick(3);
        record_actor_spawned(ActorKind::Walker);
        record_batch_failure("spawn");
        record_barrier_wait(Duration::from_micros(250));
    }
}

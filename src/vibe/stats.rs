//! Latency statistics for trial runs.
//!
//! Summaries are recomputed fresh from the raw sample each time; nothing
//! here mutates incrementally. Percentiles use the nearest-rank method.

use serde::{Deserialize, Serialize};

/// Discrete performance bucket derived from the mean latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceCategory {
    VeryFast,
    Fast,
    Moderate,
    Slow,
    VerySlow,
}

impl PerformanceCategory {
    /// Bucket a mean latency in seconds.
    pub fn from_mean(mean_secs: f64) -> Self {
        if mean_secs < 1.0 {
            PerformanceCategory::VeryFast
        } else if mean_secs < 2.5 {
            PerformanceCategory::Fast
        } else if mean_secs < 5.0 {
            PerformanceCategory::Moderate
        } else if mean_secs < 10.0 {
            PerformanceCategory::Slow
        } else {
            PerformanceCategory::VerySlow
        }
    }
}

impl std::fmt::Display for PerformanceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PerformanceCategory::VeryFast => "Very Fast",
            PerformanceCategory::Fast => "Fast",
            PerformanceCategory::Moderate => "Moderate",
            PerformanceCategory::Slow => "Slow",
            PerformanceCategory::VerySlow => "Very Slow",
        };
        write!(f, "{}", s)
    }
}

/// Summary of a latency sample, all values in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    pub std_dev: f64,
    /// [0, 100]; 100 means every trial took identical time, dropping as
    /// the coefficient of variation grows.
    pub consistency_score: f64,
    pub performance_category: PerformanceCategory,
}

impl TimingStats {
    /// Summarize a raw latency sample. An empty sample produces zeroed
    /// stats with a consistency of 0.
    pub fn from_times(times: &[f64]) -> Self {
        if times.is_empty() {
            return Self {
                count: 0,
                mean: 0.0,
                median: 0.0,
                min: 0.0,
                max: 0.0,
                p25: 0.0,
                p75: 0.0,
                p95: 0.0,
                std_dev: 0.0,
                consistency_score: 0.0,
                performance_category: PerformanceCategory::VeryFast,
            };
        }

        let mut sorted: Vec<f64> = times.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let variance = sorted.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / count as f64;
        let std_dev = variance.sqrt();

        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        Self {
            count,
            mean,
            median,
            min: sorted[0],
            max: sorted[count - 1],
            p25: nearest_rank(&sorted, 25),
            p75: nearest_rank(&sorted, 75),
            p95: nearest_rank(&sorted, 95),
            std_dev,
            consistency_score: consistency_score(mean, std_dev),
            performance_category: PerformanceCategory::from_mean(mean),
        }
    }
}

/// `100 × (1 − min(1, cv))` where cv is the coefficient of variation.
/// A zero-spread sample scores exactly 100; cv ≥ 1 floors at 0.
fn consistency_score(mean: f64, std_dev: f64) -> f64 {
    if mean <= 0.0 {
        // Degenerate all-zero samples count as perfectly consistent.
        return if std_dev == 0.0 { 100.0 } else { 0.0 };
    }
    let cv = std_dev / mean;
    (100.0 * (1.0 - cv.min(1.0))).clamp(0.0, 100.0)
}

/// Nearest-rank percentile over an already-sorted sample.
fn nearest_rank(sorted: &[f64], percentile: u8) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let p = percentile.clamp(1, 100) as f64;
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_latencies_score_exactly_100() {
        let stats = TimingStats::from_times(&[0.5, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(stats.consistency_score, 100.0);
        assert_eq!(stats.mean, 0.5);
        assert_eq!(stats.median, 0.5);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_spread_lowers_consistency() {
        let tight = TimingStats::from_times(&[1.0, 1.01, 0.99, 1.0]);
        let loose = TimingStats::from_times(&[0.1, 2.0, 0.1, 2.0]);
        assert!(tight.consistency_score > loose.consistency_score);
        assert!(loose.consistency_score < 100.0);
    }

    #[test]
    fn test_basic_moments() {
        let stats = TimingStats::from_times(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn test_nearest_rank_percentiles() {
        let sorted: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        let stats = TimingStats::from_times(&sorted);
        assert_eq!(stats.p25, 25.0);
        assert_eq!(stats.p75, 75.0);
        assert_eq!(stats.p95, 95.0);

        let small = TimingStats::from_times(&[1.0, 2.0, 3.0]);
        assert_eq!(small.p25, 1.0);
        assert_eq!(small.p95, 3.0);
    }

    #[test]
    fn test_categories_at_thresholds() {
        assert_eq!(PerformanceCategory::from_mean(0.2), PerformanceCategory::VeryFast);
        assert_eq!(PerformanceCategory::from_mean(1.0), PerformanceCategory::Fast);
        assert_eq!(PerformanceCategory::from_mean(3.0), PerformanceCategory::Moderate);
        assert_eq!(PerformanceCategory::from_mean(7.0), PerformanceCategory::Slow);
        assert_eq!(PerformanceCategory::from_mean(60.0), PerformanceCategory::VerySlow);
    }

    #[test]
    fn test_empty_sample() {
        let stats = TimingStats::from_times(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.consistency_score, 0.0);
    }
}

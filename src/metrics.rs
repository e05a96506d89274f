//! Mapping from load score to the three output metrics of a row.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Distribution;

use crate::clock::SimulatedClock;
use crate::table::Row;

/// Queries per unit of score before noise.
pub const QUERIES_PER_SCORE: f64 = 1000.0;

/// Disk units written per cumulative query (half the queries write 10 units).
pub const DISK_UNITS_PER_QUERY: f64 = 5.0;

/// Triangular law whose mode may lie beyond the upper bound.
///
/// Inverse-CDF sampling with `c = (mode - low) / (high - low)`. When `c >= 1`
/// the upper branch is never taken and draws extend past `high` up to
/// `low + (high - low) * sqrt(c)`, skewing the noise toward growth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthSkewedTriangular {
    low: f64,
    high: f64,
    mode: f64,
}

impl GrowthSkewedTriangular {
    pub fn new(low: f64, high: f64, mode: f64) -> Option<Self> {
        if !(low.is_finite() && high.is_finite() && mode.is_finite()) || high <= low {
            return None;
        }
        Some(Self { low, high, mode })
    }

    /// Query-rate noise: support `[-1, 1]`, mode `2`.
    pub fn query_noise() -> Self {
        Self {
            low: -1.0,
            high: 1.0,
            mode: 2.0,
        }
    }

    /// Smallest and largest value a draw can take.
    pub fn range(&self) -> (f64, f64) {
        let c = self.split();
        let top = if c >= 1.0 {
            self.low + (self.high - self.low) * c.sqrt()
        } else {
            self.high
        };
        let bottom = if c <= 0.0 {
            self.high - (self.high - self.low) * (1.0 - c).sqrt()
        } else {
            self.low
        };
        (bottom, top)
    }

    fn split(&self) -> f64 {
        (self.mode - self.low) / (self.high - self.low)
    }
}

impl Distribution<f64> for GrowthSkewedTriangular {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.gen();
        let c = self.split();
        let span = self.high - self.low;
        if u > c {
            self.high - span * ((1.0 - u) * (1.0 - c)).sqrt()
        } else {
            self.low + span * (u * c).sqrt()
        }
    }
}

/// Converts scores into VM load, query rate and disk usage.
#[derive(Debug, Clone)]
pub struct MetricMapper {
    noise: GrowthSkewedTriangular,
    rng: ChaCha8Rng,
}

impl MetricMapper {
    pub fn new(seed: u64) -> Self {
        Self {
            noise: GrowthSkewedTriangular::query_noise(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Pass-through.
    pub fn score_to_vm_load(&self, score: f64) -> f64 {
        score
    }

    /// `score * (1 + U) * 1000`, one noise draw per call.
    pub fn query_rate(&mut self, score: f64) -> f64 {
        let u = self.noise.sample(&mut self.rng);
        score * (1.0 + u) * QUERIES_PER_SCORE
    }

    /// Assemble the row for the tick the clock currently points at.
    pub fn build_row(
        &self,
        clock: &SimulatedClock,
        score: f64,
        requests_per_second: f64,
        totals: &RunningTotals,
    ) -> Row {
        Row {
            elapsed_seconds: clock.elapsed_seconds(),
            second: clock.second(),
            minute: clock.minute(),
            hour: clock.hour(),
            weekday: clock.weekday(),
            day_of_month: clock.day_of_month(),
            month: clock.month(),
            season: clock.season(),
            year: clock.year(),
            vm_load: self.score_to_vm_load(score),
            requests_per_second,
            disk_usage: disk_usage_proxy(totals.total_queries()),
        }
    }
}

pub fn disk_usage_proxy(total_queries: f64) -> f64 {
    total_queries * DISK_UNITS_PER_QUERY
}

/// Cumulative query counter behind the disk-usage proxy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningTotals {
    total_queries: f64,
}

impl RunningTotals {
    pub fn total_queries(&self) -> f64 {
        self.total_queries
    }

    /// Negative rates are ignored so the counter never decreases.
    pub fn record(&mut self, query_rate: f64) {
        if query_rate > 0.0 {
            self.total_queries += query_rate;
        }
    }
}

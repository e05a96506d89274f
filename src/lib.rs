//! loadgen - synthetic server and database load series
//!
//! Produces one row per simulated second (VM load, requests per second and a
//! disk-usage proxy) from a weighted sum of periodic, trend and stochastic
//! usage scores keyed off a simulated calendar clock.

pub mod clock;
pub mod config;
pub mod generator;
pub mod metrics;
pub mod output;
pub mod plot;
pub mod score;
pub mod signals;
pub mod table;

use thiserror::Error;

// Re-export main types
pub use clock::{Season, SimulatedClock};
pub use config::{parse_start, RunConfig, SECONDS_PER_DAY};
pub use generator::{
    AbortHandle, GenerationLoop, Progress, ProgressSink, RunState, RunSummary, TracingProgress,
};
pub use metrics::{disk_usage_proxy, MetricMapper, RunningTotals};
pub use output::{CsvExporter, TableExporter};
pub use score::{ScoreAggregator, SignalWeights};
pub use signals::{RandomWalk, RandomWalkParams, SignalGenerator, SignalKind};
pub use table::{Row, RowBuffer, Table};

#[derive(Debug, Error)]
pub enum LoadGenError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid start instant: {0}")]
    InvalidStart(String),
    #[error("plot error: {0}")]
    Plot(String),
    #[error("generator {generator} produced a non-finite score at t={elapsed_seconds}s")]
    NonFiniteScore {
        generator: &'static str,
        elapsed_seconds: u64,
    },
    #[error("run aborted after {ticks_done} of {total_ticks} ticks")]
    Aborted { ticks_done: u64, total_ticks: u64 },
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

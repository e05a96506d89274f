use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::clock::default_origin;
use crate::score::SignalWeights;
use crate::signals::RandomWalkParams;
use crate::LoadGenError;

/// Ticks in one simulated day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Configuration of a single generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Simulated duration in days; zero yields an empty table
    pub duration_days: f64,
    /// Export the table when the run ends
    pub export: bool,
    /// Export target; the caller picks a timestamped path when unset
    pub destination: Option<PathBuf>,
    /// Simulated instant of the first tick
    pub start: NaiveDateTime,
    /// RNG seed for the random walk and query-rate noise
    pub seed: u64,
    /// Ticks between buffer flushes
    pub chunk_ticks: u64,
    /// Ticks between progress reports
    pub progress_every_ticks: u64,
    pub weights: SignalWeights,
    pub random_walk: RandomWalkParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_days: 1.0,
            export: false,
            destination: None,
            start: default_origin(),
            seed: 2019,
            chunk_ticks: SECONDS_PER_DAY,
            progress_every_ticks: SECONDS_PER_DAY,
            weights: SignalWeights::default(),
            random_walk: RandomWalkParams::default(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), LoadGenError> {
        if !self.duration_days.is_finite() || self.duration_days < 0.0 {
            return Err(LoadGenError::InvalidConfig(format!(
                "duration_days must be a finite, non-negative number (got {})",
                self.duration_days
            )));
        }
        if self.total_ticks_f64() > u64::MAX as f64 {
            return Err(LoadGenError::InvalidConfig(
                "duration_days is too large".to_string(),
            ));
        }
        if self.chunk_ticks == 0 {
            return Err(LoadGenError::InvalidConfig(
                "chunk_ticks must be greater than zero".to_string(),
            ));
        }
        if self.progress_every_ticks == 0 {
            return Err(LoadGenError::InvalidConfig(
                "progress_every_ticks must be greater than zero".to_string(),
            ));
        }
        self.weights.validate()?;
        self.random_walk.validate()?;
        Ok(())
    }

    /// `duration_days * 86400`, rounded to whole ticks.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks_f64().round() as u64
    }

    fn total_ticks_f64(&self) -> f64 {
        self.duration_days * SECONDS_PER_DAY as f64
    }

    /// Seed of the random-walk stream.
    pub fn walk_seed(&self) -> u64 {
        self.seed
    }

    /// Seed of the query-rate noise stream, kept apart from the walk.
    pub fn noise_seed(&self) -> u64 {
        self.seed ^ 0x5EED_D15C_u64
    }
}

pub fn load_config_file(path: &Path) -> Result<RunConfig, LoadGenError> {
    let raw = fs::read_to_string(path)?;
    let config: RunConfig = serde_json::from_str(&raw)?;
    Ok(config)
}

/// Parse `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD`.
pub fn parse_start(raw: &str) -> Result<NaiveDateTime, LoadGenError> {
    let raw = raw.trim();
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(t);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|e| LoadGenError::InvalidStart(format!("{raw}: {e}")))
}

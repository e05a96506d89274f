//! Generation loop
//!
//! Drives the simulated clock one tick at a time, turning each tick into a row
//! and draining rows into the table once per chunk. Every exit path, whether
//! normal completion, a generator failure or an external abort, goes through the
//! same final flush and export step.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use tracing::{debug, error, info, warn};

use crate::clock::SimulatedClock;
use crate::config::{RunConfig, SECONDS_PER_DAY};
use crate::metrics::{MetricMapper, RunningTotals};
use crate::output::TableExporter;
use crate::score::ScoreAggregator;
use crate::table::{RowBuffer, Table};
use crate::LoadGenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub ticks_done: u64,
    pub total_ticks: u64,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total_ticks == 0 {
            return 1.0;
        }
        self.ticks_done as f64 / self.total_ticks as f64
    }
}

/// Receives periodic progress reports from the loop.
pub trait ProgressSink {
    fn report(&mut self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: FnMut(Progress),
{
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

/// Logs progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&mut self, progress: Progress) {
        info!(
            ticks_done = progress.ticks_done,
            total_ticks = progress.total_ticks,
            "generation progress {:.1}%",
            progress.fraction() * 100.0
        );
    }
}

/// Cloneable handle that asks a running loop to stop after the current tick.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Trip the handle on SIGINT or SIGTERM so the loop stops and still exports.
    ///
    /// A second signal after the handle is tripped exits the process with status 1.
    pub fn abort_on_signals(&self) -> Result<(), LoadGenError> {
        for signal in [SIGINT, SIGTERM] {
            flag::register_conditional_shutdown(signal, 1, Arc::clone(&self.0))?;
            flag::register(signal, Arc::clone(&self.0))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub state: RunState,
    pub rows: usize,
    pub ticks_done: u64,
    pub total_ticks: u64,
    pub total_queries: f64,
    pub exported_to: Option<PathBuf>,
}

/// One generation run. Owns the clock, the walk state (inside the aggregator),
/// the running totals and all accumulated rows.
pub struct GenerationLoop {
    config: RunConfig,
    clock: SimulatedClock,
    aggregator: ScoreAggregator,
    mapper: MetricMapper,
    buffer: RowBuffer,
    table: Table,
    totals: RunningTotals,
    state: RunState,
    ticks_done: u64,
    abort: AbortHandle,
}

impl GenerationLoop {
    /// Validate `config` and set up an idle loop with the default generators.
    pub fn new(config: RunConfig) -> Result<Self, LoadGenError> {
        config.validate()?;
        if config.export && config.destination.is_none() {
            return Err(LoadGenError::InvalidConfig(
                "export requested without a destination".to_string(),
            ));
        }

        let aggregator =
            ScoreAggregator::from_weights(&config.weights, &config.random_walk, config.walk_seed());
        // larger chunks grow on demand
        let buffer_capacity = config
            .chunk_ticks
            .min(config.total_ticks())
            .min(SECONDS_PER_DAY) as usize;

        Ok(Self {
            clock: SimulatedClock::new(config.start),
            aggregator,
            mapper: MetricMapper::new(config.noise_seed()),
            buffer: RowBuffer::with_capacity(buffer_capacity),
            table: Table::new(),
            totals: RunningTotals::default(),
            state: RunState::Idle,
            ticks_done: 0,
            abort: AbortHandle::default(),
            config,
        })
    }

    /// Replace the generator list built from the configured weights.
    pub fn with_aggregator(mut self, aggregator: ScoreAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn clock(&self) -> &SimulatedClock {
        &self.clock
    }

    pub fn totals(&self) -> &RunningTotals {
        &self.totals
    }

    pub fn ticks_done(&self) -> u64 {
        self.ticks_done
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run to completion, then flush and export.
    ///
    /// On failure or abort the rows accumulated so far are still flushed and
    /// exported before the original error is returned.
    pub fn run(
        &mut self,
        exporter: &mut dyn TableExporter,
        progress: &mut dyn ProgressSink,
    ) -> Result<RunSummary, LoadGenError> {
        if self.state != RunState::Idle {
            return Err(LoadGenError::InvalidState("generation loop already started"));
        }

        let total_ticks = self.config.total_ticks();
        self.state = RunState::Running;
        info!(
            total_ticks,
            start = %self.config.start,
            seed = self.config.seed,
            "starting generation"
        );

        let outcome = self.drive(total_ticks, progress);
        self.buffer.flush_into(&mut self.table);
        self.state = if outcome.is_ok() {
            RunState::Completed
        } else {
            RunState::Aborted
        };

        let exported = self.export(exporter);

        match (outcome, exported) {
            (Ok(()), Ok(exported_to)) => {
                info!(rows = self.table.len(), "generation completed");
                Ok(self.summary(total_ticks, exported_to))
            }
            (Ok(()), Err(export_err)) => {
                self.state = RunState::Aborted;
                error!(error = %export_err, "export failed");
                Err(export_err)
            }
            (Err(run_err), Ok(exported_to)) => {
                warn!(
                    error = %run_err,
                    rows = self.table.len(),
                    exported_to = ?exported_to,
                    "generation aborted"
                );
                Err(run_err)
            }
            (Err(run_err), Err(export_err)) => {
                error!(error = %export_err, "partial export failed");
                warn!(error = %run_err, rows = self.table.len(), "generation aborted");
                Err(run_err)
            }
        }
    }

    fn drive(
        &mut self,
        total_ticks: u64,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), LoadGenError> {
        while self.ticks_done < total_ticks {
            if self.abort.is_aborted() {
                return Err(LoadGenError::Aborted {
                    ticks_done: self.ticks_done,
                    total_ticks,
                });
            }

            self.tick()?;

            if self.ticks_done % self.config.chunk_ticks == 0 {
                let moved = self.buffer.flush_into(&mut self.table);
                debug!(moved, table_rows = self.table.len(), "flushed chunk");
            }

            if self.ticks_done % self.config.progress_every_ticks == 0
                || self.ticks_done == total_ticks
            {
                progress.report(Progress {
                    ticks_done: self.ticks_done,
                    total_ticks,
                });
            }
        }
        Ok(())
    }

    fn tick(&mut self) -> Result<(), LoadGenError> {
        let score = self.aggregator.compute_score(&self.clock)?;
        let query_rate = self.mapper.query_rate(score);
        let row = self
            .mapper
            .build_row(&self.clock, score, query_rate, &self.totals);

        self.buffer.append(row);
        self.clock.advance(1);
        self.totals.record(query_rate);
        self.ticks_done += 1;
        Ok(())
    }

    fn export(&self, exporter: &mut dyn TableExporter) -> Result<Option<PathBuf>, LoadGenError> {
        if !self.config.export {
            return Ok(None);
        }
        let destination = self.config.destination.clone().ok_or_else(|| {
            LoadGenError::InvalidConfig("export requested without a destination".to_string())
        })?;

        info!(rows = self.table.len(), destination = %destination.display(), "exporting table");
        exporter.export(&self.table, &destination)?;
        Ok(Some(destination))
    }

    fn summary(&self, total_ticks: u64, exported_to: Option<PathBuf>) -> RunSummary {
        RunSummary {
            state: self.state,
            rows: self.table.len(),
            ticks_done: self.ticks_done,
            total_ticks,
            total_queries: self.totals.total_queries(),
            exported_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::signals::{SignalGenerator, SignalKind, WeekdaySignal};

    #[derive(Default)]
    struct RecordingExporter {
        calls: Vec<(usize, PathBuf)>,
        fail: bool,
    }

    impl TableExporter for RecordingExporter {
        fn export(&mut self, table: &Table, destination: &Path) -> Result<(), LoadGenError> {
            self.calls.push((table.len(), destination.to_path_buf()));
            if self.fail {
                return Err(LoadGenError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only destination",
                )));
            }
            Ok(())
        }
    }

    /// Fails once the clock reaches `after` elapsed seconds.
    struct FailAfter {
        after: u64,
    }

    impl SignalGenerator for FailAfter {
        fn kind(&self) -> SignalKind {
            SignalKind::Hour
        }

        fn compute(&mut self, clock: &SimulatedClock) -> f64 {
            if clock.elapsed_seconds() >= self.after {
                f64::NAN
            } else {
                1.0
            }
        }
    }

    fn config(duration_days: f64) -> RunConfig {
        RunConfig {
            duration_days,
            export: true,
            destination: Some(PathBuf::from("memory://table")),
            chunk_ticks: 600,
            progress_every_ticks: 600,
            ..Default::default()
        }
    }

    fn no_progress() -> impl FnMut(Progress) {
        |_| {}
    }

    #[test]
    fn test_short_run_completes() {
        let mut generation = GenerationLoop::new(config(0.1)).unwrap();
        let mut exporter = RecordingExporter::default();
        let summary = generation.run(&mut exporter, &mut no_progress()).unwrap();

        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(summary.rows, 8_640);
        assert_eq!(summary.ticks_done, 8_640);
        assert_eq!(generation.clock().elapsed_seconds(), 8_640);
        assert_eq!(exporter.calls, vec![(8_640, PathBuf::from("memory://table"))]);
    }

    #[test]
    fn test_rows_are_consecutive_seconds() {
        let mut generation = GenerationLoop::new(config(0.01)).unwrap();
        generation
            .run(&mut RecordingExporter::default(), &mut no_progress())
            .unwrap();
        for (i, row) in generation.table().rows().iter().enumerate() {
            assert_eq!(row.elapsed_seconds, i as u64);
        }
    }

    #[test]
    fn test_disk_usage_tracks_previous_totals() {
        let mut generation = GenerationLoop::new(config(0.01)).unwrap();
        generation
            .run(&mut RecordingExporter::default(), &mut no_progress())
            .unwrap();

        let rows = generation.table().rows();
        assert_eq!(rows[0].disk_usage, 0.0);
        let mut total = 0.0;
        for row in rows {
            assert_eq!(row.disk_usage, total * 5.0);
            if row.requests_per_second > 0.0 {
                total += row.requests_per_second;
            }
        }
        assert_eq!(generation.totals().total_queries(), total);
    }

    #[test]
    fn test_progress_reported_per_interval() {
        let mut seen = Vec::new();
        let mut generation = GenerationLoop::new(config(0.05)).unwrap();
        generation
            .run(&mut RecordingExporter::default(), &mut |p: Progress| {
                seen.push(p.ticks_done)
            })
            .unwrap();

        // 4320 ticks, every 600 plus the final tick
        assert_eq!(seen, vec![600, 1200, 1800, 2400, 3000, 3600, 4200, 4320]);
    }

    #[test]
    fn test_export_disabled_skips_exporter() {
        let cfg = RunConfig {
            export: false,
            destination: None,
            ..config(0.01)
        };
        let mut generation = GenerationLoop::new(cfg).unwrap();
        let mut exporter = RecordingExporter::default();
        let summary = generation.run(&mut exporter, &mut no_progress()).unwrap();
        assert!(exporter.calls.is_empty());
        assert_eq!(summary.exported_to, None);
    }

    #[test]
    fn test_export_without_destination_rejected() {
        let cfg = RunConfig {
            destination: None,
            ..config(1.0)
        };
        assert!(matches!(
            GenerationLoop::new(cfg),
            Err(LoadGenError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_generator_failure_exports_partial_table() {
        let aggregator = ScoreAggregator::new()
            .with_signal(1.0, Box::new(WeekdaySignal))
            .with_signal(1.0, Box::new(FailAfter { after: 1_000 }));
        let mut generation = GenerationLoop::new(config(1.0))
            .unwrap()
            .with_aggregator(aggregator);
        let mut exporter = RecordingExporter::default();

        let err = generation.run(&mut exporter, &mut no_progress()).unwrap_err();
        assert!(matches!(
            err,
            LoadGenError::NonFiniteScore {
                generator: "hour",
                elapsed_seconds: 1_000
            }
        ));
        assert_eq!(generation.state(), RunState::Aborted);
        assert_eq!(generation.table().len(), 1_000);
        assert_eq!(exporter.calls.len(), 1);
        assert_eq!(exporter.calls[0].0, 1_000);
    }

    #[test]
    fn test_abort_exports_accumulated_rows() {
        let mut generation = GenerationLoop::new(config(1.0)).unwrap();
        let handle = generation.abort_handle();
        let mut exporter = RecordingExporter::default();

        let err = generation
            .run(&mut exporter, &mut |p: Progress| {
                if p.ticks_done == 1_200 {
                    handle.abort();
                }
            })
            .unwrap_err();

        assert!(matches!(
            err,
            LoadGenError::Aborted {
                ticks_done: 1_200,
                total_ticks: 86_400
            }
        ));
        assert_eq!(generation.state(), RunState::Aborted);
        assert_eq!(exporter.calls, vec![(1_200, PathBuf::from("memory://table"))]);
    }

    #[test]
    fn test_export_failure_surfaces_and_aborts() {
        let mut generation = GenerationLoop::new(config(0.01)).unwrap();
        let mut exporter = RecordingExporter {
            fail: true,
            ..Default::default()
        };
        let err = generation.run(&mut exporter, &mut no_progress()).unwrap_err();
        assert!(matches!(err, LoadGenError::Io(_)));
        assert_eq!(generation.state(), RunState::Aborted);
        // rows stay available to the caller
        assert_eq!(generation.table().len(), 864);
    }

    #[test]
    fn test_run_twice_is_rejected() {
        let mut generation = GenerationLoop::new(config(0.0)).unwrap();
        let mut exporter = RecordingExporter::default();
        generation.run(&mut exporter, &mut no_progress()).unwrap();
        assert!(matches!(
            generation.run(&mut exporter, &mut no_progress()),
            Err(LoadGenError::InvalidState(_))
        ));
    }

    #[test]
    fn test_huge_chunk_does_not_preallocate() {
        let cfg = RunConfig {
            duration_days: 1.0e9,
            chunk_ticks: u64::MAX / 2,
            ..config(1.0)
        };
        let generation = GenerationLoop::new(cfg).unwrap();
        assert!(generation.buffer.capacity() >= SECONDS_PER_DAY as usize);
        assert!(generation.buffer.capacity() < 2 * SECONDS_PER_DAY as usize);
    }

    #[test]
    fn test_progress_fraction() {
        let p = Progress {
            ticks_done: 50,
            total_ticks: 200,
        };
        assert_eq!(p.fraction(), 0.25);
        let empty = Progress {
            ticks_done: 0,
            total_ticks: 0,
        };
        assert_eq!(empty.fraction(), 1.0);
    }
}

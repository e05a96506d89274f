//! Usage-score signal generators
//!
//! Each generator turns the simulated clock into one scalar component of the
//! load score. All of them are pure functions of the clock except the bounded
//! random walk, which carries its own state and RNG stream across ticks.

use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::clock::{Season, SimulatedClock};
use crate::LoadGenError;

/// Identifies one generator in the weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    DayOfMonth,
    Weekday,
    Hour,
    Season,
    RandomWalk,
    ServiceGrowth,
}

impl SignalKind {
    /// Canonical evaluation order of the aggregator.
    pub const ALL: [SignalKind; 6] = [
        SignalKind::DayOfMonth,
        SignalKind::Weekday,
        SignalKind::Hour,
        SignalKind::Season,
        SignalKind::RandomWalk,
        SignalKind::ServiceGrowth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::DayOfMonth => "day_of_month",
            SignalKind::Weekday => "weekday",
            SignalKind::Hour => "hour",
            SignalKind::Season => "season",
            SignalKind::RandomWalk => "random_walk",
            SignalKind::ServiceGrowth => "service_growth",
        }
    }
}

/// A single component of the load score.
pub trait SignalGenerator {
    fn kind(&self) -> SignalKind;
    fn compute(&mut self, clock: &SimulatedClock) -> f64;
}

/// Three linear segments meeting at D=7 (0.3) and D=20 (0.5).
pub fn day_of_month_score(day: u32) -> f64 {
    let d = day as f64;
    match day {
        1..=6 => 0.7 - (0.4 / 7.0) * d,
        7..=19 => 0.3 + (0.2 / 13.0) * (d - 7.0),
        20..=31 => 0.5 + (0.3 / 10.0) * (d - 20.0),
        _ => 0.0,
    }
}

/// `weekday` is 0 = Monday .. 6 = Sunday.
pub fn weekday_score(weekday: u32) -> f64 {
    match weekday {
        0..=2 => 0.7,
        3 | 4 => 0.5,
        5 | 6 => 0.3,
        _ => 0.0,
    }
}

/// Diurnal curve over `x = hour + minute / 60`, peaking at noon and bottoming
/// out at midnight.
pub fn hour_score(hour: u32, minute: u32) -> f64 {
    if minute >= 60 {
        return 0.0;
    }
    hour_curve(hour as f64 + minute as f64 / 60.0)
}

/// Continuous form of [`hour_score`]; zero outside `[0, 24)`.
pub fn hour_curve(x: f64) -> f64 {
    if (0.0..8.0).contains(&x) {
        0.8 + 0.6 * (PI / 16.0 * (x + 24.0)).sin()
    } else if (8.0..16.0).contains(&x) {
        0.8 + 0.2 * (PI / 8.0 * (x - 8.0)).sin()
    } else if (16.0..24.0).contains(&x) {
        0.8 + 0.6 * (PI / 16.0 * x).sin()
    } else {
        0.0
    }
}

pub fn season_score(season: Season) -> f64 {
    match season {
        Season::Spring => 0.5,
        Season::Summer => 0.3,
        Season::Fall => 0.3,
        Season::Winter => 0.4,
    }
}

/// Linear yearly ramp over the 1-based day of year.
pub fn service_growth_score(day_of_year: u32) -> f64 {
    match day_of_year {
        1..=366 => day_of_year as f64 / 365.0,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DayOfMonthSignal;

impl SignalGenerator for DayOfMonthSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::DayOfMonth
    }

    fn compute(&mut self, clock: &SimulatedClock) -> f64 {
        day_of_month_score(clock.day_of_month())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WeekdaySignal;

impl SignalGenerator for WeekdaySignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Weekday
    }

    fn compute(&mut self, clock: &SimulatedClock) -> f64 {
        weekday_score(clock.weekday())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HourSignal;

impl SignalGenerator for HourSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Hour
    }

    fn compute(&mut self, clock: &SimulatedClock) -> f64 {
        hour_score(clock.hour(), clock.minute())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonSignal;

impl SignalGenerator for SeasonSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Season
    }

    fn compute(&mut self, clock: &SimulatedClock) -> f64 {
        season_score(clock.season())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceGrowthSignal;

impl SignalGenerator for ServiceGrowthSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::ServiceGrowth
    }

    fn compute(&mut self, clock: &SimulatedClock) -> f64 {
        service_growth_score(clock.day_of_year())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Tuning of the bounded random walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomWalkParams {
    pub initial_value: f64,
    pub initial_high_threshold: f64,
    pub initial_low_threshold: f64,
    /// Largest move in the current direction per tick
    pub max_step: f64,
    /// Largest move against the current direction per tick
    pub min_step: f64,
    /// Lower edge of the range a new low threshold is drawn from
    pub low_floor: f64,
    /// Upper edge of the range a new high threshold is drawn from
    pub high_ceiling: f64,
    /// Minimum distance kept between a fresh threshold and the opposite one
    pub threshold_gap: f64,
}

impl Default for RandomWalkParams {
    fn default() -> Self {
        Self {
            initial_value: 0.4,
            initial_high_threshold: 0.6,
            initial_low_threshold: -0.2,
            max_step: 0.03,
            min_step: 0.01,
            low_floor: -0.2,
            high_ceiling: 0.8,
            threshold_gap: 0.1,
        }
    }
}

impl RandomWalkParams {
    pub fn validate(&self) -> Result<(), LoadGenError> {
        let all = [
            self.initial_value,
            self.initial_high_threshold,
            self.initial_low_threshold,
            self.max_step,
            self.min_step,
            self.low_floor,
            self.high_ceiling,
            self.threshold_gap,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(LoadGenError::InvalidConfig(
                "random walk parameters must be finite".to_string(),
            ));
        }
        if self.min_step < 0.0 || self.max_step < self.min_step {
            return Err(LoadGenError::InvalidConfig(
                "random walk steps must satisfy 0 <= min_step <= max_step".to_string(),
            ));
        }
        if self.initial_low_threshold >= self.initial_high_threshold {
            return Err(LoadGenError::InvalidConfig(
                "initial low threshold must be below initial high threshold".to_string(),
            ));
        }
        if self.threshold_gap < 0.0 || self.low_floor + self.threshold_gap > self.high_ceiling {
            return Err(LoadGenError::InvalidConfig(
                "threshold_gap does not fit between low_floor and high_ceiling".to_string(),
            ));
        }
        Ok(())
    }
}

/// Mutable state of the walk; only the walk itself touches it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RandomWalkState {
    pub last: f64,
    pub direction: Direction,
    pub high_threshold: f64,
    pub low_threshold: f64,
}

/// Drifts up until it crosses a randomized high threshold, then down until it
/// crosses a randomized low threshold, forever.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    params: RandomWalkParams,
    state: RandomWalkState,
    rng: ChaCha8Rng,
}

impl RandomWalk {
    pub fn new(params: RandomWalkParams, seed: u64) -> Self {
        let state = RandomWalkState {
            last: params.initial_value,
            direction: Direction::Up,
            high_threshold: params.initial_high_threshold,
            low_threshold: params.initial_low_threshold,
        };
        Self {
            params,
            state,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &RandomWalkState {
        &self.state
    }

    /// Sample the next value, flipping direction when the active threshold is crossed.
    pub fn step(&mut self) -> f64 {
        let p = &self.params;
        let s = &mut self.state;

        match s.direction {
            Direction::Up => {
                let value = sample_between(&mut self.rng, s.last - p.min_step, s.last + p.max_step);
                if value > s.high_threshold {
                    s.direction = Direction::Down;
                    s.low_threshold = sample_between(
                        &mut self.rng,
                        p.low_floor,
                        s.high_threshold - p.threshold_gap,
                    );
                }
                s.last = value;
            }
            Direction::Down => {
                let value = sample_between(&mut self.rng, s.last - p.max_step, s.last + p.min_step);
                if value < s.low_threshold {
                    s.direction = Direction::Up;
                    s.high_threshold = sample_between(
                        &mut self.rng,
                        s.low_threshold + p.threshold_gap,
                        p.high_ceiling,
                    );
                }
                s.last = value;
            }
        }

        s.last
    }
}

impl SignalGenerator for RandomWalk {
    fn kind(&self) -> SignalKind {
        SignalKind::RandomWalk
    }

    fn compute(&mut self, _clock: &SimulatedClock) -> f64 {
        self.step()
    }
}

/// Uniform draw from the closed interval spanned by `a` and `b`, in either order.
fn sample_between<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64) -> f64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if lo == hi {
        return lo;
    }
    rng.gen_range(lo..=hi)
}

/// Build the generator for `kind`. `seed` only matters for the random walk.
pub fn build_signal(
    kind: SignalKind,
    walk: &RandomWalkParams,
    seed: u64,
) -> Box<dyn SignalGenerator> {
    match kind {
        SignalKind::DayOfMonth => Box::new(DayOfMonthSignal),
        SignalKind::Weekday => Box::new(WeekdaySignal),
        SignalKind::Hour => Box::new(HourSignal),
        SignalKind::Season => Box::new(SeasonSignal),
        SignalKind::RandomWalk => Box::new(RandomWalk::new(walk.clone(), seed)),
        SignalKind::ServiceGrowth => Box::new(ServiceGrowthSignal),
    }
}

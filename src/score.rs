//! Weighted composition of the signal generators into one load score per tick.
//!
//! The composition law is a plain weighted sum over every configured generator.
//! No normalisation or clamping is applied to the result.

use serde::{Deserialize, Serialize};

use crate::clock::SimulatedClock;
use crate::signals::{build_signal, RandomWalkParams, SignalGenerator, SignalKind};
use crate::LoadGenError;

/// Per-generator weights of the load score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub day_of_month: f64,
    pub weekday: f64,
    pub hour: f64,
    pub season: f64,
    pub random_walk: f64,
    pub service_growth: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            day_of_month: 1.0,
            weekday: 1.0,
            hour: 3.0,
            season: 0.7,
            random_walk: 1.0,
            service_growth: 2.5,
        }
    }
}

impl SignalWeights {
    pub fn weight(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::DayOfMonth => self.day_of_month,
            SignalKind::Weekday => self.weekday,
            SignalKind::Hour => self.hour,
            SignalKind::Season => self.season,
            SignalKind::RandomWalk => self.random_walk,
            SignalKind::ServiceGrowth => self.service_growth,
        }
    }

    pub fn validate(&self) -> Result<(), LoadGenError> {
        for kind in SignalKind::ALL {
            if !self.weight(kind).is_finite() {
                return Err(LoadGenError::InvalidConfig(format!(
                    "weight for {} must be finite",
                    kind.name()
                )));
            }
        }
        Ok(())
    }
}

struct WeightedSignal {
    weight: f64,
    generator: Box<dyn SignalGenerator>,
}

/// Ordered list of generators, each paired with its weight.
pub struct ScoreAggregator {
    signals: Vec<WeightedSignal>,
}

impl ScoreAggregator {
    pub fn new() -> Self {
        Self {
            signals: Vec::new(),
        }
    }

    /// All six generators in canonical order with the given weights.
    pub fn from_weights(weights: &SignalWeights, walk: &RandomWalkParams, seed: u64) -> Self {
        SignalKind::ALL
            .into_iter()
            .fold(Self::new(), |agg, kind| {
                agg.with_signal(weights.weight(kind), build_signal(kind, walk, seed))
            })
    }

    pub fn with_signal(mut self, weight: f64, generator: Box<dyn SignalGenerator>) -> Self {
        self.push(weight, generator);
        self
    }

    pub fn push(&mut self, weight: f64, generator: Box<dyn SignalGenerator>) {
        self.signals.push(WeightedSignal { weight, generator });
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn kinds(&self) -> Vec<SignalKind> {
        self.signals.iter().map(|s| s.generator.kind()).collect()
    }

    /// Evaluate every generator once and return the weighted sum.
    ///
    /// Stateful generators advance exactly one step per call. A non-finite
    /// component is reported as an error instead of being replaced.
    pub fn compute_score(&mut self, clock: &SimulatedClock) -> Result<f64, LoadGenError> {
        let mut score = 0.0;
        for signal in &mut self.signals {
            let value = signal.generator.compute(clock);
            if !value.is_finite() {
                return Err(LoadGenError::NonFiniteScore {
                    generator: signal.generator.kind().name(),
                    elapsed_seconds: clock.elapsed_seconds(),
                });
            }
            score += signal.weight * value;
        }
        if !score.is_finite() {
            return Err(LoadGenError::NonFiniteScore {
                generator: "weighted_sum",
                elapsed_seconds: clock.elapsed_seconds(),
            });
        }
        Ok(score)
    }
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::from_weights(&SignalWeights::default(), &RandomWalkParams::default(), 0)
    }
}

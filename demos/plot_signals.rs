//! Signal Inspection Example
//!
//! Renders each calendar-driven usage score over its input range, plus a
//! stretch of the bounded random walk, as PNG charts under `out/`.

use std::path::Path;

use loadgen::plot::{plot_function, Domain};
use loadgen::signals::{
    day_of_month_score, hour_curve, service_growth_score, weekday_score, RandomWalk,
    RandomWalkParams,
};
use loadgen::LoadGenError;

fn main() -> Result<(), LoadGenError> {
    println!("Rendering usage score curves...\n");
    let out = Path::new("out");

    plot_function(hour_curve, &Domain::new(0.0, 24.0, 0.05)?, &out.join("hour.png"), "Hour score")?;
    plot_function(
        |d| day_of_month_score(d.floor() as u32),
        &Domain::new(1.0, 32.0, 0.05)?,
        &out.join("day_of_month.png"),
        "Day-of-month score",
    )?;
    plot_function(
        |w| weekday_score(w.floor() as u32),
        &Domain::new(0.0, 7.0, 0.05)?,
        &out.join("weekday.png"),
        "Weekday score (0 = Monday)",
    )?;
    plot_function(
        |d| service_growth_score(d.floor() as u32),
        &Domain::new(1.0, 366.0, 1.0)?,
        &out.join("service_growth.png"),
        "Service growth score",
    )?;

    // The walk is stateful, so sample it up front and plot by index.
    let mut walk = RandomWalk::new(RandomWalkParams::default(), 42);
    let samples: Vec<f64> = (0..3_600).map(|_| walk.step()).collect();
    plot_function(
        |i| samples.get(i as usize).copied().unwrap_or(0.0),
        &Domain::new(0.0, samples.len() as f64, 1.0)?,
        &out.join("random_walk.png"),
        "Random walk (one simulated hour)",
    )?;

    println!("Plots written to {}", out.display());
    Ok(())
}

//! Ad-hoc inspection plots of single generators.

use std::fs;
use std::path::Path;

use plotters::prelude::*;

use crate::LoadGenError;

/// Half-open sampling range `[from, to)` walked in `step` increments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub from: f64,
    pub to: f64,
    pub step: f64,
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            from: -20.0,
            to: 20.0,
            step: 0.05,
        }
    }
}

impl Domain {
    pub fn new(from: f64, to: f64, step: f64) -> Result<Self, LoadGenError> {
        if !(from.is_finite() && to.is_finite() && step.is_finite()) {
            return Err(LoadGenError::Plot("domain bounds must be finite".to_string()));
        }
        if step <= 0.0 || to <= from {
            return Err(LoadGenError::Plot(format!(
                "empty domain: from={from} to={to} step={step}"
            )));
        }
        Ok(Self { from, to, step })
    }

    pub fn points(&self) -> impl Iterator<Item = f64> + '_ {
        let n = ((self.to - self.from) / self.step).ceil().max(0.0) as usize;
        (0..n)
            .map(move |i| self.from + i as f64 * self.step)
            .filter(move |x| *x < self.to)
    }
}

pub fn sample_function<F>(f: F, domain: &Domain) -> Vec<(f64, f64)>
where
    F: Fn(f64) -> f64,
{
    domain.points().map(|x| (x, f(x))).collect()
}

/// Render `f` over `domain` as a PNG line chart.
pub fn plot_function<F>(
    f: F,
    domain: &Domain,
    path: &Path,
    caption: &str,
) -> Result<(), LoadGenError>
where
    F: Fn(f64) -> f64,
{
    let points = sample_function(f, domain);
    draw_line(&points, domain, path, caption).map_err(|e| LoadGenError::Plot(e.to_string()))
}

fn draw_line(
    points: &[(f64, f64)],
    domain: &Domain,
    path: &Path,
    caption: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let (y_min, y_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| {
            (lo.min(y), hi.max(y))
        });
    let (y_min, y_max) = if y_min.is_finite() && y_max > y_min {
        let pad = 0.05 * (y_max - y_min);
        (y_min - pad, y_max + pad)
    } else {
        let y = if y_min.is_finite() { y_min } else { 0.0 };
        (y - 1.0, y + 1.0)
    };

    let root = BitMapBackend::new(path, (1280, 720)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 34).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(domain.from..domain.to, y_min..y_max)?;

    chart.configure_mesh().x_desc("x").y_desc("score").draw()?;
    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::hour_curve;

    #[test]
    fn test_default_domain_sampling() {
        let points = sample_function(|x| 2.0 * x, &Domain::default());
        assert_eq!(points.len(), 800);
        assert_eq!(points[0], (-20.0, -40.0));
        assert!(points.iter().all(|(x, _)| *x < 20.0));
    }

    #[test]
    fn test_hour_curve_over_a_day() {
        let domain = Domain::new(0.0, 24.0, 1.0).unwrap();
        let points = sample_function(hour_curve, &domain);
        assert_eq!(points.len(), 24);
        let peak = points
            .iter()
            .cloned()
            .fold((0.0, f64::NEG_INFINITY), |best, p| if p.1 > best.1 { p } else { best });
        assert_eq!(peak.0, 12.0);
    }

    #[test]
    fn test_invalid_domain_rejected() {
        assert!(Domain::new(1.0, 0.0, 0.1).is_err());
        assert!(Domain::new(0.0, 1.0, 0.0).is_err());
        assert!(Domain::new(0.0, f64::INFINITY, 0.1).is_err());
    }
}

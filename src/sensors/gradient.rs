use chrono::{DateTime, Duration, FixedOffset};
use std::collections::VecDeque;

use crate::domain::TrendReading;

/// Least-squares temperature trend over a bounded window of samples.
#[derive(Debug, Clone)]
pub struct Gradient {
    max_age: Duration,
    max_samples: usize,
    samples: VecDeque<(DateTime<FixedOffset>, f64)>,
}

impl Gradient {
    pub fn new(max_age: Duration, max_samples: usize) -> Self {
        Self {
            max_age,
            max_samples: max_samples.max(2),
            samples: VecDeque::new(),
        }
    }

    pub fn add_reading(&mut self, value: f64, t: DateTime<FixedOffset>) {
        if !value.is_finite() {
            return;
        }
        self.samples.push_back((t, value));
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
        self.prune(t);
    }

    fn prune(&mut self, now: DateTime<FixedOffset>) {
        while let Some((ts, _)) = self.samples.front() {
            if now - *ts > self.max_age {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn samples(&self) -> usize {
        self.samples.len()
    }

    /// Slope in °C per hour, 0 with fewer than two samples.
    pub fn gradient(&self) -> f64 {
        let Some((origin, _)) = self.samples.front() else {
            return 0.0;
        };
        if self.samples.len() < 2 {
            return 0.0;
        }

        let points: Vec<(f64, f64)> = self
            .samples
            .iter()
            .map(|(t, v)| ((*t - *origin).num_seconds() as f64 / 3600.0, *v))
            .collect();
        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
        let (num, den) = points.iter().fold((0.0, 0.0), |(num, den), (x, y)| {
            (num + (x - mean_x) * (y - mean_y), den + (x - mean_x).powi(2))
        });

        if den.abs() < f64::EPSILON {
            0.0
        } else {
            num / den
        }
    }

    /// Trend as of the newest sample. Clean once at least half the window
    /// (and never fewer than two samples) is filled.
    pub fn reading(&self) -> TrendReading {
        let samples = self.samples.len();
        TrendReading {
            gradient: self.gradient(),
            samples,
            is_clean: samples >= (self.max_samples / 2).max(2),
        }
    }

    /// Same as [`reading`](Self::reading) after dropping samples that are
    /// too old at `now`.
    pub fn reading_at(&mut self, now: DateTime<FixedOffset>) -> TrendReading {
        self.prune(now);
        self.reading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 10, 10, 0, 0)
            .unwrap()
            + Duration::minutes(i64::from(minute))
    }

    #[test]
    fn test_rising_trend_per_hour() {
        let mut g = Gradient::new(Duration::hours(1), 10);
        g.add_reading(40.0, at(0));
        g.add_reading(41.0, at(15));
        g.add_reading(42.0, at(30));

        assert!((g.gradient() - 4.0).abs() < 1e-9);
        assert!(g.reading().is_clean == false);
    }

    #[test]
    fn test_old_samples_are_dropped() {
        let mut g = Gradient::new(Duration::minutes(30), 10);
        g.add_reading(50.0, at(0));
        g.add_reading(49.0, at(20));
        g.add_reading(48.0, at(40));

        assert_eq!(g.samples(), 2);
        assert_eq!(g.reading_at(at(120)).samples, 0);
        assert_eq!(g.gradient(), 0.0);
    }

    #[test]
    fn test_clean_when_half_full() {
        let mut g = Gradient::new(Duration::hours(2), 6);
        for (i, v) in [21.0, 21.1, 21.2].iter().enumerate() {
            g.add_reading(*v, at(i as u32 * 10));
        }
        let reading = g.reading();
        assert!(reading.is_clean);
        assert!(reading.gradient > 0.0);
    }
}

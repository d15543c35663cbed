//! Synthetic demo series.
//!
//! Daily readings with a seasonal temperature curve, humidity loosely anti-correlated
//! with temperature, and a consumption target driven by season, weekends, comfort
//! distance from 22°C, humidity above 60% and solar gain, times multiplicative noise.

use crate::domain::ml::RawRecord;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use std::f64::consts::PI;

const BASE_CONSUMPTION: f64 = 1000.0;
const MIN_CONSUMPTION: f64 = 100.0;
const OPTIMAL_TEMPERATURE: f64 = 22.0;

/// One raw reading with its energy consumption target
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledReading {
    pub record: RawRecord,
    pub energy_consumption: f64,
}

/// Generates `n_samples` consecutive days starting at `start`, reproducible per `seed`.
pub fn generate_series(n_samples: usize, start: NaiveDate, seed: u64) -> Vec<LabeledReading> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start: NaiveDateTime = start.and_time(chrono::NaiveTime::MIN);

    (0..n_samples)
        .map(|i| {
            let mut standard = || -> f64 { StandardNormal.sample(&mut rng) };
            let timestamp = start + Duration::days(i as i64);
            let season_angle = 2.0 * PI * timestamp.ordinal() as f64 / 365.25;

            let temperature = 20.0 + 15.0 * season_angle.sin() + 5.0 * standard();
            let humidity = (70.0 - 0.5 * (temperature - 20.0) + 10.0 * standard())
                .clamp(20.0, 90.0);
            let solar = (500.0 + 300.0 * season_angle.sin() + 100.0 * standard())
                .max(0.0);

            let seasonal = 1.0 + 0.3 * season_angle.sin().abs();
            let weekend = if timestamp.weekday().num_days_from_monday() >= 5 {
                0.8
            } else {
                1.0
            };
            let comfort = 1.0 + 0.02 * (temperature - OPTIMAL_TEMPERATURE).abs();
            let damp = 1.0 + 0.01 * (humidity - 60.0).max(0.0);
            let solar_gain = 1.0 - 0.0005 * solar;
            let noise = 1.0 + 0.1 * standard();

            let energy_consumption = (BASE_CONSUMPTION
                * seasonal
                * weekend
                * comfort
                * damp
                * solar_gain
                * noise)
                .max(MIN_CONSUMPTION);

            LabeledReading {
                record: RawRecord::new(timestamp, temperature, humidity),
                energy_consumption,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    #[test]
    fn test_series_is_reproducible() {
        assert_eq!(generate_series(50, start(), 42), generate_series(50, start(), 42));
        assert_ne!(generate_series(50, start(), 42), generate_series(50, start(), 43));
    }

    #[test]
    fn test_series_values_in_range() {
        let series = generate_series(400, start(), 42);
        assert_eq!(series.len(), 400);
        for reading in &series {
            let humidity = reading.record.humidity.unwrap();
            assert!((20.0..=90.0).contains(&humidity));
            assert!(reading.energy_consumption >= MIN_CONSUMPTION);
        }
        let last = series.last().unwrap().record.timestamp.unwrap();
        assert_eq!(last.date(), start() + Duration::days(399));
    }
}

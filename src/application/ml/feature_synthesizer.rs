//! Feature synthesis from raw weather readings.
//!
//! Each derived field is a pure function of one raw record; nothing is carried
//! across records.
//!
//! - Calendar: hour, day_of_week (Monday = 0), month, is_weekend, is_peak_hour (17-21h)
//! - Cyclical: sin/cos of hour (period 24) and month (period 12), so that 23h and 0h
//!   end up next to each other
//! - Weather interactions: temp_humidity, cooling_degree, heating_degree, comfort_index

use crate::domain::errors::ForecastError;
use crate::domain::ml::{FEATURE_NAMES, FeatureRecord, RawRecord};
use chrono::{Datelike, Timelike};
use std::f64::consts::PI;

/// Base temperature (°C) for heating/cooling degree computation
pub const DEGREE_BASE_TEMPERATURE: f64 = 18.0;

const PEAK_HOUR_START: u32 = 17;
const PEAK_HOUR_END: u32 = 21;

/// Builds the feature record for a single raw reading.
pub fn synthesize_record(raw: &RawRecord) -> Result<FeatureRecord, ForecastError> {
    let timestamp = raw
        .timestamp
        .ok_or_else(|| ForecastError::invalid_record("timestamp", "is missing"))?;
    let temperature = require_finite("temperature", raw.temperature)?;
    let humidity = require_finite("humidity", raw.humidity)?;

    let hour = timestamp.hour();
    let day_of_week = timestamp.weekday().num_days_from_monday();
    let month = timestamp.month();

    let hour_angle = 2.0 * PI * hour as f64 / 24.0;
    let month_angle = 2.0 * PI * month as f64 / 12.0;

    let mut record = FeatureRecord::with_capacity(FEATURE_NAMES.len());
    record.insert("temperature", temperature);
    record.insert("humidity", humidity);
    record.insert("hour", hour as f64);
    record.insert("day_of_week", day_of_week as f64);
    record.insert("month", month as f64);
    record.insert("is_weekend", flag(day_of_week >= 5));
    record.insert(
        "is_peak_hour",
        flag((PEAK_HOUR_START..=PEAK_HOUR_END).contains(&hour)),
    );
    record.insert("hour_sin", hour_angle.sin());
    record.insert("hour_cos", hour_angle.cos());
    record.insert("month_sin", month_angle.sin());
    record.insert("month_cos", month_angle.cos());
    record.insert("temp_humidity", temperature * humidity / 100.0);
    record.insert(
        "cooling_degree",
        (temperature - DEGREE_BASE_TEMPERATURE).max(0.0),
    );
    record.insert(
        "heating_degree",
        (DEGREE_BASE_TEMPERATURE - temperature).max(0.0),
    );
    record.insert("comfort_index", temperature - (humidity - 50.0) * 0.1);

    Ok(record)
}

/// Builds one feature record per raw reading, preserving order.
///
/// Fails on the first invalid reading; the error names its position.
pub fn synthesize(raws: &[RawRecord]) -> Result<Vec<FeatureRecord>, ForecastError> {
    raws.iter()
        .enumerate()
        .map(|(i, raw)| {
            synthesize_record(raw).map_err(|e| match e {
                ForecastError::InvalidRecord { field, reason } => ForecastError::InvalidRecord {
                    field,
                    reason: format!("{} (record #{})", reason, i),
                },
                other => other,
            })
        })
        .collect()
}

fn require_finite(field: &str, value: Option<f64>) -> Result<f64, ForecastError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(ForecastError::invalid_record(
            field,
            format!("is not finite ({})", v),
        )),
        None => Err(ForecastError::invalid_record(field, "is missing")),
    }
}

fn flag(condition: bool) -> f64 {
    if condition { 1.0 } else { 0.0 }
}

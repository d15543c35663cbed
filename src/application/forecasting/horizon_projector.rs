//! Multi-horizon projection
//!
//! Approximates forecasts further out by jittering the weather inputs before
//! running the ensemble. This is a stand-in for forecast uncertainty, not a
//! physical weather model: horizons beyond the first get temperature and humidity
//! scaled by `1 + N(0, std)`, everything else in the record is left untouched.
//! The random source is supplied by the caller so tests can seed or disable it.

use super::ensemble::EnsembleCombiner;
use crate::domain::errors::ForecastError;
use crate::domain::forecasting::horizon::{default_horizons, validate_horizons};
use crate::domain::forecasting::{Horizon, HorizonForecast};
use crate::domain::ml::FeatureRecord;
use crate::domain::ports::EstimatorPair;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Multiplicative Gaussian jitter applied to horizons beyond the first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonJitter {
    pub enabled: bool,
    pub temperature_std: f64,
    pub humidity_std: f64,
}

impl Default for HorizonJitter {
    fn default() -> Self {
        Self {
            enabled: true,
            temperature_std: 0.10,
            humidity_std: 0.05,
        }
    }
}

impl HorizonJitter {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn distributions(&self) -> Result<[(&'static str, Normal<f64>); 2], ForecastError> {
        let normal = |field: &'static str, std: f64| {
            if !std.is_finite() || std < 0.0 {
                return Err(ForecastError::Config {
                    reason: format!(
                        "{} jitter std must be finite and non-negative, got {}",
                        field, std
                    ),
                });
            }
            Normal::new(0.0, std)
                .map(|dist| (field, dist))
                .map_err(|e| ForecastError::Config {
                    reason: format!("invalid {} jitter std {}: {}", field, std, e),
                })
        };
        Ok([
            normal("temperature", self.temperature_std)?,
            normal("humidity", self.humidity_std)?,
        ])
    }
}

#[derive(Debug, Clone)]
pub struct HorizonProjector {
    horizons: Vec<Horizon>,
    combiner: EnsembleCombiner,
    jitter: HorizonJitter,
}

impl HorizonProjector {
    pub fn new(horizons: Vec<Horizon>, jitter: HorizonJitter) -> Result<Self, ForecastError> {
        validate_horizons(&horizons)?;
        jitter.distributions()?;
        Ok(Self {
            horizons,
            combiner: EnsembleCombiner::new(),
            jitter,
        })
    }

    pub fn jitter(&self) -> &HorizonJitter {
        &self.jitter
    }

    pub fn horizons(&self) -> &[Horizon] {
        &self.horizons
    }

    /// Projects over the configured horizons.
    pub fn project<R: Rng + ?Sized>(
        &self,
        pair: &dyn EstimatorPair,
        record: &FeatureRecord,
        rng: &mut R,
    ) -> Result<HorizonForecast, ForecastError> {
        self.project_horizons(pair, record, &self.horizons, rng)
    }

    /// Projects over an explicit horizon list, in the given order.
    ///
    /// Fails as a whole if any horizon fails; no partial map is returned.
    pub fn project_horizons<R: Rng + ?Sized>(
        &self,
        pair: &dyn EstimatorPair,
        record: &FeatureRecord,
        horizons: &[Horizon],
        rng: &mut R,
    ) -> Result<HorizonForecast, ForecastError> {
        validate_horizons(horizons)?;
        let mut entries = Vec::with_capacity(horizons.len());
        for horizon in horizons {
            let forecast = if horizon.is_base() || !self.jitter.enabled {
                self.combiner.forecast(pair, record)?
            } else {
                let perturbed = self.perturb(record, rng)?;
                self.combiner.forecast(pair, &perturbed)?
            };
            debug!(
                "Horizon {}: tree={:.4} neural={:.4} ensemble={:.4} confidence={:.3}",
                horizon,
                forecast.tree_prediction,
                forecast.neural_prediction,
                forecast.ensemble_value,
                forecast.confidence
            );
            entries.push((horizon.label(), forecast));
        }
        Ok(HorizonForecast::from_entries(entries))
    }

    fn perturb<R: Rng + ?Sized>(
        &self,
        record: &FeatureRecord,
        rng: &mut R,
    ) -> Result<FeatureRecord, ForecastError> {
        let mut perturbed = record.clone();
        for (field, dist) in self.jitter.distributions()? {
            let value = perturbed.get_mut(field).ok_or_else(|| {
                ForecastError::prediction(format!(
                    "feature '{}' is required for horizon projection",
                    field
                ))
            })?;
            *value *= 1.0 + dist.sample(rng);
        }
        Ok(perturbed)
    }
}

impl Default for HorizonProjector {
    fn default() -> Self {
        Self {
            horizons: default_horizons(),
            combiner: EnsembleCombiner::new(),
            jitter: HorizonJitter::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Tree reads temperature, neural reads humidity.
    struct WeatherEcho;

    impl EstimatorPair for WeatherEcho {
        fn predict_tree(&self, record: &FeatureRecord) -> Result<f64, ForecastError> {
            record
                .get("temperature")
                .ok_or_else(|| ForecastError::prediction("temperature missing"))
        }

        fn predict_neural(&self, record: &FeatureRecord) -> Result<f64, ForecastError> {
            record
                .get("humidity")
                .ok_or_else(|| ForecastError::prediction("humidity missing"))
        }
    }

    fn record() -> FeatureRecord {
        [("temperature", 25.0), ("humidity", 60.0), ("hour", 18.0)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_output_follows_request_order() {
        let projector = HorizonProjector::default();
        let mut rng = StdRng::seed_from_u64(7);
        let horizons = vec![Horizon::days(30).unwrap(), Horizon::days(1).unwrap()];
        let out = projector
            .project_horizons(&WeatherEcho, &record(), &horizons, &mut rng)
            .unwrap();
        let labels: Vec<&str> = out.labels().collect();
        assert_eq!(labels, vec!["30_day", "1_day"]);
    }

    #[test]
    fn test_base_horizon_is_unperturbed() {
        let projector = HorizonProjector::default();
        let out = projector
            .project(&WeatherEcho, &record(), &mut StdRng::seed_from_u64(1))
            .unwrap();
        let base = out.get("1_day").unwrap();
        assert_eq!(base.tree_prediction, 25.0);
        assert_eq!(base.neural_prediction, 60.0);

        let again = projector
            .project(&WeatherEcho, &record(), &mut StdRng::seed_from_u64(99))
            .unwrap();
        assert_eq!(again.get("1_day"), out.get("1_day"));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let projector = HorizonProjector::default();
        let a = projector
            .project(&WeatherEcho, &record(), &mut StdRng::seed_from_u64(42))
            .unwrap();
        let b = projector
            .project(&WeatherEcho, &record(), &mut StdRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a.get("7_day").unwrap().tree_prediction, 25.0);
    }

    #[test]
    fn test_disabled_jitter_is_deterministic() {
        let projector = HorizonProjector::new(default_horizons(), HorizonJitter::disabled()).unwrap();
        let out = projector
            .project(&WeatherEcho, &record(), &mut StdRng::seed_from_u64(3))
            .unwrap();
        for (_, f) in out.iter() {
            assert_eq!(f.tree_prediction, 25.0);
            assert_eq!(f.neural_prediction, 60.0);
        }
    }

    #[test]
    fn test_missing_weather_field_fails_whole_call() {
        let projector = HorizonProjector::default();
        let partial: FeatureRecord = [("temperature", 25.0)].into_iter().collect();
        let err = projector
            .project(&WeatherEcho, &partial, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, ForecastError::Prediction { .. }));
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(HorizonProjector::new(vec![], HorizonJitter::default()).is_err());
        let bad = HorizonJitter {
            temperature_std: -1.0,
            ..HorizonJitter::default()
        };
        assert!(matches!(
            HorizonProjector::new(default_horizons(), bad),
            Err(ForecastError::Config { .. })
        ));
        let bad = HorizonJitter {
            humidity_std: f64::NAN,
            ..HorizonJitter::default()
        };
        assert!(HorizonProjector::new(default_horizons(), bad).is_err());
        let zero = HorizonJitter {
            temperature_std: 0.0,
            humidity_std: 0.0,
            ..HorizonJitter::default()
        };
        assert!(HorizonProjector::new(default_horizons(), zero).is_ok());
    }
}

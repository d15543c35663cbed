use crate::domain::errors::ForecastError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base time unit of a forecast horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HorizonUnit {
    Hours,
    #[default]
    Days,
    Weeks,
}

impl HorizonUnit {
    fn singular(&self) -> &'static str {
        match self {
            HorizonUnit::Hours => "hour",
            HorizonUnit::Days => "day",
            HorizonUnit::Weeks => "week",
        }
    }
}

impl FromStr for HorizonUnit {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hour" | "hours" => Ok(HorizonUnit::Hours),
            "day" | "days" => Ok(HorizonUnit::Days),
            "week" | "weeks" => Ok(HorizonUnit::Weeks),
            _ => Err(ForecastError::InvalidHorizon {
                reason: format!("unknown unit '{}'. Must be 'hours', 'days' or 'weeks'", s),
            }),
        }
    }
}

/// A future offset at which a forecast is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Horizon {
    pub offset: u32,
    pub unit: HorizonUnit,
}

impl Horizon {
    pub fn new(offset: u32, unit: HorizonUnit) -> Result<Self, ForecastError> {
        if offset == 0 {
            return Err(ForecastError::InvalidHorizon {
                reason: "offset must be at least 1".to_string(),
            });
        }
        Ok(Self { offset, unit })
    }

    pub fn days(offset: u32) -> Result<Self, ForecastError> {
        Self::new(offset, HorizonUnit::Days)
    }

    /// Label used as the key of a horizon forecast, e.g. "7_day".
    pub fn label(&self) -> String {
        format!("{}_{}", self.offset, self.unit.singular())
    }

    /// The nearest horizon is forecast from the unmodified record.
    pub fn is_base(&self) -> bool {
        self.offset <= 1
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Default horizon set: 1, 7 and 30 days
pub fn default_horizons() -> Vec<Horizon> {
    [1, 7, 30]
        .into_iter()
        .map(|offset| Horizon {
            offset,
            unit: HorizonUnit::Days,
        })
        .collect()
}

/// Parses a comma-separated offset list such as "1,7,30".
pub fn parse_horizons(list: &str, unit: HorizonUnit) -> Result<Vec<Horizon>, ForecastError> {
    let horizons = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let offset = s.parse::<u32>().map_err(|e| ForecastError::InvalidHorizon {
                reason: format!("'{}' is not a valid offset: {}", s, e),
            })?;
            Horizon::new(offset, unit)
        })
        .collect::<Result<Vec<_>, _>>()?;
    validate_horizons(&horizons)?;
    Ok(horizons)
}

/// Rejects empty lists and duplicate labels.
pub fn validate_horizons(horizons: &[Horizon]) -> Result<(), ForecastError> {
    if horizons.is_empty() {
        return Err(ForecastError::InvalidHorizon {
            reason: "at least one horizon is required".to_string(),
        });
    }
    for (i, h) in horizons.iter().enumerate() {
        if h.offset == 0 {
            return Err(ForecastError::InvalidHorizon {
                reason: "offset must be at least 1".to_string(),
            });
        }
        if horizons[..i].contains(h) {
            return Err(ForecastError::InvalidHorizon {
                reason: format!("duplicate horizon {}", h.label()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let labels: Vec<String> = default_horizons().iter().map(Horizon::label).collect();
        assert_eq!(labels, vec!["1_day", "7_day", "30_day"]);
        assert_eq!(Horizon::new(6, HorizonUnit::Hours).unwrap().label(), "6_hour");
    }

    #[test]
    fn test_zero_offset_rejected() {
        assert!(matches!(
            Horizon::days(0),
            Err(ForecastError::InvalidHorizon { .. })
        ));
    }

    #[test]
    fn test_parse_horizons() {
        let parsed = parse_horizons("1, 7,30", HorizonUnit::Days).unwrap();
        assert_eq!(parsed, default_horizons());
    }

    #[test]
    fn test_parse_rejects_duplicates_and_garbage() {
        assert!(parse_horizons("1,7,7", HorizonUnit::Days).is_err());
        assert!(parse_horizons("1,abc", HorizonUnit::Days).is_err());
        assert!(parse_horizons("", HorizonUnit::Days).is_err());
    }

    #[test]
    fn test_unit_from_str() {
        assert_eq!("Weeks".parse::<HorizonUnit>().unwrap(), HorizonUnit::Weeks);
        assert!("months".parse::<HorizonUnit>().is_err());
    }
}

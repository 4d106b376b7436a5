//! Grid profiles: how one LSM product names and lays out its runoff.

use rp_core::{PrepError, PrepResult};
use rp_grid::LonConvention;
use serde::{Deserialize, Serialize};

use crate::schedule::Schedule;

/// Whether runoff accumulates from the start of the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulation {
    #[default]
    Cumulative,
    Incremental,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionNames {
    pub time: String,
    pub lat: String,
    pub lon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateNames {
    /// Time coordinate used to recognize the schedule, if the product has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub lon: String,
    pub lat: String,
}

fn one() -> f64 {
    1.0
}

/// Names, units and decumulation schedules of one LSM product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub dimensions: DimensionNames,
    pub coordinates: CoordinateNames,
    /// Summed before decumulation.
    pub runoff_variables: Vec<String>,
    /// Multiplier bringing runoff to meters of water.
    #[serde(default = "one")]
    pub unit_scale: f64,
    #[serde(default)]
    pub accumulation: Accumulation,
    #[serde(default)]
    pub longitude: LonConvention,
    pub schedules: Vec<Schedule>,
}

impl GridProfile {
    /// Structural checks, independent of any file.
    pub fn validate(&self) -> PrepResult<()> {
        let fail = |what: String| Err(PrepError::config(format!("profile '{}': {what}", self.name)));
        if self.name.trim().is_empty() {
            return Err(PrepError::config("profile without a name"));
        }
        if self.runoff_variables.is_empty() {
            return fail("no runoff variables".to_string());
        }
        if !(self.unit_scale.is_finite() && self.unit_scale > 0.0) {
            return fail(format!("unit_scale must be positive, got {}", self.unit_scale));
        }
        if self.schedules.is_empty() {
            return fail("no schedules".to_string());
        }
        let mut labels: Vec<String> = Vec::new();
        for s in &self.schedules {
            let label = s.interval.to_ascii_lowercase();
            if labels.contains(&label) {
                return fail(format!("interval '{}' defined twice", s.interval));
            }
            labels.push(label);
            s.validate()?;
        }
        Ok(())
    }

    pub fn intervals(&self) -> impl Iterator<Item = &str> {
        self.schedules.iter().map(|s| s.interval.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECMWF_LOWRES: &str = r#"
name: ecmwf_lowres
dimensions: {time: time, lat: lat, lon: lon}
coordinates: {time: time, lon: lon, lat: lat}
runoff_variables: [RO]
schedules:
  - interval: 6hr
    step_hours: 6
    time_signature: [6]
    raw_time_len: 61
    segments:
      - {start: 0, end: 60, stride: 1}
"#;

    #[test]
    fn parses_with_defaults() {
        let profile: GridProfile = serde_yaml::from_str(ECMWF_LOWRES).unwrap();
        assert_eq!(profile.unit_scale, 1.0);
        assert_eq!(profile.accumulation, Accumulation::Cumulative);
        assert_eq!(profile.longitude, LonConvention::Signed);
        assert_eq!(profile.intervals().collect::<Vec<_>>(), vec!["6hr"]);
        profile.validate().unwrap();
    }

    #[test]
    fn rejects_duplicate_intervals() {
        let mut profile: GridProfile = serde_yaml::from_str(ECMWF_LOWRES).unwrap();
        let mut dup = profile.schedules[0].clone();
        dup.interval = "6HR".to_string();
        profile.schedules.push(dup);
        assert!(profile.validate().unwrap_err().is_configuration());
    }
}

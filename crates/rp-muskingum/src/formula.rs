//! kfac formulas and the statistics they need.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the travel time `kfac` of a reach is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KfacFormula {
    /// `L / c`.
    #[default]
    LengthOverCelerity,
    /// `eta * L / sqrt(S)`, eta fitted so the network mean matches `L / c`.
    EtaLengthSqrtSlope,
    /// As [`KfacFormula::EtaLengthSqrtSlope`], with `L / sqrt(S)` clipped to
    /// its 5th and 95th percentiles first.
    EtaLengthSqrtSlopeClipped,
}

impl KfacFormula {
    pub const ALL: [KfacFormula; 3] = [
        KfacFormula::LengthOverCelerity,
        KfacFormula::EtaLengthSqrtSlope,
        KfacFormula::EtaLengthSqrtSlopeClipped,
    ];

    pub fn label(self) -> &'static str {
        match self {
            KfacFormula::LengthOverCelerity => "Length/Celerity",
            KfacFormula::EtaLengthSqrtSlope => "Eta*Length/Sqrt(Slope)",
            KfacFormula::EtaLengthSqrtSlopeClipped => "Eta*Length/Sqrt(Slope) [0.05, 0.95]",
        }
    }

    fn key(self) -> &'static str {
        match self {
            KfacFormula::LengthOverCelerity => "length_over_celerity",
            KfacFormula::EtaLengthSqrtSlope => "eta_length_sqrt_slope",
            KfacFormula::EtaLengthSqrtSlopeClipped => "eta_length_sqrt_slope_clipped",
        }
    }

    /// Whether reach slopes take part in the computation.
    pub fn uses_slope(self) -> bool {
        !matches!(self, KfacFormula::LengthOverCelerity)
    }
}

impl fmt::Display for KfacFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for KfacFormula {
    type Err = String;

    /// Accepts the snake_case key or the display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        KfacFormula::ALL
            .into_iter()
            .find(|f| f.key().eq_ignore_ascii_case(s) || f.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let keys: Vec<&str> = KfacFormula::ALL.iter().map(|f| f.key()).collect();
                format!("unknown kfac formula '{s}' (expected one of: {})", keys.join(", "))
            })
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentile `q` in `[0, 100]` with linear interpolation between the two
/// nearest ranks.
pub(crate) fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Clip every value into `[p5, p95]` of the set.
pub(crate) fn clip_to_percentiles(values: &mut [f64]) {
    let lo = percentile(values, 5.0);
    let hi = percentile(values, 95.0);
    for v in values.iter_mut() {
        *v = v.clamp(lo, hi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_and_labels() {
        assert_eq!(
            "Eta*Length/Sqrt(Slope)".parse::<KfacFormula>().unwrap(),
            KfacFormula::EtaLengthSqrtSlope
        );
        assert_eq!(
            "eta_length_sqrt_slope_clipped".parse::<KfacFormula>().unwrap(),
            KfacFormula::EtaLengthSqrtSlopeClipped
        );
        assert!("manning".parse::<KfacFormula>().is_err());
        let yaml: KfacFormula = serde_yaml::from_str("length_over_celerity").unwrap();
        assert_eq!(yaml, KfacFormula::LengthOverCelerity);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 50.0), 3.0);
        assert!((percentile(&v, 5.0) - 1.2).abs() < 1e-12);
        assert!((percentile(&v, 95.0) - 4.8).abs() < 1e-12);

        let mut c = v.to_vec();
        clip_to_percentiles(&mut c);
        assert!((c[0] - 1.2).abs() < 1e-12);
        assert_eq!(c[2], 3.0);
        assert!((c[4] - 4.8).abs() < 1e-12);
    }

    mod proptests {
        use crate::formula::{clip_to_percentiles, percentile};
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn clipped_values_stay_within_range(
                values in prop::collection::vec(0.001f64..1e6, 1..60),
            ) {
                let lo = percentile(&values, 5.0);
                let hi = percentile(&values, 95.0);
                prop_assert!(lo <= hi);
                let mut clipped = values.clone();
                clip_to_percentiles(&mut clipped);
                for v in clipped {
                    prop_assert!(v >= lo && v <= hi);
                }
            }
        }
    }
}

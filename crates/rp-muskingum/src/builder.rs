//! Muskingum routing coefficients per reach.

use std::collections::{BTreeSet, HashMap};

use rp_core::{km, m, meters, mps, seconds, PrepError, PrepResult, ReachId};
use rp_network::{Connectivity, DrainageRecord};
use serde::{Deserialize, Serialize};

use crate::formula::{clip_to_percentiles, mean, KfacFormula};

/// Slope used when neither the reach nor its neighbours have a positive one.
pub const FALLBACK_SLOPE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    #[default]
    Kilometers,
    Meters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuskingumOptions {
    pub formula: KfacFormula,
    /// Wave celerity in m/s.
    pub celerity_mps: f64,
    /// Calibration multiplier applied to kfac.
    pub lambda_k: f64,
    /// x of reaches outside reservoirs.
    pub x_default: f64,
    pub length_unit: LengthUnit,
}

impl Default for MuskingumOptions {
    fn default() -> Self {
        Self {
            formula: KfacFormula::default(),
            celerity_mps: 1000.0 / 3600.0,
            lambda_k: 0.35,
            x_default: 0.3,
            length_unit: LengthUnit::default(),
        }
    }
}

impl MuskingumOptions {
    pub fn validate(&self) -> PrepResult<()> {
        if !(self.celerity_mps.is_finite() && self.celerity_mps > 0.0) {
            return Err(PrepError::config(format!(
                "celerity must be positive, got {} m/s",
                self.celerity_mps
            )));
        }
        if !(self.lambda_k.is_finite() && self.lambda_k > 0.0) {
            return Err(PrepError::config(format!(
                "lambda must be positive, got {}",
                self.lambda_k
            )));
        }
        if !(0.0..=0.5).contains(&self.x_default) {
            return Err(PrepError::config(format!(
                "x must lie in [0, 0.5], got {}",
                self.x_default
            )));
        }
        Ok(())
    }
}

/// Reach attributes the coefficients are derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReachAttributes {
    /// Length in the configured [`LengthUnit`].
    pub length: f64,
    pub slope: Option<f64>,
}

/// Attributes keyed by reach id. Records without a length are left out and
/// surface later as missing reaches.
pub fn attributes_from_drainage(records: &[DrainageRecord]) -> HashMap<ReachId, ReachAttributes> {
    records
        .iter()
        .filter_map(|r| {
            r.length.map(|length| {
                (
                    r.id,
                    ReachAttributes {
                        length,
                        slope: r.slope,
                    },
                )
            })
        })
        .collect()
}

/// Coefficients in connectivity order.
#[derive(Debug, Clone, PartialEq)]
pub struct MuskingumParameters {
    pub reach_ids: Vec<ReachId>,
    /// Travel time in seconds.
    pub kfac: Vec<f64>,
    /// `lambda * kfac` in seconds.
    pub k: Vec<f64>,
    pub x: Vec<f64>,
    /// Fitted eta for the slope formulas.
    pub eta: Option<f64>,
}

impl MuskingumParameters {
    pub fn len(&self) -> usize {
        self.reach_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reach_ids.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MuskingumParameterBuilder {
    options: MuskingumOptions,
}

impl MuskingumParameterBuilder {
    pub fn new(options: MuskingumOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MuskingumOptions {
        &self.options
    }

    pub fn build(
        &self,
        network: &Connectivity,
        attributes: &HashMap<ReachId, ReachAttributes>,
        reservoirs: &BTreeSet<ReachId>,
    ) -> PrepResult<MuskingumParameters> {
        self.options.validate()?;
        let opts = &self.options;

        let missing: Vec<ReachId> = network
            .rows()
            .iter()
            .map(|r| r.id)
            .filter(|id| !attributes.contains_key(id))
            .collect();
        if !missing.is_empty() {
            let shown: Vec<String> = missing.iter().take(10).map(|id| id.to_string()).collect();
            return Err(PrepError::data(format!(
                "{} reaches have no length attribute (first: {})",
                missing.len(),
                shown.join(", ")
            )));
        }

        let celerity = mps(opts.celerity_mps);
        let mut lengths_m = Vec::with_capacity(network.len());
        let mut travel = Vec::with_capacity(network.len());
        for row in network.rows() {
            let raw = attributes[&row.id].length;
            if !(raw.is_finite() && raw >= 0.0) {
                return Err(PrepError::data(format!(
                    "reach {} has invalid length {raw}",
                    row.id
                )));
            }
            let length = match opts.length_unit {
                LengthUnit::Kilometers => km(raw),
                LengthUnit::Meters => m(raw),
            };
            lengths_m.push(meters(length));
            travel.push(seconds(length / celerity));
        }

        let (kfac, eta) = if opts.formula.uses_slope() {
            let mut fallbacks = 0usize;
            let mut scaled = Vec::with_capacity(network.len());
            for (row, &l) in network.rows().iter().zip(&lengths_m) {
                let own = attributes[&row.id].slope.filter(|s| s.is_finite());
                let slope = match own {
                    Some(s) if s > 0.0 => s,
                    _ => {
                        fallbacks += 1;
                        let neighbour = |id: Option<ReachId>| {
                            id.and_then(|id| attributes.get(&id))
                                .and_then(|a| a.slope)
                                .filter(|s| s.is_finite())
                                .unwrap_or(0.0)
                        };
                        let avg = 0.5
                            * (neighbour(row.downstream) + neighbour(row.upstream.first().copied()));
                        if avg > 0.0 {
                            avg
                        } else {
                            FALLBACK_SLOPE
                        }
                    }
                };
                scaled.push(l / slope.sqrt());
            }
            if fallbacks > 0 {
                tracing::warn!(reaches = fallbacks, "non-positive slopes replaced from neighbours");
            }
            if opts.formula == KfacFormula::EtaLengthSqrtSlopeClipped {
                clip_to_percentiles(&mut scaled);
            }
            let denom = mean(&scaled);
            if !denom.is_finite() || denom <= 0.0 {
                return Err(PrepError::data(
                    "mean of length / sqrt(slope) is zero, eta cannot be fitted",
                ));
            }
            let eta = mean(&travel) / denom;
            (scaled.iter().map(|v| eta * v).collect::<Vec<_>>(), Some(eta))
        } else {
            (travel, None)
        };

        let k = kfac.iter().map(|v| opts.lambda_k * v).collect();
        let x = network
            .rows()
            .iter()
            .map(|r| {
                if reservoirs.contains(&r.id) {
                    0.0
                } else {
                    opts.x_default
                }
            })
            .collect();

        tracing::info!(
            formula = %opts.formula,
            reaches = network.len(),
            reservoirs = reservoirs.len(),
            eta = ?eta,
            "computed muskingum parameters"
        );
        Ok(MuskingumParameters {
            reach_ids: network.reach_ids(),
            kfac,
            k,
            x,
            eta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rp_network::{ConnectivityBuilder, ConnectivityOptions};

    fn chain() -> Connectivity {
        let mut b = ConnectivityBuilder::new(ConnectivityOptions::default());
        b.add_reach(1, None);
        b.add_reach(2, Some(1));
        b.add_reach(3, Some(2));
        b.build().unwrap()
    }

    fn attrs(rows: &[(ReachId, f64, Option<f64>)]) -> HashMap<ReachId, ReachAttributes> {
        rows.iter()
            .map(|&(id, length, slope)| (id, ReachAttributes { length, slope }))
            .collect()
    }

    #[test]
    fn length_over_celerity_in_seconds() {
        let a = attrs(&[(1, 1.0, None), (2, 2.0, None), (3, 0.5, None)]);
        let p = MuskingumParameterBuilder::default()
            .build(&chain(), &a, &BTreeSet::new())
            .unwrap();
        // 1 km at 1000 m/h is one hour
        assert!((p.kfac[0] - 3600.0).abs() < 1e-9);
        assert!((p.kfac[1] - 7200.0).abs() < 1e-9);
        assert!((p.k[2] - 0.35 * 1800.0).abs() < 1e-9);
        assert_eq!(p.x, vec![0.3, 0.3, 0.3]);
        assert_eq!(p.eta, None);
    }

    #[test]
    fn eta_matches_mean_travel_time() {
        let a = attrs(&[(1, 1.0, Some(0.01)), (2, 2.0, Some(0.04)), (3, 3.0, Some(0.0025))]);
        let opts = MuskingumOptions {
            formula: KfacFormula::EtaLengthSqrtSlope,
            ..Default::default()
        };
        let p = MuskingumParameterBuilder::new(opts)
            .build(&chain(), &a, &BTreeSet::new())
            .unwrap();
        let mean_kfac = p.kfac.iter().sum::<f64>() / 3.0;
        assert!((mean_kfac - 7200.0).abs() < 1e-6);
        // L / sqrt(S) = 10000, 10000, 60000 m
        assert!((p.kfac[0] - p.kfac[1]).abs() < 1e-9);
        assert!((p.kfac[2] / p.kfac[0] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn slope_fallback_from_neighbours() {
        // reach 2: downstream 1 (0.02), first upstream 3 (0.0) -> 0.01
        // reach 3: downstream 2 (0.0), no upstream -> 0.001
        let a = attrs(&[(1, 1.0, Some(0.02)), (2, 1.0, Some(0.0)), (3, 1.0, None)]);
        let opts = MuskingumOptions {
            formula: KfacFormula::EtaLengthSqrtSlope,
            length_unit: LengthUnit::Meters,
            ..Default::default()
        };
        let p = MuskingumParameterBuilder::new(opts)
            .build(&chain(), &a, &BTreeSet::new())
            .unwrap();
        let eta = p.eta.unwrap();
        let expected = [
            1.0 / 0.02f64.sqrt(),
            1.0 / 0.01f64.sqrt(),
            1.0 / FALLBACK_SLOPE.sqrt(),
        ];
        for (got, want) in p.kfac.iter().zip(expected) {
            assert!((got - eta * want).abs() < 1e-9);
        }
    }

    #[test]
    fn reservoirs_zero_x() {
        let a = attrs(&[(1, 1.0, None), (2, 1.0, None), (3, 1.0, None)]);
        let reservoirs = BTreeSet::from([2]);
        let p = MuskingumParameterBuilder::default()
            .build(&chain(), &a, &reservoirs)
            .unwrap();
        assert_eq!(p.x, vec![0.3, 0.0, 0.3]);
    }

    #[test]
    fn missing_attributes_are_data_errors() {
        let a = attrs(&[(1, 1.0, None), (3, 1.0, None)]);
        let err = MuskingumParameterBuilder::default()
            .build(&chain(), &a, &BTreeSet::new())
            .unwrap_err();
        assert!(err.is_data_validation());
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn bad_options_are_configuration_errors() {
        let a = attrs(&[(1, 1.0, None), (2, 1.0, None), (3, 1.0, None)]);
        for opts in [
            MuskingumOptions {
                celerity_mps: 0.0,
                ..Default::default()
            },
            MuskingumOptions {
                x_default: 0.7,
                ..Default::default()
            },
        ] {
            let err = MuskingumParameterBuilder::new(opts)
                .build(&chain(), &a, &BTreeSet::new())
                .unwrap_err();
            assert!(err.is_configuration());
        }
    }
}

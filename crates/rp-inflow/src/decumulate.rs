//! Turning raw runoff time series into per-step increments.

use ndarray::{Array2, ArrayView2, Axis};

use crate::schedule::Step;

#[derive(Debug, Clone, PartialEq)]
pub struct Increments {
    /// `(step, cell)` runoff depth per output step.
    pub values: Array2<f64>,
    /// Increments below zero before any clamping.
    pub negatives: usize,
}

/// Apply a step plan to `(raw_time, cell)` values.
///
/// Cumulative steps emit `v(index) - v(baseline)`; incremental steps emit
/// `v(index)`. Negative increments are kept unless `clamp_negative`.
pub fn decumulate(raw: ArrayView2<f64>, steps: &[Step], clamp_negative: bool) -> Increments {
    let cells = raw.len_of(Axis(1));
    let mut values = Array2::zeros((steps.len(), cells));
    let mut negatives = 0;
    for (mut out, step) in values.axis_iter_mut(Axis(0)).zip(steps) {
        let current = raw.row(step.index);
        match step.baseline {
            Some(b) => {
                let previous = raw.row(b);
                for ((o, &v), &p) in out.iter_mut().zip(current).zip(previous) {
                    *o = v - p;
                }
            }
            None => out.assign(&current),
        }
        for o in out.iter_mut() {
            if *o < 0.0 {
                negatives += 1;
                if clamp_negative {
                    *o = 0.0;
                }
            }
        }
    }
    Increments { values, negatives }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cumulative_steps(indices: &[usize]) -> Vec<Step> {
        let mut steps = vec![Step {
            index: indices[0],
            baseline: None,
        }];
        for w in indices.windows(2) {
            steps.push(Step {
                index: w[1],
                baseline: Some(w[0]),
            });
        }
        steps
    }

    #[test]
    fn differences_and_negatives() {
        let raw = array![[1.0, 0.0], [3.0, 0.5], [2.0, 1.5]];
        let steps = cumulative_steps(&[0, 1, 2]);

        let kept = decumulate(raw.view(), &steps, false);
        assert_eq!(kept.values, array![[1.0, 0.0], [2.0, 0.5], [-1.0, 1.0]]);
        assert_eq!(kept.negatives, 1);

        let clamped = decumulate(raw.view(), &steps, true);
        assert_eq!(clamped.values[[2, 0]], 0.0);
        assert_eq!(clamped.negatives, 1);
    }

    #[test]
    fn incremental_steps_copy_rows() {
        let raw = array![[1.0], [2.0], [4.0]];
        let steps = [
            Step { index: 0, baseline: None },
            Step { index: 2, baseline: None },
        ];
        assert_eq!(decumulate(raw.view(), &steps, false).values, array![[1.0], [4.0]]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Cumulating increments over an irregular index set and
            /// decumulating them again gives the increments back.
            #[test]
            fn cumulative_round_trip(
                increments in prop::collection::vec(0.0f64..10.0, 1..40),
                gaps in prop::collection::vec(1usize..4, 40),
            ) {
                let mut indices = vec![0usize];
                for g in gaps.iter().take(increments.len() - 1) {
                    let next = indices[indices.len() - 1] + g;
                    indices.push(next);
                }
                let raw_len = indices[indices.len() - 1] + 1;

                // running total, held constant between sampled indices
                let mut raw = Array2::zeros((raw_len, 1));
                let mut total = 0.0;
                let mut k = 0;
                for t in 0..raw_len {
                    if k < indices.len() && indices[k] == t {
                        total += increments[k];
                        k += 1;
                    }
                    raw[[t, 0]] = total;
                }

                let back = decumulate(raw.view(), &cumulative_steps(&indices), false);
                prop_assert_eq!(back.negatives, 0);
                for (got, want) in back.values.column(0).iter().zip(&increments) {
                    prop_assert!((got - want).abs() < 1e-9);
                }
            }
        }
    }
}

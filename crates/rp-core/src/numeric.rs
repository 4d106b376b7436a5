use crate::PrepError;

/// Floating point type for coordinates, areas and volumes.
pub type Real = f64;

/// Absolute and relative tolerance for float comparisons.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &str) -> Result<Real, PrepError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(PrepError::data(format!("non-finite value for {what}: {v}")))
    }
}

/// Map a longitude onto `[-180, 180)`.
pub fn wrap_longitude(lon: Real) -> Real {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Index of `target` in `values`, exact match first, nearest value otherwise.
///
/// Exact float equality fails for lattices stored with rounding noise near
/// 0° so the nearest finite value wins when no element compares equal.
/// Ties resolve to the lowest index.
pub fn nearest_index(values: &[Real], target: Real) -> Result<usize, PrepError> {
    if !target.is_finite() {
        return Err(PrepError::index(format!(
            "cannot resolve non-finite coordinate {target}"
        )));
    }
    if let Some(pos) = values.iter().position(|&v| v == target) {
        return Ok(pos);
    }

    let mut best: Option<(usize, Real)> = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        let d = (v - target).abs();
        match best {
            Some((_, bd)) if bd <= d => {}
            _ => best = Some((i, d)),
        }
    }

    best.map(|(i, _)| i).ok_or_else(|| {
        PrepError::index(format!(
            "no finite lattice value to match coordinate {target} ({} candidates)",
            values.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("non-finite"));
    }

    #[test]
    fn wrap_longitude_range() {
        assert_eq!(wrap_longitude(0.0), 0.0);
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(359.75), -0.25);
        assert_eq!(wrap_longitude(-180.0), -180.0);
        assert_eq!(wrap_longitude(540.0), -180.0);
    }

    #[test]
    fn nearest_index_prefers_exact_then_nearest() {
        let axis = [-0.5, -1e-13, 0.5, 1.0];
        assert_eq!(nearest_index(&axis, 0.5).unwrap(), 2);
        // 0.0 is not stored exactly; the noisy entry is closest
        assert_eq!(nearest_index(&axis, 0.0).unwrap(), 1);
        assert_eq!(nearest_index(&axis, 7.0).unwrap(), 3);
    }

    #[test]
    fn nearest_index_fails_without_candidates() {
        assert!(matches!(
            nearest_index(&[], 1.0),
            Err(PrepError::IndexResolution { .. })
        ));
        assert!(matches!(
            nearest_index(&[Real::NAN], 1.0),
            Err(PrepError::IndexResolution { .. })
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn wrapped_longitude_in_range(lon in -1.0e4f64..1.0e4) {
                let w = wrap_longitude(lon);
                prop_assert!((-180.0..180.0).contains(&w));
            }

            #[test]
            fn nearest_index_is_minimal(
                values in proptest::collection::vec(-90.0f64..90.0, 1..40),
                target in -100.0f64..100.0,
            ) {
                let i = nearest_index(&values, target).unwrap();
                let d = (values[i] - target).abs();
                for v in &values {
                    prop_assert!(d <= (v - target).abs());
                }
            }
        }
    }
}

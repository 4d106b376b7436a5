//! Decumulation schedules and their selection.

use rp_core::{nearly_equal, PrepError, PrepResult, Tolerances};
use serde::{Deserialize, Serialize};

use crate::profile::{Accumulation, GridProfile};

/// Time coordinates are often stored as float; hours are compared loosely.
const SIGNATURE_TOL: Tolerances = Tolerances {
    abs: 1e-6,
    rel: 1e-6,
};

/// Raw indices `start + stride, start + 2 * stride, ..., <= end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: usize,
    /// Last raw index; defaults to the last time step of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    pub stride: usize,
}

/// One output interval of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Label such as `"3hr"`.
    pub interval: String,
    pub step_hours: f64,
    /// Distinct time-coordinate differences identifying the raw file layout.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_signature: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_time_len: Option<usize>,
    pub segments: Vec<Segment>,
}

/// Output time step `index`, minus `baseline` for cumulative runoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub index: usize,
    pub baseline: Option<usize>,
}

impl Schedule {
    pub fn validate(&self) -> PrepResult<()> {
        let fail = |what: String| {
            Err(PrepError::config(format!("schedule '{}': {what}", self.interval)))
        };
        if !(self.step_hours.is_finite() && self.step_hours > 0.0) {
            return fail(format!("step_hours must be positive, got {}", self.step_hours));
        }
        if self.segments.is_empty() {
            return fail("no segments".to_string());
        }
        for seg in &self.segments {
            if seg.stride == 0 {
                return fail(format!("segment starting at {} has stride 0", seg.start));
            }
            if let Some(end) = seg.end {
                if end < seg.start {
                    return fail(format!("segment {}..{end} runs backwards", seg.start));
                }
            }
        }
        Ok(())
    }

    /// Raw indices to emit, first step included.
    ///
    /// `raw_len` is the length of the file's time dimension; indices past it,
    /// or a declared `raw_time_len` that differs, are data errors.
    pub fn plan(&self, raw_len: usize, accumulation: Accumulation) -> PrepResult<Vec<Step>> {
        if let Some(expected) = self.raw_time_len {
            if expected != raw_len {
                return Err(PrepError::data(format!(
                    "schedule '{}' expects {expected} time steps, file has {raw_len}",
                    self.interval
                )));
            }
        }
        if raw_len == 0 {
            return Err(PrepError::data("runoff file has no time steps"));
        }

        let mut steps = vec![Step {
            index: 0,
            baseline: None,
        }];
        for seg in &self.segments {
            let end = seg.end.unwrap_or(raw_len - 1);
            if end >= raw_len {
                return Err(PrepError::data(format!(
                    "schedule '{}' reads time index {end}, file has {raw_len} steps",
                    self.interval
                )));
            }
            let mut i = seg.start + seg.stride;
            while i <= end {
                let baseline = match accumulation {
                    Accumulation::Cumulative => Some(i - seg.stride),
                    Accumulation::Incremental => None,
                };
                steps.push(Step { index: i, baseline });
                i += seg.stride;
            }
        }
        Ok(steps)
    }

    /// Output steps for a file with `raw_len` time steps.
    pub fn output_len(&self, raw_len: usize) -> PrepResult<usize> {
        Ok(self.plan(raw_len, Accumulation::Cumulative)?.len())
    }

    fn matches_signature(&self, signature: &[f64]) -> bool {
        let tol = SIGNATURE_TOL;
        self.time_signature.len() == signature.len()
            && self
                .time_signature
                .iter()
                .all(|&a| signature.iter().any(|&b| nearly_equal(a, b, tol)))
    }
}

/// Distinct differences between consecutive time values (hours), ascending.
pub fn time_signature(times: &[f64]) -> Vec<f64> {
    let tol = SIGNATURE_TOL;
    let mut out: Vec<f64> = Vec::new();
    for w in times.windows(2) {
        let d = w[1] - w[0];
        if !out.iter().any(|&x| nearly_equal(x, d, tol)) {
            out.push(d);
        }
    }
    out.sort_by(f64::total_cmp);
    out
}

/// Schedules compatible with a file's time coordinate, if it has one.
fn candidates<'a>(profile: &'a GridProfile, times: Option<&[f64]>) -> PrepResult<Vec<&'a Schedule>> {
    let Some(times) = times else {
        return Ok(profile.schedules.iter().collect());
    };
    let signature = time_signature(times);
    let found: Vec<&Schedule> = profile
        .schedules
        .iter()
        .filter(|s| s.time_signature.is_empty() || s.matches_signature(&signature))
        .collect();
    if found.is_empty() {
        return Err(PrepError::data(format!(
            "time steps {signature:?} match no schedule of profile '{}'",
            profile.name
        )));
    }
    Ok(found)
}

/// Interval labels usable for a file with the given time coordinate.
pub fn available_intervals(profile: &GridProfile, times: Option<&[f64]>) -> PrepResult<Vec<String>> {
    Ok(candidates(profile, times)?
        .into_iter()
        .map(|s| s.interval.clone())
        .collect())
}

/// Pick the schedule for a file: by time signature, then by the requested
/// interval label, else the coarsest interval.
pub fn select_schedule<'a>(
    profile: &'a GridProfile,
    times: Option<&[f64]>,
    interval: Option<&str>,
) -> PrepResult<&'a Schedule> {
    let found = candidates(profile, times)?;
    let chosen = match interval {
        Some(label) => found
            .iter()
            .find(|s| s.interval.eq_ignore_ascii_case(label))
            .copied()
            .ok_or_else(|| {
                let labels: Vec<&str> = found.iter().map(|s| s.interval.as_str()).collect();
                PrepError::config(format!(
                    "interval '{label}' is not available for profile '{}' (available: {})",
                    profile.name,
                    labels.join(", ")
                ))
            })?,
        None => found
            .iter()
            .copied()
            .max_by(|a, b| a.step_hours.total_cmp(&b.step_hours))
            .ok_or_else(|| PrepError::config(format!("profile '{}' has no schedules", profile.name)))?,
    };
    tracing::debug!(profile = %profile.name, interval = %chosen.interval, "selected schedule");
    Ok(chosen)
}

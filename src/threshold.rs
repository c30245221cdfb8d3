//! Lactate threshold location
//!
//! LT1 and LT2 are extracted from a [`FittedCurve`] by one of two strategies:
//!
//! - **Fixed offset** (Dickhuth style): thresholds sit where the fitted curve
//!   first rises a fixed amount above its minimum.
//! - **Dmax**: LT2 is the grid point farthest from the chord joining the
//!   baseline point and the curve endpoint. LT1 always uses the fixed offset.
//!
//! Whatever the strategy produced, a safety rule and a fallback ladder enforce
//! `min_speed <= lt1 < lt2 < max_speed` before the result leaves this module.

use crate::config::ThresholdParameters;
use crate::curve::FittedCurve;
use crate::error::CurveError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Threshold detection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdMethod {
    /// Maximum perpendicular distance from the baseline-endpoint chord
    #[serde(rename = "DMAX")]
    Dmax,
    /// Fixed rise above baseline lactate
    #[serde(rename = "FIXED_OFFSET")]
    FixedOffset,
}

impl ThresholdMethod {
    /// Method implied by the effort flag of a test
    pub fn for_effort(all_out_effort: bool) -> Self {
        if all_out_effort {
            ThresholdMethod::Dmax
        } else {
            ThresholdMethod::FixedOffset
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdMethod::Dmax => "DMAX",
            ThresholdMethod::FixedOffset => "FIXED_OFFSET",
        }
    }
}

/// Located thresholds with the fitted values at each
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub lt1_speed: f64,
    pub lt1_heart_rate: f64,
    pub lt1_lactate: f64,
    pub lt2_speed: f64,
    pub lt2_heart_rate: f64,
    pub lt2_lactate: f64,
    /// Minimum of the fitted lactate curve
    pub baseline_lactate: f64,
    /// Method that produced the reported LT2
    pub method: ThresholdMethod,
    /// Whether the safety rule or the fallback ladder altered the raw result
    pub fallback_applied: bool,
}

/// Threshold locator bound to one parameter set
pub struct ThresholdLocator<'a> {
    params: &'a ThresholdParameters,
}

impl<'a> ThresholdLocator<'a> {
    pub fn new(params: &'a ThresholdParameters) -> Self {
        Self { params }
    }

    /// Locate LT1 and LT2 on a fitted curve
    ///
    /// # Errors
    /// [`CurveError::ZeroLengthChord`] when Dmax is requested on a curve whose
    /// endpoint does not rise above the baseline.
    pub fn locate(
        &self,
        curve: &FittedCurve,
        method: ThresholdMethod,
    ) -> Result<ThresholdResult, CurveError> {
        let (baseline_idx, baseline) = curve.baseline();
        let lt1_target = baseline + self.params.lt1_offset;
        let lt2_target = baseline + self.params.lt2_offset;

        let mut lt1 = self.offset_speed(curve, baseline_idx, lt1_target);
        let mut used_method = method;
        let mut fallback_applied = false;

        let mut lt2 = match method {
            ThresholdMethod::FixedOffset => self.offset_speed(curve, baseline_idx, lt2_target),
            ThresholdMethod::Dmax => {
                let last = curve.grid_speeds().len() - 1;
                let idx = dmax_index(curve.grid_speeds(), curve.grid_lactates(), baseline_idx, last)
                    .ok_or(CurveError::ZeroLengthChord)?;
                let speed = curve.grid_speeds()[idx];

                if speed <= lt1 + self.params.min_separation_kmh {
                    warn!(
                        dmax_lt2 = speed,
                        lt1,
                        separation = self.params.min_separation_kmh,
                        "Dmax LT2 too close to LT1, using fixed offset"
                    );
                    used_method = ThresholdMethod::FixedOffset;
                    fallback_applied = true;
                    self.offset_speed(curve, baseline_idx, lt2_target)
                } else {
                    speed
                }
            }
        };

        let min_speed = curve.min_speed();
        let max_speed = curve.max_speed();
        let grid = curve.grid_speeds();

        if lt2 >= max_speed {
            warn!(lt2, max_speed, "LT2 at end of test, pulling back one grid step");
            lt2 = grid[grid.len() - 2];
            fallback_applied = true;
        }
        if lt2 <= min_speed {
            warn!(lt2, min_speed, "LT2 at start of test, moving to range midpoint");
            lt2 = 0.5 * (min_speed + max_speed);
            fallback_applied = true;
        }
        if lt1 >= lt2 {
            warn!(lt1, lt2, "LT1 not below LT2, moving LT1 down");
            lt1 = (lt2 - self.params.min_separation_kmh).max(min_speed);
            if lt1 >= lt2 {
                lt1 = 0.5 * (min_speed + lt2);
            }
            fallback_applied = true;
        }

        debug!(
            lt1,
            lt2,
            baseline,
            method = used_method.as_str(),
            fallback_applied,
            "Thresholds located"
        );

        Ok(ThresholdResult {
            lt1_speed: lt1,
            lt1_heart_rate: curve.heart_rate_at(lt1),
            lt1_lactate: curve.lactate_at(lt1),
            lt2_speed: lt2,
            lt2_heart_rate: curve.heart_rate_at(lt2),
            lt2_lactate: curve.lactate_at(lt2),
            baseline_lactate: baseline,
            method: used_method,
            fallback_applied,
        })
    }

    /// Speed where the curve first reaches `target`, searching from `start_idx`
    ///
    /// Falls back to the grid point closest to the target when the curve never
    /// reaches it inside the tested range.
    pub fn offset_speed(&self, curve: &FittedCurve, start_idx: usize, target: f64) -> f64 {
        match self.find_crossing(curve, start_idx, target) {
            Some(speed) => speed,
            None => {
                let speed = nearest_grid_speed(curve, start_idx, target);
                debug!(target, speed, "No crossing in range, using nearest grid point");
                speed
            }
        }
    }

    /// First upward crossing of `target`, refined by bisection
    pub fn find_crossing(&self, curve: &FittedCurve, start_idx: usize, target: f64) -> Option<f64> {
        let speeds = curve.grid_speeds();
        let lactates = curve.grid_lactates();

        if lactates.get(start_idx).is_some_and(|&l| l >= target) {
            return Some(speeds[start_idx]);
        }

        let i = (start_idx..speeds.len() - 1).find(|&i| lactates[i + 1] >= target)?;
        let (mut lo, mut hi) = (speeds[i], speeds[i + 1]);

        for _ in 0..self.params.max_bisection_iterations {
            if hi - lo < self.params.root_tolerance {
                break;
            }
            let mid = 0.5 * (lo + hi);
            if curve.lactate_at(mid) >= target {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        Some(0.5 * (lo + hi))
    }
}

fn nearest_grid_speed(curve: &FittedCurve, start_idx: usize, target: f64) -> f64 {
    let speeds = curve.grid_speeds();
    let lactates = curve.grid_lactates();
    (start_idx..speeds.len())
        .min_by(|&a, &b| {
            (lactates[a] - target)
                .abs()
                .total_cmp(&(lactates[b] - target).abs())
        })
        .map(|i| speeds[i])
        .unwrap_or_else(|| curve.min_speed())
}

const MIN_CHORD_RISE: f64 = 1e-9;

/// Index in `start..=end` farthest from the chord between the two ends
///
/// Distance is the norm of the rejection of each point from the chord vector,
/// so the geometry holds for any chord orientation. Returns `None` when the
/// chord is degenerate: zero length or no lactate rise from start to end.
pub fn dmax_index(speeds: &[f64], lactates: &[f64], start: usize, end: usize) -> Option<usize> {
    if start >= end || end >= speeds.len() || end >= lactates.len() {
        return None;
    }

    let (x0, y0) = (speeds[start], lactates[start]);
    let dx = speeds[end] - x0;
    let dy = lactates[end] - y0;
    let chord_sq = dx * dx + dy * dy;
    if chord_sq <= f64::EPSILON || dy <= MIN_CHORD_RISE {
        return None;
    }

    let mut best = start;
    let mut best_distance = f64::NEG_INFINITY;
    for i in start..=end {
        let wx = speeds[i] - x0;
        let wy = lactates[i] - y0;
        let t = (wx * dx + wy * dy) / chord_sq;
        let px = wx - t * dx;
        let py = wy - t * dy;
        let distance = (px * px + py * py).sqrt();
        if distance > best_distance {
            best_distance = distance;
            best = i;
        }
    }

    Some(best)
}

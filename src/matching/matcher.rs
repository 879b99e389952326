//! Multi-scale tolerance-band matcher.
//!
//! For each requested scale the target pattern is stretched to that scale,
//! initially differenced, and laid over every window of equal length in the
//! series (also initially differenced). A window matches when the difference
//! lies strictly inside `(-tolerance, tolerance)` at *every* position.
//!
//! The recorded score is the signed sum of the difference vector, so
//! overshoot and undershoot can cancel. It is a ranking aid, not an error
//! metric.

use rayon::prelude::*;

use super::{initial_difference_in_place, resample, rolling_windows, ScaleRatio};
use crate::{Match, Result, Scale, Timeseries, Tolerance};

/// Pattern resampled to `scale` and initially differenced; the exact
/// sequence windows are compared against.
pub fn scaled_target(pattern: &[f64], scale: Scale) -> Result<Vec<f64>> {
    let mut target = resample(pattern, ScaleRatio::upscale(scale))?;
    initial_difference_in_place(&mut target);
    Ok(target)
}

/// Signed difference score of one raw window against a differenced target,
/// or `None` when any position falls outside the band.
#[inline]
pub fn window_score(window: &[f64], target: &[f64], tolerance: Tolerance) -> Option<f64> {
    debug_assert_eq!(window.len(), target.len());
    let eps = tolerance.get();
    let base = *window.first()?;
    window
        .iter()
        .zip(target)
        .try_fold(0.0, |score, (&v, &t)| {
            let diff = (v - base) - t;
            (diff > -eps && diff < eps).then_some(score + diff)
        })
}

/// Matches at a single scale, in series order.
///
/// A series shorter than the scaled pattern has no windows and yields no
/// matches.
pub fn match_at_scale(
    series: &Timeseries,
    pattern: &[f64],
    tolerance: Tolerance,
    scale: Scale,
) -> Result<Vec<Match>> {
    // Sized before resampling so an oversized scale never allocates
    let span = ScaleRatio::upscale(scale).checked_output_len(pattern.len());
    if pattern.len() >= 2 && span.map_or(true, |len| len > series.len()) {
        log::trace!(
            "scale {}: pattern spans {:?} values, series has {}; skipping",
            scale.get(),
            span,
            series.len()
        );
        return Ok(Vec::new());
    }

    let target = scaled_target(pattern, scale)?;

    let matches: Vec<Match> = rolling_windows(series, target.len())?
        .filter_map(|w| {
            window_score(w.values, &target, tolerance).map(|score| Match {
                timestamp: w.start,
                scale,
                score,
            })
        })
        .collect();

    log::debug!("scale {}: {} matches", scale.get(), matches.len());
    Ok(matches)
}

/// Search `series` for `pattern` at every scale in `scales`.
///
/// Results are grouped by scale in the order the scales were given; within
/// a scale they follow series order.
pub fn initial_diff_match(
    series: &Timeseries,
    pattern: &[f64],
    tolerance: Tolerance,
    scales: &[Scale],
) -> Result<Vec<Match>> {
    let mut out = Vec::new();
    for &scale in scales {
        out.extend(match_at_scale(series, pattern, tolerance, scale)?);
    }
    Ok(out)
}

/// Same as [`initial_diff_match`] with scales searched in parallel.
pub fn initial_diff_match_parallel(
    series: &Timeseries,
    pattern: &[f64],
    tolerance: Tolerance,
    scales: &[Scale],
) -> Result<Vec<Match>> {
    let per_scale: Vec<Vec<Match>> = scales
        .par_iter()
        .map(|&scale| match_at_scale(series, pattern, tolerance, scale))
        .collect::<Result<_>>()?;
    Ok(per_scale.into_iter().flatten().collect())
}

//! What the series did after each point of interest.

use super::Timestamped;
use crate::{Aftermath, MatchError, Result, Timeseries};

/// For every point, the point's own value plus up to `steps_after`
/// subsequent values. Runs are cut short, never padded, where the series
/// ends.
///
/// Every point must be a timestamp of `series`; a missing one is a caller
/// bug and fails with [`MatchError::TimestampNotFound`].
pub fn poi_afterwards<I>(series: &Timeseries, points: I, steps_after: usize) -> Result<Vec<Aftermath>>
where
    I: IntoIterator,
    I::Item: Timestamped,
{
    if steps_after == 0 {
        return Err(MatchError::InvalidValue("steps_after must be >= 1"));
    }

    let values = series.values();
    points
        .into_iter()
        .map(|point| {
            let anchor = point.anchor();
            let start = series
                .position(anchor)
                .ok_or(MatchError::TimestampNotFound(anchor))?;
            let end = start.saturating_add(steps_after).saturating_add(1).min(values.len());
            Ok(Aftermath {
                anchor,
                values: values[start..end].to_vec(),
            })
        })
        .collect()
}

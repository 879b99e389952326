//! Cross-match aftermath aggregation.
//!
//! Aftermaths recorded at different scales have different lengths. Each one
//! is initially differenced and resampled to a common time base (the LCM of
//! all searched scales), so that every row spans the same number of
//! *scaled* timesteps and rows can be averaged position by position.
//!
//! The resulting [`AggregateView`] carries everything a chart needs: the
//! individual rows, their average, and the target pattern with its
//! tolerance band for overlay. Rendering itself is left to the caller.

use chrono::NaiveDateTime;

use crate::matching::{
    initial_difference, initial_difference_rows, resample, resample_rows, Rows, ScaleRatio,
};
use crate::patterns::Pattern;
use crate::{Aftermath, MatchError, Result, Scale, SeriesReport, Tolerance};

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Least common multiple of every scale; `None` on overflow or no scales.
pub fn common_scale(scales: &[Scale]) -> Option<usize> {
    let mut iter = scales.iter().map(|s| s.get());
    let first = iter.next()?;
    iter.try_fold(first, |acc, s| (acc / gcd(acc, s)).checked_mul(s))
}

/// One aftermath on the common time base.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AggregateRow {
    pub symbol: String,
    pub anchor: NaiveDateTime,
    pub scale: Scale,
    /// Initially differenced values; shorter than the record length when
    /// the series ended early
    pub values: Vec<f64>,
}

/// Aggregated aftermaths plus the pattern overlay.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AggregateView {
    pub plot_scale: usize,
    pub scaled_steps: usize,
    /// Position of each column in scaled timesteps, `0..=scaled_steps`
    pub x_axis: Vec<f64>,
    pub rows: Vec<AggregateRow>,
    /// Column means over the rows reaching that column
    pub average: Vec<Option<f64>>,
    pub pattern: Vec<f64>,
    pub upper_band: Vec<f64>,
    pub lower_band: Vec<f64>,
    pub tolerance: f64,
}

/// Collects aftermaths from any number of series and scales.
#[derive(Debug, Clone)]
pub struct Aggregator {
    plot_scale: usize,
    scaled_steps: usize,
    rows: Vec<AggregateRow>,
}

impl Aggregator {
    pub fn new(scales: &[Scale], scaled_steps: usize) -> Result<Self> {
        if scaled_steps == 0 {
            return Err(MatchError::InvalidValue("scaled_steps must be >= 1"));
        }
        let plot_scale = common_scale(scales).ok_or_else(|| {
            MatchError::InvalidConfig(format!(
                "no common time base for scales {:?}",
                scales.iter().map(|s| s.get()).collect::<Vec<_>>()
            ))
        })?;
        plot_scale.checked_mul(scaled_steps).ok_or(MatchError::OutOfRange {
            field: "scaled_steps",
            value: scaled_steps as f64,
            min: 1.0,
            max: (usize::MAX / plot_scale) as f64,
        })?;

        Ok(Self {
            plot_scale,
            scaled_steps,
            rows: Vec::new(),
        })
    }

    #[inline]
    pub fn plot_scale(&self) -> usize {
        self.plot_scale
    }

    /// Values in a full-length row
    #[inline]
    pub fn record_len(&self) -> usize {
        self.plot_scale * self.scaled_steps + 1
    }

    #[inline]
    pub fn rows(&self) -> &[AggregateRow] {
        &self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add the aftermaths of one symbol at one scale.
    ///
    /// Full-length aftermaths go through the batched path; runs cut short
    /// by the end of the series are truncated to whole segments of `scale`
    /// and rescaled individually.
    pub fn extend_scale(&mut self, symbol: &str, scale: Scale, aftermaths: &[Aftermath]) -> Result<()> {
        let full_len = self.scaled_steps * scale.get() + 1;
        let ratio = ScaleRatio::new(scale.get(), self.plot_scale)?;

        let (full, short): (Vec<&Aftermath>, Vec<&Aftermath>) =
            aftermaths.iter().partition(|a| a.values.len() >= full_len);

        if !full.is_empty() {
            let trimmed: Vec<&[f64]> = full.iter().map(|a| &a.values[..full_len]).collect();
            let mut batch = Rows::from_rows(&trimmed)?;
            initial_difference_rows(&mut batch);
            let scaled = resample_rows(&batch, ratio)?;
            for (a, values) in full.iter().zip(scaled.iter()) {
                self.rows.push(AggregateRow {
                    symbol: symbol.to_string(),
                    anchor: a.anchor,
                    scale,
                    values: values.to_vec(),
                });
            }
        }

        for a in short {
            let segments = a.values.len().saturating_sub(1) / scale.get();
            let values = if segments == 0 {
                vec![0.0]
            } else {
                let diff = initial_difference(&a.values[..segments * scale.get() + 1]);
                resample(&diff, ratio)?
            };
            self.rows.push(AggregateRow {
                symbol: symbol.to_string(),
                anchor: a.anchor,
                scale,
                values,
            });
        }

        Ok(())
    }

    /// Add every outcome of a series report.
    pub fn extend_report(&mut self, symbol: &str, report: &SeriesReport) -> Result<()> {
        for outcome in &report.outcomes {
            self.extend_scale(symbol, outcome.scale, &outcome.aftermaths)?;
        }
        Ok(())
    }

    /// Mean of each column over the rows long enough to reach it.
    pub fn average(&self) -> Vec<Option<f64>> {
        let len = self.record_len();
        let mut sums = vec![0.0; len];
        let mut counts = vec![0usize; len];
        for row in &self.rows {
            for (i, v) in row.values.iter().take(len).enumerate() {
                sums[i] += v;
                counts[i] += 1;
            }
        }
        sums.into_iter()
            .zip(counts)
            .map(|(s, n)| (n > 0).then(|| s / n as f64))
            .collect()
    }

    /// Produce the final view with `pattern` and its tolerance band overlaid.
    pub fn finish(self, pattern: &Pattern, tolerance: Tolerance) -> Result<AggregateView> {
        let mut overlay = resample(pattern.values(), ScaleRatio::new(1, self.plot_scale)?)?;
        crate::matching::initial_difference_in_place(&mut overlay);
        let eps = tolerance.get();
        let upper_band = overlay.iter().map(|v| v + eps).collect();
        let lower_band = overlay.iter().map(|v| v - eps).collect();

        let x_axis = (0..self.record_len())
            .map(|i| i as f64 / self.plot_scale as f64)
            .collect();
        let average = self.average();

        log::debug!(
            "aggregated {} rows on a base of {} values",
            self.rows.len(),
            self.record_len()
        );

        Ok(AggregateView {
            plot_scale: self.plot_scale,
            scaled_steps: self.scaled_steps,
            x_axis,
            rows: self.rows,
            average,
            pattern: overlay,
            upper_band,
            lower_band,
            tolerance: eps,
        })
    }
}

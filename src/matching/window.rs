//! Rolling window views over a series.
//!
//! A length-2 window over
//!
//! | time       | value |
//! |------------|-------|
//! | 2020-01-01 |    13 |
//! | 2020-01-02 |    16 |
//! | 2020-01-03 |    19 |
//!
//! yields `(2020-01-01, [13, 16])` and `(2020-01-02, [16, 19])`. Windows
//! borrow the series; nothing is copied.

use chrono::NaiveDateTime;

use crate::{MatchError, Result, Timeseries};

/// A contiguous run of series values anchored at its first timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window<'a> {
    pub start: NaiveDateTime,
    /// Position of the first value in the source series
    pub offset: usize,
    pub values: &'a [f64],
}

impl Window<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Iterator over every window of a fixed length, in series order.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    timestamps: std::slice::Iter<'a, NaiveDateTime>,
    values: std::slice::Windows<'a, f64>,
    offset: usize,
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let values = self.values.next()?;
        let start = *self.timestamps.next()?;
        let offset = self.offset;
        self.offset += 1;
        Some(Window {
            start,
            offset,
            values,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl ExactSizeIterator for Windows<'_> {}

/// Number of windows of length `len` a series of `series_len` values holds.
#[inline]
pub fn window_count(series_len: usize, len: usize) -> usize {
    if len == 0 || len > series_len {
        0
    } else {
        series_len - len + 1
    }
}

/// All `N - len + 1` windows of length `len`.
///
/// Requires `1 <= len <= N`; a window longer than the series is reported as
/// [`MatchError::InsufficientData`].
pub fn rolling_windows(series: &Timeseries, len: usize) -> Result<Windows<'_>> {
    if len == 0 {
        return Err(MatchError::InvalidValue("Window length must be > 0"));
    }
    if len > series.len() {
        return Err(MatchError::InsufficientData {
            need: len,
            got: series.len(),
        });
    }

    let count = window_count(series.len(), len);
    Ok(Windows {
        timestamps: series.timestamps()[..count].iter(),
        values: series.values().windows(len),
        offset: 0,
    })
}

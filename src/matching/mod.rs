//! Matching core
//!
//! The components the search engine is assembled from. Each one is a pure
//! transformation over in-memory slices; nothing here performs I/O.
//!
//! # Components
//!
//! - **resample**: piecewise-linear rescaling of a sequence's segment count
//! - **window**: zero-copy fixed-length windows over a [`Timeseries`](crate::Timeseries)
//! - **normalize**: initial differencing (offset invariance)
//! - **matcher**: multi-scale tolerance-band search
//! - **dedup**: one record per calendar day
//! - **outcome**: forward-looking aftermath extraction

pub mod dedup;
pub mod matcher;
pub mod normalize;
pub mod outcome;
pub mod resample;
pub mod window;

pub use dedup::*;
pub use matcher::*;
pub use normalize::*;
pub use outcome::*;
pub use resample::*;
pub use window::*;

use crate::{MatchError, Result};

/// A batch of equal-length sequences stored row-major in one allocation.
///
/// Used wherever the same operation is applied to many sequences at once
/// (batched resampling, batched initial differencing).
#[derive(Debug, Clone, PartialEq)]
pub struct Rows {
    data: Vec<f64>,
    width: usize,
}

impl Rows {
    /// Build a batch from a flat row-major buffer.
    pub fn from_flat(data: Vec<f64>, width: usize) -> Result<Self> {
        if width == 0 {
            return Err(MatchError::InvalidValue("Row width must be > 0"));
        }
        if data.len() % width != 0 {
            return Err(MatchError::InvalidConfig(format!(
                "buffer of {} values is not a whole number of rows of width {}",
                data.len(),
                width
            )));
        }
        Ok(Self { data, width })
    }

    /// Build a batch by copying rows that must all share one length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let width = match rows.first() {
            Some(r) => r.as_ref().len(),
            None => return Err(MatchError::InvalidValue("Row batch cannot be empty")),
        };
        let mut data = Vec::with_capacity(width * rows.len());
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(MatchError::InvalidConfig(format!(
                    "row of length {} in a batch of width {}",
                    row.len(),
                    width
                )));
            }
            data.extend_from_slice(row);
        }
        Self::from_flat(data, width)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.width
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.data.chunks_exact(self.width).nth(index)
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'_, f64> {
        self.data.chunks_exact(self.width)
    }

    pub fn iter_mut(&mut self) -> std::slice::ChunksExactMut<'_, f64> {
        self.data.chunks_exact_mut(self.width)
    }
}

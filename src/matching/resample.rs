//! Horizontal rescaling that preserves a sequence's graphical shape.
//!
//! Scaling works on the number of *segments* (gaps between values), not the
//! number of values. A 12-value sequence has 11 segments; rescaling it with
//! ratio `(1, 3)` yields 33 segments and therefore 34 values. Plotted against
//! a position axis normalized to `[0, 1]`, input and output trace the same
//! piecewise-linear curve.

use super::Rows;
use crate::{MatchError, Result};

/// Rescaling ratio: the scale the input is expressed in, and the scale the
/// output should conform to. Only the ratio between the two matters for the
/// curve, but `in_scale` also decides how many whole segments survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScaleRatio {
    pub in_scale: usize,
    pub out_scale: usize,
}

impl ScaleRatio {
    pub fn new(in_scale: usize, out_scale: usize) -> Result<Self> {
        if in_scale == 0 || out_scale == 0 {
            return Err(MatchError::InvalidValue("Scale ratio terms must be > 0"));
        }
        Ok(Self {
            in_scale,
            out_scale,
        })
    }

    /// Ratio that upsamples a pattern expressed in unit segments to `scale`.
    pub fn upscale(scale: crate::Scale) -> Self {
        Self {
            in_scale: 1,
            out_scale: scale.get(),
        }
    }

    /// Number of output values for an input of `len` values; `None` when
    /// it does not fit in a `usize`.
    #[inline]
    pub fn checked_output_len(&self, len: usize) -> Option<usize> {
        (len.saturating_sub(1) / self.in_scale)
            .checked_mul(self.out_scale)?
            .checked_add(1)
    }
}

/// Precomputed interpolation positions for one (input length, output length)
/// pair. Built once and applied to every row of a batch.
#[derive(Debug, Clone)]
struct InterpPlan {
    // (left control point, fractional distance towards the next one)
    points: Vec<(usize, f64)>,
}

impl InterpPlan {
    fn new(in_len: usize, out_len: usize) -> Self {
        if out_len == 1 {
            return Self {
                points: vec![(0, 0.0)],
            };
        }

        let in_segments = in_len - 1;
        let out_segments = out_len - 1;
        // Integer positions keep shared control points exact.
        let points = (0..out_len)
            .map(|j| {
                let numer = j * in_segments;
                let left = numer / out_segments;
                let rem = numer % out_segments;
                (left, rem as f64 / out_segments as f64)
            })
            .collect();

        Self { points }
    }

    #[inline]
    fn apply_into(&self, values: &[f64], out: &mut [f64]) {
        for (dst, &(left, frac)) in out.iter_mut().zip(&self.points) {
            *dst = if frac == 0.0 {
                values[left]
            } else {
                let a = values[left];
                a + (values[left + 1] - a) * frac
            };
        }
    }
}

/// Output length for `len` input values, validated so that every index
/// product of the interpolation plan fits in a `usize`.
fn plan_len(len: usize, ratio: ScaleRatio) -> Result<usize> {
    if len < 2 {
        return Err(MatchError::InsufficientData { need: 2, got: len });
    }
    ratio
        .checked_output_len(len)
        .filter(|out| out.checked_mul(len - 1).is_some())
        .ok_or(MatchError::OutOfRange {
            field: "out_scale",
            value: ratio.out_scale as f64,
            min: 1.0,
            max: (usize::MAX / len) as f64,
        })
}

/// Rescale a single sequence.
///
/// Fails with [`MatchError::InsufficientData`] when `values` has fewer than
/// two elements (there is no segment to interpolate along).
pub fn resample(values: &[f64], ratio: ScaleRatio) -> Result<Vec<f64>> {
    let out_len = plan_len(values.len(), ratio)?;
    let plan = InterpPlan::new(values.len(), out_len);
    let mut out = vec![0.0; out_len];
    plan.apply_into(values, &mut out);
    Ok(out)
}

/// Rescale every row of a batch with one shared interpolation plan.
pub fn resample_rows(rows: &Rows, ratio: ScaleRatio) -> Result<Rows> {
    let out_len = plan_len(rows.width(), ratio)?;
    let total = out_len.checked_mul(rows.len()).ok_or(MatchError::OutOfRange {
        field: "out_scale",
        value: ratio.out_scale as f64,
        min: 1.0,
        max: (usize::MAX / rows.len()) as f64,
    })?;
    let plan = InterpPlan::new(rows.width(), out_len);
    let mut out = vec![0.0; total];
    for (src, dst) in rows.iter().zip(out.chunks_exact_mut(out_len)) {
        plan.apply_into(src, dst);
    }
    Rows::from_flat(out, out_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ratio(a: usize, b: usize) -> ScaleRatio {
        ScaleRatio::new(a, b).unwrap()
    }

    #[test]
    fn test_output_len() {
        assert_eq!(ratio(1, 3).checked_output_len(12), Some(34));
        assert_eq!(ratio(1, 1).checked_output_len(5), Some(5));
        assert_eq!(ratio(2, 6).checked_output_len(11), Some(31));
        // Partial trailing segments are dropped
        assert_eq!(ratio(3, 3).checked_output_len(5), Some(4));
        assert_eq!(ratio(5, 1).checked_output_len(3), Some(1));
    }

    #[test]
    fn test_output_len_overflow() {
        assert_eq!(ratio(1, usize::MAX / 2).checked_output_len(5), None);
        assert_eq!(ratio(1, usize::MAX).checked_output_len(2), None);
        assert!(matches!(
            resample(&[1.0, 2.0, 3.0, 4.0, 5.0], ratio(1, usize::MAX / 2)),
            Err(MatchError::OutOfRange { .. })
        ));
        let rows = Rows::from_rows(&[[0.0, 1.0], [2.0, 3.0]]).unwrap();
        assert!(matches!(
            resample_rows(&rows, ratio(1, usize::MAX)),
            Err(MatchError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_upsample_linear() {
        let out = resample(&[0.0, 1.0, 0.0], ratio(1, 2)).unwrap();
        assert_eq!(out.len(), 5);
        let expected = [0.0, 0.5, 1.0, 0.5, 0.0];
        for (a, b) in out.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_control_points_exact() {
        let values = [1.04, 1.004, 1.032, 1.008, 1.024];
        let out = resample(&values, ratio(1, 7)).unwrap();
        for (i, v) in values.iter().enumerate() {
            assert_eq!(out[i * 7], *v);
        }
    }

    #[test]
    fn test_downsample() {
        let values: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let out = resample(&values, ratio(5, 1)).unwrap();
        assert_eq!(out, vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            resample(&[1.0], ratio(1, 2)),
            Err(MatchError::InsufficientData { need: 2, got: 1 })
        ));
        assert!(resample(&[], ratio(1, 2)).is_err());
    }

    #[test]
    fn test_zero_ratio_rejected() {
        assert!(ScaleRatio::new(0, 1).is_err());
        assert!(ScaleRatio::new(1, 0).is_err());
    }

    #[test]
    fn test_rows_match_single() {
        let a = [0.0, 2.0, 1.0];
        let b = [5.0, 4.0, 6.0];
        let rows = Rows::from_rows(&[a, b]).unwrap();
        let out = resample_rows(&rows, ratio(1, 4)).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.width(), 9);
        assert_eq!(out.row(0).unwrap(), resample(&a, ratio(1, 4)).unwrap().as_slice());
        assert_eq!(out.row(1).unwrap(), resample(&b, ratio(1, 4)).unwrap().as_slice());
    }

    proptest! {
        #[test]
        fn prop_identity_when_scale_divides_segments(
            values in prop::collection::vec(-100.0f64..100.0, 2..40),
            k in 1usize..6,
        ) {
            // Trim so that k divides the segment count
            let keep = (values.len() - 1) / k * k + 1;
            prop_assume!(keep >= 2);
            let values = &values[..keep];
            let out = resample(values, ratio(k, k)).unwrap();
            prop_assert_eq!(out.len(), values.len());
            for (a, b) in out.iter().zip(values) {
                prop_assert!((a - b).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_monotonic_preserved(
            steps in prop::collection::vec(0.0f64..10.0, 1..30),
            scale in 1usize..25,
        ) {
            let mut acc = 0.0;
            let mut values = vec![acc];
            for s in steps {
                acc += s;
                values.push(acc);
            }
            let out = resample(&values, ratio(1, scale)).unwrap();
            for w in out.windows(2) {
                prop_assert!(w[1] >= w[0]);
            }
        }
    }
}

//! Initial differencing.
//!
//! Every value of a sequence has the sequence's first value subtracted:
//! `[3, 4, -6, 5, 26, 1] -> [0, 1, -9, 2, 23, -2]`. The result keeps only
//! the shape of relative movement, so comparisons become offset-invariant.

use super::Rows;

/// Initial differencing in place. Empty input is left untouched.
#[inline]
pub fn initial_difference_in_place(values: &mut [f64]) {
    let Some(&first) = values.first() else {
        return;
    };
    values.iter_mut().for_each(|v| *v -= first);
    // inf - inf is NaN
    values[0] = 0.0;
}

/// Initially differenced copy of `values`.
pub fn initial_difference(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    initial_difference_in_place(&mut out);
    out
}

/// Initial differencing applied to each row of a batch independently.
pub fn initial_difference_rows(rows: &mut Rows) {
    rows.iter_mut().for_each(initial_difference_in_place);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_example() {
        let out = initial_difference(&[3.0, 4.0, -6.0, 5.0, 26.0, 1.0]);
        assert_eq!(out, vec![0.0, 1.0, -9.0, 2.0, 23.0, -2.0]);
    }

    #[test]
    fn test_empty() {
        assert!(initial_difference(&[]).is_empty());
    }

    #[test]
    fn test_rows_independent() {
        let mut rows = Rows::from_rows(&[[5.0, 6.0, 4.0], [-1.0, -1.0, 0.0]]).unwrap();
        initial_difference_rows(&mut rows);
        assert_eq!(rows.row(0).unwrap(), &[0.0, 1.0, -1.0]);
        assert_eq!(rows.row(1).unwrap(), &[0.0, 0.0, 1.0]);
    }

    proptest! {
        #[test]
        fn prop_first_is_zero(values in prop::collection::vec(-1e6f64..1e6, 1..64)) {
            let out = initial_difference(&values);
            prop_assert_eq!(out.len(), values.len());
            prop_assert_eq!(out[0], 0.0);
        }
    }
}

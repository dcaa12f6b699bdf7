use ndarray::{Array1, Array2, Axis};

use crate::error::{Result, SdrError};

/// Column-wise moments of a dense samples × features matrix.
pub trait ColumnStats {
    /// Per-feature mean over all rows.
    fn column_means(&self) -> Result<Array1<f64>>;

    /// Copy of the matrix with `mean` subtracted from every row.
    fn centered(&self, mean: &Array1<f64>) -> Result<Array2<f64>>;

    /// Feature covariance, normalised by `n - ddof`.
    fn covariance(&self, ddof: f64) -> Result<Array2<f64>>;

    /// Fails with [`SdrError::NonFiniteInput`] on the first NaN or infinity.
    fn ensure_finite(&self, what: &'static str) -> Result<()>;
}

pub(crate) fn ensure_finite_values<'a>(
    values: impl IntoIterator<Item = &'a f64>,
    what: &'static str,
) -> Result<()> {
    match values.into_iter().position(|v| !v.is_finite()) {
        Some(index) => Err(SdrError::NonFiniteInput { what, index }),
        None => Ok(()),
    }
}

/// Scales every row to unit length and flips its sign so the entry with the
/// largest magnitude is positive. Rows that are numerically zero are left alone.
pub(crate) fn normalize_and_orient_rows(directions: &mut Array2<f64>) {
    for mut row in directions.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm <= f64::EPSILON {
            continue;
        }
        row /= norm;

        let pivot = row
            .iter()
            .copied()
            .fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
        if pivot < 0.0 {
            row.mapv_inplace(|v| -v);
        }
    }
}

use ndarray::{Array1, Array2, ArrayView2, Axis};
use nshare::{IntoNalgebra, IntoNdarray2};

use crate::error::{Result, SdrError};

/// Eigen-decomposition of a real symmetric matrix.
///
/// Eigenpairs are ordered by descending eigenvalue magnitude; equal
/// magnitudes keep the order nalgebra produced them in, so the result is
/// deterministic for a given input. Eigenvectors are stored as columns.
pub struct SymmetricEigen {
    values: Array1<f64>,
    vectors: Array2<f64>,
}

impl SymmetricEigen {
    pub fn new(matrix: ArrayView2<f64>) -> Result<Self> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(SdrError::InvalidShape {
                what: "columns of symmetric matrix",
                expected: rows,
                found: cols,
            });
        }

        // Round-off in A^T A style products leaves tiny asymmetries.
        let symmetric = (&matrix + &matrix.t()) * 0.5;
        let decomposition = nalgebra::SymmetricEigen::new(symmetric.into_nalgebra());

        let raw_values: Vec<f64> = decomposition.eigenvalues.iter().copied().collect();
        if raw_values.iter().any(|v| !v.is_finite()) {
            return Err(SdrError::NumericalInstability(
                "symmetric eigen-decomposition produced non-finite eigenvalues".to_string(),
            ));
        }

        let mut order: Vec<usize> = (0..raw_values.len()).collect();
        order.sort_by(|&a, &b| raw_values[b].abs().total_cmp(&raw_values[a].abs()));

        let raw_vectors = decomposition.eigenvectors.into_ndarray2().into_owned();
        let vectors = raw_vectors.select(Axis(1), &order);
        let values = order.iter().map(|&i| raw_values[i]).collect::<Array1<f64>>();

        Ok(SymmetricEigen { values, vectors })
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn vectors(&self) -> &Array2<f64> {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_sorted_by_magnitude() {
        let m = array![[1.0, 0.0, 0.0], [0.0, -5.0, 0.0], [0.0, 0.0, 3.0]];
        let eig = SymmetricEigen::new(m.view()).unwrap();

        assert_eq!(eig.len(), 3);
        assert_abs_diff_eq!(eig.values()[0], -5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.values()[1], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.values()[2], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.vectors()[[1, 0]].abs(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.vectors()[[2, 1]].abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reconstruction() {
        let m = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        let eig = SymmetricEigen::new(m.view()).unwrap();

        let v = eig.vectors();
        let d = Array2::from_diag(eig.values());
        let reconstructed = v.dot(&d).dot(&v.t());
        for i in 0..3 {
            for j in 0..3 {
                assert_abs_diff_eq!(reconstructed[[i, j]], m[[i, j]], epsilon = 1e-10);
            }
        }

        let gram = v.t().dot(v);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_rejects_non_square() {
        let m = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            SymmetricEigen::new(m.view()),
            Err(SdrError::InvalidShape { .. })
        ));
    }
}

use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};

use crate::error::{Result, SdrError};
use crate::utils::{ensure_finite_values, ColumnStats};

impl<S> ColumnStats for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn column_means(&self) -> Result<Array1<f64>> {
        self.mean_axis(Axis(0)).ok_or(SdrError::InvalidShape {
            what: "rows for column means",
            expected: 1,
            found: 0,
        })
    }

    fn centered(&self, mean: &Array1<f64>) -> Result<Array2<f64>> {
        if mean.len() != self.ncols() {
            return Err(SdrError::InvalidShape {
                what: "mean length",
                expected: self.ncols(),
                found: mean.len(),
            });
        }
        let mut out = self.to_owned();
        out -= mean;
        Ok(out)
    }

    fn covariance(&self, ddof: f64) -> Result<Array2<f64>> {
        let n = self.nrows() as f64;
        if n - ddof <= 0.0 {
            return Err(SdrError::InvalidShape {
                what: "rows for covariance",
                expected: ddof.floor() as usize + 1,
                found: self.nrows(),
            });
        }
        let mean = self.column_means()?;
        let centered = self.centered(&mean)?;
        Ok(centered.t().dot(&centered) / (n - ddof))
    }

    fn ensure_finite(&self, what: &'static str) -> Result<()> {
        ensure_finite_values(self.iter(), what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_column_means_and_centering() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 9.0]];
        let mean = x.column_means().unwrap();
        assert_relative_eq!(mean[0], 3.0);
        assert_relative_eq!(mean[1], 5.0);

        let centered = x.view().centered(&mean).unwrap();
        assert_relative_eq!(centered.column(0).sum(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(centered.column(1).sum(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(centered[[2, 1]], 4.0);
    }

    #[test]
    fn test_covariance() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]];

        let cov = x.covariance(1.0).unwrap();
        assert_relative_eq!(cov[[0, 0]], 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[0, 1]], 10.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[1, 0]], cov[[0, 1]]);
        assert_relative_eq!(cov[[1, 1]], 20.0 / 3.0, epsilon = 1e-12);

        let population = x.covariance(0.0).unwrap();
        assert_relative_eq!(population[[0, 0]], 1.25, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_errors() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(empty.column_means().is_err());

        let single = array![[1.0, 2.0]];
        assert!(single.covariance(1.0).is_err());

        let x = array![[1.0, 2.0]];
        assert!(x.centered(&array![1.0]).is_err());
    }

    #[test]
    fn test_ensure_finite() {
        let x = array![[1.0, 2.0], [f64::INFINITY, 4.0]];
        match x.ensure_finite("X") {
            Err(SdrError::NonFiniteInput { index, .. }) => assert_eq!(index, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

//! Thin singular value decomposition over nalgebra, kept in ndarray form.

use anyhow::{anyhow, bail};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use nshare::{IntoNalgebra, IntoNdarray2};

/// Thin SVD `X = U · diag(s) · Vt` with singular values in descending order.
pub struct SVD {
    u: Option<Array2<f64>>,
    s: Option<Array1<f64>>,
    vt: Option<Array2<f64>>,
}

impl SVD {
    pub fn new() -> Self {
        SVD {
            u: None,
            s: None,
            vt: None,
        }
    }

    pub fn compute(&mut self, x: ArrayView2<f64>) -> anyhow::Result<()> {
        if x.is_empty() {
            bail!("cannot decompose an empty {}x{} matrix", x.nrows(), x.ncols());
        }
        let matrix = x.to_owned().into_nalgebra();

        let svd = nalgebra::SVD::try_new(matrix, true, true, f64::EPSILON, 0)
            .ok_or_else(|| anyhow!("SVD did not converge"))?;
        let u = svd.u.ok_or_else(|| anyhow!("SVD returned no left singular vectors"))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| anyhow!("SVD returned no right singular vectors"))?;

        let s = Array1::from(svd.singular_values.as_slice().to_vec());
        if s.iter().any(|v| !v.is_finite()) {
            bail!("SVD produced non-finite singular values");
        }

        // nalgebra does not guarantee an ordering.
        let mut order: Vec<usize> = (0..s.len()).collect();
        order.sort_by(|&a, &b| s[b].total_cmp(&s[a]));

        let u = u.into_ndarray2().into_owned();
        let vt = v_t.into_ndarray2().into_owned();

        self.u = Some(u.select(Axis(1), &order));
        self.s = Some(s.select(Axis(0), &order));
        self.vt = Some(vt.select(Axis(0), &order));

        Ok(())
    }

    pub fn u(&self) -> Option<&Array2<f64>> {
        self.u.as_ref()
    }

    pub fn s(&self) -> Option<&Array1<f64>> {
        self.s.as_ref()
    }

    pub fn vt(&self) -> Option<&Array2<f64>> {
        self.vt.as_ref()
    }

    pub fn reconstruct(&self) -> Option<Array2<f64>> {
        match (self.u(), self.s(), self.vt()) {
            (Some(u), Some(s), Some(vt)) => {
                let s_diag = Array2::from_diag(s);
                Some(u.dot(&s_diag).dot(vt))
            }
            _ => None,
        }
    }

    /// Moves out `(U, s, Vt)`, or `None` before [`compute`](Self::compute).
    pub fn into_factors(self) -> Option<(Array2<f64>, Array1<f64>, Array2<f64>)> {
        match (self.u, self.s, self.vt) {
            (Some(u), Some(s), Some(vt)) => Some((u, s, vt)),
            _ => None,
        }
    }
}

impl Default for SVD {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn test_simple_svd() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let mut svd = SVD::new();
        svd.compute(a.view()).unwrap();
        let s = svd.s().unwrap();
        let vt = svd.vt().unwrap();
        let u = svd.u().unwrap();
        assert_eq!(u.shape(), &[2, 2]);
        assert_eq!(s.len(), 2);
        assert_eq!(vt.shape(), &[2, 2]);

        assert_abs_diff_eq!(s[0], 5.4649857, epsilon = 1e-6);
        assert_abs_diff_eq!(s[1], 0.3659662, epsilon = 1e-6);

        let reconstructed = svd.reconstruct().unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(reconstructed[[i, j]], a[[i, j]], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_thin_factors_for_tall_matrix() {
        let a = array![[3.0, 0.0], [0.0, 1.0], [0.0, 0.0], [0.0, 0.0]];
        let mut svd = SVD::new();
        svd.compute(a.view()).unwrap();

        let (u, s, vt) = svd.into_factors().unwrap();
        assert_eq!(u.dim(), (4, 2));
        assert_eq!(vt.dim(), (2, 2));
        assert_abs_diff_eq!(s[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_before_compute() {
        let svd = SVD::default();
        assert!(svd.reconstruct().is_none());
        assert!(svd.into_factors().is_none());

        let mut svd = SVD::new();
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(svd.compute(empty.view()).is_err());
    }
}

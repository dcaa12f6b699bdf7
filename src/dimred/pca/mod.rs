//! # Principal Component Analysis
//!
//! Dense PCA over a pluggable SVD backend. It ignores the response entirely and
//! is kept as the unsupervised reference the sliced estimators are compared
//! against: on isotropic features its leading component points in an arbitrary
//! direction, whatever `y` depends on.

use log::debug;
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use std::sync::Arc;

use crate::error::{Result, SdrError};
use crate::utils::{normalize_and_orient_rows, ColumnStats};

/// Thin SVD backend used by [`Pca`].
pub trait SVDImplementation: Send + Sync {
    /// Thin SVD `X = U S Vᵀ` with singular values in descending order.
    fn compute(
        &self,
        matrix: ArrayView2<f64>,
    ) -> anyhow::Result<(Array2<f64>, Array1<f64>, Array2<f64>)>;
}

/// SVD backed by nalgebra, see [`crate::svd::SVD`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NalgebraSVD;

impl SVDImplementation for NalgebraSVD {
    fn compute(
        &self,
        matrix: ArrayView2<f64>,
    ) -> anyhow::Result<(Array2<f64>, Array1<f64>, Array2<f64>)> {
        let mut svd = crate::svd::SVD::new();
        svd.compute(matrix)?;
        svd.into_factors()
            .ok_or_else(|| anyhow::anyhow!("SVD finished without producing factors"))
    }
}

/// Builder for [`Pca`].
///
/// Default values:
/// - `n_components`: `min(n_samples, n_features)`, resolved at fit time
/// - `center`: true
/// - `scale`: false
pub struct PCABuilder<S: SVDImplementation> {
    n_components: Option<usize>,
    center: bool,
    scale: bool,
    svd_implementation: Arc<S>,
}

impl<S: SVDImplementation> PCABuilder<S> {
    pub fn new(svd_implementation: S) -> Self {
        PCABuilder {
            n_components: None,
            center: true,
            scale: false,
            svd_implementation: Arc::new(svd_implementation),
        }
    }

    /// Must not exceed `min(n_samples, n_features)` of the data passed to `fit`.
    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
        self
    }

    pub fn center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    /// Divide each feature by its standard deviation after centering.
    /// Constant features are left unscaled.
    pub fn scale(mut self, scale: bool) -> Self {
        self.scale = scale;
        self
    }

    pub fn build(self) -> Pca<S> {
        Pca {
            n_components: self.n_components,
            center: self.center,
            scale: self.scale,
            svd_implementation: self.svd_implementation,
            fitted: None,
        }
    }
}

/// Everything `fit` learns; replaced wholesale on refit.
#[derive(Debug, Clone)]
struct FittedPca {
    components: Array2<f64>,
    mean: Option<Array1<f64>>,
    std_dev: Option<Array1<f64>>,
    eigenvalues: Array1<f64>,
    explained_variance_ratio: Array1<f64>,
    total_variance: f64,
}

pub struct Pca<S: SVDImplementation> {
    n_components: Option<usize>,
    center: bool,
    scale: bool,
    svd_implementation: Arc<S>,
    fitted: Option<FittedPca>,
}

impl<S: SVDImplementation> Pca<S> {
    /// Fits the components to `x` (n × p). On error the previous fit is kept.
    pub fn fit(&mut self, x: ArrayView2<f64>) -> Result<&mut Self> {
        let (n_samples, n_features) = x.dim();
        if n_samples < 2 {
            return Err(SdrError::InvalidShape {
                what: "observations (minimum)",
                expected: 2,
                found: n_samples,
            });
        }
        if n_features == 0 {
            return Err(SdrError::InvalidShape {
                what: "features (minimum)",
                expected: 1,
                found: 0,
            });
        }
        x.ensure_finite("X")?;

        let max_components = n_samples.min(n_features);
        let n_components = self.n_components.unwrap_or(max_components);
        if n_components == 0 || n_components > max_components {
            return Err(SdrError::InvalidConfiguration(format!(
                "n_components={} must be in 1..={} (min(n_samples, n_features))",
                n_components, max_components
            )));
        }

        let mean = if self.center {
            Some(x.column_means()?)
        } else {
            None
        };
        let std_dev = if self.scale {
            Some(
                x.std_axis(Axis(0), 0.0)
                    .mapv(|sd| if sd > f64::EPSILON { sd } else { 1.0 }),
            )
        } else {
            None
        };

        let x_preprocessed = preprocess(x, mean.as_ref(), std_dev.as_ref());
        let (_u, s, vt) = self.svd_implementation.compute(x_preprocessed.view())?;
        if vt.nrows() < n_components || s.len() < n_components {
            return Err(SdrError::NumericalInstability(format!(
                "SVD returned {} components, {} requested",
                vt.nrows().min(s.len()),
                n_components
            )));
        }

        let mut components = vt.slice(s![..n_components, ..]).to_owned();
        normalize_and_orient_rows(&mut components);

        let variances = s.mapv(|v| v * v / (n_samples as f64 - 1.0));
        let total_variance = variances.sum();
        let ratio = if total_variance > 0.0 {
            &variances / total_variance
        } else {
            Array1::zeros(variances.len())
        };

        debug!(
            "PCA kept {} of {} components, explaining {:.4} of the variance",
            n_components,
            variances.len(),
            ratio.slice(s![..n_components]).sum()
        );

        self.fitted = Some(FittedPca {
            components,
            mean,
            std_dev,
            eigenvalues: variances.slice(s![..n_components]).to_owned(),
            explained_variance_ratio: ratio.slice(s![..n_components]).to_owned(),
            total_variance,
        });
        Ok(self)
    }

    /// Projects `x` onto the fitted components, after the same centering and
    /// scaling as the training data.
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or(SdrError::NotFitted { estimator: "Pca" })?;
        if x.ncols() != fitted.components.ncols() {
            return Err(SdrError::InvalidShape {
                what: "feature count",
                expected: fitted.components.ncols(),
                found: x.ncols(),
            });
        }

        let x_preprocessed = preprocess(x, fitted.mean.as_ref(), fitted.std_dev.as_ref());
        Ok(x_preprocessed.dot(&fitted.components.t()))
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// `n_components × n_features`, one unit-length component per row.
    pub fn components(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.components)
    }

    pub fn explained_variance_ratio(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|f| &f.explained_variance_ratio)
    }

    /// Sum of the variances along all components, not just the kept ones.
    pub fn total_variance(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.total_variance)
    }

    /// Variance along each kept component (`s² / (n - 1)`).
    pub fn eigenvalues(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|f| &f.eigenvalues)
    }
}

fn preprocess(
    x: ArrayView2<f64>,
    mean: Option<&Array1<f64>>,
    std_dev: Option<&Array1<f64>>,
) -> Array2<f64> {
    let mut x_preprocessed = x.to_owned();

    if let Some(m) = mean {
        x_preprocessed
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|mut row| {
                row -= m;
            });
    }

    if let Some(sd) = std_dev {
        x_preprocessed
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|mut row| {
                row /= sd;
            });
    }

    x_preprocessed
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_pca_with_nalgebra_svd() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let mut pca = PCABuilder::new(NalgebraSVD).n_components(2).build();

        pca.fit(x.view()).unwrap();

        assert!(pca.components().is_some());
        assert_eq!(pca.components().unwrap().dim(), (2, 2));
    }

    #[test]
    fn test_pca_with_different_n_components() {
        let x = array![
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.5],
            [7.0, 8.5, 9.0],
            [2.0, 0.5, 1.0]
        ];

        let mut pca_1 = PCABuilder::new(NalgebraSVD).n_components(1).build();
        let transformed_1 = pca_1.fit_transform(x.view()).unwrap();
        assert_eq!(transformed_1.shape(), &[4, 1]);

        let mut pca_3 = PCABuilder::new(NalgebraSVD).n_components(3).build();
        let transformed_3 = pca_3.fit_transform(x.view()).unwrap();
        assert_eq!(transformed_3.shape(), &[4, 3]);

        let ratio = pca_3.explained_variance_ratio().unwrap();
        assert_abs_diff_eq!(ratio.sum(), 1.0, epsilon = 1e-10);
        assert!(ratio[0] >= ratio[1] && ratio[1] >= ratio[2]);
    }

    #[test]
    fn test_pca_finds_dominant_axis() {
        let x = array![
            [-2.0, -2.1],
            [-1.0, -0.9],
            [0.0, 0.1],
            [1.0, 1.0],
            [2.0, 1.9],
            [3.0, 3.05]
        ];
        let mut pca = PCABuilder::new(NalgebraSVD).n_components(1).build();
        pca.fit(x.view()).unwrap();

        let component = pca.components().unwrap().row(0).to_owned();
        let s = 1.0 / 2.0f64.sqrt();
        assert_abs_diff_eq!(component[0], s, epsilon = 0.05);
        assert_abs_diff_eq!(component[1], s, epsilon = 0.05);
    }

    #[test]
    fn test_eigenvalues_match_covariance() {
        let x = array![[2.0, 0.0], [-2.0, 0.0], [0.0, 1.0], [0.0, -1.0]];
        let mut pca = PCABuilder::new(NalgebraSVD).build();
        pca.fit(x.view()).unwrap();

        let eigenvalues = pca.eigenvalues().unwrap();
        assert_abs_diff_eq!(eigenvalues[0], 8.0 / 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(eigenvalues[1], 2.0 / 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(pca.total_variance().unwrap(), 10.0 / 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_scaled_pca_handles_constant_column() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [4.0, 5.0]];
        let mut pca = PCABuilder::new(NalgebraSVD).scale(true).n_components(1).build();
        let transformed = pca.fit_transform(x.view()).unwrap();
        assert!(transformed.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_pca_transform_without_fit() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let pca = PCABuilder::new(NalgebraSVD).n_components(2).build();

        assert!(matches!(
            pca.transform(x.view()),
            Err(SdrError::NotFitted { estimator: "Pca" })
        ));
    }

    #[test]
    fn test_pca_rejects_bad_shapes() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 7.0]];
        let mut pca = PCABuilder::new(NalgebraSVD).n_components(5).build();
        assert!(matches!(
            pca.fit(x.view()),
            Err(SdrError::InvalidConfiguration(_))
        ));

        let mut pca = PCABuilder::new(NalgebraSVD).build();
        pca.fit(x.view()).unwrap();
        let wrong = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            pca.transform(wrong.view()),
            Err(SdrError::InvalidShape { .. })
        ));
    }

    struct FailingSVD;

    impl SVDImplementation for FailingSVD {
        fn compute(
            &self,
            _matrix: ArrayView2<f64>,
        ) -> anyhow::Result<(Array2<f64>, Array1<f64>, Array2<f64>)> {
            anyhow::bail!("backend unavailable")
        }
    }

    #[test]
    fn test_backend_errors_propagate() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 7.0]];
        let mut pca = PCABuilder::new(FailingSVD).build();
        assert!(matches!(pca.fit(x.view()), Err(SdrError::Backend(_))));
        assert!(!pca.is_fitted());
    }

    #[test]
    fn test_failed_refit_keeps_components() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 7.0]];
        let mut pca = PCABuilder::new(NalgebraSVD).n_components(2).build();
        pca.fit(x.view()).unwrap();
        let before = pca.components().unwrap().clone();

        let short = array![[1.0, 2.0]];
        assert!(pca.fit(short.view()).is_err());
        assert_eq!(pca.components().unwrap(), &before);
    }
}

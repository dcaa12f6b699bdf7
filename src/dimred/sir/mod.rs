//! # Sliced Inverse Regression
//!
//! Estimates directions of the central subspace from the inverse regression
//! curve `E[X | y]`. Observations are sorted by response and cut into slices;
//! the weighted covariance of the slice means of the whitened features is then
//! eigen-decomposed and its leading eigenvectors are mapped back to feature space.
//!
//! The resulting directions solve the generalized eigenproblem `A v = λ Σ v`
//! where `A` is the between-slice covariance of the centered features and `Σ`
//! their overall covariance.
//!
//! SIR is blind to symmetric links such as `y = (x·β)²`, where every slice mean
//! is zero; use [`crate::dimred::save`] for those.

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::dimred::sliced::{prepare, FittedDirections, SlicedConfig};
use crate::dimred::SupervisedReduction;
use crate::error::{Result, SdrError};
use crate::slicing::Slices;
use crate::whitening::CovarianceRegularization;

const ESTIMATOR: &str = "SlicedInverseRegression";

/// Sliced Inverse Regression direction estimator.
///
/// # Example Usage
/// ```ignore
/// let mut sir = SirBuilder::new().n_directions(1).n_slices(10).build()?;
/// let reduced = sir.fit_transform(x.view(), y.view())?;
/// let beta = sir.directions().unwrap().row(0);
/// ```
#[derive(Debug, Clone)]
pub struct SlicedInverseRegression {
    config: SlicedConfig,
    fitted: Option<FittedDirections>,
}

impl SlicedInverseRegression {
    /// Creates an estimator keeping `n_directions` directions from `n_slices` slices.
    pub fn new(n_directions: usize, n_slices: usize) -> Result<Self> {
        SirBuilder::new()
            .n_directions(n_directions)
            .n_slices(n_slices)
            .build()
    }

    pub fn builder() -> SirBuilder {
        SirBuilder::new()
    }

    pub fn config(&self) -> &SlicedConfig {
        &self.config
    }

    /// Fits the directions to `x` (n × p) and `y` (length n).
    ///
    /// Inputs are validated before anything is computed. On error the
    /// previously fitted state, if any, is left untouched.
    ///
    /// # Returns
    /// - `Ok(&mut self)`: fitted, ready for `transform`
    /// - `Err(InvalidShape)`: `y` length differs from the rows of `x`, fewer
    ///   than two observations, or no features
    /// - `Err(DegenerateResponse)`: every `y` is identical
    /// - `Err(NonFiniteInput)`: NaN or infinity in `x` or `y`
    /// - `Err(NumericalInstability)`: the covariance could not be regularized
    pub fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<&mut Self> {
        let prepared = prepare(x, y, &self.config)?;
        let kernel = between_slice_covariance(prepared.z.view(), &prepared.slices);
        let fitted = FittedDirections::from_kernel(kernel.view(), prepared, self.config.n_directions)?;

        debug!(
            "{} fitted {} direction(s), leading eigenvalue {:?}",
            ESTIMATOR,
            fitted.n_directions(),
            fitted.eigenvalues().get(0)
        );

        self.fitted = Some(fitted);
        Ok(self)
    }

    /// Projects `x` (m × p) onto the fitted directions, giving m × n_directions.
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.fitted
            .as_ref()
            .ok_or(SdrError::NotFitted {
                estimator: ESTIMATOR,
            })?
            .project(x)
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<Array2<f64>> {
        self.fit(x, y)?;
        self.transform(x)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn fitted(&self) -> Option<&FittedDirections> {
        self.fitted.as_ref()
    }

    pub fn directions(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(FittedDirections::directions)
    }

    pub fn eigenvalues(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(FittedDirections::eigenvalues)
    }
}

impl Default for SlicedInverseRegression {
    fn default() -> Self {
        Self {
            config: SlicedConfig::default(),
            fitted: None,
        }
    }
}

impl SupervisedReduction for SlicedInverseRegression {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<&mut Self> {
        SlicedInverseRegression::fit(self, x, y)
    }

    fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        SlicedInverseRegression::transform(self, x)
    }
}

/// Weighted covariance of the slice means of `z`, weights `n_h / n`.
pub(crate) fn between_slice_covariance(z: ArrayView2<f64>, slices: &Slices) -> Array2<f64> {
    let weights = slices.weights();
    let mut means = Array2::zeros((slices.len(), z.ncols()));
    for (h, members) in slices.iter().enumerate() {
        let sum = z.select(Axis(0), members).sum_axis(Axis(0));
        means.row_mut(h).assign(&(sum / members.len() as f64));
    }

    // Equals the mean of z, which is zero up to round-off after centering.
    let grand_mean = weights.dot(&means);
    debug!(
        "grand mean of working features: max |m| = {:e}",
        grand_mean.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    );

    let mut deviations = means - &grand_mean;
    for (mut row, &w) in deviations.axis_iter_mut(Axis(0)).zip(weights.iter()) {
        row *= w.sqrt();
    }
    deviations.t().dot(&deviations)
}

/// Builder for [`SlicedInverseRegression`].
///
/// Default values:
/// - `n_directions`: 2
/// - `n_slices`: 10
/// - `whiten`: true
/// - `regularization`: `Cutoff(1e-10)`
#[derive(Debug, Clone, Default)]
pub struct SirBuilder {
    config: SlicedConfig,
}

impl SirBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_directions(mut self, n_directions: usize) -> Self {
        self.config.n_directions = n_directions;
        self
    }

    /// Sets the number of response slices. Must be at least 2.
    pub fn n_slices(mut self, n_slices: usize) -> Self {
        self.config.n_slices = n_slices;
        self
    }

    /// Sets whether to whiten the features before slicing.
    ///
    /// Without whitening the directions are eigenvectors of the between-slice
    /// covariance of the centered features, not generalized eigenvectors.
    pub fn whiten(mut self, whiten: bool) -> Self {
        self.config.whiten = whiten;
        self
    }

    pub fn regularization(mut self, regularization: CovarianceRegularization) -> Self {
        self.config.regularization = regularization;
        self
    }

    /// Shorthand for `regularization(CovarianceRegularization::Cutoff(tolerance))`.
    pub fn tolerance(self, tolerance: f64) -> Self {
        self.regularization(CovarianceRegularization::Cutoff(tolerance))
    }

    pub fn build(self) -> Result<SlicedInverseRegression> {
        self.config.validate()?;
        Ok(SlicedInverseRegression {
            config: self.config,
            fitted: None,
        })
    }
}

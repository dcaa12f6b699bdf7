//! # Sliced Average Variance Estimation
//!
//! Second-moment counterpart of SIR. Instead of slice means, SAVE looks at how
//! the covariance of the whitened features inside each slice departs from the
//! identity:
//!
//! `M = Σ_h (n_h / n) (I - V_h)²`
//!
//! with `V_h` the covariance of the whitened rows in slice `h`. Directions along
//! which the spread of `X` changes with `y` show up even when the slice means do
//! not move, which is what happens for symmetric links like `y = (x·β)²`.
//!
//! SAVE always whitens; the kernel is only meaningful against identity covariance.

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::dimred::sliced::{prepare, FittedDirections, SlicedConfig};
use crate::dimred::SupervisedReduction;
use crate::error::{Result, SdrError};
use crate::slicing::Slices;
use crate::utils::ColumnStats;
use crate::whitening::CovarianceRegularization;

const ESTIMATOR: &str = "SlicedAverageVarianceEstimation";

#[derive(Debug, Clone)]
pub struct SlicedAverageVarianceEstimation {
    config: SlicedConfig,
    fitted: Option<FittedDirections>,
}

impl SlicedAverageVarianceEstimation {
    pub fn new(n_directions: usize, n_slices: usize) -> Result<Self> {
        SaveBuilder::new()
            .n_directions(n_directions)
            .n_slices(n_slices)
            .build()
    }

    pub fn builder() -> SaveBuilder {
        SaveBuilder::new()
    }

    pub fn config(&self) -> &SlicedConfig {
        &self.config
    }

    /// Fits the directions to `x` (n × p) and `y` (length n). Validation and
    /// failure behavior match [`SlicedInverseRegression::fit`](crate::dimred::sir::SlicedInverseRegression::fit).
    pub fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<&mut Self> {
        let prepared = prepare(x, y, &self.config)?;
        let kernel = average_variance_kernel(prepared.z.view(), &prepared.slices)?;
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

impl Default for SlicedAverageVarianceEstimation {
    fn default() -> Self {
        Self {
            config: SlicedConfig::default(),
            fitted: None,
        }
    }
}

impl SupervisedReduction for SlicedAverageVarianceEstimation {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<&mut Self> {
        SlicedAverageVarianceEstimation::fit(self, x, y)
    }

    fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        SlicedAverageVarianceEstimation::transform(self, x)
    }
}

fn average_variance_kernel(z: ArrayView2<f64>, slices: &Slices) -> Result<Array2<f64>> {
    let r = z.ncols();
    let identity = Array2::<f64>::eye(r);
    let mut kernel = Array2::<f64>::zeros((r, r));

    for (members, &weight) in slices.iter().zip(slices.weights().iter()) {
        // Single-member slices have zero within-slice covariance.
        let within = z.select(Axis(0), members).covariance(0.0)?;
        let deviation = &identity - &within;
        kernel.scaled_add(weight, &deviation.dot(&deviation));
    }
    Ok(kernel)
}

/// Builder for [`SlicedAverageVarianceEstimation`].
///
/// Default values:
/// - `n_directions`: 2
/// - `n_slices`: 10
/// - `regularization`: `Cutoff(1e-10)`
#[derive(Debug, Clone, Default)]
pub struct SaveBuilder {
    config: SlicedConfig,
}

impl SaveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_directions(mut self, n_directions: usize) -> Self {
        self.config.n_directions = n_directions;
        self
    }

    pub fn n_slices(mut self, n_slices: usize) -> Self {
        self.config.n_slices = n_slices;
        self
    }

    pub fn regularization(mut self, regularization: CovarianceRegularization) -> Self {
        self.config.regularization = regularization;
        self
    }

    pub fn build(self) -> Result<SlicedAverageVarianceEstimation> {
        self.config.validate()?;
        Ok(SlicedAverageVarianceEstimation {
            config: self.config,
            fitted: None,
        })
    }
}

//! # Dimensionality Reduction
//!
//! This module provides linear dimensionality reduction for dense samples × features
//! matrices. The supervised estimators look for the directions of the feature space
//! that carry information about a response `y`; PCA is kept as the unsupervised
//! baseline they are compared against.
//!
//! ## Currently Available
//! - **SIR** ([`sir`]): Sliced Inverse Regression, slice means of the whitened features
//! - **SAVE** ([`save`]): Sliced Average Variance Estimation, slice covariances of the
//!   whitened features
//! - **PCA** ([`pca`]): Principal Component Analysis with a pluggable SVD backend
//!
//! ## Algorithm Selection Guide
//! - Use **SIR** when the response moves monotonically (or at least asymmetrically)
//!   along the informative directions
//! - Use **SAVE** when the link is symmetric, e.g. `y = (x·β)²`, where slice means
//!   carry no signal
//! - Use **PCA** when there is no response, or as a reference: it only sees the
//!   spread of `X` and ignores `y` entirely

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::Result;

pub mod pca;
pub mod save;
pub mod sir;
mod sliced;

pub use sliced::{FittedDirections, SlicedConfig, DEFAULT_N_DIRECTIONS, DEFAULT_N_SLICES};

/// Estimators that learn a projection from features and a response.
pub trait SupervisedReduction {
    /// Fit the projection to `x` (samples × features) and the response `y`.
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<&mut Self>;

    /// Project `x` onto the fitted directions.
    fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>>;

    /// Fit the projection and transform the training data in a single call.
    fn fit_transform(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<Array2<f64>> {
        self.fit(x, y)?;
        self.transform(x)
    }
}

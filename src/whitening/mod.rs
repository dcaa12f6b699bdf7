//! # Whitening
//!
//! Maps centered features to coordinates with identity covariance, so the
//! generalized eigenproblem `A v = λ Σ v` of the sliced estimators becomes
//! an ordinary symmetric one.
//!
//! The rank decision is made on the correlation matrix `R = D⁻¹ Σ D⁻¹`, with
//! `D` the per-column standard deviations, so features measured in very
//! different units are never mistaken for a singular covariance. With
//! `R = V Λ Vᵀ` the whitening transform is `T = D⁻¹ V_r Λ_r^{-1/2}`, where `r`
//! eigenpairs survive the configured [`CovarianceRegularization`]. The whitened
//! data is `Z = (X - mean) T` and a whitened direction `η` maps back to feature
//! space as `β = T η`, which keeps `Z η == (X - mean) β`.
//!
//! Columns that are constant get a zero row in `T` and count as dropped.

use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::eigen::SymmetricEigen;
use crate::error::{Result, SdrError};
use crate::utils::ColumnStats;

/// Default cutoff for correlation eigenvalues, relative to the largest.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// How a singular or near-singular covariance is inverted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CovarianceRegularization {
    /// Drop correlation eigen-directions with eigenvalue `<= tolerance * λ_max`
    /// (pseudo-inverse square root).
    Cutoff(f64),
    /// Add `alpha` to every correlation eigenvalue before inverting. Keeps all
    /// directions.
    Ridge(f64),
}

impl Default for CovarianceRegularization {
    fn default() -> Self {
        CovarianceRegularization::Cutoff(DEFAULT_TOLERANCE)
    }
}

impl CovarianceRegularization {
    pub fn validate(&self) -> Result<()> {
        match *self {
            CovarianceRegularization::Cutoff(tolerance) => {
                if !tolerance.is_finite() || tolerance < 0.0 {
                    return Err(SdrError::InvalidConfiguration(format!(
                        "cutoff tolerance must be finite and non-negative, got {}",
                        tolerance
                    )));
                }
            }
            CovarianceRegularization::Ridge(alpha) => {
                if !alpha.is_finite() || alpha <= 0.0 {
                    return Err(SdrError::InvalidConfiguration(format!(
                        "ridge alpha must be finite and positive, got {}",
                        alpha
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Whitener {
    mean: Array1<f64>,
    transform: Array2<f64>,
    dropped: usize,
}

impl Whitener {
    /// Estimates the mean and whitening transform of `x` (population
    /// covariance, `1/n`).
    pub fn fit(x: ArrayView2<f64>, regularization: CovarianceRegularization) -> Result<Self> {
        regularization.validate()?;
        let n_features = x.ncols();
        let mean = x.column_means()?;
        let covariance = x.covariance(0.0)?;

        let scales = column_scales(x, &covariance);
        if scales.iter().all(Option::is_none) {
            return Err(SdrError::NumericalInstability(
                "feature covariance is zero, every column is constant".to_string(),
            ));
        }
        // Constant columns get a zero row in the correlation matrix.
        let inverse_scales = scales.mapv(|sd| sd.map_or(0.0, |sd| 1.0 / sd));
        let correlation = &covariance
            * &inverse_scales.view().insert_axis(Axis(1))
            * &inverse_scales.view().insert_axis(Axis(0));
        let eigen = SymmetricEigen::new(correlation.view())?;

        let values = eigen.values();
        let largest = values.iter().copied().fold(0.0_f64, f64::max);
        if largest <= 0.0 {
            return Err(SdrError::NumericalInstability(
                "feature correlation matrix has no positive eigenvalue".to_string(),
            ));
        }

        let (keep, scaled): (Vec<usize>, Vec<f64>) = match regularization {
            CovarianceRegularization::Cutoff(tolerance) => {
                let threshold = tolerance * largest;
                values
                    .iter()
                    .enumerate()
                    .filter(|&(_, &v)| v > threshold)
                    .map(|(i, &v)| (i, 1.0 / v.sqrt()))
                    .unzip()
            }
            CovarianceRegularization::Ridge(alpha) => values
                .iter()
                .enumerate()
                .map(|(i, &v)| (i, 1.0 / (v.max(0.0) + alpha).sqrt()))
                .unzip(),
        };

        if keep.is_empty() {
            return Err(SdrError::NumericalInstability(
                "no covariance eigenvalue survived the cutoff".to_string(),
            ));
        }

        // Ridge keeps every direction but the numerical rank is still
        // judged against the default cutoff.
        let dropped = match regularization {
            CovarianceRegularization::Cutoff(_) => n_features - keep.len(),
            CovarianceRegularization::Ridge(_) => values
                .iter()
                .filter(|&&v| v <= DEFAULT_TOLERANCE * largest)
                .count(),
        };

        // T = D^{-1} V_r Λ_r^{-1/2}
        let mut transform = eigen.vectors().select(Axis(1), &keep);
        for (mut column, &scale) in transform.axis_iter_mut(Axis(1)).zip(scaled.iter()) {
            column *= scale;
        }
        for (mut row, &inverse) in transform.axis_iter_mut(Axis(0)).zip(inverse_scales.iter()) {
            row *= inverse;
        }

        debug!(
            "whitening: {} features, {} directions kept, {} regularized",
            n_features,
            keep.len(),
            dropped
        );

        Ok(Whitener {
            mean,
            transform,
            dropped,
        })
    }

    /// Centering without rescaling: the transform is the identity.
    pub fn centering_only(x: ArrayView2<f64>) -> Result<Self> {
        let mean = x.column_means()?;
        Ok(Whitener {
            mean,
            transform: Array2::eye(x.ncols()),
            dropped: 0,
        })
    }

    /// `(x - mean) · T`
    pub fn apply(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let centered = x.centered(&self.mean)?;
        Ok(centered.dot(&self.transform))
    }

    /// Maps whitened-space vectors (as columns) back to feature space,
    /// returning them as rows.
    pub fn to_feature_space(&self, whitened: ArrayView2<f64>) -> Array2<f64> {
        self.transform.dot(&whitened).reversed_axes()
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn transform(&self) -> &Array2<f64> {
        &self.transform
    }

    pub fn n_features(&self) -> usize {
        self.transform.nrows()
    }

    /// Dimension of the whitened space. Equals [`rank`](Self::rank) under a
    /// cutoff; ridge keeps all `n_features` directions.
    pub fn dimension(&self) -> usize {
        self.transform.ncols()
    }

    /// Numerical rank of the feature covariance.
    pub fn rank(&self) -> usize {
        self.n_features() - self.dropped
    }

    /// Number of covariance eigen-directions at or below the cutoff.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_rank_deficient(&self) -> bool {
        self.dropped > 0
    }
}

/// Per-column standard deviation, `None` for columns that are constant up to
/// rounding in their own magnitude.
fn column_scales(x: ArrayView2<f64>, covariance: &Array2<f64>) -> Array1<Option<f64>> {
    let n = x.nrows() as f64;
    x.axis_iter(Axis(1))
        .zip(covariance.diag().iter())
        .map(|(column, &variance)| {
            let magnitude = column.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
            let sd = variance.max(0.0).sqrt();
            (sd > n * f64::EPSILON * magnitude).then_some(sd)
        })
        .collect()
}

//! Plumbing shared by the sliced estimators: configuration, input validation,
//! the center/whiten/slice preparation and the fitted state.

use log::{debug, warn};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

use crate::eigen::SymmetricEigen;
use crate::error::{Advisory, Result, SdrError};
use crate::slicing::Slices;
use crate::utils::{ensure_finite_values, normalize_and_orient_rows, ColumnStats};
use crate::whitening::{CovarianceRegularization, Whitener};

pub const DEFAULT_N_DIRECTIONS: usize = 2;
pub const DEFAULT_N_SLICES: usize = 10;

/// Settings shared by [`SlicedInverseRegression`](crate::dimred::sir::SlicedInverseRegression)
/// and [`SlicedAverageVarianceEstimation`](crate::dimred::save::SlicedAverageVarianceEstimation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicedConfig {
    /// Directions to keep. Clamped at fit time to what the data supports.
    pub n_directions: usize,
    /// Slices of the sorted response. Clamped at fit time to the number of observations.
    pub n_slices: usize,
    /// Whiten the features before slicing.
    pub whiten: bool,
    pub regularization: CovarianceRegularization,
}

impl Default for SlicedConfig {
    fn default() -> Self {
        Self {
            n_directions: DEFAULT_N_DIRECTIONS,
            n_slices: DEFAULT_N_SLICES,
            whiten: true,
            regularization: CovarianceRegularization::default(),
        }
    }
}

impl SlicedConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_directions == 0 {
            return Err(SdrError::InvalidConfiguration(
                "n_directions must be positive".to_string(),
            ));
        }
        if self.n_slices < 2 {
            return Err(SdrError::InvalidConfiguration(format!(
                "n_slices must be at least 2, got {}",
                self.n_slices
            )));
        }
        self.regularization.validate()
    }
}

/// Checks a training pair before anything is computed.
pub(crate) fn validate_training(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
    let n = x.nrows();
    if y.len() != n {
        return Err(SdrError::InvalidShape {
            what: "response length",
            expected: n,
            found: y.len(),
        });
    }
    if n < 2 {
        return Err(SdrError::InvalidShape {
            what: "observations (minimum)",
            expected: 2,
            found: n,
        });
    }
    if x.ncols() == 0 {
        return Err(SdrError::InvalidShape {
            what: "features (minimum)",
            expected: 1,
            found: 0,
        });
    }
    x.ensure_finite("X")?;
    ensure_finite_values(y.iter(), "y")?;

    let first = y[0];
    if y.iter().all(|&v| v == first) {
        return Err(SdrError::DegenerateResponse { value: first });
    }
    Ok(())
}

/// Centered (and optionally whitened) data with its slicing.
pub(crate) struct Prepared {
    pub whitener: Whitener,
    pub z: Array2<f64>,
    pub slices: Slices,
    pub advisories: Vec<Advisory>,
}

pub(crate) fn prepare(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    config: &SlicedConfig,
) -> Result<Prepared> {
    validate_training(x, y)?;
    let mut advisories = Vec::new();

    let whitener = if config.whiten {
        Whitener::fit(x, config.regularization)?
    } else {
        Whitener::centering_only(x)?
    };
    if whitener.is_rank_deficient() {
        let advisory = Advisory::RankDeficientCovariance {
            rank: whitener.rank(),
            n_features: whitener.n_features(),
            dropped: whitener.dropped(),
        };
        warn!("{}", advisory);
        advisories.push(advisory);
    }

    let z = whitener.apply(x)?;
    let slices = Slices::new(y, config.n_slices)?;
    advisories.extend(slices.advisory());

    debug!(
        "prepared {} observations in {} slices, working dimension {}, rank {}",
        slices.n_observations(),
        slices.len(),
        z.ncols(),
        whitener.rank()
    );

    Ok(Prepared {
        whitener,
        z,
        slices,
        advisories,
    })
}

/// State of a successfully fitted sliced estimator.
///
/// Immutable once built; a new fit replaces it wholesale.
#[derive(Debug, Clone)]
pub struct FittedDirections {
    mean: Array1<f64>,
    directions: Array2<f64>,
    eigenvalues: Array1<f64>,
    slice_sizes: Vec<usize>,
    rank: usize,
    advisories: Vec<Advisory>,
}

impl FittedDirections {
    /// Decomposes the whitened-space `kernel` and maps the leading
    /// eigenvectors back to feature space.
    pub(crate) fn from_kernel(
        kernel: ArrayView2<f64>,
        prepared: Prepared,
        requested: usize,
    ) -> Result<Self> {
        let Prepared {
            whitener,
            slices,
            mut advisories,
            ..
        } = prepared;

        let eigen = SymmetricEigen::new(kernel)?;
        // Under ridge the whitened space is wider than the numerical rank.
        let used = requested.min(eigen.len()).min(whitener.rank());
        if used < requested {
            let advisory = Advisory::DirectionsClamped { requested, used };
            warn!("{}", advisory);
            advisories.push(advisory);
        }

        let mut directions = whitener.to_feature_space(eigen.vectors().slice(s![.., ..used]));
        normalize_and_orient_rows(&mut directions);
        let eigenvalues = eigen.values().slice(s![..used]).to_owned();

        Ok(FittedDirections {
            mean: whitener.mean().clone(),
            directions,
            eigenvalues,
            slice_sizes: slices.sizes(),
            rank: whitener.rank(),
            advisories,
        })
    }

    /// `(x - mean) · directionsᵀ`
    pub(crate) fn project(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(SdrError::InvalidShape {
                what: "feature count",
                expected: self.n_features(),
                found: x.ncols(),
            });
        }
        if x.nrows() == 0 {
            return Err(SdrError::InvalidShape {
                what: "rows to transform (minimum)",
                expected: 1,
                found: 0,
            });
        }
        let centered = x.centered(&self.mean)?;
        Ok(centered.dot(&self.directions.t()))
    }

    /// `n_directions × p`, one unit-length direction per row.
    pub fn directions(&self) -> &Array2<f64> {
        &self.directions
    }

    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    /// Fit-time feature mean used to center inputs in `transform`.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn n_directions(&self) -> usize {
        self.directions.nrows()
    }

    pub fn slice_sizes(&self) -> &[usize] {
        &self.slice_sizes
    }

    /// Numerical rank of the feature covariance at fit time. Also the
    /// largest number of directions a fit can return when whitening.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_config_validation() {
        assert!(SlicedConfig::default().validate().is_ok());

        let config = SlicedConfig {
            n_directions: 0,
            ..SlicedConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SdrError::InvalidConfiguration(_))
        ));

        let config = SlicedConfig {
            n_slices: 1,
            ..SlicedConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SlicedConfig {
            regularization: CovarianceRegularization::Cutoff(f64::NAN),
            ..SlicedConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_training() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 7.0]];

        assert!(validate_training(x.view(), array![1.0, 2.0, 3.0].view()).is_ok());
        assert!(matches!(
            validate_training(x.view(), array![1.0, 2.0].view()),
            Err(SdrError::InvalidShape { expected: 3, found: 2, .. })
        ));
        assert!(matches!(
            validate_training(x.view(), array![4.0, 4.0, 4.0].view()),
            Err(SdrError::DegenerateResponse { .. })
        ));
        assert!(matches!(
            validate_training(x.view(), array![1.0, f64::NAN, 3.0].view()),
            Err(SdrError::NonFiniteInput { what: "y", index: 1 })
        ));

        let single = array![[1.0, 2.0]];
        assert!(matches!(
            validate_training(single.view(), array![1.0].view()),
            Err(SdrError::InvalidShape { expected: 2, found: 1, .. })
        ));
    }
}

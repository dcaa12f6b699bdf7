//! # Synthetic Datasets
//!
//! Seeded single-index regression problems with a known central subspace, used
//! to check that an estimator finds the direction it should.
//!
//! Features are i.i.d. standard normal; the response depends on `X` only
//! through `X·β`. Every generator is reproducible for a fixed seed.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Normal, StandardNormal};

use crate::error::{Result, SdrError};

/// A generated problem together with its true directions.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// n × p features.
    pub x: Array2<f64>,
    /// Length-n response.
    pub y: Array1<f64>,
    /// Orthonormal basis of the central subspace, one direction per row.
    pub directions: Array2<f64>,
}

/// `y = link(X·β̂) + noise_std·ε` with `β̂ = beta / ‖beta‖` and `X` of width `beta.len()`.
pub fn make_single_index<F>(
    n_samples: usize,
    beta: ArrayView1<f64>,
    link: F,
    noise_std: f64,
    seed: u64,
) -> Result<Dataset>
where
    F: Fn(f64) -> f64,
{
    if n_samples == 0 {
        return Err(SdrError::InvalidConfiguration(
            "n_samples must be positive".to_string(),
        ));
    }
    let norm = beta.dot(&beta).sqrt();
    if beta.is_empty() || !norm.is_finite() || norm == 0.0 {
        return Err(SdrError::InvalidConfiguration(
            "beta must be a finite, non-zero vector".to_string(),
        ));
    }
    let noise = Normal::new(0.0, noise_std).map_err(|e| {
        SdrError::InvalidConfiguration(format!("invalid noise_std {}: {}", noise_std, e))
    })?;

    let beta = &beta / norm;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let x = Array2::from_shape_simple_fn((n_samples, beta.len()), || {
        rng.sample::<f64, _>(StandardNormal)
    });
    let index = x.dot(&beta);
    let y = index.mapv(|t| link(t) + rng.sample(noise));

    Ok(Dataset {
        x,
        y,
        directions: beta.insert_axis(Axis(0)),
    })
}

/// Two standard normal features and `y = sin(0.7·x₁ − 0.7·x₂) + noise`.
///
/// The central subspace is spanned by `(1, −1)/√2`.
pub fn make_sine(n_samples: usize, noise_std: f64, seed: u64) -> Result<Dataset> {
    let scale = 0.7 * 2.0f64.sqrt();
    make_single_index(
        n_samples,
        ndarray::array![1.0, -1.0].view(),
        |t| (scale * t).sin(),
        noise_std,
        seed,
    )
}

/// `y = (X·β)² + noise` with `β = (1, 1, 0, …, 0)/√2`.
///
/// Symmetric in `X·β`, so slice means carry no information and SIR fails
/// while SAVE does not.
pub fn make_quadratic(
    n_samples: usize,
    n_features: usize,
    noise_std: f64,
    seed: u64,
) -> Result<Dataset> {
    if n_features < 2 {
        return Err(SdrError::InvalidConfiguration(format!(
            "make_quadratic needs at least 2 features, got {}",
            n_features
        )));
    }
    let mut beta = Array1::zeros(n_features);
    beta[0] = 1.0;
    beta[1] = 1.0;
    make_single_index(n_samples, beta.view(), |t| t * t, noise_std, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ColumnStats;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_reproducible_for_seed() {
        let a = make_sine(50, 0.1, 42).unwrap();
        let b = make_sine(50, 0.1, 42).unwrap();
        let c = make_sine(50, 0.1, 43).unwrap();

        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
        assert_ne!(a.x, c.x);
    }

    #[test]
    fn test_sine_matches_model_without_noise() {
        let data = make_sine(20, 0.0, 1).unwrap();
        assert_eq!(data.x.dim(), (20, 2));
        for i in 0..20 {
            let expected = (0.7 * data.x[[i, 0]] - 0.7 * data.x[[i, 1]]).sin();
            assert_abs_diff_eq!(data.y[i], expected, epsilon = 1e-12);
        }

        let s = 1.0 / 2.0f64.sqrt();
        assert_abs_diff_eq!(data.directions[[0, 0]], s, epsilon = 1e-12);
        assert_abs_diff_eq!(data.directions[[0, 1]], -s, epsilon = 1e-12);
    }

    #[test]
    fn test_quadratic_shape_and_direction() {
        let data = make_quadratic(30, 5, 0.0, 7).unwrap();
        assert_eq!(data.x.dim(), (30, 5));
        assert_eq!(data.directions.dim(), (1, 5));

        let beta = data.directions.row(0);
        for i in 0..30 {
            let t = data.x.row(i).dot(&beta);
            assert_abs_diff_eq!(data.y[i], t * t, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_features_are_roughly_standard() {
        let data = make_sine(4000, 0.1, 99).unwrap();
        let mean = data.x.column_means().unwrap();
        let cov = data.x.covariance(1.0).unwrap();
        assert!(mean.iter().all(|m| m.abs() < 0.1));
        assert!((cov[[0, 0]] - 1.0).abs() < 0.1);
        assert!(cov[[0, 1]].abs() < 0.1);
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(make_sine(0, 0.1, 1).is_err());
        assert!(make_sine(10, -1.0, 1).is_err());
        assert!(make_quadratic(10, 1, 0.1, 1).is_err());
        let zero = Array1::<f64>::zeros(3);
        assert!(make_single_index(10, zero.view(), |t| t, 0.1, 1).is_err());
    }
}

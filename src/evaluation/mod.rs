//! # Evaluation
//!
//! Angular error between estimated and true directions, and a replication study
//! that repeats the SIR-versus-PCA comparison across seeded trials.

use std::f64::consts::FRAC_PI_2;

use log::info;
use ndarray::{array, Array1, ArrayView1};
use rayon::prelude::*;

use crate::datasets::make_sine;
use crate::dimred::pca::{NalgebraSVD, PCABuilder};
use crate::dimred::sir::SlicedInverseRegression;
use crate::error::{Result, SdrError};

/// Angle in radians between the lines spanned by `a` and `b`, in `[0, π/2]`.
///
/// Directions are only defined up to sign, so `a` and `-a` give 0.
pub fn angle_between(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Result<f64> {
    if a.len() != b.len() {
        return Err(SdrError::InvalidShape {
            what: "direction length",
            expected: a.len(),
            found: b.len(),
        });
    }
    let norms = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if norms == 0.0 || !norms.is_finite() {
        return Err(SdrError::InvalidConfiguration(
            "cannot measure the angle of a zero or non-finite vector".to_string(),
        ));
    }
    let cosine = (a.dot(&b) / norms).abs().min(1.0);
    Ok(cosine.acos().min(FRAC_PI_2))
}

/// Repeats the sine-model comparison between SIR and PCA.
///
/// Trial `t` draws [`make_sine`] with seed `seed + t`, fits SIR with one
/// direction and PCA with one component, and records each method's angle to
/// the true direction `(1, −1)/√2`. Trials run on the rayon pool; the report
/// is ordered by trial and identical across runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicationStudy {
    pub n_samples: usize,
    pub n_trials: usize,
    pub noise_std: f64,
    pub n_slices: usize,
    pub seed: u64,
}

impl Default for ReplicationStudy {
    fn default() -> Self {
        Self {
            n_samples: 500,
            n_trials: 100,
            noise_std: 0.1,
            n_slices: 10,
            seed: 0,
        }
    }
}

impl ReplicationStudy {
    pub fn run(&self) -> Result<ReplicationReport> {
        if self.n_trials == 0 {
            return Err(SdrError::InvalidConfiguration(
                "n_trials must be positive".to_string(),
            ));
        }

        let truth: Array1<f64> = array![1.0, -1.0] / 2.0f64.sqrt();
        let angles = (0..self.n_trials as u64)
            .into_par_iter()
            .map(|t| self.trial(self.seed.wrapping_add(t), &truth))
            .collect::<Result<Vec<(f64, f64)>>>()?;

        let (sir_angles, pca_angles): (Vec<f64>, Vec<f64>) = angles.into_iter().unzip();
        let report = ReplicationReport {
            sir_angles,
            pca_angles,
        };
        info!(
            "replication over {} trials (n = {}): mean SIR angle {:.4}, mean PCA angle {:.4}",
            self.n_trials,
            self.n_samples,
            report.mean_sir_angle(),
            report.mean_pca_angle()
        );
        Ok(report)
    }

    fn trial(&self, seed: u64, truth: &Array1<f64>) -> Result<(f64, f64)> {
        let data = make_sine(self.n_samples, self.noise_std, seed)?;

        let mut sir = SlicedInverseRegression::new(1, self.n_slices)?;
        sir.fit(data.x.view(), data.y.view())?;
        let sir_direction = sir
            .directions()
            .ok_or(SdrError::NotFitted {
                estimator: "SlicedInverseRegression",
            })?
            .row(0)
            .to_owned();

        let mut pca = PCABuilder::new(NalgebraSVD).n_components(1).build();
        pca.fit(data.x.view())?;
        let pca_direction = pca
            .components()
            .ok_or(SdrError::NotFitted { estimator: "Pca" })?
            .row(0)
            .to_owned();

        Ok((
            angle_between(sir_direction.view(), truth.view())?,
            angle_between(pca_direction.view(), truth.view())?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationReport {
    pub sir_angles: Vec<f64>,
    pub pca_angles: Vec<f64>,
}

impl ReplicationReport {
    pub fn mean_sir_angle(&self) -> f64 {
        mean(&self.sir_angles)
    }

    pub fn mean_pca_angle(&self) -> f64 {
        mean(&self.pca_angles)
    }

    /// Share of trials whose SIR angle is below `tolerance` radians.
    pub fn sir_fraction_within(&self, tolerance: f64) -> f64 {
        fraction_within(&self.sir_angles, tolerance)
    }

    pub fn pca_fraction_within(&self, tolerance: f64) -> f64 {
        fraction_within(&self.pca_angles, tolerance)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn fraction_within(values: &[f64], tolerance: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().filter(|&&v| v < tolerance).count() as f64 / values.len() as f64
}

//! Sufficient dimension reduction for regression.
//!
//! [`dimred::sir::SlicedInverseRegression`] finds the directions of `X` that
//! `y` depends on by slicing the response and taking the principal axes of the
//! slice means in whitened coordinates. [`dimred::save`] does the same with
//! slice covariances, and [`dimred::pca`] is the unsupervised baseline.

pub mod datasets;
mod dense;
pub mod dimred;
pub mod eigen;
pub mod error;
pub mod evaluation;
pub mod slicing;
pub mod svd;
mod utils;
pub mod whitening;

pub use error::{Advisory, Result, SdrError};
pub use utils::ColumnStats;

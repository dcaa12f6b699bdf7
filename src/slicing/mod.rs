//! # Response Slicing
//!
//! Partitions observations into contiguous groups of the response-sorted order.
//! Every sliced estimator in [`crate::dimred`] builds its kernel matrix from
//! these groups.
//!
//! Observations are sorted by `y` ascending with a stable sort, so tied
//! responses keep their original index order. The sorted order is then cut
//! into `n_slices` pieces whose sizes differ by at most one; when `n` is not
//! divisible by `n_slices` the first `n % n_slices` slices get the extra
//! observation. With `n = 10` and three slices the sizes are `[4, 3, 3]`.

use std::ops::Range;

use log::warn;
use ndarray::{Array1, ArrayView1};

use crate::error::{Advisory, Result, SdrError};

#[derive(Debug, Clone)]
pub struct Slices {
    order: Vec<usize>,
    bounds: Vec<Range<usize>>,
    requested: usize,
}

impl Slices {
    /// Sorts `y` and partitions it into `n_slices` groups.
    ///
    /// `n_slices` larger than the number of observations is clamped to it and
    /// logged; check [`Slices::advisory`] to pick the condition up
    /// programmatically.
    pub fn new(y: ArrayView1<f64>, n_slices: usize) -> Result<Self> {
        if n_slices < 2 {
            return Err(SdrError::InvalidConfiguration(format!(
                "n_slices must be at least 2, got {}",
                n_slices
            )));
        }
        let n = y.len();
        if n == 0 {
            return Err(SdrError::InvalidShape {
                what: "observations to slice",
                expected: 1,
                found: 0,
            });
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| y[a].total_cmp(&y[b]));

        let used = n_slices.min(n);
        if used < n_slices {
            warn!(
                "n_slices={} exceeds the {} available observations, clamping to {}",
                n_slices, n, used
            );
        }

        let base = n / used;
        let extra = n % used;
        let mut bounds = Vec::with_capacity(used);
        let mut start = 0;
        for h in 0..used {
            let size = base + usize::from(h < extra);
            bounds.push(start..start + size);
            start += size;
        }

        Ok(Slices {
            order,
            bounds,
            requested: n_slices,
        })
    }

    /// Observation indices sorted by ascending response.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Number of slices actually used.
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn n_observations(&self) -> usize {
        self.order.len()
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn was_clamped(&self) -> bool {
        self.len() < self.requested
    }

    pub fn advisory(&self) -> Option<Advisory> {
        self.was_clamped().then(|| Advisory::SlicesClamped {
            requested: self.requested,
            used: self.len(),
        })
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.bounds.iter().map(|r| r.len()).collect()
    }

    /// Slice proportions `n_h / n`.
    pub fn weights(&self) -> Array1<f64> {
        let n = self.n_observations() as f64;
        self.bounds.iter().map(|r| r.len() as f64 / n).collect()
    }

    /// Observation indices belonging to slice `h`.
    pub fn members(&self, h: usize) -> &[usize] {
        &self.order[self.bounds[h].clone()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.bounds.iter().map(move |r| &self.order[r.clone()])
    }
}

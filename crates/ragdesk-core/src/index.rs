//! Exact nearest-neighbor index over dense vectors.
//!
//! [`FlatL2Index`] stores vectors row by row and answers k-nearest-neighbor
//! queries by brute force under squared Euclidean distance. Results are
//! ordered by ascending distance; equal distances keep insertion order.

use thiserror::Error;

use crate::embedding::squared_l2;

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("vector dimension mismatch: index holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// One search result: the position of the stored vector and its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// A k-nearest-neighbor index.
///
/// Positions are assigned in insertion order starting at 0, so callers
/// can keep a parallel array of payloads.
pub trait VectorIndex: Send + Sync {
    fn dims(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError>;
    /// Return up to `k` nearest neighbors of `query`, closest first.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError>;
}

/// Brute-force index using squared L2 distance.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dims: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            data: Vec::new(),
        }
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dims..(i + 1) * self.dims]
    }

    fn check(&self, v: &[f32]) -> Result<(), IndexError> {
        if v.len() != self.dims {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                actual: v.len(),
            });
        }
        Ok(())
    }
}

impl VectorIndex for FlatL2Index {
    fn dims(&self) -> usize {
        self.dims
    }

    fn len(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.data.len() / self.dims
        }
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        for v in vectors {
            self.check(v)?;
        }
        self.data.reserve(vectors.len() * self.dims);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        self.check(query)?;

        let mut scored: Vec<Neighbor> = (0..self.len())
            .map(|position| Neighbor {
                position,
                distance: squared_l2(query, self.row(position)),
            })
            .collect();

        // stable: ties stay in insertion order
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}

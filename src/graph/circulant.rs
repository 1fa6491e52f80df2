//! Symmetric circulant adjacency.

use ndarray::Array2;

use crate::error::{PipelineError, PipelineResult};

/// Build the `n × n` binary adjacency where node `i` links to the `k`
/// nodes after it and the `k` nodes before it, wrapping around both ends.
///
/// Self-loops are never created, so once `2k >= n` the neighbourhoods
/// overlap and each row has `min(2k, n - 1)` ones.
pub fn circulant_adjacency(n: usize, k: usize) -> PipelineResult<Array2<f64>> {
    if k < 1 {
        return Err(PipelineError::InvalidRadius(k));
    }

    let mut adm = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for offset in 1..=k {
            let j = (i + offset) % n;
            if j != i {
                adm[[i, j]] = 1.0;
                adm[[j, i]] = 1.0;
            }
        }
    }
    Ok(adm)
}

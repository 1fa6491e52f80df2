//! Dense adjacency ⇄ sparse edge list, plus GCN normalisation.

use ndarray::Array2;

use crate::error::{PipelineError, PipelineResult};

/// Sparse weighted edges: `(sources[e], targets[e])` carries `weights[e]`.
///
/// Edge order is the row-major scan order of the dense matrix it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeList {
    pub sources: Vec<usize>,
    pub targets: Vec<usize>,
    pub weights: Vec<f64>,
}

impl EdgeList {
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Every endpoint must name one of the `n` nodes.
    fn check_nodes(&self, n: usize) -> PipelineResult<()> {
        match self.sources.iter().chain(&self.targets).find(|&&i| i >= n) {
            Some(&index) => Err(PipelineError::IndexOutOfRange { what: "edge node", index, len: n }),
            None => Ok(()),
        }
    }

    /// Rebuild the `n × n` dense matrix.
    pub fn to_dense(&self, n: usize) -> PipelineResult<Array2<f64>> {
        self.check_nodes(n)?;
        let mut adm = Array2::zeros((n, n));
        for ((&u, &v), &w) in self.sources.iter().zip(&self.targets).zip(&self.weights) {
            adm[[u, v]] = w;
        }
        Ok(adm)
    }

    /// Number of edges leaving each node
    pub fn out_degrees(&self, n: usize) -> PipelineResult<Vec<usize>> {
        self.check_nodes(n)?;
        let mut degrees = vec![0; n];
        for &u in &self.sources {
            degrees[u] += 1;
        }
        Ok(degrees)
    }
}

/// One edge per nonzero cell, scanned row by row.
pub fn adjacency_to_edges(adm: &Array2<f64>) -> EdgeList {
    let mut sources = Vec::new();
    let mut targets = Vec::new();
    let mut weights = Vec::new();

    for ((u, v), &w) in adm.indexed_iter() {
        if w != 0.0 {
            sources.push(u);
            targets.push(v);
            weights.push(w);
        }
    }
    EdgeList { sources, targets, weights }
}

/// `D^-1/2 (A + I) D^-1/2`, the propagation matrix of a GCN layer.
pub fn gcn_normalize(edges: &EdgeList, n: usize) -> PipelineResult<Array2<f64>> {
    let mut a = edges.to_dense(n)?;
    for i in 0..n {
        a[[i, i]] += 1.0;
    }

    let inv_sqrt: Vec<f64> = a
        .rows()
        .into_iter()
        .map(|row| {
            let d = row.sum();
            if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 }
        })
        .collect();

    for ((i, j), v) in a.indexed_iter_mut() {
        *v *= inv_sqrt[i] * inv_sqrt[j];
    }
    Ok(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::circulant_adjacency;
    use ndarray::array;

    #[test]
    fn test_round_trip_reproduces_adjacency() {
        for (n, k) in [(1, 1), (4, 3), (16, 2), (33, 5)] {
            let adm = circulant_adjacency(n, k).unwrap();
            let edges = adjacency_to_edges(&adm);
            assert_eq!(edges.to_dense(n).unwrap(), adm);
            assert_eq!(edges.len(), n * (2 * k).min(n.saturating_sub(1)));
            assert!(edges.weights.iter().all(|&w| w == 1.0));
        }
    }

    #[test]
    fn test_row_major_order_and_arbitrary_weights() {
        let adm = array![[0.0, 2.5, 0.0], [0.5, 0.0, 1.0], [0.0, 3.0, 0.0]];
        let edges = adjacency_to_edges(&adm);
        assert_eq!(edges.sources, vec![0, 1, 1, 2]);
        assert_eq!(edges.targets, vec![1, 0, 2, 1]);
        assert_eq!(edges.weights, vec![2.5, 0.5, 1.0, 3.0]);
        assert_eq!(edges.to_dense(3).unwrap(), adm);
        assert_eq!(edges.out_degrees(3).unwrap(), vec![1, 2, 1]);
    }

    #[test]
    fn test_gcn_normalize_regular_graph() {
        // degree 2 ring + self loop → every nonzero entry is 1/3
        let edges = adjacency_to_edges(&circulant_adjacency(5, 1).unwrap());
        let p = gcn_normalize(&edges, 5).unwrap();
        assert!((p[[0, 0]] - 1.0 / 3.0).abs() < 1e-12);
        assert!((p[[0, 1]] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(p[[0, 2]], 0.0);
        assert_eq!(p, p.t());
    }

    #[test]
    fn test_endpoint_past_node_count_is_rejected() {
        let edges = EdgeList { sources: vec![0, 1], targets: vec![1, 3], weights: vec![1.0, 1.0] };
        for err in [
            edges.to_dense(3).unwrap_err(),
            edges.out_degrees(3).unwrap_err(),
            gcn_normalize(&edges, 3).unwrap_err(),
        ] {
            assert!(matches!(
                err,
                PipelineError::IndexOutOfRange { what: "edge node", index: 3, len: 3 }
            ));
        }
        assert_eq!(edges.out_degrees(4).unwrap(), vec![1, 1, 0, 0]);
    }
}

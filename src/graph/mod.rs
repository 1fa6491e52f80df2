//! Ring-lattice graph topology for the graph-convolution stage.
//!
//! Everything here is pure and works on plain `ndarray` arrays:
//! the adjacency depends only on `(n, k)` and is built once per
//! model configuration, then shared read-only by every forward pass.

mod circulant;
mod edge_list;

pub use circulant::circulant_adjacency;
pub use edge_list::{adjacency_to_edges, gcn_normalize, EdgeList};

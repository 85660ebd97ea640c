//! Spatial layer: the zone adjacency graph and its bounded traversals.

mod graph;

pub use graph::{AdjacencyGraph, GraphWarning};

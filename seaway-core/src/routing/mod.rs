//! Path searches over network snapshots

pub mod dijkstra;
pub mod paths;

pub use dijkstra::{EdgeWeight, ShortestPath, shortest_path};
pub use paths::{all_shortest_paths, bounded_simple_paths, shortest_hop_path, simple_paths};

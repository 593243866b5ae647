//! Network construction and maintenance algorithms

pub mod graph_builder;
pub mod locator;
pub mod pruning;
pub mod refinement;
pub mod sspd;
pub mod stop_points;

pub use graph_builder::build_network;
pub use pruning::{PruneConfig, PruneOutcome, PruneReport, RedundancyOrder, prune_network};
pub use refinement::{LabeledPath, RefinementOutcome, RefinementReport, refine_network};
pub use stop_points::{MergedStopPoints, merge_stop_points};

//! # lobachevsky-dataset
//!
//! Small hierarchical graphs embedded in the Poincaré ball, for training and
//! testing the layer stacks.
//!
//! - [`HyperbolicDataset`]: validated nodes + edges + optional depth labels
//! - [`DatasetGenerator`]: seeded trees, random graphs and batches of trees
//! - [`topology`]: adjacency, BFS hops, triangles, clustering

pub mod dataset;
pub mod error;
pub mod generator;
pub mod topology;

pub use dataset::HyperbolicDataset;
pub use error::{DatasetError, Result};
pub use generator::{random_hyperbolic_point, random_tangent, DatasetGenerator, GeneratorConfig, MAX_NODES};

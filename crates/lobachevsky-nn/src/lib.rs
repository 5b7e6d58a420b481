//! # lobachevsky-nn
//!
//! Neural layers that operate on points of the Poincaré ball.
//!
//! Each layer does its Euclidean work in a tangent space and maps the result
//! back with the exponential map, so every output is re-validated against the
//! ball invariant before it is returned.
//!
//! | Layer | Parameters |
//! |---|---|
//! | [`Linear`] | `W` (out × in), `b` |
//! | [`Attention`] | `ln β` |
//! | [`BatchNorm`] | `γ`, `β` |
//! | [`Activation`] | none |
//! | [`Dropout`] | none |
//! | [`MessagePassing`] | inner `Linear`, optional scoring vector |

pub mod activation;
pub mod attention;
pub mod batch;
pub mod batch_norm;
pub mod context;
pub mod dropout;
pub mod error;
pub mod layer;
pub mod linear;
pub mod message_passing;

pub use activation::Activation;
pub use attention::{Attended, Attention, Head};
pub use batch::NodeBatch;
pub use batch_norm::BatchNorm;
pub use context::{ForwardContext, Mode};
pub use dropout::Dropout;
pub use error::{LayerError, Result};
pub use layer::{forward_stack, forward_trace, stack_output_dim, Layer, Parameterized};
pub use linear::Linear;
pub use message_passing::{Aggregation, EdgeWeighting, MessagePassing};

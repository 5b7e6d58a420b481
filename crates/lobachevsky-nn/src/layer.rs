//! The uniform layer contract and stack composition.
//!
//! Every layer kind sits behind [`Layer`], which exposes one
//! `forward(manifold, batch, ctx) -> batch` call. A model is an ordered
//! `Vec<Layer>` run front to back by [`forward_stack`].

use lobachevsky_hyp_ops::Manifold;
use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::attention::Attention;
use crate::batch::NodeBatch;
use crate::batch_norm::BatchNorm;
use crate::context::ForwardContext;
use crate::dropout::Dropout;
use crate::error::{LayerError, Result};
use crate::linear::Linear;
use crate::message_passing::MessagePassing;

/// Flat access to a layer's trainable parameters.
///
/// Parameters are tangent-space (Euclidean) values; the layout of the vector
/// is fixed per layer and documented on each `params` implementation.
pub trait Parameterized {
    fn num_params(&self) -> usize;
    fn params(&self) -> Vec<f64>;
    fn set_params(&mut self, params: &[f64]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Linear(Linear),
    Attention(Attention),
    BatchNorm(BatchNorm),
    Activation(Activation),
    Dropout(Dropout),
    MessagePassing(MessagePassing),
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Linear(_) => "linear",
            Layer::Attention(_) => "attention",
            Layer::BatchNorm(_) => "batch_norm",
            Layer::Activation(_) => "activation",
            Layer::Dropout(_) => "dropout",
            Layer::MessagePassing(_) => "message_passing",
        }
    }

    /// Output dimension for an input of `in_dim`, or the mismatch it would hit.
    pub fn output_dim(&self, in_dim: usize) -> Result<usize> {
        let expect = |want: usize| {
            if want == in_dim {
                Ok(())
            } else {
                Err(LayerError::DimensionMismatch { expected: want, got: in_dim })
            }
        };
        match self {
            Layer::Linear(l) => expect(l.in_dim()).map(|_| l.out_dim()),
            Layer::MessagePassing(mp) => expect(mp.in_dim()).map(|_| mp.out_dim()),
            Layer::Attention(a) => expect(a.dim()).map(|_| in_dim),
            Layer::BatchNorm(bn) => expect(bn.dim()).map(|_| in_dim),
            Layer::Activation(_) | Layer::Dropout(_) => Ok(in_dim),
        }
    }

    pub fn forward(
        &self,
        manifold: &Manifold,
        batch: &NodeBatch,
        ctx: &mut ForwardContext,
    ) -> Result<NodeBatch> {
        if batch.is_empty() {
            return Err(LayerError::NullInput("layer got an empty batch"));
        }
        match self {
            Layer::Linear(l) => Ok(batch.with_nodes(l.forward_batch(manifold, batch.nodes())?)),
            Layer::Attention(a) => a.forward_graph(manifold, batch, ctx),
            Layer::BatchNorm(bn) => Ok(batch.with_nodes(bn.forward_batch(manifold, batch.nodes())?)),
            Layer::Activation(act) => Ok(batch.with_nodes(act.forward_batch(manifold, batch.nodes())?)),
            Layer::Dropout(d) => Ok(batch.with_nodes(d.forward_batch(manifold, batch.nodes(), ctx)?)),
            Layer::MessagePassing(mp) => mp.forward_graph(manifold, batch),
        }
    }

    fn as_parameterized(&self) -> Option<&dyn Parameterized> {
        match self {
            Layer::Linear(l) => Some(l),
            Layer::Attention(a) => Some(a),
            Layer::BatchNorm(bn) => Some(bn),
            Layer::MessagePassing(mp) => Some(mp),
            Layer::Activation(_) | Layer::Dropout(_) => None,
        }
    }

    fn as_parameterized_mut(&mut self) -> Option<&mut dyn Parameterized> {
        match self {
            Layer::Linear(l) => Some(l),
            Layer::Attention(a) => Some(a),
            Layer::BatchNorm(bn) => Some(bn),
            Layer::MessagePassing(mp) => Some(mp),
            Layer::Activation(_) | Layer::Dropout(_) => None,
        }
    }
}

/// Parameter-free layers report zero parameters and accept only an empty vector.
impl Parameterized for Layer {
    fn num_params(&self) -> usize {
        self.as_parameterized().map_or(0, |p| p.num_params())
    }

    fn params(&self) -> Vec<f64> {
        self.as_parameterized().map(|p| p.params()).unwrap_or_default()
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        match self.as_parameterized_mut() {
            Some(p) => p.set_params(params),
            None if params.is_empty() => Ok(()),
            None => Err(LayerError::DimensionMismatch { expected: 0, got: params.len() }),
        }
    }
}

/// Run `layers` in order. An empty stack returns the (clamped) input.
pub fn forward_stack(
    layers: &[Layer],
    manifold: &Manifold,
    batch: &NodeBatch,
    ctx: &mut ForwardContext,
) -> Result<NodeBatch> {
    let mut current = batch.with_nodes(manifold.project_all(batch.nodes())?);
    for layer in layers {
        current = layer.forward(manifold, &current, ctx)?;
    }
    Ok(current)
}

/// Like [`forward_stack`] but keeps every layer's output.
pub fn forward_trace(
    layers: &[Layer],
    manifold: &Manifold,
    batch: &NodeBatch,
    ctx: &mut ForwardContext,
) -> Result<Vec<NodeBatch>> {
    let start = batch.with_nodes(manifold.project_all(batch.nodes())?);
    let mut outputs: Vec<NodeBatch> = Vec::with_capacity(layers.len());
    for layer in layers {
        let input = outputs.last().unwrap_or(&start);
        let next = layer.forward(manifold, input, ctx)?;
        outputs.push(next);
    }
    Ok(outputs)
}

/// Check that `layers` chain from `in_dim` and return the final dimension.
pub fn stack_output_dim(layers: &[Layer], in_dim: usize) -> Result<usize> {
    layers.iter().try_fold(in_dim, |dim, layer| layer.output_dim(dim))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> Vec<Layer> {
        vec![
            Layer::MessagePassing(MessagePassing::new(3, 4, 1).unwrap()),
            Layer::Activation(Activation::Tanh),
            Layer::Attention(Attention::new(4).unwrap()),
            Layer::BatchNorm(BatchNorm::new(4).unwrap()),
            Layer::Dropout(Dropout::new(0.2, 5).unwrap()),
            Layer::Linear(Linear::new(4, 2, 2).unwrap()),
        ]
    }

    fn batch() -> NodeBatch {
        NodeBatch::new(
            vec![vec![0.0, 0.0, 0.0], vec![0.3, 0.1, 0.0], vec![-0.2, 0.3, 0.1], vec![0.1, -0.4, 0.2]],
            &[(0, 1), (0, 2), (2, 3)],
        )
        .unwrap()
    }

    #[test]
    fn stack_dims_chain() {
        assert_eq!(stack_output_dim(&stack(), 3).unwrap(), 2);
        assert!(matches!(
            stack_output_dim(&stack(), 5),
            Err(LayerError::DimensionMismatch { expected: 3, got: 5 })
        ));
    }

    #[test]
    fn full_stack_keeps_points_inside() {
        let m = Manifold::default();
        let mut ctx = ForwardContext::train(1);
        let out = forward_stack(&stack(), &m, &batch(), &mut ctx).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out.dim(), 2);
        assert!(out.nodes().iter().all(|x| lobachevsky_hyp_ops::validate_hyperbolic(x)));
        assert_eq!(ctx.margins().map(|m| m.len()), Some(4));
    }

    #[test]
    fn trace_matches_stack() {
        let m = Manifold::default();
        let layers = stack();
        let traced = forward_trace(&layers, &m, &batch(), &mut ForwardContext::infer()).unwrap();
        let direct = forward_stack(&layers, &m, &batch(), &mut ForwardContext::infer()).unwrap();
        assert_eq!(traced.len(), layers.len());
        let last = traced.last().unwrap();
        for (a, b) in last.nodes().iter().flatten().zip(direct.nodes().iter().flatten()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn params_roundtrip_through_enum() {
        let mut layers = stack();
        for layer in layers.iter_mut() {
            let p = layer.params();
            assert_eq!(p.len(), layer.num_params());
            layer.set_params(&p).unwrap();
        }
        assert_eq!(layers[1].num_params(), 0);
        assert!(layers[1].set_params(&[1.0]).is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let layers = stack();
        let json = serde_json::to_string(&layers).unwrap();
        let back: Vec<Layer> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), layers.len());
        for (a, b) in layers.iter().zip(back.iter()) {
            assert_eq!(a.name(), b.name());
            for (x, y) in a.params().iter().zip(b.params().iter()) {
                assert!((x - y).abs() <= 1e-15 * x.abs().max(1.0));
            }
        }
    }
}

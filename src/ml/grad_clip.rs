// ============================================================
// Layer 5 - Gradient Norm Clipping
// ============================================================
// Rescales the whole gradient so its global L2 norm stays
// under a ceiling:
//
//   norm = sqrt(Σ_p ||g_p||²)        over every float parameter p
//   if norm > max_norm:  g_p ← g_p · max_norm / (norm + 1e-6)
//
// burn's optimiser-level clipping works on one parameter tensor
// at a time, so the global norm is computed here: the model's
// parameter ids are visited and their gradients looked up in
// GradientsParams (which holds them on the inner backend).
//
// Reference: Pascanu et al. (2013) On the difficulty of training RNNs

use burn::{
    module::{Module, ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

const NORM_EPS: f64 = 1e-6;

/// Sums ||g_p||² over every parameter that has a gradient.
struct SquaredNorm<'a> {
    grads: &'a GradientsParams,
    total: f64,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.total += grad.clone().mul(grad).sum().into_scalar().elem::<f64>();
        }
    }
}

/// Multiplies every gradient by `scale`.
struct Rescale<'a> {
    grads: &'a mut GradientsParams,
    scale: f64,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads
                .register::<B::InnerBackend, D>(id, grad.mul_scalar(self.scale));
        }
    }
}

/// Global L2 norm of the gradients of `model`'s parameters.
pub fn grad_norm<B, M>(model: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let mut visitor = SquaredNorm { grads, total: 0.0 };
    model.visit(&mut visitor);
    visitor.total.sqrt()
}

/// Clip the global gradient norm to `max_norm`; `max_norm <= 0` is a no-op.
/// Returns the norm before clipping.
pub fn clip_grad_norm<B, M>(model: &M, grads: &mut GradientsParams, max_norm: f64) -> f64
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let norm = grad_norm::<B, M>(model, grads);
    if max_norm > 0.0 && norm > max_norm {
        let mut visitor = Rescale { grads, scale: max_norm / (norm + NORM_EPS) };
        model.visit(&mut visitor);
    }
    norm
}

use crate::{Param, ParamMut, Result};

/// A differentiable step in a network, generic over the batch type it
/// consumes (`Matrix` for dense paths, `Tensor4D` for image paths).
///
/// `forward` caches whatever `backward` needs; `backward` consumes that cache
/// and returns the gradient with respect to the forward input. One instance
/// supports one in-flight forward/backward pair at a time.
pub trait Layer<X> {
    fn forward(&mut self, input: &X) -> Result<X>;

    fn backward(&mut self, dout: &X) -> Result<X>;

    /// Live views of the weights this layer owns, by local name (`W`, `b`).
    fn params_mut(&mut self) -> Vec<(&'static str, ParamMut<'_>)> {
        Vec::new()
    }

    /// Gradients computed by the last `backward`, keyed like `params_mut`.
    /// Empty before the first backward.
    fn grads(&self) -> Vec<(&'static str, Param)> {
        Vec::new()
    }

    /// Append one group per weighted layer, in forward order. Containers
    /// override this to recurse into their children.
    fn param_groups_mut<'a>(&'a mut self, out: &mut Vec<Vec<(&'static str, ParamMut<'a>)>>) {
        let params = self.params_mut();
        if !params.is_empty() {
            out.push(params);
        }
    }

    /// Gradient counterpart of [`Layer::param_groups_mut`].
    fn grad_groups(&self, out: &mut Vec<Vec<(&'static str, Param)>>) {
        let grads = self.grads();
        if !grads.is_empty() {
            out.push(grads);
        }
    }
}

/// The terminal layer: turns predictions and targets into a scalar loss.
pub trait LossLayer<X> {
    fn forward(&mut self, input: &X, target: &X) -> Result<f64>;

    /// Gradient of the last loss with respect to the input of `forward`.
    fn backward(&mut self) -> Result<X>;
}

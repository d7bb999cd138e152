use crate::gradcheck;
use crate::{
    Activation, Affine, Batch, ConvNetConfig, Convolution, Grads, Layer, LossLayer, MlpConfig,
    Optimizer, Param, ParamsMut, Pooling, Relu, Result, Rng, Sequential, Sigmoid, SoftmaxWithLoss,
    WeightInit,
};
use std::collections::BTreeMap;
use sumi_la::Matrix;
use sumi_tensor::{conv_output_size, Tensor4D};
use tracing::debug;

/// An ordered layer sequence ending in a loss layer, plus the optimizer that
/// updates its weights.
///
/// Parameters are named by kind and by position among the layers that own
/// weights: the first weighted layer contributes `W1`/`b1`, the next
/// `W2`/`b2`, and so on.
pub struct Network<X> {
    layers: Sequential<X>,
    last: Box<dyn LossLayer<X>>,
    optimizer: Box<dyn Optimizer>,
    weight_decay: f64,
}

fn collect_params<X>(layers: &mut Sequential<X>) -> ParamsMut<'_> {
    let mut groups = Vec::new();
    layers.param_groups_mut(&mut groups);
    let mut out = ParamsMut::new();
    for (i, group) in groups.into_iter().enumerate() {
        for (kind, p) in group {
            out.insert(format!("{kind}{}", i + 1), p);
        }
    }
    out
}

fn is_weight(name: &str) -> bool {
    name.starts_with('W')
}

impl<X: Batch + 'static> Network<X> {
    pub fn new(
        layers: Sequential<X>,
        last: impl LossLayer<X> + 'static,
        optimizer: Box<dyn Optimizer>,
    ) -> Self {
        Self {
            layers,
            last: Box::new(last),
            optimizer,
            weight_decay: 0.0,
        }
    }

    /// L2 penalty `0.5·λ·Σ W²` over weight parameters (biases excluded).
    pub fn with_weight_decay(mut self, lambda: f64) -> Self {
        self.weight_decay = lambda;
        self
    }

    pub fn weight_decay(&self) -> f64 {
        self.weight_decay
    }

    pub fn layers(&self) -> &Sequential<X> {
        &self.layers
    }

    pub fn optimizer(&self) -> &dyn Optimizer {
        self.optimizer.as_ref()
    }

    pub fn optimizer_mut(&mut self) -> &mut dyn Optimizer {
        self.optimizer.as_mut()
    }

    /// Live views of every weight, by global name.
    pub fn params_mut(&mut self) -> ParamsMut<'_> {
        collect_params(&mut self.layers)
    }

    /// Snapshot of every weight, by global name.
    pub fn params(&mut self) -> BTreeMap<String, Param> {
        self.params_mut()
            .iter()
            .map(|(name, p)| (name.clone(), p.to_param()))
            .collect()
    }

    pub fn predict(&mut self, x: &X) -> Result<X> {
        self.layers.forward(x)
    }

    pub fn loss(&mut self, x: &X, t: &X) -> Result<f64> {
        let y = self.predict(x)?;
        let loss = self.last.forward(&y, t)?;
        Ok(loss + self.decay_penalty())
    }

    fn decay_penalty(&mut self) -> f64 {
        if self.weight_decay == 0.0 {
            return 0.0;
        }
        let squares: f64 = self
            .params_mut()
            .iter()
            .filter(|(name, _)| is_weight(name))
            .map(|(_, p)| p.as_slice().iter().map(|w| w * w).sum::<f64>())
            .sum();
        0.5 * self.weight_decay * squares
    }

    /// Forward, then the loss layer's backward, then every layer's backward
    /// in reverse order.
    pub fn gradient(&mut self, x: &X, t: &X) -> Result<Grads> {
        self.loss(x, t)?;
        let dout = self.last.backward()?;
        self.layers.backward(&dout)?;

        let mut groups = Vec::new();
        self.layers.grad_groups(&mut groups);
        let mut grads = Grads::new();
        for (i, group) in groups.into_iter().enumerate() {
            for (kind, p) in group {
                grads.insert(format!("{kind}{}", i + 1), p);
            }
        }

        if self.weight_decay != 0.0 {
            let lambda = self.weight_decay;
            for (name, p) in self.params_mut().iter().filter(|(n, _)| is_weight(n)) {
                if let Some(g) = grads.get_mut(name) {
                    for (gi, &w) in g.as_mut_slice().iter_mut().zip(p.as_slice()) {
                        *gi += lambda * w;
                    }
                }
            }
        }
        Ok(grads)
    }

    /// Hand `grads` to the optimizer, writing through to the layers' weights.
    pub fn update_params(&mut self, grads: &Grads) -> Result<()> {
        let mut params = collect_params(&mut self.layers);
        self.optimizer.update(&mut params, grads)
    }

    /// Fraction of samples whose predicted argmax matches the target's.
    pub fn accuracy(&mut self, x: &X, t: &X) -> Result<f64> {
        let y = self.predict(x)?.to_rows()?.argmax_rows();
        let t = t.to_rows()?.argmax_rows();
        let hits = y.iter().zip(&t).filter(|(a, b)| a == b).count();
        Ok(hits as f64 / y.len() as f64)
    }

    /// Central-difference gradient of [`Network::loss`] for every parameter.
    pub fn numerical_gradient(&mut self, x: &X, t: &X) -> Result<Grads> {
        let names: Vec<(String, Param)> = self.params().into_iter().collect();
        let mut grads = Grads::new();
        for (name, mut value) in names {
            let diffs = gradcheck::numerical_gradient(
                |w| {
                    if let Some(p) = self.params_mut().get_mut(&name) {
                        p.as_mut_slice().copy_from_slice(w);
                    }
                    self.loss(x, t)
                },
                value.as_mut_slice(),
            )?;
            // put the unperturbed value back
            if let Some(p) = self.params_mut().get_mut(&name) {
                p.as_mut_slice().copy_from_slice(value.as_slice());
            }
            value.as_mut_slice().copy_from_slice(&diffs);
            grads.insert(name, value);
        }
        Ok(grads)
    }
}

impl Network<Matrix> {
    /// Affine, then `activation` and Affine for each further size.
    pub fn multi_layer(config: &MlpConfig, optimizer: Box<dyn Optimizer>, rng: &mut Rng) -> Result<Self> {
        let mut sizes = vec![config.input_size];
        sizes.extend(&config.hidden_sizes);
        sizes.push(config.output_size);

        let mut layers: Sequential<Matrix> = Sequential::new();
        for (i, pair) in sizes.windows(2).enumerate() {
            let idx = i + 1;
            if i > 0 {
                match config.activation {
                    Activation::Relu => layers.push(format!("Relu{i}"), Relu::new()),
                    Activation::Sigmoid => layers.push(format!("Sigmoid{i}"), Sigmoid::new()),
                }
            }
            layers.push(format!("Affine{idx}"), Affine::init(pair[0], pair[1], config.init, rng)?);
        }
        debug!(
            layers = ?layers.names().collect::<Vec<_>>(),
            sizes = ?sizes,
            "built multi-layer network"
        );
        Ok(Self::new(layers, SoftmaxWithLoss::new(), optimizer).with_weight_decay(config.weight_decay))
    }

    /// Affine → ReLU → Affine.
    pub fn two_layer(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        init: WeightInit,
        optimizer: Box<dyn Optimizer>,
        rng: &mut Rng,
    ) -> Result<Self> {
        let config = MlpConfig {
            input_size,
            hidden_sizes: vec![hidden_size],
            output_size,
            activation: Activation::Relu,
            init,
            weight_decay: 0.0,
        };
        Self::multi_layer(&config, optimizer, rng)
    }
}

impl Network<Tensor4D> {
    /// Conv → ReLU → Pool → Affine → ReLU → Affine.
    pub fn simple_conv(config: &ConvNetConfig, optimizer: Box<dyn Optimizer>, rng: &mut Rng) -> Result<Self> {
        let input = config.input;
        let conv = config.conv;
        let pool = config.pool;

        let conv_layer = Convolution::init(
            conv.filter_num,
            input.channels,
            conv.filter_size,
            conv.stride,
            conv.pad,
            config.init,
            rng,
        )?;
        let (ch, cw) = conv_layer.window().output_hw(input.height, input.width)?;
        let ph = conv_output_size(ch, pool.size, 0, pool.stride)?;
        let pw = conv_output_size(cw, pool.size, 0, pool.stride)?;
        let flat = conv.filter_num * ph * pw;
        debug!(
            conv_out = ?(conv.filter_num, ch, cw),
            pool_out = ?(conv.filter_num, ph, pw),
            "conv geometry"
        );

        let layers: Sequential<Tensor4D> = Sequential::new()
            .with("Conv1", conv_layer)
            .with("Relu1", Relu::new())
            .with("Pool1", Pooling::new(pool.size, pool.size, pool.stride))
            .with("Affine1", Affine::init(flat, config.hidden_size, config.init, rng)?)
            .with("Relu2", Relu::new())
            .with("Affine2", Affine::init(config.hidden_size, config.output_size, config.init, rng)?);
        debug!(layers = ?layers.names().collect::<Vec<_>>(), "built conv network");
        Ok(Self::new(layers, SoftmaxWithLoss::new(), optimizer).with_weight_decay(config.weight_decay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{one_hot, Sgd};

    fn tiny(rng: &mut Rng) -> Network<Matrix> {
        Network::two_layer(3, 4, 2, WeightInit::Std(0.5), Box::new(Sgd::new(0.1)), rng).unwrap()
    }

    #[test]
    fn parameter_names() {
        let mut rng = Rng::new(1);
        let mut net = tiny(&mut rng);
        let names: Vec<String> = net.params_mut().keys().cloned().collect();
        assert_eq!(names, vec!["W1", "W2", "b1", "b2"]);
        assert_eq!(net.layers().names().collect::<Vec<_>>(), vec!["Affine1", "Relu1", "Affine2"]);
    }

    #[test]
    fn update_writes_through_to_layers() {
        let mut rng = Rng::new(2);
        let mut net = tiny(&mut rng);
        let x = Matrix::from_fn(2, 3, |r, c| (r + c) as f64 * 0.1).unwrap();
        let t = one_hot(&[0, 1], 2).unwrap();

        let before = net.params();
        let grads = net.gradient(&x, &t).unwrap();
        assert_eq!(grads.keys().collect::<Vec<_>>(), before.keys().collect::<Vec<_>>());
        net.update_params(&grads).unwrap();
        let after = net.params();

        for (name, g) in &grads {
            let want: Vec<f64> = before[name]
                .as_slice()
                .iter()
                .zip(g.as_slice())
                .map(|(w, g)| w - 0.1 * g)
                .collect();
            assert_eq!(after[name].as_slice(), want.as_slice(), "{name}");
        }
    }

    #[test]
    fn analytic_matches_numerical() {
        let mut rng = Rng::new(3);
        let mut net = tiny(&mut rng);
        let x = Matrix::from_fn(3, 3, |r, c| ((r * 3 + c) as f64 * 0.37).sin()).unwrap();
        let t = one_hot(&[0, 1, 1], 2).unwrap();

        let analytic = net.gradient(&x, &t).unwrap();
        let numeric = net.numerical_gradient(&x, &t).unwrap();
        for (name, g) in &analytic {
            let diff = gradcheck::max_abs_diff(g.as_slice(), numeric[name].as_slice());
            assert!(diff < 1e-6, "{name}: {diff}");
        }
    }

    #[test]
    fn weight_decay_adds_penalty_and_gradient() {
        let mut rng = Rng::new(4);
        let mut plain = tiny(&mut rng);
        let mut rng = Rng::new(4);
        let mut decayed = tiny(&mut rng).with_weight_decay(0.1);
        let x = Matrix::from_fn(2, 3, |r, c| (r * 2 + c) as f64 * 0.2).unwrap();
        let t = one_hot(&[1, 0], 2).unwrap();

        let squares: f64 = plain
            .params()
            .iter()
            .filter(|(n, _)| n.starts_with('W'))
            .map(|(_, p)| p.as_slice().iter().map(|w| w * w).sum::<f64>())
            .sum();
        let l0 = plain.loss(&x, &t).unwrap();
        let l1 = decayed.loss(&x, &t).unwrap();
        assert!((l1 - l0 - 0.05 * squares).abs() < 1e-12);

        let g0 = plain.gradient(&x, &t).unwrap();
        let g1 = decayed.gradient(&x, &t).unwrap();
        let w1 = decayed.params()["W1"].clone();
        for ((a, b), w) in g0["W1"].as_slice().iter().zip(g1["W1"].as_slice()).zip(w1.as_slice()) {
            assert!((b - a - 0.1 * w).abs() < 1e-12);
        }
        assert_eq!(g0["b1"], g1["b1"]);

        let numeric = decayed.numerical_gradient(&x, &t).unwrap();
        let diff = gradcheck::max_abs_diff(g1["W1"].as_slice(), numeric["W1"].as_slice());
        assert!(diff < 1e-6, "{diff}");
    }

    #[test]
    fn nested_blocks_are_trained() {
        let mut rng = Rng::new(8);
        let block: Sequential<Matrix> = Sequential::new()
            .with("Affine1", Affine::init(3, 4, WeightInit::Std(0.5), &mut rng).unwrap())
            .with("Relu1", Relu::new());
        let layers: Sequential<Matrix> = Sequential::new()
            .with("Block1", block)
            .with("Affine2", Affine::init(4, 2, WeightInit::Std(0.5), &mut rng).unwrap());
        let mut net = Network::new(layers, SoftmaxWithLoss::new(), Box::new(Sgd::new(0.1)));
        let x = Matrix::from_fn(2, 3, |r, c| (r + 2 * c) as f64 * 0.3).unwrap();
        let t = one_hot(&[1, 0], 2).unwrap();

        let before = net.params();
        assert_eq!(before.keys().collect::<Vec<_>>(), vec!["W1", "W2", "b1", "b2"]);
        let grads = net.gradient(&x, &t).unwrap();
        assert_eq!(grads.keys().collect::<Vec<_>>(), before.keys().collect::<Vec<_>>());
        net.update_params(&grads).unwrap();
        assert_ne!(net.params()["W1"], before["W1"]);
    }

    #[test]
    fn accuracy_counts_argmax_hits() {
        let mut rng = Rng::new(5);
        let mut net = tiny(&mut rng);
        let x = Matrix::zeros(4, 3).unwrap();
        // zero input gives identical rows, so every sample predicts the same class
        let pred = net.predict(&x).unwrap().argmax_rows()[0];
        let labels = [pred, pred, 1 - pred, pred];
        let t = one_hot(&labels, 2).unwrap();
        assert_eq!(net.accuracy(&x, &t).unwrap(), 0.75);
    }

    #[test]
    fn conv_geometry_and_names() {
        let mut rng = Rng::new(6);
        let config = ConvNetConfig {
            input: crate::InputDim {
                channels: 1,
                height: 8,
                width: 8,
            },
            conv: crate::ConvParams {
                filter_num: 2,
                filter_size: 3,
                pad: 0,
                stride: 1,
            },
            hidden_size: 5,
            output_size: 3,
            ..ConvNetConfig::default()
        };
        let mut net = Network::simple_conv(&config, Box::new(Sgd::new(0.1)), &mut rng).unwrap();
        let params = net.params();
        assert_eq!(params["W1"].dims(), vec![2, 1, 3, 3]);
        assert_eq!(params["W2"].dims(), vec![2 * 3 * 3, 5]);
        assert_eq!(params["W3"].dims(), vec![5, 3]);

        let x = Tensor4D::zeros([2, 1, 8, 8]).unwrap();
        assert_eq!(net.predict(&x).unwrap().dims(), [2, 1, 1, 3]);
    }
}

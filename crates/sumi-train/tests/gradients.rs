use sumi_train::gradcheck::{max_abs_diff, numerical_gradient};
use sumi_train::{
    one_hot, Affine, ConvNetConfig, ConvParams, InputDim, Layer, LossLayer, Matrix, Network,
    PoolParams, Pooling, Rng, Sgd, SoftmaxWithLoss, Tensor4D, WeightInit,
};

fn random_matrix(rows: usize, cols: usize, rng: &mut Rng) -> Matrix {
    Matrix::from_fn(rows, cols, |_, _| rng.normal()).unwrap()
}

/// Scalar objective `Σ (affine(x) ⊙ c)`, whose upstream gradient is `c`.
fn weighted_sum(layer: &mut Affine, x: &Matrix, c: &Matrix) -> f64 {
    let y = Layer::<Matrix>::forward(layer, x).unwrap();
    y.mul(c).unwrap().sum()
}

#[test]
fn test_affine_backward_gradient_check() {
    let mut rng = Rng::new(42);
    let w = random_matrix(3, 2, &mut rng);
    let b = random_matrix(1, 2, &mut rng);
    let x = random_matrix(4, 3, &mut rng);
    let c = random_matrix(4, 2, &mut rng);

    let mut layer = Affine::new(w, b).unwrap();
    Layer::<Matrix>::forward(&mut layer, &x).unwrap();
    let dx = Layer::<Matrix>::backward(&mut layer, &c).unwrap();
    let dw = layer.dw().unwrap().clone();
    let db = layer.db().unwrap().clone();

    let mut probe = layer.clone();
    let num_w = numerical_gradient(
        |w| {
            probe.weight.as_mut_slice().copy_from_slice(w);
            Ok(weighted_sum(&mut probe, &x, &c))
        },
        &mut layer.weight.as_slice().to_vec(),
    )
    .unwrap();
    assert!(
        max_abs_diff(&num_w, dw.as_slice()) < 1e-4,
        "dW mismatch: numerical={:?}, analytical={:?}",
        num_w,
        dw.as_slice()
    );

    let mut probe = layer.clone();
    let num_b = numerical_gradient(
        |b| {
            probe.bias.as_mut_slice().copy_from_slice(b);
            Ok(weighted_sum(&mut probe, &x, &c))
        },
        &mut layer.bias.as_slice().to_vec(),
    )
    .unwrap();
    assert!(max_abs_diff(&num_b, db.as_slice()) < 1e-4, "db mismatch: {:?}", num_b);

    let mut probe = layer.clone();
    let num_x = numerical_gradient(
        |xs| {
            let x = Matrix::new(4, 3, xs.to_vec())?;
            Ok(weighted_sum(&mut probe, &x, &c))
        },
        &mut x.as_slice().to_vec(),
    )
    .unwrap();
    assert!(max_abs_diff(&num_x, dx.as_slice()) < 1e-4, "dx mismatch: {:?}", num_x);
}

#[test]
fn test_softmax_with_loss_gradient_check() {
    let mut rng = Rng::new(7);
    let x = random_matrix(3, 4, &mut rng);
    let t = one_hot(&[0, 3, 1], 4).unwrap();

    let mut loss = SoftmaxWithLoss::new();
    LossLayer::<Matrix>::forward(&mut loss, &x, &t).unwrap();
    let dx: Matrix = loss.backward().unwrap();

    let mut probe = SoftmaxWithLoss::new();
    let num = numerical_gradient(
        |xs| {
            let x = Matrix::new(3, 4, xs.to_vec())?;
            LossLayer::<Matrix>::forward(&mut probe, &x, &t)
        },
        &mut x.as_slice().to_vec(),
    )
    .unwrap();
    assert!(max_abs_diff(&num, dx.as_slice()) < 1e-4, "{:?} vs {:?}", num, dx.as_slice());
}

#[test]
fn test_pooling_gradient_only_at_argmax() {
    let mut rng = Rng::new(3);
    let x = Tensor4D::from_fn([2, 3, 4, 4], |_| rng.normal()).unwrap();
    let mut pool = Pooling::new(2, 2, 2);
    let y = pool.forward(&x).unwrap();
    let dout = Tensor4D::from_fn(y.dims(), |_| 1.0).unwrap();
    let dx = pool.backward(&dout).unwrap();

    for n in 0..2 {
        for c in 0..3 {
            for oy in 0..2 {
                for ox in 0..2 {
                    let mut nonzero = Vec::new();
                    for i in 0..2 {
                        for j in 0..2 {
                            let (yy, xx) = (2 * oy + i, 2 * ox + j);
                            if dx.get([n, c, yy, xx]) != 0.0 {
                                nonzero.push((yy, xx));
                            }
                        }
                    }
                    assert_eq!(nonzero.len(), 1, "window ({n},{c},{oy},{ox})");
                    let (yy, xx) = nonzero[0];
                    assert_eq!(x.get([n, c, yy, xx]), y.get([n, c, oy, ox]));
                    assert_eq!(dx.get([n, c, yy, xx]), 1.0);
                }
            }
        }
    }
}

#[test]
fn test_conv_network_gradient_check() {
    let mut rng = Rng::new(2024);
    let config = ConvNetConfig {
        input: InputDim {
            channels: 2,
            height: 5,
            width: 5,
        },
        conv: ConvParams {
            filter_num: 2,
            filter_size: 3,
            pad: 1,
            stride: 1,
        },
        pool: PoolParams { size: 2, stride: 1 },
        hidden_size: 4,
        output_size: 3,
        init: WeightInit::Std(0.3),
        weight_decay: 0.0,
    };
    let mut net = Network::simple_conv(&config, Box::new(Sgd::new(0.1)), &mut rng).unwrap();
    let x = Tensor4D::from_fn([2, 2, 5, 5], |_| rng.normal()).unwrap();
    let t = Tensor4D::unflatten(&one_hot(&[2, 0], 3).unwrap(), [2, 1, 1, 3]).unwrap();

    let analytic = net.gradient(&x, &t).unwrap();
    let numeric = net.numerical_gradient(&x, &t).unwrap();
    assert_eq!(
        analytic.keys().collect::<Vec<_>>(),
        vec!["W1", "W2", "W3", "b1", "b2", "b3"]
    );
    for (name, g) in &analytic {
        assert_eq!(g.dims(), numeric[name].dims(), "{name}");
        let diff = max_abs_diff(g.as_slice(), numeric[name].as_slice());
        assert!(diff < 1e-4, "{name}: max diff {diff}");
    }
}

#[test]
fn test_mlp_with_decay_gradient_check() {
    let mut rng = Rng::new(8);
    let config = sumi_train::MlpConfig {
        input_size: 4,
        hidden_sizes: vec![5, 3],
        output_size: 2,
        activation: sumi_train::Activation::Sigmoid,
        init: WeightInit::Xavier,
        weight_decay: 0.05,
    };
    let mut net = Network::multi_layer(&config, Box::new(Sgd::new(0.1)), &mut rng).unwrap();
    let x = random_matrix(3, 4, &mut rng);
    let t = one_hot(&[1, 0, 1], 2).unwrap();

    let analytic = net.gradient(&x, &t).unwrap();
    let numeric = net.numerical_gradient(&x, &t).unwrap();
    assert_eq!(analytic.len(), 6);
    for (name, g) in &analytic {
        let diff = max_abs_diff(g.as_slice(), numeric[name].as_slice());
        assert!(diff < 1e-6, "{name}: max diff {diff}");
    }
}

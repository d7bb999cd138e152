//! Small convolutional network on blob "images".
//!
//! Each sample is a 1×6×6 map whose class decides which pixel is bright, so
//! the network has to locate it spatially.
//!
//! ```sh
//! RUST_LOG=debug cargo run --release --example conv_images -p sumi-train
//! ```

use sumi_train::{
    blobs, ConvNetConfig, ConvParams, InputDim, Network, OptimizerConfig, Rng, TrainConfig,
    Trainer, WeightInit,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dim = InputDim {
        channels: 1,
        height: 6,
        width: 6,
    };
    let mut rng = Rng::new(3);
    let train = blobs(40, 5, 36, 0.5, &mut rng)?.into_images(dim)?;
    let test = blobs(10, 5, 36, 0.5, &mut rng)?.into_images(dim)?;

    let config = ConvNetConfig {
        input: dim,
        conv: ConvParams {
            filter_num: 8,
            filter_size: 3,
            pad: 1,
            stride: 1,
        },
        hidden_size: 32,
        output_size: 5,
        init: WeightInit::He,
        ..ConvNetConfig::default()
    };
    let optimizer = OptimizerConfig::Adam {
        lr: 0.001,
        beta1: 0.9,
        beta2: 0.999,
    };
    let mut net = Network::simple_conv(&config, optimizer.build(), &mut rng)?;

    let mut trainer = Trainer::new(TrainConfig {
        iterations: 300,
        batch_size: 20,
        eval_interval: 50,
        seed: 11,
    });
    let history = trainer.fit(&mut net, &train, Some(&test))?;
    println!(
        "final loss {:.4}, test accuracy {:?}",
        history.final_loss().unwrap_or(f64::NAN),
        history.test_acc.last()
    );
    Ok(())
}

//! Two-layer perceptron on synthetic Gaussian clusters.
//!
//! An optimizer can be given as JSON on the command line:
//!
//! ```sh
//! RUST_LOG=info cargo run --example blobs_mlp -p sumi-train
//! RUST_LOG=info cargo run --example blobs_mlp -p sumi-train -- '{"kind":"adam","lr":0.01,"beta1":0.9,"beta2":0.999}'
//! ```

use sumi_train::{blobs, MlpConfig, Network, OptimizerConfig, Rng, TrainConfig, Trainer, WeightInit};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let optimizer: OptimizerConfig = match std::env::args().nth(1) {
        Some(json) => serde_json::from_str(&json)?,
        None => OptimizerConfig::default(),
    };

    let mut rng = Rng::new(7);
    let train = blobs(200, 4, 8, 1.0, &mut rng)?;
    let test = blobs(50, 4, 8, 1.0, &mut rng)?;

    let config = MlpConfig {
        input_size: 8,
        hidden_sizes: vec![32],
        output_size: 4,
        init: WeightInit::He,
        ..MlpConfig::default()
    };
    let mut net = Network::multi_layer(&config, optimizer.build(), &mut rng)?;
    let mut trainer = Trainer::new(TrainConfig {
        iterations: 500,
        batch_size: 50,
        eval_interval: 100,
        seed: 1,
    });
    let history = trainer.fit(&mut net, &train, Some(&test))?;

    println!("{}", serde_json::to_string_pretty(&history.test_acc)?);
    Ok(())
}

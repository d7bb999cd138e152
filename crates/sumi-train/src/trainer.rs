use crate::{Batch, Dataset, Network, Result, Rng, TrainConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Loss after every update, accuracies at every evaluation point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub losses: Vec<f64>,
    pub train_acc: Vec<f64>,
    pub test_acc: Vec<f64>,
}

impl History {
    pub fn final_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }
}

/// Mini-batch training loop.
///
/// ```ignore
/// let mut trainer = Trainer::new(TrainConfig { iterations: 1000, ..Default::default() });
/// let history = trainer.fit(&mut net, &train, Some(&test))?;
/// ```
pub struct Trainer {
    config: TrainConfig,
    rng: Rng,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Self {
        let rng = Rng::new(config.seed);
        Self { config, rng }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Sample a batch, compute gradients, update, and record the loss on that
    /// batch under the updated weights. Accuracy over the full sets is taken
    /// every `eval_interval` iterations and after the last one.
    pub fn fit<X: Batch + 'static>(
        &mut self,
        net: &mut Network<X>,
        train: &Dataset<X>,
        test: Option<&Dataset<X>>,
    ) -> Result<History> {
        let iterations = self.config.iterations;
        let interval = self.config.eval_interval;
        let mut history = History::default();

        for i in 0..iterations {
            let (x, t) = train.sample_batch(self.config.batch_size, &mut self.rng)?;
            let grads = net.gradient(&x, &t)?;
            net.update_params(&grads)?;
            let loss = net.loss(&x, &t)?;
            debug!(iteration = i, loss, "step");
            history.losses.push(loss);

            if interval > 0 && (i % interval == 0 || i + 1 == iterations) {
                let train_acc = net.accuracy(train.inputs(), train.targets())?;
                history.train_acc.push(train_acc);
                let test_acc = match test {
                    Some(test) => {
                        let acc = net.accuracy(test.inputs(), test.targets())?;
                        history.test_acc.push(acc);
                        Some(acc)
                    }
                    None => None,
                };
                info!(iteration = i, loss, train_acc, test_acc = ?test_acc, "evaluation");
            }
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blobs, Sgd, WeightInit};

    #[test]
    fn records_every_step_and_evaluation() {
        let mut rng = Rng::new(11);
        let train = blobs(10, 2, 2, 0.2, &mut rng).unwrap();
        let mut net = Network::two_layer(2, 4, 2, WeightInit::Std(0.1), Box::new(Sgd::new(0.1)), &mut rng).unwrap();
        let mut trainer = Trainer::new(TrainConfig {
            iterations: 7,
            batch_size: 5,
            eval_interval: 3,
            seed: 1,
        });
        let history = trainer.fit(&mut net, &train, Some(&train)).unwrap();
        assert_eq!(history.losses.len(), 7);
        // iterations 0, 3, 6
        assert_eq!(history.train_acc.len(), 3);
        assert_eq!(history.test_acc, history.train_acc);
    }
}

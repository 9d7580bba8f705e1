//! Mini-batch training loop.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use wrm_data::window::TrainingWindow;

use crate::{
    config::ModelConfig,
    error::NumericError,
    network::{Gradients, LstmNetwork},
    optimizer::Adam,
};

/// Summary of a completed training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Number of training windows
    pub windows: usize,
    pub epochs: usize,
    /// Mean per-window MSE of each epoch
    pub loss_history: Vec<f64>,
    pub final_loss: f64,
}

/// Fit `network` to `windows` with MSE loss and Adam, shuffling every epoch.
pub(crate) fn fit(
    network: &mut LstmNetwork,
    windows: &[TrainingWindow],
    config: &ModelConfig,
) -> Result<TrainingReport, NumericError> {
    if windows.is_empty() {
        return Err(NumericError::EmptyTrainingSet);
    }
    let expected = network.output_size();
    if let Some(bad) = windows.iter().find(|w| w.target.len() != expected) {
        return Err(NumericError::TargetShape {
            expected,
            actual: bad.target.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let mut optimizer = Adam::new(network, config.learning_rate);
    let mut order: Vec<usize> = (0..windows.len()).collect();
    let mut loss_history = Vec::with_capacity(config.epochs);

    for epoch in 0..config.epochs {
        order.shuffle(&mut rng);
        let mut epoch_loss = 0.0;

        for batch in order.chunks(config.batch_size.max(1)) {
            let mut grads = Gradients::zeros_like(network);
            for &idx in batch {
                epoch_loss += network.accumulate_gradients(&windows[idx], &mut grads);
            }
            grads.scale(1.0 / batch.len() as f64);
            if !grads.is_finite() {
                return Err(NumericError::NonFiniteGradient { epoch });
            }
            if let Some(clip) = config.gradient_clip {
                grads.clip_norm(clip);
            }
            optimizer.step(network, &grads);
        }

        let mean_loss = epoch_loss / windows.len() as f64;
        if !mean_loss.is_finite() {
            return Err(NumericError::NonFiniteLoss { epoch });
        }
        log::debug!("epoch {}/{}: loss {:.6}", epoch + 1, config.epochs, mean_loss);
        loss_history.push(mean_loss);
    }

    let final_loss = loss_history.last().copied().unwrap_or(f64::NAN);
    Ok(TrainingReport {
        windows: windows.len(),
        epochs: config.epochs,
        loss_history,
        final_loss,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrm_data::window::build_training_set;

    fn sine_windows() -> Vec<TrainingWindow> {
        let series: Vec<f64> = (0..60)
            .map(|i| 0.5 + 0.4 * (i as f64 * std::f64::consts::TAU / 12.0).sin())
            .collect();
        build_training_set(&series, 6, 1).unwrap()
    }

    #[test]
    fn test_training_reduces_loss() {
        let config = ModelConfig::default()
            .with_hidden_sizes(vec![8])
            .with_learning_rate(0.01)
            .with_batch_size(8)
            .with_epochs(30);
        let mut network = LstmNetwork::new(&config.hidden_sizes, 1, config.seed);
        let report = fit(&mut network, &sine_windows(), &config).unwrap();
        assert_eq!(report.epochs, 30);
        assert_eq!(report.windows, 54);
        assert_eq!(report.loss_history.len(), 30);
        assert!(report.final_loss < report.loss_history[0]);
    }

    #[test]
    fn test_training_is_deterministic_for_a_seed() {
        let config = ModelConfig::default()
            .with_hidden_sizes(vec![4])
            .with_epochs(3);
        let windows = sine_windows();
        let mut a = LstmNetwork::new(&config.hidden_sizes, 1, config.seed);
        let mut b = LstmNetwork::new(&config.hidden_sizes, 1, config.seed);
        let ra = fit(&mut a, &windows, &config).unwrap();
        let rb = fit(&mut b, &windows, &config).unwrap();
        assert_eq!(ra, rb);
        assert_eq!(a.predict(&[0.1; 6]), b.predict(&[0.1; 6]));
    }

    #[test]
    fn test_divergence_is_reported() {
        let config = ModelConfig::default()
            .with_hidden_sizes(vec![4])
            .with_learning_rate(1e200)
            .with_gradient_clip(None)
            .with_batch_size(1)
            .with_epochs(3);
        let mut network = LstmNetwork::new(&config.hidden_sizes, 1, config.seed);
        let err = fit(&mut network, &sine_windows(), &config).unwrap_err();
        assert!(matches!(
            err,
            NumericError::NonFiniteLoss { .. } | NumericError::NonFiniteGradient { .. }
        ));
    }

    #[test]
    fn test_target_shape_mismatch() {
        let config = ModelConfig::default().with_hidden_sizes(vec![2]);
        let mut network = LstmNetwork::new(&config.hidden_sizes, 2, config.seed);
        let err = fit(&mut network, &sine_windows(), &config).unwrap_err();
        assert_eq!(
            err,
            NumericError::TargetShape {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_empty_training_set() {
        let config = ModelConfig::default().with_hidden_sizes(vec![2]);
        let mut network = LstmNetwork::new(&config.hidden_sizes, 1, config.seed);
        assert_eq!(
            fit(&mut network, &[], &config),
            Err(NumericError::EmptyTrainingSet)
        );
    }
}

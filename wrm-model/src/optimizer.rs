//! Adam optimizer over [`LstmNetwork`] parameters.

use ndarray::{Array, Dimension, Zip};

use crate::network::{Gradients, LstmNetwork};

#[derive(Debug, Clone, Copy)]
struct Step {
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    rate: f64,
}

fn update<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    step: Step,
) {
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = step.beta1 * *m + (1.0 - step.beta1) * g;
            *v = step.beta2 * *v + (1.0 - step.beta2) * g * g;
            *p -= step.rate * *m / ((*v).sqrt() + step.epsilon);
        });
}

/// First-order adaptive optimizer with bias-corrected moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    t: i32,
    m: Gradients,
    v: Gradients,
}

impl Adam {
    pub fn new(network: &LstmNetwork, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            m: Gradients::zeros_like(network),
            v: Gradients::zeros_like(network),
        }
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> i32 {
        self.t
    }

    pub fn step(&mut self, network: &mut LstmNetwork, grads: &Gradients) {
        self.t = self.t.saturating_add(1);
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);
        let step = Step {
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            rate: self.learning_rate * bias2.sqrt() / bias1,
        };

        let layers = network
            .layers
            .iter_mut()
            .zip(&grads.layers)
            .zip(self.m.layers.iter_mut())
            .zip(self.v.layers.iter_mut());
        for (((layer, g), m), v) in layers {
            update(&mut layer.w_x, &g.w_x, &mut m.w_x, &mut v.w_x, step);
            update(&mut layer.w_h, &g.w_h, &mut m.w_h, &mut v.w_h, step);
            update(&mut layer.b, &g.b, &mut m.b, &mut v.b, step);
        }
        let head = &mut network.head;
        update(
            &mut head.weights,
            &grads.head.weights,
            &mut self.m.head.weights,
            &mut self.v.head.weights,
            step,
        );
        update(
            &mut head.biases,
            &grads.head.biases,
            &mut self.m.head.biases,
            &mut self.v.head.biases,
            step,
        );
    }
}

//! Stacked LSTM network with a linear output projection.
//!
//! The network reads a univariate window (W timesteps x 1 feature), runs it
//! through the recurrent layers and projects the last hidden state of the
//! top layer to L outputs. Gradients are computed with backpropagation
//! through time over the whole window.

use ndarray::{s, Array1, Array2, ArrayViewD, ArrayViewMutD, Axis};
use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use wrm_data::window::TrainingWindow;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    let col = a.view().insert_axis(Axis(1));
    let row = b.view().insert_axis(Axis(0));
    col.dot(&row)
}

/// One LSTM layer. Gate blocks are stacked in the order
/// input, forget, candidate, output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayer {
    pub(crate) input_size: usize,
    pub(crate) hidden_size: usize,
    pub(crate) w_x: Array2<f64>, // [4H, I]
    pub(crate) w_h: Array2<f64>, // [4H, H]
    pub(crate) b: Array1<f64>,   // [4H]
}

/// Activations of one timestep, kept for the backward pass.
#[derive(Debug, Clone)]
struct StepCache {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    c: Array1<f64>,
    tanh_c: Array1<f64>,
    h: Array1<f64>,
}

impl LstmLayer {
    fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        let w_x = Array2::from_shape_fn((4 * hidden_size, input_size), |_| rng.sample(&dist));
        let w_h = Array2::from_shape_fn((4 * hidden_size, hidden_size), |_| rng.sample(&dist));
        let mut b = Array1::zeros(4 * hidden_size);
        // forget gate starts open
        b.slice_mut(s![hidden_size..2 * hidden_size]).fill(1.0);
        Self {
            input_size,
            hidden_size,
            w_x,
            w_h,
            b,
        }
    }

    fn step(&self, x: &Array1<f64>, h_prev: &Array1<f64>, c_prev: &Array1<f64>) -> StepCache {
        let n = self.hidden_size;
        let z = self.w_x.dot(x) + self.w_h.dot(h_prev) + &self.b;
        let i = z.slice(s![0..n]).mapv(sigmoid);
        let f = z.slice(s![n..2 * n]).mapv(sigmoid);
        let g = z.slice(s![2 * n..3 * n]).mapv(f64::tanh);
        let o = z.slice(s![3 * n..4 * n]).mapv(sigmoid);
        let c = &f * c_prev + &i * &g;
        let tanh_c = c.mapv(f64::tanh);
        let h = &o * &tanh_c;
        StepCache {
            x: x.clone(),
            h_prev: h_prev.clone(),
            c_prev: c_prev.clone(),
            i,
            f,
            g,
            o,
            c,
            tanh_c,
            h,
        }
    }

    /// Backpropagate through time. `dh_seq[t]` is the loss gradient flowing
    /// into this layer's output at step t from above; returns the gradient
    /// with respect to this layer's inputs at every step.
    fn backward(
        &self,
        steps: &[StepCache],
        dh_seq: &[Array1<f64>],
        grads: &mut LayerGrads,
    ) -> Vec<Array1<f64>> {
        let n = self.hidden_size;
        let mut dh_next = Array1::<f64>::zeros(n);
        let mut dc_next = Array1::<f64>::zeros(n);
        let mut dz = Array1::<f64>::zeros(4 * n);
        let mut dx_seq = vec![Array1::<f64>::zeros(self.input_size); steps.len()];

        for t in (0..steps.len()).rev() {
            let step = &steps[t];
            let dh = &dh_seq[t] + &dh_next;
            let d_o = &dh * &step.tanh_c;
            let dc = &dh * &step.o * &step.tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;
            let d_i = &dc * &step.g;
            let d_g = &dc * &step.i;
            let d_f = &dc * &step.c_prev;
            dc_next = &dc * &step.f;

            dz.slice_mut(s![0..n])
                .assign(&(d_i * &step.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![n..2 * n])
                .assign(&(d_f * &step.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![2 * n..3 * n])
                .assign(&(d_g * &step.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![3 * n..4 * n])
                .assign(&(d_o * &step.o.mapv(|v| v * (1.0 - v))));

            grads.w_x += &outer(&dz, &step.x);
            grads.w_h += &outer(&dz, &step.h_prev);
            grads.b += &dz;

            dx_seq[t] = self.w_x.t().dot(&dz);
            dh_next = self.w_h.t().dot(&dz);
        }
        dx_seq
    }
}

/// Fully connected output projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub(crate) weights: Array2<f64>, // [O, H]
    pub(crate) biases: Array1<f64>,  // [O]
}

impl Dense {
    fn new(input_size: usize, output_size: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (input_size + output_size) as f64).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        Self {
            weights: Array2::from_shape_fn((output_size, input_size), |_| rng.sample(&dist)),
            biases: Array1::zeros(output_size),
        }
    }

    fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        self.weights.dot(x) + &self.biases
    }
}

/// Recurrent state carried across the timesteps of one inference call.
///
/// Owned by the call and dropped when it returns, so repeated single-step
/// predictions never accumulate buffers.
struct Scratch {
    hidden: Vec<Array1<f64>>,
    cell: Vec<Array1<f64>>,
}

impl Scratch {
    fn new(layers: &[LstmLayer]) -> Self {
        Self {
            hidden: layers.iter().map(|l| Array1::zeros(l.hidden_size)).collect(),
            cell: layers.iter().map(|l| Array1::zeros(l.hidden_size)).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmNetwork {
    pub(crate) layers: Vec<LstmLayer>,
    pub(crate) head: Dense,
}

impl LstmNetwork {
    /// A univariate network with one LSTM layer per entry of `hidden_sizes`.
    pub fn new(hidden_sizes: &[usize], output_size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut input_size = 1;
        let mut layers = Vec::with_capacity(hidden_sizes.len());
        for &hidden_size in hidden_sizes {
            layers.push(LstmLayer::new(input_size, hidden_size, &mut rng));
            input_size = hidden_size;
        }
        let head = Dense::new(input_size, output_size, &mut rng);
        Self { layers, head }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size)
    }

    pub fn output_size(&self) -> usize {
        self.head.biases.len()
    }

    pub fn hidden_sizes(&self) -> Vec<usize> {
        self.layers.iter().map(|l| l.hidden_size).collect()
    }

    fn top_hidden_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.hidden_size)
    }

    /// Run one window through the network.
    pub fn predict(&self, window: &[f64]) -> Array1<f64> {
        let mut scratch = Scratch::new(&self.layers);
        for &value in window {
            let mut x = Array1::from_elem(1, value);
            for (k, layer) in self.layers.iter().enumerate() {
                let step = layer.step(&x, &scratch.hidden[k], &scratch.cell[k]);
                scratch.cell[k] = step.c;
                scratch.hidden[k] = step.h.clone();
                x = step.h;
            }
        }
        let top = scratch
            .hidden
            .last()
            .cloned()
            .unwrap_or_else(|| Array1::zeros(self.top_hidden_size()));
        self.head.forward(&top)
    }

    fn trace(&self, window: &[f64]) -> (Array1<f64>, Vec<Vec<StepCache>>) {
        let mut seq: Vec<Array1<f64>> = window.iter().map(|&v| Array1::from_elem(1, v)).collect();
        let mut traces = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let mut h = Array1::zeros(layer.hidden_size);
            let mut c = Array1::zeros(layer.hidden_size);
            let mut steps = Vec::with_capacity(seq.len());
            for x in &seq {
                let step = layer.step(x, &h, &c);
                h = step.h.clone();
                c = step.c.clone();
                steps.push(step);
            }
            seq = steps.iter().map(|step| step.h.clone()).collect();
            traces.push(steps);
        }
        let top = seq
            .last()
            .cloned()
            .unwrap_or_else(|| Array1::zeros(self.top_hidden_size()));
        (self.head.forward(&top), traces)
    }

    /// Add the MSE gradients of one window into `grads`; returns its loss.
    ///
    /// The target length must equal [`output_size`](Self::output_size).
    pub fn accumulate_gradients(&self, window: &TrainingWindow, grads: &mut Gradients) -> f64 {
        let (output, traces) = self.trace(&window.input);
        let target = Array1::from(window.target.clone());
        let diff = &output - &target;
        let outputs = diff.len() as f64;
        let loss = diff.mapv(|d| d * d).sum() / outputs;
        let d_out = diff.mapv(|d| 2.0 * d / outputs);

        let top = traces
            .last()
            .and_then(|steps| steps.last())
            .map(|step| step.h.clone())
            .unwrap_or_else(|| Array1::zeros(self.top_hidden_size()));
        grads.head.weights += &outer(&d_out, &top);
        grads.head.biases += &d_out;

        let timesteps = window.input.len();
        if timesteps == 0 {
            return loss;
        }
        let mut dh_seq = vec![Array1::<f64>::zeros(self.top_hidden_size()); timesteps];
        dh_seq[timesteps - 1] = self.head.weights.t().dot(&d_out);
        for (k, layer) in self.layers.iter().enumerate().rev() {
            dh_seq = layer.backward(&traces[k], &dh_seq, &mut grads.layers[k]);
        }
        loss
    }
}

#[derive(Debug, Clone)]
pub struct LayerGrads {
    pub(crate) w_x: Array2<f64>,
    pub(crate) w_h: Array2<f64>,
    pub(crate) b: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub(crate) weights: Array2<f64>,
    pub(crate) biases: Array1<f64>,
}

/// Gradient (or optimizer moment) buffers shaped like a network.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub(crate) layers: Vec<LayerGrads>,
    pub(crate) head: DenseGrads,
}

impl Gradients {
    pub fn zeros_like(network: &LstmNetwork) -> Self {
        Self {
            layers: network
                .layers
                .iter()
                .map(|l| LayerGrads {
                    w_x: Array2::zeros(l.w_x.raw_dim()),
                    w_h: Array2::zeros(l.w_h.raw_dim()),
                    b: Array1::zeros(l.b.raw_dim()),
                })
                .collect(),
            head: DenseGrads {
                weights: Array2::zeros(network.head.weights.raw_dim()),
                biases: Array1::zeros(network.head.biases.raw_dim()),
            },
        }
    }

    fn views(&self) -> Vec<ArrayViewD<'_, f64>> {
        let mut views = Vec::with_capacity(self.layers.len() * 3 + 2);
        for layer in &self.layers {
            views.push(layer.w_x.view().into_dyn());
            views.push(layer.w_h.view().into_dyn());
            views.push(layer.b.view().into_dyn());
        }
        views.push(self.head.weights.view().into_dyn());
        views.push(self.head.biases.view().into_dyn());
        views
    }

    fn views_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        let mut views = Vec::with_capacity(self.layers.len() * 3 + 2);
        for layer in &mut self.layers {
            views.push(layer.w_x.view_mut().into_dyn());
            views.push(layer.w_h.view_mut().into_dyn());
            views.push(layer.b.view_mut().into_dyn());
        }
        views.push(self.head.weights.view_mut().into_dyn());
        views.push(self.head.biases.view_mut().into_dyn());
        views
    }

    pub fn scale(&mut self, factor: f64) {
        for mut view in self.views_mut() {
            view.mapv_inplace(|v| v * factor);
        }
    }

    /// Global L2 norm over every buffer.
    pub fn norm(&self) -> f64 {
        self.views()
            .iter()
            .map(|view| view.iter().map(|v| v * v).sum::<f64>())
            .sum::<f64>()
            .sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.views().iter().all(|view| view.iter().all(|v| v.is_finite()))
    }

    /// Rescale so the global norm does not exceed `max_norm`.
    pub fn clip_norm(&mut self, max_norm: f64) {
        let norm = self.norm();
        if norm > max_norm {
            self.scale(max_norm / norm);
        }
    }
}

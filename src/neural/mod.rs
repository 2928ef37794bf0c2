pub mod activations;
pub mod optimizer;
pub mod persist;
mod utils;

use crate::prelude::*;
use std::{collections::VecDeque, ops::RangeInclusive};

use crate::matrix::Matrix2;
use rand::Rng;

use self::{
    activations::{dsigmoid, sigmoid},
    utils::{random_matrix, vector},
};

/// Number of implicit bias units appended to the input and hidden layers.
/// The bias unit always occupies the last slot of its layer and holds 1.0.
pub const BIAS_UNITS: usize = 1;

/// Default range for initial weights.
pub const DEFAULT_INIT_RANGE: RangeInclusive<f64> = -1.0..=1.0;

/// Value every slot of a default context snapshot starts at.
pub const CONTEXT_FILL: f64 = 0.5;

/// One training example.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub input: Vec<f64>,
    pub target: Vec<f64>,
}

impl Pattern {
    pub fn new(input: Vec<f64>, target: Vec<f64>) -> Self {
        Self { input, target }
    }
}

/// A three layer feedforward network trained by backpropagation with
/// momentum, with an optional Elman style context window over past hidden
/// activations.
///
/// `n_inputs` and `n_hiddens` count the bias unit, so a network built with
/// `FeedForward::new(4, 12, 3)` accepts 4 inputs and has `n_inputs() == 5`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedForward {
    n_inputs: usize,
    n_hiddens: usize,
    n_outputs: usize,
    regression: bool,
    input_activations: Vec<f64>,
    hidden_activations: Vec<f64>,
    output_activations: Vec<f64>,
    /// `[n_inputs][n_hiddens]`
    input_weights: Matrix2<f64>,
    /// `[n_hiddens][n_outputs]`
    output_weights: Matrix2<f64>,
    input_changes: Matrix2<f64>,
    output_changes: Matrix2<f64>,
    /// Most recent snapshot first.
    contexts: VecDeque<Vec<f64>>,
}

impl FeedForward {
    /// Initializes a network with weights drawn uniformly from [-1, 1]
    /// using the thread RNG.
    pub fn new(inputs: usize, hiddens: usize, outputs: usize) -> Self {
        Self::with_rng(
            &mut rand::thread_rng(),
            inputs,
            hiddens,
            outputs,
            DEFAULT_INIT_RANGE,
        )
    }

    /// Initializes a network with weights drawn uniformly from `init_range`.
    /// Input weights are sampled before output weights, row by row, so a
    /// seeded RNG always produces the same network.
    ///
    /// # Panics
    ///
    /// Panics if `init_range` is empty or not finite.
    pub fn with_rng<R: Rng + ?Sized>(
        rng: &mut R,
        inputs: usize,
        hiddens: usize,
        outputs: usize,
        init_range: RangeInclusive<f64>,
    ) -> Self {
        let n_inputs = inputs + BIAS_UNITS;
        let n_hiddens = hiddens + BIAS_UNITS;

        let input_weights = random_matrix(rng, n_inputs, n_hiddens, init_range.clone());
        let output_weights = random_matrix(rng, n_hiddens, outputs, init_range);

        Self {
            n_inputs,
            n_hiddens,
            n_outputs: outputs,
            regression: false,
            input_activations: vector(n_inputs, 1.0),
            hidden_activations: vector(n_hiddens, 1.0),
            output_activations: vector(outputs, 1.0),
            input_weights,
            output_weights,
            input_changes: Matrix2::new(n_inputs, n_hiddens),
            output_changes: Matrix2::new(n_hiddens, outputs),
            contexts: VecDeque::new(),
        }
    }

    /// Configures a context window of `n` hidden-activation snapshots.
    ///
    /// Without `init_values` every snapshot starts as `n_hiddens` copies of 0.5.
    /// Explicit values replace the window as given (their count becomes the
    /// window size) and must each hold `n_hiddens` values. `n == 0` with no
    /// values disables recurrence.
    pub fn set_contexts(&mut self, n: usize, init_values: Option<Vec<Vec<f64>>>) -> Result<()> {
        let contexts = match init_values {
            Some(values) => {
                if let Some(bad) = values.iter().find(|c| c.len() != self.n_hiddens) {
                    return Err(Error::InvalidContext {
                        expected: self.n_hiddens,
                        got: bad.len(),
                    });
                }
                values
            }
            None => vec![vector(self.n_hiddens, CONTEXT_FILL); n],
        };

        self.contexts = contexts.into();
        Ok(())
    }

    /// Runs a forward pass and returns the output activations.
    ///
    /// `inputs` excludes the bias unit. When a context window is configured
    /// every non-bias value of every snapshot is added, unweighted, to each
    /// hidden unit's sum, and the new hidden activations are then pushed to
    /// the front of the window.
    pub fn update(&mut self, inputs: &[f64]) -> Result<&[f64]> {
        let n_features = self.n_inputs - BIAS_UNITS;
        if inputs.len() != n_features {
            return Err(Error::InvalidInputLength {
                expected: n_features,
                got: inputs.len(),
            });
        }

        self.input_activations[..n_features].copy_from_slice(inputs);

        for i in 0..self.n_hiddens - BIAS_UNITS {
            let mut sum = 0.0;
            for j in 0..self.n_inputs {
                sum += self.input_activations[j] * self.input_weights[(j, i)];
            }
            for context in &self.contexts {
                for &c in &context[..self.n_hiddens - BIAS_UNITS] {
                    sum += c;
                }
            }
            self.hidden_activations[i] = sigmoid(sum);
        }

        if !self.contexts.is_empty() {
            self.contexts.pop_back();
            self.contexts.push_front(self.hidden_activations.clone());
        }

        for i in 0..self.n_outputs {
            let mut sum = 0.0;
            for j in 0..self.n_hiddens {
                sum += self.hidden_activations[j] * self.output_weights[(j, i)];
            }
            self.output_activations[i] = sigmoid(sum);
        }

        Ok(&self.output_activations)
    }

    /// Adjusts every weight toward `targets` based on the last forward pass
    /// and returns that pattern's loss, `sum 0.5 * (target - output)^2`.
    ///
    /// Each weight moves by `rate * change + momentum * previous_change`,
    /// where `change` is the downstream delta times the upstream activation.
    pub fn back_propagate(&mut self, targets: &[f64], rate: f64, momentum: f64) -> Result<f64> {
        if targets.len() != self.n_outputs {
            return Err(Error::InvalidTargetLength {
                expected: self.n_outputs,
                got: targets.len(),
            });
        }

        let output_deltas: Vec<f64> = self
            .output_activations
            .iter()
            .zip(targets)
            .map(|(&out, &target)| dsigmoid(out) * (target - out))
            .collect();

        let hidden_deltas: Vec<f64> = (0..self.n_hiddens)
            .map(|i| {
                let e: f64 = output_deltas
                    .iter()
                    .zip(self.output_weights.row(i))
                    .map(|(delta, w)| delta * w)
                    .sum();
                dsigmoid(self.hidden_activations[i]) * e
            })
            .collect();

        adjust(
            &mut self.output_weights,
            &mut self.output_changes,
            &self.hidden_activations,
            &output_deltas,
            rate,
            momentum,
        );
        adjust(
            &mut self.input_weights,
            &mut self.input_changes,
            &self.input_activations,
            &hidden_deltas,
            rate,
            momentum,
        );

        Ok(targets
            .iter()
            .zip(&self.output_activations)
            .map(|(target, out)| 0.5 * (target - out).powi(2))
            .sum())
    }

    /// One pass over `patterns` in order, returning the summed loss.
    pub fn train_epoch(&mut self, patterns: &[Pattern], rate: f64, momentum: f64) -> Result<f64> {
        let mut e = 0.0;
        for p in patterns {
            self.update(&p.input)?;
            e += self.back_propagate(&p.target, rate, momentum)?;
        }
        Ok(e)
    }

    /// Runs exactly `iterations` passes over `patterns` and returns the
    /// summed loss of each pass. Any failing pattern aborts the whole call.
    pub fn train(
        &mut self,
        patterns: &[Pattern],
        iterations: usize,
        rate: f64,
        momentum: f64,
    ) -> Result<Vec<f64>> {
        (0..iterations)
            .map(|_| self.train_epoch(patterns, rate, momentum))
            .collect()
    }

    /// Forward pass over every pattern's input without touching the weights.
    pub fn evaluate(&mut self, patterns: &[Pattern]) -> Result<Vec<Vec<f64>>> {
        patterns
            .iter()
            .map(|p| self.update(&p.input).map(<[f64]>::to_vec))
            .collect()
    }

    /// Input layer size, bias unit included.
    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    /// Hidden layer size, bias unit included.
    pub fn n_hiddens(&self) -> usize {
        self.n_hiddens
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    pub fn regression(&self) -> bool {
        self.regression
    }

    pub fn set_regression(&mut self, regression: bool) {
        self.regression = regression;
    }

    pub fn input_activations(&self) -> &[f64] {
        &self.input_activations
    }

    pub fn hidden_activations(&self) -> &[f64] {
        &self.hidden_activations
    }

    pub fn output_activations(&self) -> &[f64] {
        &self.output_activations
    }

    pub fn input_weights(&self) -> &Matrix2<f64> {
        &self.input_weights
    }

    pub fn output_weights(&self) -> &Matrix2<f64> {
        &self.output_weights
    }

    pub fn input_changes(&self) -> &Matrix2<f64> {
        &self.input_changes
    }

    pub fn output_changes(&self) -> &Matrix2<f64> {
        &self.output_changes
    }

    /// Context snapshots, most recent first.
    pub fn contexts(&self) -> &VecDeque<Vec<f64>> {
        &self.contexts
    }
}

/// Momentum update of one weight layer.
/// `weights[i][j]` connects upstream unit `i` to downstream unit `j`.
fn adjust(
    weights: &mut Matrix2<f64>,
    changes: &mut Matrix2<f64>,
    upstream: &[f64],
    deltas: &[f64],
    rate: f64,
    momentum: f64,
) {
    for (i, &act) in upstream.iter().enumerate() {
        for (j, &delta) in deltas.iter().enumerate() {
            let change = delta * act;
            weights[(i, j)] += rate * change + momentum * changes[(i, j)];
            changes[(i, j)] = change;
        }
    }
}

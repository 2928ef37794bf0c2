use std::{fs, ops::RangeInclusive, path::Path, sync::mpsc};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    neural::{FeedForward, Pattern},
    prelude::*,
    viz::Visualizer,
};

/// Shape and initialization of a fresh network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Input units, bias excluded. One per CMYK channel by default.
    pub inputs: usize,
    /// Hidden units, bias excluded.
    pub hiddens: usize,
    pub outputs: usize,
    /// Context window size; 0 disables recurrence.
    pub contexts: usize,
    /// Inclusive bounds of the uniform initial weights.
    pub init_range: (f64, f64),
    /// Seed for weight initialization. `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            inputs: 4,
            hiddens: 12,
            outputs: 3,
            contexts: 0,
            init_range: (-1.0, 1.0),
            seed: None,
        }
    }
}

impl NetworkConfig {
    /// Reads a JSON config. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn with_hiddens(mut self, hiddens: usize) -> Self {
        self.hiddens = hiddens;
        self
    }

    pub fn with_outputs(mut self, outputs: usize) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_contexts(mut self, contexts: usize) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn with_init_range(mut self, range: RangeInclusive<f64>) -> Self {
        self.init_range = range.into_inner();
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(&self) -> Result<FeedForward> {
        if self.inputs == 0 || self.hiddens == 0 || self.outputs == 0 {
            return Err(Error::InvalidConfig(format!(
                "every layer needs at least one unit, got {}-{}-{}",
                self.inputs, self.hiddens, self.outputs
            )));
        }
        let (low, high) = self.init_range;
        if !(low.is_finite() && high.is_finite() && low <= high) {
            return Err(Error::InvalidConfig(format!(
                "bad weight range [{low}, {high}]"
            )));
        }

        let mut net = match self.seed {
            Some(seed) => FeedForward::with_rng(
                &mut StdRng::seed_from_u64(seed),
                self.inputs,
                self.hiddens,
                self.outputs,
                low..=high,
            ),
            None => FeedForward::with_rng(
                &mut rand::thread_rng(),
                self.inputs,
                self.hiddens,
                self.outputs,
                low..=high,
            ),
        };
        net.set_contexts(self.contexts, None)?;
        Ok(net)
    }
}

/// Drives repeated training passes over a pattern set, with optional
/// progress logging and a live loss plot.
pub struct Optimizer {
    iterations: usize,
    iterations_per_log: Option<usize>,
    rate: f64,
    momentum: f64,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(2, 0.6, 0.4)
    }
}

impl Optimizer {
    pub fn new(iterations: usize, rate: f64, momentum: f64) -> Self {
        Self {
            iterations,
            iterations_per_log: None,
            rate,
            momentum,
        }
    }

    /// Log the loss every `iterations_per_log` passes.
    pub fn with_log(mut self, iterations_per_log: Option<usize>) -> Self {
        self.iterations_per_log = iterations_per_log.filter(|&n| n > 0);
        self
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub fn set_momentum(&mut self, momentum: f64) {
        self.momentum = momentum;
    }

    pub fn set_iterations(&mut self, iterations: usize) {
        self.iterations = iterations;
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Trains `net` on `patterns` and returns the loss of every pass.
    pub fn train(&self, net: &mut FeedForward, patterns: &[Pattern]) -> Result<Vec<f64>> {
        self.run(net, patterns, |_, _| {})
    }

    /// Trains on a worker thread while a [`Visualizer`] plots the loss.
    /// Closing the window does not stop training.
    pub fn train_gui<Gui: Visualizer>(
        &self,
        net: &mut FeedForward,
        patterns: &[Pattern],
    ) -> Result<Vec<f64>> {
        std::thread::scope(|scope| -> Result<Vec<f64>> {
            let (tx, rx) = mpsc::channel();
            let handle = scope.spawn(move || {
                self.run(net, patterns, |i, loss| {
                    // Viewer may already be closed.
                    let _ = tx.send((i, loss));
                })
            });

            if let Err(e) = eframe::run_native(
                "cmyk_nn",
                eframe::NativeOptions::default(),
                Box::new(|cc| Box::new(Gui::new(cc, rx))),
            ) {
                tracing::warn!(error = %e, "loss viewer failed to start");
            }

            handle.join().map_err(|_| Error::ThreadErr)?
        })
    }

    fn run<F: FnMut(usize, f64)>(
        &self,
        net: &mut FeedForward,
        patterns: &[Pattern],
        mut on_iteration: F,
    ) -> Result<Vec<f64>> {
        tracing::info!(
            patterns = patterns.len(),
            iterations = self.iterations,
            rate = self.rate,
            momentum = self.momentum,
            "training"
        );

        let mut losses = Vec::with_capacity(self.iterations);
        for i in 0..self.iterations {
            let loss = net.train_epoch(patterns, self.rate, self.momentum)?;
            if self.iterations_per_log.is_some_and(|ipl| i % ipl == 0) {
                tracing::info!(iteration = i, loss, "training progress");
            }
            on_iteration(i, loss);
            losses.push(loss);
        }

        tracing::debug!(final_loss = ?losses.last(), "training finished");
        Ok(losses)
    }
}

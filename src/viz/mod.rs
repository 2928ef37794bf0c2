use std::{
    collections::VecDeque,
    sync::{mpsc::Receiver, Arc, Mutex, PoisonError},
    thread,
};

use eframe::CreationContext;
use egui::plot::{Line, Plot};

/// State sent to the GUI renderer after each training pass
/// (iteration, summed loss)
pub type IterationState = (usize, f64);

/// Any type that can be rendered and updated during training
pub trait Visualizer: eframe::App + 'static {
    fn new(cc: &CreationContext, rx: Receiver<IterationState>) -> Self;
}

/// Shared, bounded history of training losses. Oldest points are dropped
/// once `limit` is reached.
#[derive(Clone)]
pub struct LossHistory {
    data: Arc<Mutex<VecDeque<IterationState>>>,
    limit: usize,
}

impl LossHistory {
    pub const DATA_LIMIT: usize = 20_000;

    pub fn new(limit: usize) -> Self {
        Self {
            data: Arc::new(Mutex::new(VecDeque::new())),
            limit,
        }
    }

    pub fn push(&self, state: IterationState) {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        if self.limit == 0 {
            return;
        }
        while data.len() >= self.limit {
            data.pop_front();
        }
        data.push_back(state);
    }

    /// Returns a copy of the history, oldest first.
    pub fn snapshot(&self) -> Vec<IterationState> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.iter().copied().collect()
    }

    /// Plot points as `[iteration, loss]`.
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.snapshot()
            .into_iter()
            .map(|(i, loss)| [i as f64, loss])
            .collect()
    }
}

impl Default for LossHistory {
    fn default() -> Self {
        Self::new(Self::DATA_LIMIT)
    }
}

/// Default gui that plots the loss curve while training
pub struct LossGui {
    history: LossHistory,
}

impl Visualizer for LossGui {
    /// Initialize LossGui, but also start a thread that listens to a receiver and updates the history
    fn new(cc: &CreationContext, rx: Receiver<IterationState>) -> Self {
        let history = LossHistory::default();
        let writer = history.clone();

        let ctx = cc.egui_ctx.clone();
        thread::spawn(move || {
            // Ends once the training thread drops its sender.
            for state in rx {
                writer.push(state);
                ctx.request_repaint();
            }
        });

        Self { history }
    }
}

impl eframe::App for LossGui {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let data = self.history.points();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical(|ui| {
                let [i, loss] = data.last().copied().unwrap_or([0.0, f64::INFINITY]);
                ui.heading(format!("Iteration {} loss: {loss}", i as usize));
                Plot::new("Loss").show(ui, |plot_ui| plot_ui.line(Line::new(data)));
            });
        });
    }
}

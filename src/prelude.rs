use std::path::PathBuf;

/// Error type for cmyk_nn
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input vector does not match the network's input layer (bias excluded).
    #[error("wrong number of inputs: expected {expected}, got {got}")]
    InvalidInputLength { expected: usize, got: usize },
    /// The target vector does not match the network's output layer.
    #[error("wrong number of target values: expected {expected}, got {got}")]
    InvalidTargetLength { expected: usize, got: usize },
    /// A context snapshot does not match the hidden layer (bias included).
    #[error("context snapshot has {got} values, hidden layer has {expected}")]
    InvalidContext { expected: usize, got: usize },
    /// No saved network exists at the given location.
    #[error("no saved network at {}", .0.display())]
    NotFound(PathBuf),
    /// Saved network data could not be decoded or has inconsistent shapes.
    #[error("corrupt network state: {0}")]
    CorruptState(String),
    /// A network configuration that cannot produce a network.
    #[error("invalid network config: {0}")]
    InvalidConfig(String),
    /// Indicates some dimension is incorrect in a Matrix operation.
    #[error("rows of unequal length")]
    DimensionErr,
    /// Paired pixel buffers do not hold the same number of samples.
    #[error("pixel count mismatch: {cmyk} CMYK samples, {rgb} RGB samples")]
    PixelCountMismatch { cmyk: usize, rgb: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The training thread behind the loss viewer panicked.
    #[error("training thread panicked")]
    ThreadErr,
}

pub type Result<T> = std::result::Result<T, Error>;

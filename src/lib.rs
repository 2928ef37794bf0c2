//! A small backpropagation network that learns to map CMYK samples to RGB.
//!
//! - [`neural`] holds the network, its training passes and persistence
//! - [`color`] turns paired pixel samples into training patterns and converts
//!   CMYK through a trained network
//! - [`viz`] plots the loss while training

pub mod color;
pub mod matrix;
pub mod neural;
pub mod prelude;
pub mod viz;

pub use color::{Cmyk, Converter, Rgba, TargetLayout};
pub use neural::{
    optimizer::{NetworkConfig, Optimizer},
    FeedForward, Pattern,
};
pub use prelude::{Error, Result};

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;

pub use audio::{AudioEngine, AudioSource, CpalOutput, PulledOutput, Transport};
pub use error::*;
pub use models::*;

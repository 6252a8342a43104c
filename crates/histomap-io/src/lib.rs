//! # Histomap I/O
//!
//! Network retrieval of feature layers and the host settings that drive it.

pub mod fetch;
pub mod settings;

pub use fetch::{FetchError, HttpLayerSource, LayerSource};
pub use settings::{ButtonPalette, HostSettings, SelectionPolicy};

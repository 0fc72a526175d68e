//! In-memory signal model
//!
//! - [`SignalDataset`] - shared time base, ordered channels, bounds and file state
//! - [`Channel`] - one value series with its shaping metadata and smoothing cache
//! - [`Color`] - channel display color
//! - [`EventBus`] / [`DatasetEvent`] - change notifications for observers

pub mod channel;
pub mod color;
pub mod dataset;
pub mod events;

pub use channel::{moving_average, Channel};
pub use color::Color;
pub use dataset::{DatasetSummary, Extents, PlotWindow, SignalDataset, FILE_EXTENSION};
pub use events::{DatasetEvent, EventBus};

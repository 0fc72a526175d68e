//! # recon-plot: recorded analog measurement data
//!
//! Loads multi-channel analog recordings (one shared time base plus N value
//! channels) into an in-memory model and exposes smoothed, scaled views of
//! each channel for plotting.
//!
//! ## Architecture
//!
//! - **Model**: [`SignalDataset`] owns the time base and an ordered list of
//!   [`Channel`]s; channels cache their smoothed/scaled series
//! - **Codec**: [`codec`] reads and writes the compressed `.plot` container
//! - **Import**: [`import`] streams the legacy comma separated text export
//!   with progress events and cooperative cancellation
//! - **Notifications**: crossbeam channels carry [`DatasetEvent`]s to observers
//!
//! ## Example
//!
//! ```no_run
//! use recon_plot::{import::TextImporter, SignalDataset};
//!
//! # fn main() -> recon_plot::Result<()> {
//! let mut importer = TextImporter::new();
//! let mut dataset = importer.import_file("record.txt")?;
//!
//! if let Some(series) = dataset.smoothed(0) {
//!     println!("{} points", series.len());
//! }
//!
//! dataset.save_as("record.plot")?;
//! let reopened = SignalDataset::open("record.plot")?;
//! assert_eq!(reopened.channel_count(), dataset.channel_count());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod import;
pub mod model;
pub mod parse;
pub mod tokenizer;

// Re-export commonly used types
pub use codec::ContainerCodec;
pub use config::AppConfig;
pub use error::{PlotError, Result};
pub use import::{CancelToken, TextImporter};
pub use model::{Channel, Color, DatasetEvent, SignalDataset};

//! The file-level model: shared time base, ordered channels and bounds
//!
//! A [`SignalDataset`] is produced by [`codec`](crate::codec) or the text
//! [`import`](crate::import) and replaced wholesale when a file is reopened.
//! All metadata edits go through the dataset so it can track its dirty flag
//! and notify subscribers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use serde::Serialize;

use super::channel::Channel;
use super::color::Color;
use super::events::{DatasetEvent, EventBus};
use crate::codec::ContainerCodec;
use crate::error::{PlotError, Result, ResultExt};
use crate::parse::{has_file_suffix, round_to_nice_ceil, round_to_nice_floor};

/// Extension of the native container format
pub const FILE_EXTENSION: &str = "plot";

/// Significant digits used when deriving the plot window
pub const NICE_DIGITS: i32 = 2;

/// Chosen plot window, persisted independently of the data extents
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PlotWindow {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

/// Observed extents of the time base and all channels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Extents {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Extents {
    pub fn is_finite(&self) -> bool {
        [self.min_x, self.max_x, self.min_y, self.max_y]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Per-channel line of a [`DatasetSummary`]
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub name: String,
    pub unit: String,
    pub color: String,
    pub selected: bool,
    pub factor: f64,
    pub scale: f64,
    pub smoothing_window: usize,
    pub samples: usize,
    pub min: f64,
    pub max: f64,
}

/// Serializable overview of a dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub path: Option<PathBuf>,
    pub title: String,
    pub device: String,
    pub original_file_name: String,
    pub label_x: String,
    pub label_y: String,
    pub samples: usize,
    pub window: PlotWindow,
    pub extents: Extents,
    pub channels: Vec<ChannelSummary>,
}

/// A recorded measurement: one time base and N channels
#[derive(Debug, Default)]
pub struct SignalDataset {
    path: Option<PathBuf>,
    title: String,
    device: String,
    original_file_name: String,
    label_x: String,
    label_y: String,
    window: PlotWindow,
    extents: Extents,
    time: Vec<f64>,
    channels: Vec<Channel>,
    modified: bool,
    rename_needed: bool,
    events: EventBus,
}

/// Compares the persisted content; path, flags and subscribers are ignored
impl PartialEq for SignalDataset {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.device == other.device
            && self.original_file_name == other.original_file_name
            && self.label_x == other.label_x
            && self.label_y == other.label_y
            && self.window == other.window
            && self.extents == other.extents
            && self.time == other.time
            && self.channels == other.channels
    }
}

impl SignalDataset {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== File state ====================

    /// Read a `.plot` container
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(&ContainerCodec::default(), path)
    }

    /// Read a container with a specific codec configuration
    pub fn open_with(codec: &ContainerCodec, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut dataset = codec
            .read_file(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        dataset.mark_loaded_as(path, codec.extension());
        tracing::info!(
            "Opened {} ({} channels, {} samples)",
            path.display(),
            dataset.channel_count(),
            dataset.sample_count()
        );
        Ok(dataset)
    }

    /// Replace this dataset with the container at `path`
    ///
    /// On error the current content is left untouched. Subscribers stay
    /// attached and receive `DataLoaded`.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let loaded = Self::open(path)?;
        self.replace_contents(loaded);
        Ok(())
    }

    /// Swap in the content of `other`, keeping this dataset's subscribers
    pub fn replace_contents(&mut self, other: SignalDataset) {
        let events = std::mem::take(&mut self.events);
        let was_modified = self.modified;
        *self = other;
        self.events = events;
        self.events.emit(DatasetEvent::DataLoaded);
        if was_modified != self.modified {
            self.events.emit(DatasetEvent::ModifiedChanged(self.modified));
        }
    }

    /// Write back to the current path
    ///
    /// Fails with [`PlotError::RenameRequired`] when there is no path or the
    /// path lacks the container extension; use [`save_as`](Self::save_as) then.
    pub fn save(&mut self) -> Result<()> {
        self.save_with(&ContainerCodec::default())
    }

    /// Write back to the current path with a specific codec configuration
    pub fn save_with(&mut self, codec: &ContainerCodec) -> Result<()> {
        let path = match &self.path {
            Some(path) if !self.rename_needed => path.clone(),
            _ => return Err(PlotError::RenameRequired),
        };
        codec
            .write_file(self, &path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        self.set_modified(false);
        tracing::info!("Saved {}", path.display());
        Ok(())
    }

    /// Write to `path` and make it the current path
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.save_as_with(&ContainerCodec::default(), path)
    }

    /// Write to `path` with a specific codec configuration
    pub fn save_as_with(&mut self, codec: &ContainerCodec, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        codec
            .write_file(self, path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        self.mark_loaded_as(path, codec.extension());
        tracing::info!("Saved {}", path.display());
        Ok(())
    }

    /// Record `path` as the backing file and clear the dirty flag
    pub fn mark_loaded(&mut self, path: impl AsRef<Path>) {
        self.mark_loaded_as(path, FILE_EXTENSION);
    }

    /// Like [`mark_loaded`](Self::mark_loaded) with a custom container extension
    pub fn mark_loaded_as(&mut self, path: impl AsRef<Path>, extension: &str) {
        let path = path.as_ref();
        self.rename_needed = !has_file_suffix(path, extension);
        self.path = Some(path.to_path_buf());
        self.set_modified(false);
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_rename_needed(&self) -> bool {
        self.rename_needed
    }

    /// Set the dirty flag, notifying subscribers when it changes
    pub fn set_modified(&mut self, modified: bool) {
        if self.modified != modified {
            self.modified = modified;
            self.events.emit(DatasetEvent::ModifiedChanged(modified));
        }
    }

    // ==================== Observers ====================

    /// Receive change notifications for this dataset
    pub fn subscribe(&mut self) -> Receiver<DatasetEvent> {
        self.events.subscribe()
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    // ==================== Identity ====================

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn original_file_name(&self) -> &str {
        &self.original_file_name
    }

    pub fn label_x(&self) -> &str {
        &self.label_x
    }

    pub fn label_y(&self) -> &str {
        &self.label_y
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.set_modified(true);
    }

    pub fn set_device(&mut self, device: impl Into<String>) {
        self.device = device.into();
        self.set_modified(true);
    }

    pub fn set_original_file_name(&mut self, name: impl Into<String>) {
        self.original_file_name = name.into();
        self.set_modified(true);
    }

    pub fn set_labels(&mut self, label_x: impl Into<String>, label_y: impl Into<String>) {
        self.label_x = label_x.into();
        self.label_y = label_y.into();
        self.set_modified(true);
    }

    // ==================== Time base ====================

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Timestamp at `index`, NaN when out of range
    pub fn time_at(&self, index: usize) -> f64 {
        self.time.get(index).copied().unwrap_or(f64::NAN)
    }

    /// Number of timestamps
    pub fn sample_count(&self) -> usize {
        self.time.len()
    }

    pub fn push_time(&mut self, value: f64) {
        self.time.push(value);
        self.set_modified(true);
    }

    pub fn set_time(&mut self, time: Vec<f64>) {
        self.time = time;
        self.set_modified(true);
    }

    // ==================== Channels ====================

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Append a channel, returning its index
    pub fn add_channel(&mut self, channel: Channel) -> usize {
        self.channels.push(channel);
        self.set_modified(true);
        self.channels.len() - 1
    }

    /// Append one sample row: a timestamp plus one value per channel
    ///
    /// Missing values are not appended, extra values are ignored.
    pub fn push_row(&mut self, time: f64, values: &[f64]) {
        self.time.push(time);
        for (channel, &value) in self.channels.iter_mut().zip(values) {
            channel.push_sample(value);
        }
        self.set_modified(true);
    }

    /// Smoothed and scaled series of a channel, clipped to the time base
    pub fn smoothed(&self, index: usize) -> Option<Arc<[f64]>> {
        self.channels
            .get(index)
            .map(|channel| channel.smoothed(self.time.len()))
    }

    /// `[time, value]` pairs of a channel's smoothed series
    pub fn plot_points(&self, index: usize) -> Option<Vec<[f64; 2]>> {
        let series = self.smoothed(index)?;
        Some(
            self.time
                .iter()
                .zip(series.iter())
                .map(|(&t, &v)| [t, v])
                .collect(),
        )
    }

    /// Indices of the selected channels
    pub fn selected_channels(&self) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_selected())
            .map(|(i, _)| i)
            .collect()
    }

    fn edit_channel(&mut self, index: usize, edit: impl FnOnce(&mut Channel) -> bool) -> bool {
        let Some(channel) = self.channels.get_mut(index) else {
            return false;
        };
        let changed = edit(channel);
        if changed {
            self.set_modified(true);
        }
        changed
    }

    /// Returns true if the channel exists and the value changed
    pub fn set_channel_name(&mut self, index: usize, name: &str) -> bool {
        self.edit_channel(index, |c| {
            let changed = c.name() != name;
            c.set_name(name);
            changed
        })
    }

    pub fn set_channel_unit(&mut self, index: usize, unit: &str) -> bool {
        self.edit_channel(index, |c| {
            let changed = c.unit() != unit;
            c.set_unit(unit);
            changed
        })
    }

    pub fn set_channel_selected(&mut self, index: usize, selected: bool) -> bool {
        let changed = self.edit_channel(index, |c| {
            let changed = c.is_selected() != selected;
            c.set_selected(selected);
            changed
        });
        if changed {
            self.events
                .emit(DatasetEvent::SelectionChanged { index, selected });
        }
        changed
    }

    pub fn set_channel_color(&mut self, index: usize, color: Color) -> bool {
        let changed = self.edit_channel(index, |c| {
            let changed = c.color() != color;
            c.set_color(color);
            changed
        });
        if changed {
            self.events.emit(DatasetEvent::ColorChanged { index, color });
        }
        changed
    }

    pub fn set_channel_inverted(&mut self, index: usize, inverted: bool) -> bool {
        self.edit_channel(index, |c| {
            let changed = c.is_inverted() != inverted;
            c.set_inverted(inverted);
            changed
        })
    }

    pub fn set_channel_factor(&mut self, index: usize, factor: f64) -> bool {
        self.edit_channel(index, |c| {
            let changed = c.factor() != factor;
            c.set_factor(factor);
            changed
        })
    }

    pub fn set_channel_scale(&mut self, index: usize, scale: f64) -> bool {
        self.edit_channel(index, |c| {
            let changed = c.scale() != scale;
            c.set_scale(scale);
            changed
        })
    }

    pub fn set_channel_smoothing(&mut self, index: usize, window: usize) -> bool {
        self.edit_channel(index, |c| {
            let before = c.smoothing_window();
            c.set_smoothing_window(window);
            c.smoothing_window() != before
        })
    }

    /// Negate the raw samples of a channel
    pub fn invert_channel(&mut self, index: usize) -> bool {
        self.edit_channel(index, |c| {
            c.invert();
            true
        })
    }

    /// Mutable access for loaders; does not touch the dirty flag
    pub(crate) fn channels_mut(&mut self) -> &mut [Channel] {
        &mut self.channels
    }

    // ==================== Bounds ====================

    pub fn window(&self) -> PlotWindow {
        self.window
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    /// Manually override the plot window
    pub fn set_window(&mut self, window: PlotWindow) {
        if self.window != window {
            self.window = window;
            self.set_modified(true);
        }
    }

    /// Store extents read from a container without recomputing them
    pub(crate) fn set_extents(&mut self, extents: Extents) {
        self.extents = extents;
    }

    /// Store header fields and window read from a file
    pub(crate) fn set_header(
        &mut self,
        title: String,
        device: String,
        original_file_name: String,
        label_x: String,
        label_y: String,
        window: PlotWindow,
    ) {
        self.title = title;
        self.device = device;
        self.original_file_name = original_file_name;
        self.label_x = label_x;
        self.label_y = label_y;
        self.window = window;
    }

    /// Recompute channel min/max and the dataset extents
    ///
    /// X extents come from the first and last timestamp (the time base is
    /// assumed non-decreasing). Y extents span every channel's min/max.
    /// Empty inputs yield 0.0 so the stored extents stay finite.
    pub fn calculate_limits(&mut self) {
        for channel in &mut self.channels {
            channel.calculate_limits();
        }

        let min_x = self.time.first().copied().unwrap_or(0.0);
        let max_x = self.time.last().copied().unwrap_or(0.0);

        let (mut min_y, mut max_y) = self.channels.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), c| (min.min(c.min_value()), max.max(c.max_value())),
        );
        if min_y > max_y {
            min_y = 0.0;
            max_y = 0.0;
        }

        self.extents = Extents {
            min_x,
            max_x,
            min_y,
            max_y,
        };
    }

    /// Derive the plot window from the extents by nice rounding
    pub fn reset_window(&mut self) {
        self.window = PlotWindow {
            left: round_to_nice_floor(self.extents.min_x, NICE_DIGITS),
            right: round_to_nice_ceil(self.extents.max_x, NICE_DIGITS),
            bottom: round_to_nice_floor(self.extents.min_y, NICE_DIGITS),
            top: round_to_nice_ceil(self.extents.max_y, NICE_DIGITS),
        };
    }

    /// Serializable overview for reports
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            path: self.path.clone(),
            title: self.title.clone(),
            device: self.device.clone(),
            original_file_name: self.original_file_name.clone(),
            label_x: self.label_x.clone(),
            label_y: self.label_y.clone(),
            samples: self.time.len(),
            window: self.window,
            extents: self.extents,
            channels: self
                .channels
                .iter()
                .map(|c| ChannelSummary {
                    name: c.name().to_string(),
                    unit: c.unit().to_string(),
                    color: c.color().name(),
                    selected: c.is_selected(),
                    factor: c.factor(),
                    scale: c.scale(),
                    smoothing_window: c.smoothing_window(),
                    samples: c.data_count(),
                    min: c.min_value(),
                    max: c.max_value(),
                })
                .collect(),
        }
    }
}

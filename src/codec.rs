//! The `.plot` binary container
//!
//! A container is a zlib-compressed payload. The payload is little-endian
//! with IEEE-754 doubles; strings are a `u32` byte length followed by UTF-8.
//!
//! ```text
//! magic(u32 = 0x504C4F54) version(u32 = 1)
//! title device original_filename label_x label_y        (string x5)
//! left right bottom top min_x max_x min_y max_y          (f64 x8)
//! time_count(u64) time_values(f64 x time_count)
//! channel_count(u64)
//! channel_count x {
//!     name unit (string) selected(u8)
//!     factor scale (f64) smoothing_window(u64)
//!     min_y max_y (f64) color(string "#rrggbb")
//!     sample_count(u64) samples(f64 x sample_count)
//! }
//! ```
//!
//! Decoding either yields a complete [`SignalDataset`] or an error; every
//! field read is bounds checked and reports [`PlotError::Truncated`].

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::config::ContainerConfig;
use crate::error::{PlotError, Result};
use crate::model::{Channel, Color, Extents, PlotWindow, SignalDataset, FILE_EXTENSION};
use crate::parse::has_file_suffix;

/// "PLOT" read as a little-endian u32
pub const MAGIC: u32 = 0x504C_4F54;

/// The only payload version this build reads and writes
pub const VERSION: u32 = 1;

/// Default zlib compression level
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Encoder/decoder for `.plot` containers
#[derive(Debug, Clone)]
pub struct ContainerCodec {
    compression_level: u32,
    extension: String,
}

impl Default for ContainerCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl ContainerCodec {
    /// Create a codec with a zlib level (clamped to 0-9)
    pub fn new(compression_level: u32) -> Self {
        Self {
            compression_level: compression_level.min(9),
            extension: FILE_EXTENSION.to_string(),
        }
    }

    pub fn from_config(config: &ContainerConfig) -> Self {
        Self::new(config.compression_level).with_extension(&config.extension)
    }

    /// Use a different canonical file extension (without the dot)
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    /// Canonical extension of container files
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Whether `path` carries the canonical extension
    pub fn is_container_path(&self, path: impl AsRef<Path>) -> bool {
        has_file_suffix(path, &self.extension)
    }

    /// Serialize and compress a dataset
    pub fn encode(&self, dataset: &SignalDataset) -> Result<Vec<u8>> {
        let payload = encode_payload(dataset);
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(payload.len() / 2),
            Compression::new(self.compression_level),
        );
        encoder.write_all(&payload)?;
        Ok(encoder.finish()?)
    }

    /// Decompress and deserialize a dataset
    pub fn decode(&self, blob: &[u8]) -> Result<SignalDataset> {
        let mut payload = Vec::new();
        ZlibDecoder::new(blob)
            .read_to_end(&mut payload)
            .map_err(PlotError::Decompress)?;
        decode_payload(&payload)
    }

    /// Read and decode a container file
    pub fn read_file(&self, path: &Path) -> Result<SignalDataset> {
        let blob = fs::read(path)?;
        self.decode(&blob)
    }

    /// Encode a dataset and write it to `path`
    pub fn write_file(&self, dataset: &SignalDataset, path: &Path) -> Result<()> {
        let blob = self.encode(dataset)?;
        fs::write(path, blob)?;
        Ok(())
    }
}

// ==================== Payload writer ====================

#[derive(Debug, Default)]
struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    fn string(&mut self, value: &str) {
        self.u32(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
    }

    fn f64_array(&mut self, values: &[f64]) {
        self.u64(values.len() as u64);
        self.buf.reserve(values.len() * 8);
        for &value in values {
            self.f64(value);
        }
    }
}

/// Serialize a dataset into an uncompressed payload
pub fn encode_payload(dataset: &SignalDataset) -> Vec<u8> {
    let mut w = PayloadWriter::default();

    w.u32(MAGIC);
    w.u32(VERSION);

    w.string(dataset.title());
    w.string(dataset.device());
    w.string(dataset.original_file_name());
    w.string(dataset.label_x());
    w.string(dataset.label_y());

    let window = dataset.window();
    let extents = dataset.extents();
    for value in [
        window.left,
        window.right,
        window.bottom,
        window.top,
        extents.min_x,
        extents.max_x,
        extents.min_y,
        extents.max_y,
    ] {
        w.f64(value);
    }

    w.f64_array(dataset.time());

    w.u64(dataset.channel_count() as u64);
    for channel in dataset.channels() {
        w.string(channel.name());
        w.string(channel.unit());
        w.bool(channel.is_selected());
        w.f64(channel.factor());
        w.f64(channel.scale());
        w.u64(channel.smoothing_window() as u64);
        w.f64(channel.min_value());
        w.f64(channel.max_value());
        w.string(&channel.color().name());
        w.f64_array(channel.data());
    }

    w.buf
}

// ==================== Payload reader ====================

struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, needed: usize, field: &'static str) -> Result<&'a [u8]> {
        if needed > self.remaining() {
            return Err(PlotError::Truncated {
                field,
                needed,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    fn u32(&mut self, field: &'static str) -> Result<u32> {
        self.array(field).map(u32::from_le_bytes)
    }

    fn u64(&mut self, field: &'static str) -> Result<u64> {
        self.array(field).map(u64::from_le_bytes)
    }

    fn f64(&mut self, field: &'static str) -> Result<f64> {
        self.array(field).map(f64::from_le_bytes)
    }

    fn bool(&mut self, field: &'static str) -> Result<bool> {
        self.array::<1>(field).map(|[b]| b != 0)
    }

    fn string(&mut self, field: &'static str) -> Result<String> {
        let len = self.u32(field)? as usize;
        let bytes = self.take(len, field)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Length-prefixed f64 array; the length is checked before allocating
    fn f64_array(&mut self, field: &'static str) -> Result<Vec<f64>> {
        let count = self.u64(field)?;
        let needed = usize::try_from(count)
            .ok()
            .and_then(|n| n.checked_mul(8))
            .unwrap_or(usize::MAX);
        let bytes = self.take(needed, field)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect())
    }
}

fn decode_channel(r: &mut PayloadReader<'_>) -> Result<Channel> {
    let name = r.string("channel name")?;
    let unit = r.string("channel unit")?;
    let selected = r.bool("channel selected")?;
    let factor = r.f64("channel factor")?;
    let scale = r.f64("channel scale")?;
    let window = r.u64("channel smoothing window")?;
    let min_value = r.f64("channel min")?;
    let max_value = r.f64("channel max")?;
    let color: Color = r.string("channel color")?.parse()?;
    let data = r.f64_array("channel samples")?;

    let mut channel = Channel::new(name)
        .with_unit(unit)
        .with_factor(factor)
        .with_scale(scale)
        .with_color(color)
        .with_smoothing_window(usize::try_from(window).unwrap_or(usize::MAX));
    channel.set_selected(selected);
    channel.set_data(data);
    channel.set_limits(min_value, max_value);
    Ok(channel)
}

/// Deserialize an uncompressed payload
///
/// Rejects a wrong magic or version before reading anything else. When any
/// stored extent is non-finite the extents are recomputed from the samples
/// and the plot window is derived again.
pub fn decode_payload(payload: &[u8]) -> Result<SignalDataset> {
    let mut r = PayloadReader::new(payload);

    let magic = r.u32("magic")?;
    if magic != MAGIC {
        return Err(PlotError::BadMagic { found: magic });
    }
    let version = r.u32("version")?;
    if version != VERSION {
        return Err(PlotError::UnsupportedVersion {
            found: version,
            supported: VERSION,
        });
    }

    let title = r.string("title")?;
    let device = r.string("device")?;
    let original_file_name = r.string("original file name")?;
    let label_x = r.string("x label")?;
    let label_y = r.string("y label")?;

    let window = PlotWindow {
        left: r.f64("left")?,
        right: r.f64("right")?,
        bottom: r.f64("bottom")?,
        top: r.f64("top")?,
    };
    let extents = Extents {
        min_x: r.f64("min x")?,
        max_x: r.f64("max x")?,
        min_y: r.f64("min y")?,
        max_y: r.f64("max y")?,
    };

    let time = r.f64_array("time values")?;

    let channel_count = r.u64("channel count")?;
    let mut channels = Vec::new();
    for _ in 0..channel_count {
        channels.push(decode_channel(&mut r)?);
    }

    if r.remaining() > 0 {
        tracing::warn!("Ignoring {} trailing bytes in container", r.remaining());
    }

    let mut dataset = SignalDataset::new();
    dataset.set_header(title, device, original_file_name, label_x, label_y, window);
    dataset.set_time(time);
    for channel in channels {
        dataset.add_channel(channel);
    }
    dataset.set_extents(extents);

    if !extents.is_finite() {
        tracing::warn!("Stored extents are not finite, recomputing from samples");
        dataset.calculate_limits();
        dataset.reset_window();
    }

    Ok(dataset)
}

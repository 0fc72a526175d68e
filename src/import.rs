//! Streaming importer for the legacy delimited text export
//!
//! The export is read in a single pass:
//!
//! 1. header line: title, device, original file, X label, Y label and the four
//!    plot window bounds (missing trailing fields are tolerated)
//! 2. one blank separator line
//! 3. channel descriptors until a blank line or a line starting with `N`;
//!    a line starting with `1` marks a discrete channel and is skipped
//!    together with the line after it
//! 4. two trailer lines
//! 5. data rows of exactly `channels + 3` fields, split on every `,` with
//!    empty fields kept (data rows are never quoted). An empty first field makes
//!    it a units row, otherwise column 1 is the timestamp and columns 2.. the
//!    channel values. The first row of another width ends the data.
//!
//! Cancellation is cooperative: the [`CancelToken`] is polled before each data
//! row. Progress is published as [`DatasetEvent`]s no more often than the
//! configured interval.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::config::ImportConfig;
use crate::error::{PlotError, Result, ResultExt};
use crate::model::{Channel, Color, DatasetEvent, EventBus, PlotWindow, SignalDataset};
use crate::parse::{parse_bool, parse_real, parse_uint};
use crate::tokenizer::{simplify, split_fields, split_line};

/// First descriptor field of the end-of-descriptors line
const END_MARKER: &str = "N";

/// First descriptor field of a discrete channel (not modeled)
const DISCRETE_MARKER: &str = "1";

/// Shared flag used to stop a running import
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next data row
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Re-arm the token for another import
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Line source tracking byte position and line number
struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    position: u64,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            position: 0,
            line_number: 0,
        }
    }

    /// Next line without its terminator, `None` at end of input
    ///
    /// Lines that are not valid UTF-8 are decoded as Latin-1.
    fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let read = self.inner.read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(None);
        }
        self.position += read as u64;
        self.line_number += 1;

        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }

        let line = match std::str::from_utf8(&self.buf) {
            Ok(text) => text.to_string(),
            Err(_) => self.buf.iter().map(|&b| char::from(b)).collect(),
        };
        Ok(Some(line))
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn line_number(&self) -> usize {
        self.line_number
    }
}

/// Importer for the legacy text export
#[derive(Debug)]
pub struct TextImporter {
    progress_interval: Duration,
    assign_colors: bool,
    default_smoothing_window: usize,
    cancel: CancelToken,
    events: EventBus,
}

impl Default for TextImporter {
    fn default() -> Self {
        Self::from_config(&ImportConfig::default())
    }
}

impl TextImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            progress_interval: config.progress_interval(),
            assign_colors: config.assign_colors,
            default_smoothing_window: config.default_smoothing_window,
            cancel: CancelToken::new(),
            events: EventBus::new(),
        }
    }

    /// Use an externally owned cancel token
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this importer
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Receive progress, cancellation and completion events
    pub fn subscribe(&mut self) -> Receiver<DatasetEvent> {
        self.events.subscribe()
    }

    /// Import a text export into `target`, replacing its content
    ///
    /// `target` is only touched when the import succeeds.
    pub fn import_into(&mut self, path: impl AsRef<Path>, target: &mut SignalDataset) -> Result<()> {
        let dataset = self.import_file(path)?;
        target.replace_contents(dataset);
        Ok(())
    }

    /// Import a text export file into a new dataset
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<SignalDataset> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(PlotError::from)
            .with_context(|| format!("Failed to import {}", path.display()))?;
        let total = file.metadata().map(|m| m.len()).unwrap_or(0);

        self.import_reader(BufReader::new(file), total, path)
    }

    /// Import from any buffered reader; `total` is the input size for progress
    pub fn import_reader<R: BufRead>(
        &mut self,
        reader: R,
        total: u64,
        source: &Path,
    ) -> Result<SignalDataset> {
        let started = Instant::now();
        let mut lines = LineReader::new(reader);
        let mut dataset = SignalDataset::new();

        self.events.emit(DatasetEvent::ProgressRange { min: 0, max: total });
        self.events.emit(DatasetEvent::ProgressUpdated {
            value: 0,
            range: total,
        });

        self.read_header(&mut lines, &mut dataset)?;
        lines.next_line()?;

        self.read_descriptors(&mut lines, &mut dataset)?;
        lines.next_line()?;
        lines.next_line()?;

        self.events.emit(DatasetEvent::ProgressUpdated {
            value: lines.position(),
            range: total,
        });

        self.read_data(&mut lines, &mut dataset, total)?;

        dataset.calculate_limits();
        dataset.reset_window();
        dataset.mark_loaded(source);

        self.events.emit(DatasetEvent::ProgressUpdated {
            value: total,
            range: total,
        });
        self.events.emit(DatasetEvent::DataLoaded);

        tracing::info!(
            "Imported {} ({} channels, {} samples) in {:?}",
            source.display(),
            dataset.channel_count(),
            dataset.sample_count(),
            started.elapsed()
        );
        Ok(dataset)
    }

    fn read_header<R: BufRead>(
        &self,
        lines: &mut LineReader<R>,
        dataset: &mut SignalDataset,
    ) -> Result<()> {
        let header = lines.next_line()?.unwrap_or_default();
        let fields = split_line(&header);
        let text = |i: usize| fields.get(i).cloned().unwrap_or_default();
        let bound = |i: usize| fields.get(i).map(|f| parse_real(f, 0.0)).unwrap_or(0.0);

        dataset.set_header(
            text(0),
            text(1),
            text(2),
            text(3),
            text(4),
            PlotWindow {
                left: bound(5),
                right: bound(6),
                bottom: bound(7),
                top: bound(8),
            },
        );
        Ok(())
    }

    fn read_descriptors<R: BufRead>(
        &self,
        lines: &mut LineReader<R>,
        dataset: &mut SignalDataset,
    ) -> Result<()> {
        while let Some(line) = lines.next_line()? {
            let line = simplify(&line);
            if line.is_empty() {
                break;
            }

            let fields = split_line(&line);
            match fields.first().map(String::as_str) {
                Some(END_MARKER) => break,
                Some(DISCRETE_MARKER) => {
                    tracing::debug!(
                        "Skipping discrete channel descriptor at line {}",
                        lines.line_number()
                    );
                    lines.next_line()?;
                    continue;
                }
                _ => {}
            }

            let mut channel = Channel::new(fields.get(2).cloned().unwrap_or_default())
                .with_smoothing_window(self.default_smoothing_window);
            if let Some(selected) = fields.get(3).filter(|f| !f.is_empty()) {
                channel.set_selected(parse_bool(selected, false));
            }
            if let Some(factor) = fields.get(4) {
                channel.set_factor(parse_real(factor, 1.0));
            }
            if let Some(window) = fields.get(5) {
                channel.set_smoothing_window(parse_uint(window, 0) as usize);
            }
            if self.assign_colors {
                channel.set_color(Color::palette(dataset.channel_count()));
            }

            dataset.add_channel(channel);
        }
        Ok(())
    }

    fn read_data<R: BufRead>(
        &mut self,
        lines: &mut LineReader<R>,
        dataset: &mut SignalDataset,
        total: u64,
    ) -> Result<()> {
        let channel_count = dataset.channel_count();
        let expected = channel_count + 3;
        let mut values = Vec::with_capacity(channel_count);
        let mut last_progress = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Import cancelled at line {}", lines.line_number());
                self.events.emit(DatasetEvent::Cancelled);
                return Err(PlotError::Cancelled);
            }

            let Some(line) = lines.next_line()? else {
                break;
            };

            let fields = split_fields(&line);
            if fields.len() != expected {
                let end = PlotError::MalformedRow {
                    line: lines.line_number(),
                    expected,
                    found: fields.len(),
                };
                tracing::debug!("End of data: {}", end);
                break;
            }

            if fields[0].is_empty() {
                for (channel, unit) in dataset.channels_mut().iter_mut().zip(&fields[2..]) {
                    channel.set_unit(unit.as_str());
                }
            } else {
                values.clear();
                values.extend(fields[2..2 + channel_count].iter().map(|f| parse_real(f, 0.0)));
                dataset.push_row(parse_real(&fields[1], 0.0), &values);
            }

            if last_progress.elapsed() >= self.progress_interval {
                self.events.emit(DatasetEvent::ProgressUpdated {
                    value: lines.position(),
                    range: total,
                });
                last_progress = Instant::now();
            }
        }

        Ok(())
    }
}

//! One recorded value series and its display metadata
//!
//! A [`Channel`] owns its raw samples. Timestamps live in the owning
//! [`SignalDataset`](super::SignalDataset), which passes the time base length
//! in whenever a channel needs to clip to it.
//!
//! # Smoothing cache
//!
//! [`Channel::smoothed`] returns `moving_average(data) × factor × scale`
//! (negated when the channel is inverted). The result is cached behind a
//! `RefCell` keyed on `(sample count, effective multiplier, window)`, so a
//! changed scale or window is picked up on the next read while unrelated
//! edits reuse the buffer. Reads hand out a shared `Arc<[f64]>`, so any number
//! of series may be held while the channel is read again. The `RefCell` makes
//! `Channel` `!Sync`: the cache must not be read from several threads without
//! outside synchronization.

use std::cell::RefCell;
use std::sync::Arc;

use super::color::Color;

/// Inputs the cached series was computed from
#[derive(Debug, Clone, Copy, PartialEq)]
struct CacheKey {
    sample_count: usize,
    multiplier: f64,
    window: usize,
}

#[derive(Debug, Clone)]
struct SmoothCache {
    key: Option<CacheKey>,
    values: Arc<[f64]>,
    computations: u64,
}

impl Default for SmoothCache {
    fn default() -> Self {
        Self {
            key: None,
            values: Arc::from(Vec::new()),
            computations: 0,
        }
    }
}

/// A named analog value series sharing its dataset's time base
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    unit: String,
    color: Color,
    selected: bool,
    inverted: bool,
    /// Calibration multiplier applied at acquisition
    factor: f64,
    /// Display multiplier on top of `factor`
    scale: f64,
    /// Trailing moving-average width; 1 disables smoothing
    smoothing_window: usize,
    data: Vec<f64>,
    min_value: f64,
    max_value: f64,
    cache: RefCell<SmoothCache>,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            name: String::new(),
            unit: String::new(),
            color: Color::default(),
            selected: false,
            inverted: false,
            factor: 1.0,
            scale: 1.0,
            smoothing_window: 1,
            data: Vec::new(),
            min_value: f64::INFINITY,
            max_value: f64::NEG_INFINITY,
            cache: RefCell::new(SmoothCache::default()),
        }
    }
}

/// Compares the persisted content; the display-only `inverted` flag and the
/// smoothing cache are ignored
impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.unit == other.unit
            && self.color == other.color
            && self.selected == other.selected
            && self.factor == other.factor
            && self.scale == other.scale
            && self.smoothing_window == other.smoothing_window
            && self.min_value == other.min_value
            && self.max_value == other.max_value
            && self.data == other.data
    }
}

impl Channel {
    /// Create an empty channel with default shaping
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set the calibration factor
    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// Set the display scale
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the smoothing window (0 is ignored)
    pub fn with_smoothing_window(mut self, window: usize) -> Self {
        self.set_smoothing_window(window);
        self
    }

    /// Set the display color
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Set the raw samples and recompute min/max
    pub fn with_data(mut self, data: Vec<f64>) -> Self {
        self.set_data(data);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn smoothing_window(&self) -> usize {
        self.smoothing_window
    }

    /// Raw samples
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Number of raw samples
    pub fn data_count(&self) -> usize {
        self.data.len()
    }

    /// Smallest raw sample as of the last [`calculate_limits`](Self::calculate_limits)
    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    /// Largest raw sample as of the last [`calculate_limits`](Self::calculate_limits)
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    pub fn set_factor(&mut self, factor: f64) {
        self.factor = factor;
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    /// Set the smoothing window; zero is ignored
    pub fn set_smoothing_window(&mut self, window: usize) {
        if window > 0 {
            self.smoothing_window = window;
        }
    }

    /// Replace the raw samples and recompute min/max
    pub fn set_data(&mut self, data: Vec<f64>) {
        self.data = data;
        self.invalidate_cache();
        self.calculate_limits();
    }

    /// Append one raw sample; min/max are left for [`calculate_limits`](Self::calculate_limits)
    pub fn push_sample(&mut self, value: f64) {
        self.data.push(value);
    }

    /// Overwrite the stored min/max, e.g. with values read from a container
    pub fn set_limits(&mut self, min_value: f64, max_value: f64) {
        self.min_value = min_value;
        self.max_value = max_value;
    }

    /// Negate every raw sample in place
    pub fn invert(&mut self) {
        for value in &mut self.data {
            *value = -*value;
        }
        std::mem::swap(&mut self.min_value, &mut self.max_value);
        self.min_value = -self.min_value;
        self.max_value = -self.max_value;
        self.invalidate_cache();
    }

    /// Reset metadata to defaults; samples and factor are kept
    pub fn clear(&mut self) {
        self.name.clear();
        self.unit.clear();
        self.scale = 1.0;
        self.smoothing_window = 1;
        self.selected = false;
    }

    /// Recompute min/max over the raw samples
    ///
    /// An empty channel ends up with `min = +inf` and `max = -inf`. NaN
    /// samples are skipped.
    pub fn calculate_limits(&mut self) {
        let (min, max) = self
            .data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
                (if v < min { v } else { min }, if v > max { v } else { max })
            });
        self.min_value = min;
        self.max_value = max;
    }

    /// Product of factor, scale and the inversion sign
    pub fn multiplier(&self) -> f64 {
        let sign = if self.inverted { -1.0 } else { 1.0 };
        self.factor * self.scale * sign
    }

    /// The smoothed and scaled series, clipped to `time_len` samples
    ///
    /// Recomputed only when the clipped sample count, the multiplier or the
    /// smoothing window changed since the previous call. The returned buffer
    /// is shared with the cache and stays valid after later edits.
    pub fn smoothed(&self, time_len: usize) -> Arc<[f64]> {
        let sample_count = self.data.len().min(time_len);
        let key = CacheKey {
            sample_count,
            multiplier: self.multiplier(),
            window: self.smoothing_window,
        };

        {
            let cache = self.cache.borrow();
            if cache.key == Some(key) {
                return Arc::clone(&cache.values);
            }
        }

        let mut values = moving_average(&self.data[..sample_count], key.window);
        scale_in_place(&mut values, key.multiplier);
        let values: Arc<[f64]> = values.into();

        let mut cache = self.cache.borrow_mut();
        cache.key = Some(key);
        cache.values = Arc::clone(&values);
        cache.computations += 1;
        values
    }

    /// How many times the smoothed series has been (re)computed
    pub fn cache_computations(&self) -> u64 {
        self.cache.borrow().computations
    }

    fn invalidate_cache(&mut self) {
        self.cache.get_mut().key = None;
    }

    /// Legend text: `name, unit × scale`
    pub fn legend_name(&self) -> String {
        format!("{}, {} × {}", self.name, self.unit, self.scale)
    }

    /// Multi-line description for tooltips
    pub fn summary(&self) -> String {
        format!(
            "Name:\t{}\nUnit:\t{}\nScale:\t{}\nSmooth:\t{}",
            self.name, self.unit, self.scale, self.smoothing_window
        )
    }
}

/// Trailing moving average with ramp-up
///
/// Output `i` is the mean of the last `min(i + 1, window)` samples, so the
/// first `window - 1` points average whatever has accumulated so far.
/// A window of 0 or 1 returns the samples unchanged.
pub fn moving_average(samples: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 {
        return samples.to_vec();
    }

    let mut result = Vec::with_capacity(samples.len());
    let mut sum = 0.0;

    for (i, &value) in samples.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= samples[i - window];
        }
        let occupancy = (i + 1).min(window);
        result.push(sum / occupancy as f64);
    }

    result
}

/// Multiply every value by `multiplier`; a no-op for exactly 1.0
pub fn scale_in_place(values: &mut [f64], multiplier: f64) {
    if multiplier == 1.0 {
        return;
    }
    for value in values {
        *value *= multiplier;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_ramp_up() {
        assert_eq!(moving_average(&[1.0, 2.0, 3.0, 4.0], 3), vec![1.0, 1.5, 2.0, 3.0]);
        assert_eq!(moving_average(&[1.0, 2.0], 5), vec![1.0, 1.5]);
        assert!(moving_average(&[], 3).is_empty());
    }

    #[test]
    fn test_moving_average_window_one_is_identity() {
        let raw = [3.0, -1.0, 7.5];
        assert_eq!(moving_average(&raw, 1), raw.to_vec());
        assert_eq!(moving_average(&raw, 0), raw.to_vec());
    }

    #[test]
    fn test_smoothed_applies_factor_and_scale() {
        let channel = Channel::new("Ud")
            .with_factor(2.0)
            .with_scale(0.5)
            .with_data(vec![1.0, -2.0, 4.0]);
        // factor * scale == 1.0 here
        assert_eq!(&*channel.smoothed(3), &[1.0, -2.0, 4.0]);

        let channel = channel.with_scale(3.0);
        assert_eq!(&*channel.smoothed(3), &[6.0, -12.0, 24.0]);
    }

    #[test]
    fn test_smoothed_with_window() {
        let channel = Channel::new("Id")
            .with_smoothing_window(3)
            .with_factor(2.0)
            .with_data(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(&*channel.smoothed(4), &[2.0, 3.0, 4.0, 6.0]);
    }

    #[test]
    fn test_smoothed_is_clipped_to_time_base() {
        let channel = Channel::new("Ud").with_data(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(&*channel.smoothed(2), &[1.0, 2.0]);
        assert_eq!(channel.smoothed(10).len(), 4);
    }

    #[test]
    fn test_cache_invalidated_by_scale() {
        let mut channel = Channel::new("Ud").with_data(vec![1.0, 2.0]);
        assert_eq!(&*channel.smoothed(2), &[1.0, 2.0]);

        channel.set_scale(10.0);
        assert_eq!(&*channel.smoothed(2), &[10.0, 20.0]);
        assert_eq!(channel.cache_computations(), 2);
    }

    #[test]
    fn test_cache_reused_for_unrelated_edits() {
        let mut channel = Channel::new("Ud").with_data(vec![1.0, 2.0, 3.0]);
        let _ = channel.smoothed(3);
        channel.set_name("Renamed");
        channel.set_unit("kV");
        channel.set_selected(true);
        let _ = channel.smoothed(3);
        assert_eq!(channel.cache_computations(), 1);

        channel.set_smoothing_window(2);
        assert_eq!(&*channel.smoothed(3), &[1.0, 1.5, 2.5]);
        assert_eq!(channel.cache_computations(), 2);
    }

    #[test]
    fn test_cache_invalidated_by_new_samples() {
        let mut channel = Channel::new("Ud").with_data(vec![1.0]);
        assert_eq!(channel.smoothed(5).len(), 1);
        channel.push_sample(2.0);
        assert_eq!(&*channel.smoothed(5), &[1.0, 2.0]);
    }

    #[test]
    fn test_held_series_survive_rereads_and_edits() {
        let mut channel = Channel::new("Ud").with_data(vec![1.0, 2.0]);
        let first = channel.smoothed(2);
        let second = channel.smoothed(2);
        assert!(Arc::ptr_eq(&first, &second));

        channel.set_scale(2.0);
        let scaled = channel.smoothed(2);
        assert_eq!(&*first, &[1.0, 2.0]);
        assert_eq!(&*scaled, &[2.0, 4.0]);
        assert_eq!(channel.cache_computations(), 2);
    }

    #[test]
    fn test_equality_ignores_inverted_flag() {
        let plain = Channel::new("Ud").with_data(vec![1.0, -3.0]);
        let mut flagged = plain.clone();
        flagged.set_inverted(true);
        assert_eq!(plain, flagged);

        flagged.invert();
        assert_ne!(plain, flagged);
    }

    #[test]
    fn test_inversion() {
        let mut channel = Channel::new("Ud").with_data(vec![1.0, -3.0]);
        channel.set_inverted(true);
        assert_eq!(&*channel.smoothed(2), &[-1.0, 3.0]);
        channel.set_inverted(false);

        channel.invert();
        assert_eq!(channel.data(), &[-1.0, 3.0]);
        assert_eq!(channel.min_value(), -1.0);
        assert_eq!(channel.max_value(), 3.0);
        assert_eq!(&*channel.smoothed(2), &[-1.0, 3.0]);
    }

    #[test]
    fn test_calculate_limits() {
        let mut channel = Channel::new("Ud");
        channel.calculate_limits();
        assert_eq!(channel.min_value(), f64::INFINITY);
        assert_eq!(channel.max_value(), f64::NEG_INFINITY);

        for v in [0.5, f64::NAN, -2.314, 2.314] {
            channel.push_sample(v);
        }
        channel.calculate_limits();
        assert_eq!(channel.min_value(), -2.314);
        assert_eq!(channel.max_value(), 2.314);
    }

    #[test]
    fn test_zero_smoothing_window_ignored() {
        let mut channel = Channel::new("Ud").with_smoothing_window(4);
        channel.set_smoothing_window(0);
        assert_eq!(channel.smoothing_window(), 4);
    }

    #[test]
    fn test_legend_and_clear() {
        let mut channel = Channel::new("Ud").with_unit("V").with_scale(2.0);
        assert_eq!(channel.legend_name(), "Ud, V × 2");
        assert!(channel.summary().contains("Unit:\tV"));

        channel.set_selected(true);
        channel.clear();
        assert_eq!(channel.name(), "");
        assert_eq!(channel.scale(), 1.0);
        assert!(!channel.is_selected());
    }
}

//! Test data builders for creating test objects

use recon_plot::{Channel, Color, SignalDataset};

/// Builder for creating test datasets with a linear time base
pub struct DatasetBuilder {
    title: String,
    step: f64,
    channels: Vec<Channel>,
}

impl DatasetBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            step: 0.001,
            channels: Vec::new(),
        }
    }

    /// Sampling period of the generated time base
    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn channel(mut self, name: &str, unit: &str, data: Vec<f64>) -> Self {
        let color = Color::palette(self.channels.len());
        self.channels.push(
            Channel::new(name)
                .with_unit(unit)
                .with_color(color)
                .with_data(data),
        );
        self
    }

    pub fn build(self) -> SignalDataset {
        let mut dataset = SignalDataset::new();
        dataset.set_title(self.title);
        dataset.set_labels("Time, s", "Value");

        let samples = self.channels.iter().map(Channel::data_count).max().unwrap_or(0);
        dataset.set_time((0..samples).map(|i| i as f64 * self.step).collect());
        for channel in self.channels {
            dataset.add_channel(channel);
        }

        dataset.calculate_limits();
        dataset.reset_window();
        dataset.set_modified(false);
        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_builder() {
        let dataset = DatasetBuilder::new("bench")
            .channel("U", "V", vec![1.0, 2.0])
            .build();
        assert_eq!(dataset.sample_count(), 2);
        assert_eq!(dataset.channel_count(), 1);
    }
}

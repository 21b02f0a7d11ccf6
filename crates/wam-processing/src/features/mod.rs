//! Feature library
//!
//! Each [`FeatureSpec`] names a pure function and the channels it runs on.
//! Evaluated over one window it returns one scalar per output column, in the
//! order given by [`FeatureSpec::keys`].

pub mod entropy;
pub mod spectral;
pub mod statistics;

use crate::windowing::Window;
use serde::{Deserialize, Serialize};
use wam_core::{config_error, ChannelId, FeatureKey, FeatureKind, WamResult};

pub use entropy::signal_entropy;
pub use spectral::{dominant_frequency, iqr_of_autocovariance, DominantFrequency, DEFAULT_FREQUENCY_CUTOFF};
pub use statistics::{
    amplitude, correlation_coefficient, jerk_ratio, mean_cross_rate, range_count_percentage,
    signal_range, signal_rms,
};

/// Default band for range count percentage
pub const DEFAULT_RANGE_COUNT: (f64, f64) = (-1.0, 1.0);

/// A feature function bound to its channels and parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "feature", rename_all = "snake_case")]
pub enum FeatureSpec {
    SignalEntropy {
        channels: Vec<ChannelId>,
    },
    CorrelationCoefficient {
        pairs: Vec<(ChannelId, ChannelId)>,
    },
    Rms {
        channels: Vec<ChannelId>,
    },
    Range {
        channels: Vec<ChannelId>,
    },
    IqrOfAutocovariance {
        channels: Vec<ChannelId>,
    },
    /// Five columns per channel: value, magnitude, ratio, flatness, entropy
    DominantFrequency {
        channels: Vec<ChannelId>,
        #[serde(default = "default_cutoff")]
        cutoff: f64,
    },
    MeanCrossRate {
        channels: Vec<ChannelId>,
    },
    RangeCountPercentage {
        channels: Vec<ChannelId>,
        #[serde(default = "default_range_min")]
        min: f64,
        #[serde(default = "default_range_max")]
        max: f64,
    },
    JerkRatio {
        channels: Vec<ChannelId>,
    },
    Amplitude {
        channels: Vec<ChannelId>,
    },
}

fn default_cutoff() -> f64 {
    DEFAULT_FREQUENCY_CUTOFF
}

fn default_range_min() -> f64 {
    DEFAULT_RANGE_COUNT.0
}

fn default_range_max() -> f64 {
    DEFAULT_RANGE_COUNT.1
}

const DOMINANT_FREQUENCY_KINDS: [FeatureKind; 5] = [
    FeatureKind::DominantFrequencyValue,
    FeatureKind::DominantFrequencyMagnitude,
    FeatureKind::DominantFrequencyRatio,
    FeatureKind::SpectralFlatness,
    FeatureKind::SpectralEntropy,
];

impl FeatureSpec {
    /// Channels for single-channel features; empty for correlation
    fn single_channels(&self) -> &[ChannelId] {
        match self {
            FeatureSpec::SignalEntropy { channels }
            | FeatureSpec::Rms { channels }
            | FeatureSpec::Range { channels }
            | FeatureSpec::IqrOfAutocovariance { channels }
            | FeatureSpec::DominantFrequency { channels, .. }
            | FeatureSpec::MeanCrossRate { channels }
            | FeatureSpec::RangeCountPercentage { channels, .. }
            | FeatureSpec::JerkRatio { channels }
            | FeatureSpec::Amplitude { channels } => channels,
            FeatureSpec::CorrelationCoefficient { .. } => &[],
        }
    }

    /// Function name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            FeatureSpec::SignalEntropy { .. } => "signal_entropy",
            FeatureSpec::CorrelationCoefficient { .. } => "correlation_coefficient",
            FeatureSpec::Rms { .. } => "signal_rms",
            FeatureSpec::Range { .. } => "signal_range",
            FeatureSpec::IqrOfAutocovariance { .. } => "iqr_of_autocovariance",
            FeatureSpec::DominantFrequency { .. } => "dominant_frequency",
            FeatureSpec::MeanCrossRate { .. } => "mean_cross_rate",
            FeatureSpec::RangeCountPercentage { .. } => "range_count_percentage",
            FeatureSpec::JerkRatio { .. } => "jerk_metric",
            FeatureSpec::Amplitude { .. } => "amplitude",
        }
    }

    /// Every channel the feature reads
    pub fn channels(&self) -> Vec<ChannelId> {
        match self {
            FeatureSpec::CorrelationCoefficient { pairs } => {
                pairs.iter().flat_map(|&(a, b)| [a, b]).collect()
            }
            _ => self.single_channels().to_vec(),
        }
    }

    /// Output columns, in evaluation order
    pub fn keys(&self) -> Vec<FeatureKey> {
        let channels = self.single_channels();
        match self {
            FeatureSpec::CorrelationCoefficient { pairs } => {
                pairs.iter().map(|&(a, b)| FeatureKey::pair(a, b)).collect()
            }
            FeatureSpec::DominantFrequency { .. } => channels
                .iter()
                .flat_map(|&c| DOMINANT_FREQUENCY_KINDS.map(|kind| FeatureKey::channel(c, kind)))
                .collect(),
            _ => {
                let kind = match self {
                    FeatureSpec::SignalEntropy { .. } => FeatureKind::SignalEntropy,
                    FeatureSpec::Rms { .. } => FeatureKind::Rms,
                    FeatureSpec::Range { .. } => FeatureKind::Range,
                    FeatureSpec::IqrOfAutocovariance { .. } => FeatureKind::IqrOfAutocovariance,
                    FeatureSpec::MeanCrossRate { .. } => FeatureKind::MeanCrossRate,
                    FeatureSpec::RangeCountPercentage { .. } => FeatureKind::RangeCountPercentage,
                    FeatureSpec::JerkRatio { .. } => FeatureKind::JerkRatio,
                    _ => FeatureKind::Amplitude,
                };
                channels.iter().map(|&c| FeatureKey::channel(c, kind)).collect()
            }
        }
    }

    /// Check parameters; independent of the data
    pub fn validate(&self) -> WamResult<()> {
        if self.channels().is_empty() {
            return Err(config_error!("{} is configured without channels", self.name()));
        }
        match *self {
            FeatureSpec::DominantFrequency { cutoff, .. } if !(cutoff > 0.0) || !cutoff.is_finite() => {
                Err(config_error!("dominant frequency cutoff {cutoff} Hz must be positive"))
            }
            FeatureSpec::RangeCountPercentage { min, max, .. } if !(min < max) => {
                Err(config_error!("range count band [{min}, {max}) is empty"))
            }
            _ => Ok(()),
        }
    }

    /// Compute this feature's columns over one window.
    ///
    /// Degenerate numeric input yields NaN values; structurally inapplicable
    /// input yields a `DataInsufficient` error.
    pub fn evaluate(&self, window: &Window<'_>) -> WamResult<Vec<f64>> {
        let fs = window.sampling_rate();

        if let FeatureSpec::CorrelationCoefficient { pairs } = self {
            return pairs
                .iter()
                .map(|(a, b)| Ok(correlation_coefficient(window.samples(a)?, window.samples(b)?)))
                .collect();
        }

        let mut values = Vec::with_capacity(self.single_channels().len());
        for id in self.single_channels() {
            let data = window.samples(id)?;
            match *self {
                FeatureSpec::SignalEntropy { .. } => values.push(signal_entropy(data)),
                FeatureSpec::Rms { .. } => values.push(signal_rms(data)),
                FeatureSpec::Range { .. } => values.push(signal_range(data)),
                FeatureSpec::IqrOfAutocovariance { .. } => values.push(iqr_of_autocovariance(data)?),
                FeatureSpec::DominantFrequency { cutoff, .. } => {
                    values.extend(dominant_frequency(data, fs, cutoff)?.values())
                }
                FeatureSpec::MeanCrossRate { .. } => values.push(mean_cross_rate(data)),
                FeatureSpec::RangeCountPercentage { min, max, .. } => {
                    values.push(range_count_percentage(data, min, max))
                }
                FeatureSpec::JerkRatio { .. } => values.push(jerk_ratio(data, fs)),
                FeatureSpec::Amplitude { .. } => values.push(amplitude(data)),
                FeatureSpec::CorrelationCoefficient { .. } => {}
            }
        }
        Ok(values)
    }
}

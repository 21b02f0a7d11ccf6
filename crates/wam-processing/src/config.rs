//! Pipeline configuration and use-case presets
//!
//! The use cases differ only in their [`PipelineConfig`]: which bands are
//! filtered, which derived channels are built, and which feature functions
//! run on them. The assembler itself is shared.

use crate::features::{FeatureSpec, DEFAULT_FREQUENCY_CUTOFF};
use crate::filters::{BandPassFilter, FilterConfig};
use crate::magnitude::{MagnitudeConfig, VectorMagnitude};
use crate::pca::{PcaConfig, PrincipalComponents};
use crate::processor::ChannelStage;
use crate::windowing::{window_samples, DEFAULT_WINDOW_SECONDS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use wam_core::{config_error, Axis, Band, ChannelId, Recording, WamError, WamResult};

/// Downstream classification target a pipeline feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    /// Walking detection
    Gait,
    /// Resting tremor detection
    Tremor,
    /// Hand movement amplitude and smoothness
    Bradykinesia,
    /// Resting tremor amplitude
    TremorAmplitude,
    /// Caller-defined pipeline
    Custom,
}

impl UseCase {
    pub const PRESETS: [UseCase; 4] = [
        UseCase::Gait,
        UseCase::Tremor,
        UseCase::Bradykinesia,
        UseCase::TremorAmplitude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UseCase::Gait => "gait",
            UseCase::Tremor => "tremor",
            UseCase::Bradykinesia => "bradykinesia",
            UseCase::TremorAmplitude => "tremor_amplitude",
            UseCase::Custom => "custom",
        }
    }
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One channel-deriving stage, in declaration order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageConfig {
    BandPass(FilterConfig),
    PrincipalComponents(PcaConfig),
    VectorMagnitude(MagnitudeConfig),
}

impl StageConfig {
    /// Instantiate the stage for a sampling rate
    pub fn build(&self, sampling_rate: f64) -> WamResult<Box<dyn ChannelStage>> {
        Ok(match self {
            StageConfig::BandPass(config) => Box::new(BandPassFilter::new(config.clone(), sampling_rate)?),
            StageConfig::PrincipalComponents(config) => Box::new(PrincipalComponents::new(config.clone())?),
            StageConfig::VectorMagnitude(config) => Box::new(VectorMagnitude::new(config.clone())?),
        })
    }
}

/// Complete declaration of one feature pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name used in logs
    pub name: String,
    pub use_case: UseCase,
    /// Analysis window duration (seconds)
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,
    /// Channel-deriving stages, applied in order
    pub stages: Vec<StageConfig>,
    /// Feature functions; their columns appear in this order
    pub features: Vec<FeatureSpec>,
    /// Evaluate windows on worker threads
    #[serde(default)]
    pub parallel: bool,
}

fn default_window_seconds() -> f64 {
    DEFAULT_WINDOW_SECONDS
}

fn band_passed(band: Band) -> Vec<ChannelId> {
    Axis::ALL.iter().map(|&a| ChannelId::band_passed(a, band)).collect()
}

fn first_component(band: Band) -> ChannelId {
    ChannelId::Principal {
        rank: 1,
        band: Some(band),
    }
}

/// Preset configurations for the supported use cases
impl PipelineConfig {
    /// Gait: one band, its first principal component, eight feature families
    pub fn gait() -> Self {
        let band = Band::new(0.25, 3.0);
        let axes = band_passed(band);
        let mut channels = axes.clone();
        channels.push(first_component(band));

        PipelineConfig {
            name: "gait".to_string(),
            use_case: UseCase::Gait,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            stages: vec![
                StageConfig::BandPass(FilterConfig::bandpass(band.low, band.high, 1)),
                StageConfig::PrincipalComponents(PcaConfig::new(axes.clone())),
            ],
            features: vec![
                FeatureSpec::SignalEntropy { channels: channels.clone() },
                FeatureSpec::CorrelationCoefficient {
                    pairs: vec![(axes[0], axes[1]), (axes[0], axes[2]), (axes[1], axes[2])],
                },
                FeatureSpec::Rms { channels: channels.clone() },
                FeatureSpec::Range { channels: channels.clone() },
                FeatureSpec::IqrOfAutocovariance { channels: channels.clone() },
                FeatureSpec::DominantFrequency {
                    channels: channels.clone(),
                    cutoff: DEFAULT_FREQUENCY_CUTOFF,
                },
                FeatureSpec::MeanCrossRate { channels: channels.clone() },
                FeatureSpec::RangeCountPercentage { channels, min: -0.1, max: 0.1 },
            ],
            parallel: false,
        }
    }

    /// Resting tremor: tremor band and low band, each with its first component
    pub fn tremor() -> Self {
        let tremor_band = Band::new(3.5, 7.5);
        let low_band = Band::new(0.25, 3.5);
        let tremor_axes = band_passed(tremor_band);
        let low_axes = band_passed(low_band);

        let mut channels = tremor_axes.clone();
        channels.extend(low_axes.iter().copied());
        channels.push(first_component(tremor_band));
        channels.push(first_component(low_band));

        PipelineConfig {
            name: "tremor".to_string(),
            use_case: UseCase::Tremor,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            stages: vec![
                StageConfig::BandPass(FilterConfig::bandpass(tremor_band.low, tremor_band.high, 1)),
                StageConfig::BandPass(FilterConfig::bandpass(low_band.low, low_band.high, 1)),
                StageConfig::PrincipalComponents(PcaConfig::new(tremor_axes)),
                StageConfig::PrincipalComponents(PcaConfig::new(low_axes)),
            ],
            features: vec![
                FeatureSpec::Range { channels: channels.clone() },
                FeatureSpec::Rms { channels: channels.clone() },
                FeatureSpec::DominantFrequency {
                    channels: channels.clone(),
                    cutoff: DEFAULT_FREQUENCY_CUTOFF,
                },
                FeatureSpec::SignalEntropy { channels },
            ],
            parallel: false,
        }
    }

    /// Hand movement: magnitude amplitude and jerk ratio
    pub fn bradykinesia() -> Self {
        let band = Band::new(0.25, 3.5);
        let magnitude = ChannelId::Magnitude { band: Some(band) };

        PipelineConfig {
            name: "bradykinesia".to_string(),
            use_case: UseCase::Bradykinesia,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            stages: vec![
                StageConfig::BandPass(FilterConfig::bandpass(band.low, band.high, 4)),
                StageConfig::VectorMagnitude(MagnitudeConfig { source: band_passed(band) }),
            ],
            features: vec![
                FeatureSpec::Amplitude { channels: vec![magnitude] },
                FeatureSpec::JerkRatio { channels: vec![magnitude] },
            ],
            parallel: false,
        }
    }

    /// Resting tremor amplitude: magnitude amplitude in the tremor band
    pub fn tremor_amplitude() -> Self {
        let band = Band::new(3.5, 7.5);
        let magnitude = ChannelId::Magnitude { band: Some(band) };

        PipelineConfig {
            name: "tremor_amplitude".to_string(),
            use_case: UseCase::TremorAmplitude,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            stages: vec![
                StageConfig::BandPass(FilterConfig::bandpass(band.low, band.high, 3)),
                StageConfig::VectorMagnitude(MagnitudeConfig { source: band_passed(band) }),
            ],
            features: vec![FeatureSpec::Amplitude { channels: vec![magnitude] }],
            parallel: false,
        }
    }

    /// Preset for a use case; `Custom` has none
    pub fn for_use_case(use_case: UseCase) -> WamResult<Self> {
        match use_case {
            UseCase::Gait => Ok(Self::gait()),
            UseCase::Tremor => Ok(Self::tremor()),
            UseCase::Bradykinesia => Ok(Self::bradykinesia()),
            UseCase::TremorAmplitude => Ok(Self::tremor_amplitude()),
            UseCase::Custom => Err(config_error!("custom pipelines have no preset")),
        }
    }

    /// Enable or disable parallel window evaluation
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validate the whole pipeline against a sampling rate.
    ///
    /// Checks every stage and feature parameter, and that every channel a
    /// stage or feature reads is a raw axis or produced by an earlier stage.
    pub fn validate(&self, sampling_rate: f64) -> WamResult<()> {
        Recording::validate_sampling_rate(sampling_rate)?;

        if !self.window_seconds.is_finite() || self.window_seconds <= 0.0 {
            return Err(config_error!(
                "window duration must be positive, got {} s",
                self.window_seconds
            ));
        }
        window_samples(sampling_rate, self.window_seconds)?;

        if self.features.is_empty() {
            return Err(config_error!("pipeline '{}' computes no features", self.name));
        }

        let mut available: HashSet<ChannelId> =
            Axis::ALL.iter().map(|&a| ChannelId::Axis(a)).collect();

        for stage_config in &self.stages {
            let stage = stage_config.build(sampling_rate)?;
            if let Some(missing) = stage.inputs().iter().find(|id| !available.contains(id)) {
                return Err(config_error!(
                    "stage {} reads {} before it is derived",
                    stage.name(),
                    missing
                ));
            }
            for output in stage.outputs() {
                if !available.insert(output) {
                    return Err(config_error!("channel {output} is derived more than once"));
                }
            }
        }

        for feature in &self.features {
            feature.validate()?;
            if let Some(missing) = feature.channels().iter().find(|id| !available.contains(id)) {
                return Err(WamError::unknown_channel(format!(
                    "{} (read by {})",
                    missing,
                    feature.name()
                )));
            }
        }

        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> WamResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| WamError::Serialization {
            reason: format!("failed to serialize pipeline configuration: {e}"),
        })
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> WamResult<Self> {
        serde_json::from_str(json).map_err(|e| WamError::Serialization {
            reason: format!("failed to deserialize pipeline configuration: {e}"),
        })
    }
}

//! WAM-Processing: windowed movement feature extraction
//!
//! Band-pass filtering, principal components and vector magnitude derive
//! channels from a raw recording; the stream is then split into fixed
//! windows and a declared set of feature functions runs on each window.
//!
//! ```no_run
//! use wam_processing::{FeaturePipeline, UseCase};
//! # fn demo(recording: &wam_core::Recording) -> wam_core::WamResult<()> {
//! let pipeline = FeaturePipeline::preset(UseCase::Gait, recording.sampling_rate())?;
//! let table = pipeline.run(recording)?;
//! println!("{} windows kept", table.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod features;
pub mod filters;
pub mod magnitude;
pub mod pca;
pub mod pipeline;
pub mod processor;
pub mod windowing;

pub use config::{PipelineConfig, StageConfig, UseCase};
pub use features::{DominantFrequency, FeatureSpec};
pub use filters::{butter_bandpass, filtfilt, BandPassFilter, FilterCoefficients, FilterConfig};
pub use magnitude::{MagnitudeConfig, VectorMagnitude};
pub use pca::{PcaConfig, PrincipalComponents};
pub use pipeline::{DroppedWindow, FeaturePipeline, PipelineReport};
pub use processor::{apply_stages, ChannelStage, StageType};
pub use windowing::{segment, window_samples, Segmentation, Window};

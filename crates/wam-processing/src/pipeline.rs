//! Feature set assembler
//!
//! Runs derive channels -> segment -> evaluate features -> drop rule for any
//! [`PipelineConfig`]. Windows are independent, so they may be evaluated on
//! worker threads; rows are always emitted in window order.

use crate::config::{PipelineConfig, UseCase};
use crate::processor::{apply_stages, ChannelStage};
use crate::windowing::{Segmentation, Window};
use serde::Serialize;
use std::thread;
use wam_core::{
    config_error, ChannelSet, FeatureKey, FeatureRow, FeatureTable, FeatureTableBuilder, Recording,
    WamError, WamResult,
};

/// A window removed by the drop rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedWindow {
    pub index: usize,
    pub reason: String,
}

/// Bookkeeping for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    pub total_windows: usize,
    pub retained: usize,
    pub dropped: Vec<DroppedWindow>,
}

impl PipelineReport {
    /// Fraction of windows that were dropped
    pub fn drop_rate(&self) -> f64 {
        if self.total_windows == 0 {
            return 0.0;
        }
        self.dropped.len() as f64 / self.total_windows as f64
    }
}

/// Validated, ready-to-run feature pipeline for one sampling rate
pub struct FeaturePipeline {
    config: PipelineConfig,
    sampling_rate: f64,
    stages: Vec<Box<dyn ChannelStage>>,
    columns: Vec<FeatureKey>,
}

impl FeaturePipeline {
    /// Validate a configuration and build its stages
    pub fn new(config: PipelineConfig, sampling_rate: f64) -> WamResult<Self> {
        config.validate(sampling_rate)?;

        let stages = config
            .stages
            .iter()
            .map(|stage| stage.build(sampling_rate))
            .collect::<WamResult<Vec<_>>>()?;
        let columns = config.features.iter().flat_map(|f| f.keys()).collect();

        Ok(FeaturePipeline {
            config,
            sampling_rate,
            stages,
            columns,
        })
    }

    /// Pipeline for one of the preset use cases
    pub fn preset(use_case: UseCase, sampling_rate: f64) -> WamResult<Self> {
        Self::new(PipelineConfig::for_use_case(use_case)?, sampling_rate)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Output columns in table order
    pub fn columns(&self) -> &[FeatureKey] {
        &self.columns
    }

    /// Raw axes plus every derived channel
    pub fn derive_channels(&self, recording: &Recording) -> WamResult<ChannelSet> {
        if recording.sampling_rate() != self.sampling_rate {
            return Err(config_error!(
                "pipeline '{}' was built for {} Hz, recording is {} Hz",
                self.config.name,
                self.sampling_rate,
                recording.sampling_rate()
            ));
        }
        apply_stages(&self.stages, &recording.channel_set())
    }

    /// Build the feature table for a recording
    pub fn run(&self, recording: &Recording) -> WamResult<FeatureTable> {
        self.run_with_report(recording).map(|(table, _)| table)
    }

    /// Build the feature table and report which windows were dropped
    pub fn run_with_report(&self, recording: &Recording) -> WamResult<(FeatureTable, PipelineReport)> {
        let span = tracing::info_span!(
            "feature_pipeline",
            use_case = %self.config.use_case,
            recording = %recording.id()
        );
        let _enter = span.enter();

        let channels = self.derive_channels(recording)?;
        let segmentation = Segmentation::new(&channels, self.config.window_seconds)?;

        let outcomes = if self.config.parallel {
            self.evaluate_parallel(&segmentation)
        } else {
            segmentation
                .windows()
                .map(|window| (window.index(), self.evaluate_window(&window)))
                .collect()
        };

        let mut builder = FeatureTableBuilder::new(self.columns.clone());
        let mut report = PipelineReport {
            total_windows: segmentation.len(),
            ..PipelineReport::default()
        };

        for (index, outcome) in outcomes {
            let pushed = outcome.and_then(|row| builder.push(row));
            match pushed {
                Ok(()) => report.retained += 1,
                Err(err) if err.is_window_local() => {
                    let reason = match err {
                        WamError::WindowDegenerate { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    tracing::debug!(window = index, %reason, "dropping window");
                    report.dropped.push(DroppedWindow { index, reason });
                }
                Err(err) => return Err(err),
            }
        }

        let table = builder.finish(report.total_windows);

        tracing::info!(
            pipeline = %self.config.name,
            channels = channels.channel_count(),
            windows = report.total_windows,
            rows = table.len(),
            "feature table assembled"
        );
        if report.drop_rate() > 0.5 {
            tracing::warn!(
                dropped = report.dropped.len(),
                windows = report.total_windows,
                "more than half of the windows were dropped"
            );
        }

        Ok((table, report))
    }

    /// All feature values of one window, in column order
    fn evaluate_window(&self, window: &Window<'_>) -> WamResult<FeatureRow> {
        let mut values = Vec::with_capacity(self.columns.len());
        for feature in &self.config.features {
            let computed = feature.evaluate(window).map_err(|err| {
                if err.is_window_local() {
                    WamError::WindowDegenerate {
                        window: window.index(),
                        reason: format!("{}: {}", feature.name(), err),
                    }
                } else {
                    err
                }
            })?;
            values.extend(computed);
        }

        Ok(FeatureRow {
            window_index: window.index(),
            samples: window.range(),
            values,
        })
    }

    /// Evaluate windows on scoped worker threads, returned in window order
    fn evaluate_parallel(&self, segmentation: &Segmentation<'_>) -> Vec<(usize, WamResult<FeatureRow>)> {
        let workers = thread::available_parallelism().map_or(1, |n| n.get());
        let chunk = segmentation.len().div_ceil(workers).max(1);
        let indices: Vec<usize> = (0..segmentation.len()).collect();

        let mut outcomes: Vec<(usize, WamResult<FeatureRow>)> = thread::scope(|scope| {
            let handles: Vec<_> = indices
                .chunks(chunk)
                .map(|batch| {
                    scope.spawn(move || {
                        batch
                            .iter()
                            .filter_map(|&i| segmentation.window(i))
                            .map(|window| (window.index(), self.evaluate_window(&window)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        outcomes.sort_by_key(|(index, _)| *index);
        tracing::trace!(workers, windows = outcomes.len(), "parallel window evaluation finished");
        outcomes
    }
}

impl std::fmt::Debug for FeaturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeaturePipeline")
            .field("name", &self.config.name)
            .field("sampling_rate", &self.sampling_rate)
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("columns", &self.columns.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSpec;
    use wam_core::{Axis, ChannelId};

    fn recording(samples: Vec<(f64, f64, f64)>, fs: f64) -> Recording {
        let n = samples.len();
        Recording::from_columns(
            (0..n).map(|i| i as f64 / fs).collect(),
            samples.iter().map(|s| s.0).collect(),
            samples.iter().map(|s| s.1).collect(),
            samples.iter().map(|s| s.2).collect(),
            fs,
        )
        .unwrap()
    }

    fn raw_config(features: Vec<FeatureSpec>) -> PipelineConfig {
        PipelineConfig {
            name: "raw".to_string(),
            use_case: UseCase::Custom,
            window_seconds: 3.0,
            stages: Vec::new(),
            features,
            parallel: false,
        }
    }

    #[test]
    fn test_flat_segment_window_is_dropped() {
        // Three 30-sample windows; the middle one is constant on x.
        let fs = 10.0;
        let samples = (0..90)
            .map(|i| {
                let x = if (30..60).contains(&i) { 1.0 } else { (i as f64 * 0.7).sin() };
                (x, 0.0, 9.81)
            })
            .collect();
        let config = raw_config(vec![FeatureSpec::SignalEntropy {
            channels: vec![ChannelId::Axis(Axis::X)],
        }]);

        let pipeline = FeaturePipeline::new(config, fs).unwrap();
        let (table, report) = pipeline.run_with_report(&recording(samples, fs)).unwrap();

        assert_eq!(report.total_windows, 3);
        assert_eq!(report.retained, 2);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].index, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].window_index, 0);
        assert_eq!(table.rows()[1].window_index, 2);
        assert_eq!(table.rows()[1].samples, 60..90);
    }

    #[test]
    fn test_single_sample_windows_are_dropped() {
        // 0.3 Hz with a 3 s window gives one-sample windows.
        let fs = 0.3;
        let config = raw_config(vec![FeatureSpec::IqrOfAutocovariance {
            channels: vec![ChannelId::Axis(Axis::X)],
        }]);
        let pipeline = FeaturePipeline::new(config, fs).unwrap();
        let samples = vec![(0.1, 0.0, 1.0), (0.4, 0.0, 1.0), (-0.2, 0.0, 1.0)];

        let (table, report) = pipeline.run_with_report(&recording(samples, fs)).unwrap();

        assert!(table.is_empty());
        assert_eq!(report.total_windows, 3);
        assert_eq!(report.retained, 0);
        assert_eq!(
            report.dropped.iter().map(|d| d.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        let insufficient = WamError::DataInsufficient {
            operation: "autocorrelation",
            required: 2,
            actual: 1,
        };
        for dropped in &report.dropped {
            assert_eq!(dropped.reason, format!("iqr_of_autocovariance: {insufficient}"));
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let fs = 20.0;
        let samples = (0..1210)
            .map(|i| {
                let t = i as f64 / fs;
                ((2.0 * t).sin(), (5.0 * t).cos() * 0.3, 1.0 + 0.01 * t)
            })
            .collect();
        let recording = recording(samples, fs);

        let sequential = FeaturePipeline::preset(UseCase::Gait, fs).unwrap();
        let parallel =
            FeaturePipeline::new(PipelineConfig::gait().with_parallel(true), fs).unwrap();

        let a = sequential.run(&recording).unwrap();
        let b = parallel.run(&recording).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.total_windows(), 20);
    }

    #[test]
    fn test_sampling_rate_mismatch() {
        let pipeline = FeaturePipeline::preset(UseCase::TremorAmplitude, 100.0).unwrap();
        let recording = recording(vec![(0.0, 0.0, 0.0); 600], 50.0);
        assert!(matches!(
            pipeline.run(&recording),
            Err(WamError::Configuration { .. })
        ));
    }

    #[test]
    fn test_short_recording_aborts() {
        let pipeline = FeaturePipeline::preset(UseCase::Bradykinesia, 50.0).unwrap();

        let tiny = recording(vec![(0.1, 0.2, 0.3); 8], 50.0);
        assert!(matches!(
            pipeline.run(&tiny),
            Err(WamError::InsufficientData { required: 11, .. })
        ));

        let under_one_window = recording(
            (0..100).map(|i| ((i as f64).sin(), 0.0, 1.0)).collect(),
            50.0,
        );
        assert!(matches!(
            pipeline.run(&under_one_window),
            Err(WamError::InsufficientData { required: 150, .. })
        ));
    }

    #[test]
    fn test_columns_match_rows() {
        let pipeline = FeaturePipeline::preset(UseCase::Tremor, 50.0).unwrap();
        let samples = (0..1500)
            .map(|i| {
                let t = i as f64 / 50.0;
                (
                    (2.0 * std::f64::consts::PI * 5.0 * t).sin(),
                    0.5 * (2.0 * std::f64::consts::PI * 1.2 * t).sin(),
                    0.2 * (2.0 * std::f64::consts::PI * 0.7 * t).cos(),
                )
            })
            .collect();
        let table = pipeline.run(&recording(samples, 50.0)).unwrap();

        assert_eq!(table.columns().len(), pipeline.columns().len());
        for row in table.rows() {
            assert_eq!(row.values.len(), table.columns().len());
            assert!(row.values.iter().all(|v| v.is_finite()));
        }
    }
}

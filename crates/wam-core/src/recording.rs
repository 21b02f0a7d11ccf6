//! Recording: raw triaxial wrist accelerometer stream

use crate::channel::{Axis, Channel, ChannelId, ChannelSet};
use crate::error::{WamError, WamResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound accepted for wearable accelerometer sampling rates (Hz)
pub const MAX_SAMPLING_RATE: f64 = 10_000.0;

/// One timestamped triaxial sample, as found in `ts,x,y,z` tables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    pub ts: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Raw accelerometer stream at a fixed sampling rate.
///
/// Loaded once and never mutated; every pipeline derives its own
/// [`ChannelSet`] from it.
#[derive(Debug, Clone)]
pub struct Recording {
    id: Uuid,
    sampling_rate: f64,
    timestamps: Vec<f64>,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl Recording {
    /// Build a recording from sample rows
    pub fn from_samples(samples: &[AccelSample], sampling_rate: f64) -> WamResult<Self> {
        Self::validate_sampling_rate(sampling_rate)?;

        let mut timestamps = Vec::with_capacity(samples.len());
        let mut x = Vec::with_capacity(samples.len());
        let mut y = Vec::with_capacity(samples.len());
        let mut z = Vec::with_capacity(samples.len());
        for sample in samples {
            timestamps.push(sample.ts);
            x.push(sample.x);
            y.push(sample.y);
            z.push(sample.z);
        }

        Ok(Recording {
            id: Uuid::new_v4(),
            sampling_rate,
            timestamps,
            x,
            y,
            z,
        })
    }

    /// Build a recording from per-axis columns
    pub fn from_columns(
        timestamps: Vec<f64>,
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
        sampling_rate: f64,
    ) -> WamResult<Self> {
        Self::validate_sampling_rate(sampling_rate)?;

        let expected = timestamps.len();
        for column in [&x, &y, &z] {
            if column.len() != expected {
                return Err(WamError::LengthMismatch {
                    expected,
                    actual: column.len(),
                });
            }
        }

        Ok(Recording {
            id: Uuid::new_v4(),
            sampling_rate,
            timestamps,
            x,
            y,
            z,
        })
    }

    /// Validate a sampling rate
    pub fn validate_sampling_rate(sampling_rate: f64) -> WamResult<()> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 || sampling_rate > MAX_SAMPLING_RATE
        {
            return Err(WamError::configuration(format!(
                "sampling rate {sampling_rate} Hz outside (0, {MAX_SAMPLING_RATE}]"
            )));
        }
        Ok(())
    }

    /// Unique identifier used to correlate log output
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the recording holds no samples
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Sampling rate in Hz
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sampling_rate
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Samples of one axis
    pub fn axis(&self, axis: Axis) -> &[f64] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    /// Iterate rows in chronological order
    pub fn samples(&self) -> impl Iterator<Item = AccelSample> + '_ {
        (0..self.len()).map(move |i| AccelSample {
            ts: self.timestamps[i],
            x: self.x[i],
            y: self.y[i],
            z: self.z[i],
        })
    }

    /// Channel set holding the three raw axes
    pub fn channel_set(&self) -> ChannelSet {
        let channels = Axis::ALL
            .iter()
            .map(|&axis| Channel::new(ChannelId::Axis(axis), self.axis(axis).to_vec()))
            .collect();

        ChannelSet::from_parts(self.sampling_rate, self.len(), channels)
    }
}

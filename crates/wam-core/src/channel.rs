//! Channels: named scalar time series, raw or derived
//!
//! Channels are identified by a structured [`ChannelId`] rather than by a
//! string. The conventional column names (`x_bp_filt_[0.25, 3.0]`,
//! `PC1_[3.5, 7.5]`, ...) are produced by `Display` only when a table is
//! serialized.

use crate::error::{WamError, WamResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Accelerometer axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes in column order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Band-pass cutoff pair in Hz
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(low: f64, high: f64) -> Self {
        Band { low, high }
    }

    /// Check the band against a sampling rate.
    ///
    /// Both edges must lie strictly inside `(0, fs/2)` with `low < high`.
    pub fn validate(&self, sampling_rate: f64) -> WamResult<()> {
        let nyquist = sampling_rate / 2.0;
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(WamError::configuration(format!(
                "band {self} has non-finite cutoffs"
            )));
        }
        if self.low <= 0.0 {
            return Err(WamError::configuration(format!(
                "band {self}: low cutoff must be positive"
            )));
        }
        if self.low >= self.high {
            return Err(WamError::configuration(format!(
                "band {self}: low cutoff must be below high cutoff"
            )));
        }
        if self.high >= nyquist {
            return Err(WamError::configuration(format!(
                "band {self}: high cutoff must be below Nyquist ({nyquist} Hz)"
            )));
        }
        Ok(())
    }
}

// Bands are keys; compare bit patterns so Eq and Hash agree.
impl PartialEq for Band {
    fn eq(&self, other: &Self) -> bool {
        self.low.to_bits() == other.low.to_bits() && self.high.to_bits() == other.high.to_bits()
    }
}

impl Eq for Band {}

impl Hash for Band {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.low.to_bits().hash(state);
        self.high.to_bits().hash(state);
    }
}

/// Renders as `[low, high]`. Cutoffs use Rust's shortest float form, which
/// matches Python's list formatting for plain decimals such as `0.25` or
/// `3.0` but not for exponent forms (`1e-5` here, `1e-05` in Python).
impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}, {:?}]", self.low, self.high)
    }
}

/// Structured channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    /// Raw accelerometer axis
    Axis(Axis),
    /// Zero-phase band-passed axis
    BandPassed { axis: Axis, band: Band },
    /// Principal component (1-based rank) of a channel group
    Principal { rank: usize, band: Option<Band> },
    /// Euclidean norm of a channel group
    Magnitude { band: Option<Band> },
}

impl ChannelId {
    pub fn band_passed(axis: Axis, band: Band) -> Self {
        ChannelId::BandPassed { axis, band }
    }

    /// Band the channel was derived from, if any
    pub fn band(&self) -> Option<Band> {
        match self {
            ChannelId::Axis(_) => None,
            ChannelId::BandPassed { band, .. } => Some(*band),
            ChannelId::Principal { band, .. } | ChannelId::Magnitude { band } => *band,
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelId::Axis(axis) => write!(f, "{axis}"),
            ChannelId::BandPassed { axis, band } => write!(f, "{axis}_bp_filt_{band}"),
            ChannelId::Principal { rank, band: Some(band) } => write!(f, "PC{rank}_{band}"),
            ChannelId::Principal { rank, band: None } => write!(f, "PC{rank}"),
            ChannelId::Magnitude { band: Some(band) } => write!(f, "mag_{band}"),
            ChannelId::Magnitude { band: None } => f.write_str("mag"),
        }
    }
}

/// Immutable channel: identifier plus shared samples
#[derive(Debug, Clone)]
pub struct Channel {
    id: ChannelId,
    samples: Arc<[f64]>,
}

impl Channel {
    pub fn new(id: ChannelId, samples: Vec<f64>) -> Self {
        Channel {
            id,
            samples: samples.into(),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Columnar, immutable set of equal-length channels.
///
/// Stages never modify a set; they return a new one that shares the
/// existing columns and appends the derived ones.
#[derive(Debug, Clone)]
pub struct ChannelSet {
    sampling_rate: f64,
    len: usize,
    channels: Vec<Channel>,
}

impl ChannelSet {
    /// Create a channel set, checking that every column has the same length
    pub fn new(sampling_rate: f64, channels: Vec<Channel>) -> WamResult<Self> {
        let len = channels.first().map_or(0, Channel::len);
        let set = ChannelSet {
            sampling_rate,
            len,
            channels: Vec::with_capacity(channels.len()),
        };
        set.with_channels(channels)
    }

    pub(crate) fn from_parts(sampling_rate: f64, len: usize, channels: Vec<Channel>) -> Self {
        ChannelSet {
            sampling_rate,
            len,
            channels,
        }
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channel identifiers in insertion order
    pub fn ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels.iter().map(Channel::id)
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.channels.iter().any(|c| c.id == *id)
    }

    pub fn channel(&self, id: &ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == *id)
    }

    /// Samples of a channel, or `UnknownChannel`
    pub fn samples(&self, id: &ChannelId) -> WamResult<&[f64]> {
        self.channel(id)
            .map(Channel::samples)
            .ok_or_else(|| WamError::unknown_channel(id.to_string()))
    }

    /// Return a new set with `derived` appended.
    ///
    /// Derived channels must match the set length and must not reuse an
    /// existing identifier.
    pub fn with_channels(&self, derived: Vec<Channel>) -> WamResult<ChannelSet> {
        let mut channels = self.channels.clone();
        channels.reserve(derived.len());

        for channel in derived {
            if channel.len() != self.len {
                return Err(WamError::LengthMismatch {
                    expected: self.len,
                    actual: channel.len(),
                });
            }
            if channels.iter().any(|c| c.id == channel.id) {
                return Err(WamError::configuration(format!(
                    "channel {} is derived more than once",
                    channel.id
                )));
            }
            channels.push(channel);
        }

        Ok(ChannelSet {
            sampling_rate: self.sampling_rate,
            len: self.len,
            channels,
        })
    }
}

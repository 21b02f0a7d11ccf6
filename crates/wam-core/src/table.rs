//! Feature keys and the windows-by-features table

use crate::channel::ChannelId;
use crate::error::{WamError, WamResult};
use serde::ser::{Serialize, Serializer};
use serde::Deserialize;
use std::fmt;
use std::ops::Range;

/// Kind of scalar a feature function produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    SignalEntropy,
    CorrelationCoefficient,
    Rms,
    Range,
    IqrOfAutocovariance,
    DominantFrequencyValue,
    DominantFrequencyMagnitude,
    DominantFrequencyRatio,
    SpectralFlatness,
    SpectralEntropy,
    MeanCrossRate,
    RangeCountPercentage,
    JerkRatio,
    /// Root mean square of a vector magnitude channel
    Amplitude,
}

impl FeatureKind {
    /// Column-name suffix
    pub fn suffix(&self) -> &'static str {
        match self {
            FeatureKind::SignalEntropy => "signal_entropy",
            FeatureKind::CorrelationCoefficient => "corr_coef",
            FeatureKind::Rms => "rms",
            FeatureKind::Range => "range",
            FeatureKind::IqrOfAutocovariance => "iqr_of_autocovariance",
            FeatureKind::DominantFrequencyValue => "dom_freq_value",
            FeatureKind::DominantFrequencyMagnitude => "dom_freq_magnitude",
            FeatureKind::DominantFrequencyRatio => "dom_freq_ratio",
            FeatureKind::SpectralFlatness => "spectral_flatness",
            FeatureKind::SpectralEntropy => "spectral_entropy",
            FeatureKind::MeanCrossRate => "mean_cross_rate",
            FeatureKind::RangeCountPercentage => "range_count_per",
            FeatureKind::JerkRatio => "jerk_ratio",
            FeatureKind::Amplitude => "amplitude",
        }
    }
}

/// What a feature was computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureTarget {
    Channel(ChannelId),
    Pair(ChannelId, ChannelId),
}

/// Structured column key: (target channel(s), feature kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureKey {
    pub target: FeatureTarget,
    pub kind: FeatureKind,
}

impl FeatureKey {
    pub fn channel(channel: ChannelId, kind: FeatureKind) -> Self {
        FeatureKey {
            target: FeatureTarget::Channel(channel),
            kind,
        }
    }

    pub fn pair(first: ChannelId, second: ChannelId) -> Self {
        FeatureKey {
            target: FeatureTarget::Pair(first, second),
            kind: FeatureKind::CorrelationCoefficient,
        }
    }

    /// Conventional column name, e.g. `PC1_[0.25, 3.0]_dom_freq_value`
    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            FeatureTarget::Channel(channel) => write!(f, "{}_{}", channel, self.kind.suffix()),
            FeatureTarget::Pair(a, b) => write!(f, "{}_{}_{}", a, b, self.kind.suffix()),
        }
    }
}

/// One retained window
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Zero-based index of the window in the segmentation
    pub window_index: usize,
    /// Half-open sample range the window covers
    pub samples: Range<usize>,
    /// One value per table column, all finite
    pub values: Vec<f64>,
}

/// Ordered, immutable windows-by-features table.
///
/// Every cell is finite: a window with any undefined value never becomes a
/// row. Rows are in chronological window order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<FeatureKey>,
    rows: Vec<FeatureRow>,
    total_windows: usize,
}

impl FeatureTable {
    /// Number of retained windows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[FeatureKey] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(FeatureKey::display_name).collect()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Windows produced by segmentation, retained or not
    pub fn total_windows(&self) -> usize {
        self.total_windows
    }

    /// Windows removed by the drop rule
    pub fn dropped_windows(&self) -> usize {
        self.total_windows.saturating_sub(self.rows.len())
    }

    pub fn column_index(&self, key: &FeatureKey) -> Option<usize> {
        self.columns.iter().position(|c| c == key)
    }

    /// Column index by display name
    pub fn column_index_by_name(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.display_name() == name)
    }

    /// All values of one column, in row order
    pub fn column(&self, key: &FeatureKey) -> Option<Vec<f64>> {
        let idx = self.column_index(key)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    pub fn value(&self, row: usize, key: &FeatureKey) -> Option<f64> {
        let idx = self.column_index(key)?;
        self.rows.get(row).map(|r| r.values[idx])
    }

    /// Project the table onto a subset of columns, in the given order
    pub fn select(&self, keys: &[FeatureKey]) -> WamResult<FeatureTable> {
        let indices = keys
            .iter()
            .map(|k| {
                self.column_index(k)
                    .ok_or_else(|| WamError::UnknownFeature { name: k.display_name() })
            })
            .collect::<WamResult<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|r| FeatureRow {
                window_index: r.window_index,
                samples: r.samples.clone(),
                values: indices.iter().map(|&i| r.values[i]).collect(),
            })
            .collect();

        Ok(FeatureTable {
            columns: keys.to_vec(),
            rows,
            total_windows: self.total_windows,
        })
    }
}

/// Incremental construction of a [`FeatureTable`]
#[derive(Debug, Clone)]
pub struct FeatureTableBuilder {
    columns: Vec<FeatureKey>,
    rows: Vec<FeatureRow>,
}

impl FeatureTableBuilder {
    pub fn new(columns: Vec<FeatureKey>) -> Self {
        FeatureTableBuilder {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[FeatureKey] {
        &self.columns
    }

    /// Append a row; rejects rows with the wrong width or undefined values
    pub fn push(&mut self, row: FeatureRow) -> WamResult<()> {
        if row.values.len() != self.columns.len() {
            return Err(WamError::LengthMismatch {
                expected: self.columns.len(),
                actual: row.values.len(),
            });
        }
        if let Some(pos) = row.values.iter().position(|v| !v.is_finite()) {
            return Err(WamError::WindowDegenerate {
                window: row.window_index,
                reason: format!("{} is undefined", self.columns[pos]),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Freeze the table; rows are ordered by window index.
    ///
    /// `total_windows` is raised to the row count if it is smaller.
    pub fn finish(mut self, total_windows: usize) -> FeatureTable {
        self.rows.sort_by_key(|r| r.window_index);
        let total_windows = total_windows.max(self.rows.len());
        FeatureTable {
            columns: self.columns,
            rows: self.rows,
            total_windows,
        }
    }
}

#[derive(serde::Serialize)]
struct SerializedRow<'a> {
    window: usize,
    start: usize,
    end: usize,
    values: &'a [f64],
}

#[derive(serde::Serialize)]
struct SerializedTable<'a> {
    columns: Vec<String>,
    total_windows: usize,
    rows: Vec<SerializedRow<'a>>,
}

// Display names only appear at this boundary.
impl Serialize for FeatureTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializedTable {
            columns: self.column_names(),
            total_windows: self.total_windows,
            rows: self
                .rows
                .iter()
                .map(|r| SerializedRow {
                    window: r.window_index,
                    start: r.samples.start,
                    end: r.samples.end,
                    values: &r.values,
                })
                .collect(),
        }
        .serialize(serializer)
    }
}

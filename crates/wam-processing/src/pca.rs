//! Principal component stage
//!
//! Components come from the symmetric eigendecomposition of the channel
//! covariance matrix. Each component is oriented so that its largest
//! magnitude loading is positive, which makes the output independent of the
//! eigensolver's sign choice.

use crate::processor::{ChannelStage, StageType};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};
use wam_core::{config_error, Band, Channel, ChannelId, ChannelSet, WamResult};

/// Principal component stage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Channels to decompose, in order
    pub source: Vec<ChannelId>,
    /// Number of leading components to keep
    #[serde(default = "default_components")]
    pub n_components: usize,
}

fn default_components() -> usize {
    1
}

impl PcaConfig {
    pub fn new(source: Vec<ChannelId>) -> Self {
        PcaConfig {
            source,
            n_components: 1,
        }
    }

    pub fn validate(&self) -> WamResult<()> {
        if self.source.is_empty() {
            return Err(config_error!("principal components need at least one source channel"));
        }
        if self.n_components == 0 || self.n_components > self.source.len() {
            return Err(config_error!(
                "cannot keep {} components of {} channels",
                self.n_components,
                self.source.len()
            ));
        }
        Ok(())
    }
}

/// Sorted eigenpairs of a covariance matrix
#[derive(Debug, Clone)]
pub struct PcaResult {
    /// Eigenvalues, descending
    pub eigenvalues: Vec<f64>,
    /// Unit eigenvectors matching `eigenvalues`, sign-corrected
    pub components: Vec<DVector<f64>>,
    centered: DMatrix<f64>,
}

impl PcaResult {
    /// Projection of the centred samples onto component `k` (0-based)
    pub fn scores(&self, k: usize) -> Option<Vec<f64>> {
        let component = self.components.get(k)?;
        Some((&self.centered * component).iter().copied().collect())
    }
}

/// Decompose equal-length columns.
///
/// Returns `None` for degenerate input: fewer samples than channels, zero
/// total variance, or non-finite samples.
pub fn principal_components(columns: &[&[f64]]) -> Option<PcaResult> {
    let channels = columns.len();
    let samples = columns.first().map_or(0, |c| c.len());
    if channels == 0 || samples < channels || samples < 2 {
        return None;
    }

    let centered = centered_matrix(columns, samples)?;
    let covariance = centered.transpose() * &centered / (samples as f64 - 1.0);
    if covariance.trace() <= 0.0 {
        return None;
    }

    let eigen = SymmetricEigen::new(covariance);

    let mut pairs: Vec<(f64, DVector<f64>)> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(i, &v)| (v, eigen.eigenvectors.column(i).into_owned()))
        .collect();
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let (eigenvalues, components): (Vec<f64>, Vec<DVector<f64>>) = pairs
        .into_iter()
        .map(|(value, vector)| (value, orient(vector)))
        .unzip();

    Some(PcaResult {
        eigenvalues,
        components,
        centered,
    })
}

/// Samples-by-channels matrix with each column mean removed
fn centered_matrix(columns: &[&[f64]], samples: usize) -> Option<DMatrix<f64>> {
    let mut matrix = DMatrix::<f64>::zeros(samples, columns.len());
    for (j, column) in columns.iter().enumerate() {
        if column.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let mean = column.iter().sum::<f64>() / samples as f64;
        for (i, &v) in column.iter().enumerate() {
            matrix[(i, j)] = v - mean;
        }
    }
    Some(matrix)
}

/// Flip a component so its largest-magnitude loading is positive
fn orient(vector: DVector<f64>) -> DVector<f64> {
    let dominant = vector
        .iter()
        .copied()
        .fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
    if dominant < 0.0 {
        -vector
    } else {
        vector
    }
}

/// Appends the leading principal components of a channel group
#[derive(Debug, Clone)]
pub struct PrincipalComponents {
    name: String,
    config: PcaConfig,
    band: Option<Band>,
}

impl PrincipalComponents {
    pub fn new(config: PcaConfig) -> WamResult<Self> {
        config.validate()?;

        // Components inherit the band when every source shares one.
        let first = config.source[0].band();
        let band = if config.source.iter().all(|id| id.band() == first) {
            first
        } else {
            None
        };

        let name = match band {
            Some(band) => format!("pca_{band}"),
            None => "pca".to_string(),
        };

        Ok(PrincipalComponents { name, config, band })
    }

    fn component_id(&self, rank: usize) -> ChannelId {
        ChannelId::Principal {
            rank,
            band: self.band,
        }
    }
}

impl ChannelStage for PrincipalComponents {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: &ChannelSet) -> WamResult<ChannelSet> {
        let columns = self
            .config
            .source
            .iter()
            .map(|id| input.samples(id))
            .collect::<WamResult<Vec<_>>>()?;

        let derived = match principal_components(&columns) {
            Some(result) => (0..self.config.n_components)
                .filter_map(|k| {
                    let scores = result.scores(k)?;
                    Some(Channel::new(self.component_id(k + 1), scores))
                })
                .collect(),
            None => {
                tracing::debug!(stage = %self.name, "degenerate input, components are undefined");
                (1..=self.config.n_components)
                    .map(|rank| Channel::new(self.component_id(rank), vec![f64::NAN; input.len()]))
                    .collect()
            }
        };

        input.with_channels(derived)
    }

    fn inputs(&self) -> Vec<ChannelId> {
        self.config.source.clone()
    }

    fn outputs(&self) -> Vec<ChannelId> {
        (1..=self.config.n_components)
            .map(|rank| self.component_id(rank))
            .collect()
    }

    fn stage_type(&self) -> StageType {
        StageType::DimensionalityReduction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use wam_core::Axis;

    fn set_of(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> ChannelSet {
        ChannelSet::new(
            50.0,
            vec![
                Channel::new(ChannelId::Axis(Axis::X), x),
                Channel::new(ChannelId::Axis(Axis::Y), y),
                Channel::new(ChannelId::Axis(Axis::Z), z),
            ],
        )
        .unwrap()
    }

    fn raw_axes() -> Vec<ChannelId> {
        Axis::ALL.iter().map(|&a| ChannelId::Axis(a)).collect()
    }

    #[test]
    fn test_triplicated_channel() {
        let signal: Vec<f64> = (0..200).map(|i| (i as f64 * 0.21).sin() + 0.3).collect();
        let set = set_of(signal.clone(), signal.clone(), signal.clone());

        let stage = PrincipalComponents::new(PcaConfig::new(raw_axes())).unwrap();
        let output = stage.apply(&set).unwrap();
        let pc1 = output
            .samples(&ChannelId::Principal { rank: 1, band: None })
            .unwrap();

        let mean = signal.iter().sum::<f64>() / signal.len() as f64;
        for (p, s) in pc1.iter().zip(&signal) {
            assert_abs_diff_eq!(*p, (s - mean) * 3f64.sqrt(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_dominant_axis_orientation() {
        let x: Vec<f64> = (0..300).map(|i| 5.0 * (i as f64 * 0.1).sin()).collect();
        let y: Vec<f64> = (0..300).map(|i| 0.1 * (i as f64 * 0.37).cos()).collect();
        let z = vec![1.0; 300];

        let result = principal_components(&[&x, &y, &z]).unwrap();
        assert!(result.eigenvalues[0] >= result.eigenvalues[1]);
        assert!(result.eigenvalues[1] >= result.eigenvalues[2]);
        assert!(result.components[0][0] > 0.99);

        // Flipping the input flips the scores, not the loadings.
        let negated: Vec<f64> = x.iter().map(|v| -v).collect();
        let flipped = principal_components(&[&negated, &y, &z]).unwrap();
        assert!(flipped.components[0][0] > 0.99);
    }

    #[test]
    fn test_degenerate_input_is_undefined() {
        let set = set_of(vec![1.0; 50], vec![2.0; 50], vec![3.0; 50]);
        let stage = PrincipalComponents::new(PcaConfig::new(raw_axes())).unwrap();
        let output = stage.apply(&set).unwrap();
        let pc1 = output
            .samples(&ChannelId::Principal { rank: 1, band: None })
            .unwrap();
        assert!(pc1.iter().all(|v| v.is_nan()));

        let short = set_of(vec![1.0, 2.0], vec![0.0, 1.0], vec![3.0, 1.0]);
        let output = stage.apply(&short).unwrap();
        assert_eq!(output.channel_count(), 4);
        assert!(output
            .samples(&ChannelId::Principal { rank: 1, band: None })
            .unwrap()
            .iter()
            .all(|v| v.is_nan()));
    }

    #[test]
    fn test_band_is_inherited() {
        let band = Band::new(3.5, 7.5);
        let sources = Axis::ALL
            .iter()
            .map(|&a| ChannelId::band_passed(a, band))
            .collect();
        let stage = PrincipalComponents::new(PcaConfig::new(sources)).unwrap();
        assert_eq!(stage.outputs()[0].to_string(), "PC1_[3.5, 7.5]");

        let mixed = PrincipalComponents::new(PcaConfig::new(vec![
            ChannelId::band_passed(Axis::X, band),
            ChannelId::Axis(Axis::Y),
        ]))
        .unwrap();
        assert_eq!(mixed.outputs()[0].to_string(), "PC1");
    }

    #[test]
    fn test_invalid_component_count() {
        let mut config = PcaConfig::new(raw_axes());
        config.n_components = 4;
        assert!(PrincipalComponents::new(config.clone()).is_err());
        config.n_components = 0;
        assert!(PrincipalComponents::new(config).is_err());
    }

    #[test]
    fn test_missing_source_channel() {
        let set = ChannelSet::new(
            50.0,
            vec![Channel::new(ChannelId::Axis(Axis::X), vec![0.0; 10])],
        )
        .unwrap();
        let stage = PrincipalComponents::new(PcaConfig::new(raw_axes())).unwrap();
        assert!(stage.apply(&set).is_err());
    }
}

//! Vector magnitude stage

use crate::processor::{ChannelStage, StageType};
use serde::{Deserialize, Serialize};
use wam_core::{config_error, Band, Channel, ChannelId, ChannelSet, WamResult};

/// Vector magnitude configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagnitudeConfig {
    /// Channels combined as vector components
    pub source: Vec<ChannelId>,
}

/// Appends `sqrt(sum of squares)` of a channel group as one channel
#[derive(Debug, Clone)]
pub struct VectorMagnitude {
    source: Vec<ChannelId>,
    output: ChannelId,
    name: String,
}

impl VectorMagnitude {
    pub fn new(config: MagnitudeConfig) -> WamResult<Self> {
        let first = match config.source.first() {
            Some(id) => id.band(),
            None => return Err(config_error!("vector magnitude needs source channels")),
        };
        let band: Option<Band> = config
            .source
            .iter()
            .all(|id| id.band() == first)
            .then_some(first)
            .flatten();

        let output = ChannelId::Magnitude { band };
        Ok(VectorMagnitude {
            name: format!("magnitude_{output}"),
            source: config.source,
            output,
        })
    }

    pub fn output(&self) -> ChannelId {
        self.output
    }
}

/// Pointwise Euclidean norm of equal-length columns
pub fn vector_magnitude(columns: &[&[f64]]) -> Vec<f64> {
    let len = columns.first().map_or(0, |c| c.len());
    (0..len)
        .map(|i| columns.iter().map(|c| c[i] * c[i]).sum::<f64>().sqrt())
        .collect()
}

impl ChannelStage for VectorMagnitude {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: &ChannelSet) -> WamResult<ChannelSet> {
        let columns = self
            .source
            .iter()
            .map(|id| input.samples(id))
            .collect::<WamResult<Vec<_>>>()?;

        input.with_channels(vec![Channel::new(self.output, vector_magnitude(&columns))])
    }

    fn inputs(&self) -> Vec<ChannelId> {
        self.source.clone()
    }

    fn outputs(&self) -> Vec<ChannelId> {
        vec![self.output]
    }

    fn stage_type(&self) -> StageType {
        StageType::Derivation
    }
}

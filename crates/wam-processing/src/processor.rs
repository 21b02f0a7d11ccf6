//! Core channel stage trait and types

use serde::{Deserialize, Serialize};
use wam_core::{ChannelId, ChannelSet, WamResult};

/// Core trait for all channel-deriving stages.
///
/// A stage reads channels from an immutable [`ChannelSet`] and returns a
/// new set with its derived channels appended. Stages hold no mutable
/// state, so one instance can be applied to any number of recordings that
/// share its sampling rate.
pub trait ChannelStage: Send + Sync {
    /// Get stage name/identifier
    fn name(&self) -> &str;

    /// Derive new channels from `input`
    fn apply(&self, input: &ChannelSet) -> WamResult<ChannelSet>;

    /// Channels this stage reads
    fn inputs(&self) -> Vec<ChannelId>;

    /// Channels this stage appends, in order
    fn outputs(&self) -> Vec<ChannelId>;

    /// Get stage type for pipeline organization
    fn stage_type(&self) -> StageType {
        StageType::Filter
    }
}

/// Types of channel stages for pipeline organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageType {
    /// Band-limiting filters
    Filter,
    /// Principal component projection
    DimensionalityReduction,
    /// Pointwise combinations such as vector magnitude
    Derivation,
}

/// Apply stages in order, threading the channel set through
pub fn apply_stages(
    stages: &[Box<dyn ChannelStage>],
    input: &ChannelSet,
) -> WamResult<ChannelSet> {
    let mut current = input.clone();
    for stage in stages {
        tracing::trace!(stage = stage.name(), kind = ?stage.stage_type(), "applying stage");
        current = stage.apply(&current)?;
    }
    Ok(current)
}

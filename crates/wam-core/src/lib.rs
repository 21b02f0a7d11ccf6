//! WAM-Core: Foundation types for wrist accelerometer movement features
//!
//! Raw recordings, structured channel identifiers, the immutable channel set
//! passed between pipeline stages, and the windows-by-features table.

pub mod channel;
pub mod error;
pub mod recording;
pub mod table;

pub use channel::{Axis, Band, Channel, ChannelId, ChannelSet};
pub use error::{WamError, WamResult};
pub use recording::{AccelSample, Recording};
pub use table::{FeatureKey, FeatureKind, FeatureRow, FeatureTable, FeatureTableBuilder, FeatureTarget};

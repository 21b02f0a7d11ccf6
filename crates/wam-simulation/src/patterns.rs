//! Movement patterns for synthetic wrist acceleration

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Wrist movement pattern, producing dynamic acceleration in g
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum MovementPattern {
    /// Wrist at rest: gravity and sensor noise only
    Rest,
    /// Resting tremor oscillation (typically 3.5-7.5 Hz)
    Tremor { frequency: f64, amplitude: f64 },
    /// Walking: heel strikes at `cadence` steps per minute plus arm swing
    Gait { cadence: f64, amplitude: f64 },
    /// Slow voluntary reaching movements
    Voluntary { frequency: f64, amplitude: f64 },
    /// Fixed acceleration on every axis
    Constant { x: f64, y: f64, z: f64 },
}

impl MovementPattern {
    /// Typical parkinsonian resting tremor
    pub fn resting_tremor() -> Self {
        MovementPattern::Tremor {
            frequency: 5.0,
            amplitude: 0.15,
        }
    }

    /// Normal walking pace
    pub fn walking() -> Self {
        MovementPattern::Gait {
            cadence: 110.0,
            amplitude: 0.3,
        }
    }

    /// Deliberate hand movement
    pub fn reaching() -> Self {
        MovementPattern::Voluntary {
            frequency: 0.8,
            amplitude: 0.25,
        }
    }

    /// Dynamic acceleration `[x, y, z]` at time `t` seconds
    pub fn acceleration_at_time(&self, t: f64) -> [f64; 3] {
        match *self {
            MovementPattern::Rest => [0.0; 3],

            MovementPattern::Tremor { frequency, amplitude } => {
                let phase = 2.0 * PI * frequency * t;
                [
                    amplitude * phase.sin(),
                    0.6 * amplitude * (phase + PI / 3.0).sin(),
                    0.3 * amplitude * (phase + PI / 2.0).sin(),
                ]
            }

            MovementPattern::Gait { cadence, amplitude } => {
                let step = cadence / 60.0;
                let stride = 2.0 * PI * step * t;
                // Arm swing runs at half the step rate.
                let swing = 2.0 * PI * (step / 2.0) * t;
                [
                    amplitude * swing.sin(),
                    0.4 * amplitude * (swing + PI / 4.0).sin(),
                    0.7 * amplitude * stride.sin() + 0.2 * amplitude * (2.0 * stride).sin(),
                ]
            }

            MovementPattern::Voluntary { frequency, amplitude } => {
                let phase = 2.0 * PI * frequency * t;
                // Raised-cosine envelope: movements separated by pauses.
                let envelope = 0.5 * (1.0 - (phase / 4.0).cos());
                [
                    amplitude * envelope * phase.sin(),
                    0.8 * amplitude * envelope * phase.cos(),
                    0.3 * amplitude * envelope * (phase / 2.0).sin(),
                ]
            }

            MovementPattern::Constant { x, y, z } => [x, y, z],
        }
    }

    /// Get pattern description
    pub fn description(&self) -> String {
        match self {
            MovementPattern::Rest => "Wrist at rest".to_string(),
            MovementPattern::Tremor { frequency, amplitude } => {
                format!("Tremor: {frequency:.1} Hz, {amplitude:.2} g")
            }
            MovementPattern::Gait { cadence, amplitude } => {
                format!("Gait: {cadence:.0} steps/min, {amplitude:.2} g")
            }
            MovementPattern::Voluntary { frequency, amplitude } => {
                format!("Voluntary movement: {frequency:.1} Hz, {amplitude:.2} g")
            }
            MovementPattern::Constant { x, y, z } => format!("Constant: [{x}, {y}, {z}] g"),
        }
    }
}

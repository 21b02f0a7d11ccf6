//! WAM-Simulation: synthetic wrist accelerometer recordings
//!
//! Seeded generators for rest, tremor, gait and voluntary movement, used by
//! tests, benchmarks and the command line demo.

pub mod patterns;
pub mod simulator;

pub use patterns::MovementPattern;
pub use simulator::{simulate, AccelSimulator, SimulationConfig};

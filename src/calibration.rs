//! Calibration utilities for the ultrasonic range channel.
//!
//! Fits environmental models from a measured table and applies them to
//! raw distances the way the firmware does.

mod compensation;
mod fitting;
mod regression;

pub use compensation::{
    CompensationModel, DistanceCoefficients, RangeCompensator, SpeedCoefficients,
    raw_to_time_of_flight,
};
pub use fitting::{
    CalibrationSample, DistanceFit, DistanceFitMetrics, DistancePrediction, SpeedOfSoundFit,
    load_samples,
};
pub use regression::{LeastSquaresFit, least_squares, r_squared};

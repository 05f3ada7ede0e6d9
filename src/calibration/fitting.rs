//! Calibration model fitting from measured tables.
//!
//! Two models are fitted against reference distances measured alongside the
//! instrument's time of flight and environmental readings:
//!
//! - speed of sound: `c - c0 = a_t·Δt + a_rh·Δrh + a_p·Δp`
//! - distance: `d = a0 + a1·tof + b0·Δt·tof + b1·Δrh·tof + b2·Δp·tof`
//!
//! Humidity enters both models as a fraction (percent / 100).

use super::compensation::{DistanceCoefficients, SpeedCoefficients};
use super::regression::{LeastSquaresFit, least_squares};
use crate::config::{CalibrationColumns, ReferencePoint};
use crate::error::{Result, SensorLogError};
use crate::table::NumericTable;
use tracing::info;

/// One row of a calibration table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSample {
    /// Reference distance (mm)
    pub real_distance: f64,
    /// Round-trip time of flight (ns)
    pub time_of_flight: f64,
    /// Temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Pressure (kPa)
    pub pressure: f64,
}

impl CalibrationSample {
    /// Measured speed of sound in m/s
    pub fn speed_of_sound(&self) -> f64 {
        self.real_distance / self.time_of_flight * 1e9 * 2.0 / 1000.0
    }

    fn deltas(&self, reference: &ReferencePoint) -> (f64, f64, f64) {
        (
            self.temperature - reference.temperature,
            self.humidity / 100.0 - reference.humidity,
            self.pressure - reference.pressure,
        )
    }
}

/// Load every complete row of a calibration table
pub fn load_samples(
    table: &NumericTable,
    columns: &CalibrationColumns,
) -> Result<Vec<CalibrationSample>> {
    let names = [
        columns.real_distance.as_str(),
        columns.time_of_flight.as_str(),
        columns.temperature.as_str(),
        columns.humidity.as_str(),
        columns.pressure.as_str(),
    ];

    let samples: Vec<CalibrationSample> = table
        .complete_rows(&names)?
        .into_iter()
        .map(|row| CalibrationSample {
            real_distance: row[0],
            time_of_flight: row[1],
            temperature: row[2],
            humidity: row[3],
            pressure: row[4],
        })
        .collect();

    if let Some(bad) = samples.iter().position(|s| s.time_of_flight == 0.0) {
        return Err(SensorLogError::Configuration {
            message: format!("Calibration row {} has a zero time of flight", bad + 1),
        });
    }

    info!("Loaded {} calibration samples", samples.len());
    Ok(samples)
}

/// Fitted speed-of-sound model
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedOfSoundFit {
    pub coefficients: SpeedCoefficients,
    pub reference: ReferencePoint,
    pub r_squared: f64,
}

impl SpeedOfSoundFit {
    pub fn fit(samples: &[CalibrationSample], reference: ReferencePoint) -> Result<Self> {
        let design: Vec<Vec<f64>> = samples
            .iter()
            .map(|s| {
                let (dt, drh, dp) = s.deltas(&reference);
                vec![dt, drh, dp]
            })
            .collect();
        let target: Vec<f64> = samples
            .iter()
            .map(|s| s.speed_of_sound() - reference.speed_of_sound)
            .collect();

        let fit = least_squares(&design, &target)?;
        let coefficients = SpeedCoefficients {
            a_t: fit.coefficients[0],
            a_rh: fit.coefficients[1],
            a_p: fit.coefficients[2],
        };

        Ok(Self {
            coefficients,
            reference,
            r_squared: fit.r_squared,
        })
    }

    /// Predicted speed of sound (m/s); humidity in percent
    pub fn predict(&self, temperature: f64, humidity: f64, pressure: f64) -> f64 {
        let r = &self.reference;
        let c = &self.coefficients;
        r.speed_of_sound
            + c.a_t * (temperature - r.temperature)
            + c.a_rh * (humidity / 100.0 - r.humidity)
            + c.a_p * (pressure - r.pressure)
    }
}

/// Prediction for one calibration row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistancePrediction {
    pub actual: f64,
    pub predicted: f64,
    pub residual: f64,
    /// |residual / actual| in percent
    pub relative_error: f64,
}

/// Error summary of a distance fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceFitMetrics {
    pub r_squared: f64,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mean_relative_error: f64,
    pub max_relative_error: f64,
}

/// Fitted direct distance model
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceFit {
    pub coefficients: DistanceCoefficients,
    pub reference: ReferencePoint,
    pub metrics: DistanceFitMetrics,
    pub predictions: Vec<DistancePrediction>,
}

impl DistanceFit {
    pub fn fit(samples: &[CalibrationSample], reference: ReferencePoint) -> Result<Self> {
        let design: Vec<Vec<f64>> = samples
            .iter()
            .map(|s| {
                let (dt, drh, dp) = s.deltas(&reference);
                let tof = s.time_of_flight;
                vec![1.0, tof, dt * tof, drh * tof, dp * tof]
            })
            .collect();
        let target: Vec<f64> = samples.iter().map(|s| s.real_distance).collect();

        let fit = least_squares(&design, &target)?;
        let predictions = predictions(&fit, &target);
        let metrics = metrics(&fit, &predictions);

        let coefficients = DistanceCoefficients {
            a0: fit.coefficients[0],
            a1: fit.coefficients[1],
            b0: fit.coefficients[2],
            b1: fit.coefficients[3],
            b2: fit.coefficients[4],
        };

        Ok(Self {
            coefficients,
            reference,
            metrics,
            predictions,
        })
    }
}

fn predictions(fit: &LeastSquaresFit, target: &[f64]) -> Vec<DistancePrediction> {
    target
        .iter()
        .zip(&fit.fitted)
        .map(|(&actual, &predicted)| {
            let residual = actual - predicted;
            DistancePrediction {
                actual,
                predicted,
                residual,
                relative_error: (residual / actual).abs() * 100.0,
            }
        })
        .collect()
}

fn metrics(fit: &LeastSquaresFit, predictions: &[DistancePrediction]) -> DistanceFitMetrics {
    let n = predictions.len().max(1) as f64;
    let mse = predictions.iter().map(|p| p.residual.powi(2)).sum::<f64>() / n;
    let mae = predictions.iter().map(|p| p.residual.abs()).sum::<f64>() / n;
    let mean_relative_error = predictions.iter().map(|p| p.relative_error).sum::<f64>() / n;
    let max_relative_error = predictions
        .iter()
        .map(|p| p.relative_error)
        .fold(0.0_f64, f64::max);

    DistanceFitMetrics {
        r_squared: fit.r_squared,
        mse,
        rmse: mse.sqrt(),
        mae,
        mean_relative_error,
        max_relative_error,
    }
}

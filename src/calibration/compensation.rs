//! Environmental range compensation as performed on the device.
//!
//! The firmware reports a raw distance computed with a fixed speed of
//! sound. Compensation recovers the time of flight from that distance and
//! re-derives the range from either a speed-of-sound model or a direct
//! distance model.

use crate::config::ReferencePoint;
use crate::constants::device_reference::RAW_DISTANCE_SPEED_MM_S;
use serde::{Deserialize, Serialize};

/// Speed-of-sound sensitivities: m/s per °C, per unit humidity fraction,
/// per kPa
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedCoefficients {
    pub a_t: f64,
    pub a_rh: f64,
    pub a_p: f64,
}

/// Direct distance model coefficients:
/// `d = a0 + a1·tof + b0·Δt·tof + b1·Δrh·tof + b2·Δp·tof`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceCoefficients {
    pub a0: f64,
    pub a1: f64,
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
}

/// Which model a compensator applies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CompensationModel {
    Speed(SpeedCoefficients),
    Distance(DistanceCoefficients),
}

/// Converts raw ultrasonic distances to environment-compensated ones
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeCompensator {
    model: CompensationModel,
    reference: ReferencePoint,
}

impl RangeCompensator {
    pub fn new(model: CompensationModel, reference: ReferencePoint) -> Self {
        Self { model, reference }
    }

    /// Compensator using the firmware's reference point
    pub fn device(model: CompensationModel) -> Self {
        Self::new(model, ReferencePoint::device())
    }

    pub fn model(&self) -> &CompensationModel {
        &self.model
    }

    /// Speed of sound in mm/s for the given conditions.
    ///
    /// Humidity is in percent. Only meaningful for the speed model; the
    /// distance model has no explicit speed and returns `None`.
    pub fn speed_of_sound(&self, temperature: f64, humidity: f64, pressure: f64) -> Option<f64> {
        match self.model {
            CompensationModel::Speed(c) => {
                Some(self.speed_mm_s(&c, temperature, humidity, pressure))
            }
            CompensationModel::Distance(_) => None,
        }
    }

    fn speed_mm_s(
        &self,
        c: &SpeedCoefficients,
        temperature: f64,
        humidity: f64,
        pressure: f64,
    ) -> f64 {
        let r = &self.reference;
        let speed = r.speed_of_sound
            + c.a_t * (temperature - r.temperature)
            + c.a_rh * (humidity - r.humidity) / 100.0
            + c.a_p * (pressure - r.pressure);
        speed * 1000.0
    }

    /// Compensated distance (mm) for a raw distance (mm)
    pub fn compensate(
        &self,
        raw_distance: f64,
        temperature: f64,
        humidity: f64,
        pressure: f64,
    ) -> f64 {
        let tof_ns = raw_to_time_of_flight(raw_distance);
        let r = &self.reference;
        let delta_t = temperature - r.temperature;
        let delta_rh = humidity - r.humidity;
        let delta_p = pressure - r.pressure;

        match self.model {
            CompensationModel::Speed(c) => {
                tof_ns * 1e-9 * self.speed_mm_s(&c, temperature, humidity, pressure) / 2.0
            }
            CompensationModel::Distance(c) => {
                c.a0 + c.a1 * tof_ns
                    + c.b0 * delta_t * tof_ns
                    + c.b1 * delta_rh * tof_ns / 100.0
                    + c.b2 * delta_p * tof_ns
            }
        }
    }
}

/// Round-trip time of flight (ns) implied by a raw firmware distance (mm)
pub fn raw_to_time_of_flight(raw_distance: f64) -> f64 {
    raw_distance * 2.0 / RAW_DISTANCE_SPEED_MM_S * 1e9
}

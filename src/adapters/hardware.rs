//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`DistanceSensor`] and the [`ServoDriver`], exposing them
//! through [`SensorPort`] and [`ActuatorPort`].  This is the only module
//! in the system that touches the sensor and servo.  The drivers are
//! generic over `embedded-hal`, so on non-espidf targets the adapter runs
//! against simulated pins.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use log::{info, warn};

use crate::app::ports::{ActuatorPort, DistanceReading, MonotonicClock, SensorPort};
use crate::drivers::servo::ServoDriver;
use crate::error::{ActuatorError, SensorError};
use crate::sensors::distance::DistanceSensor;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<T, E, D, C, P> {
    sensor: DistanceSensor<T, E, D, C>,
    servo: ServoDriver<P>,
}

impl<T, E, D, C, P> HardwareAdapter<T, E, D, C, P>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: MonotonicClock,
    P: SetDutyCycle,
{
    pub fn new(sensor: DistanceSensor<T, E, D, C>, servo: ServoDriver<P>) -> Self {
        Self { sensor, servo }
    }

    /// Last angle the servo was commanded to.
    pub fn servo_angle(&self) -> Option<u8> {
        self.servo.angle()
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<T, E, D, C, P> SensorPort for HardwareAdapter<T, E, D, C, P>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: MonotonicClock,
    P: SetDutyCycle,
{
    fn measure_distance(&mut self) -> Result<DistanceReading, SensorError> {
        self.sensor.measure()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<T, E, D, C, P> ActuatorPort for HardwareAdapter<T, E, D, C, P>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: MonotonicClock,
    P: SetDutyCycle,
{
    fn move_to(&mut self, angle: i16) -> Result<(), ActuatorError> {
        let applied = self.servo.set_angle(angle)?;
        if i16::from(applied) == angle {
            info!("Servo: -> {}°", applied);
        } else {
            warn!("Servo: {}° out of range, clamped to {}°", angle, applied);
        }
        Ok(())
    }
}

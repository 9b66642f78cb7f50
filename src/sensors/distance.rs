//! HC-SR04 ultrasonic distance sensor driver.
//!
//! A measurement is a 10 µs HIGH pulse on TRIG; the sensor answers with a
//! HIGH pulse on ECHO whose width is the sound round-trip time.  At
//! ~343 m/s that is 58 µs per centimetre of distance.
//!
//! ```text
//! TRIG  __|‾‾‾‾‾‾‾‾‾‾|_____________________________
//!          <- 10 µs ->
//! ECHO  _____________________|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾|_____
//!                             <-  58 µs/cm  ->
//! ```
//!
//! The driver is generic over `embedded-hal` pins and delay plus the
//! firmware's [`MonotonicClock`], so the same code runs against
//! `esp-idf-hal` `PinDriver`s on the device and simulated pins in tests.
//! No rate limiting happens here; the control loop decides when to sample.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::{DistanceReading, MonotonicClock};
use crate::error::SensorError;

/// Settle time with TRIG held LOW before the trigger pulse.
const TRIG_SETTLE_US: u32 = 2;
/// Width of the trigger pulse.
const TRIG_PULSE_US: u32 = 10;

pub struct DistanceSensor<T, E, D, C> {
    trig: T,
    echo: E,
    delay: D,
    clock: C,
    us_per_cm: u32,
    timeout_us: u32,
}

impl<T, E, D, C> DistanceSensor<T, E, D, C>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: MonotonicClock,
{
    pub fn new(trig: T, echo: E, delay: D, clock: C, us_per_cm: u32, timeout_us: u32) -> Self {
        Self {
            trig,
            echo,
            delay,
            clock,
            us_per_cm: us_per_cm.max(1),
            timeout_us,
        }
    }

    /// Fire one ping and convert the echo width to centimetres.
    ///
    /// Blocks for at most `timeout_us` plus the trigger sequence.  A missing
    /// echo is [`SensorError::EchoTimeout`], never a 0 cm reading.
    pub fn measure(&mut self) -> Result<DistanceReading, SensorError> {
        self.trig
            .set_low()
            .map_err(|_| SensorError::GpioWriteFailed)?;
        self.delay.delay_us(TRIG_SETTLE_US);
        self.trig
            .set_high()
            .map_err(|_| SensorError::GpioWriteFailed)?;
        self.delay.delay_us(TRIG_PULSE_US);
        self.trig
            .set_low()
            .map_err(|_| SensorError::GpioWriteFailed)?;

        let echo_us = self.pulse_in()?;

        Ok(DistanceReading {
            distance_cm: echo_us / self.us_per_cm,
            timestamp_ms: self.clock.now_ms(),
        })
    }

    /// Width of the next HIGH pulse on ECHO in microseconds.
    ///
    /// Waits for any pulse already in progress to finish, then for the
    /// rising edge, then times until the falling edge.  The whole wait is
    /// bounded by one timeout.
    fn pulse_in(&mut self) -> Result<u32, SensorError> {
        let deadline = self.clock.now_us() + u64::from(self.timeout_us);

        while self.echo_high()? {
            self.check_deadline(deadline)?;
        }
        while !self.echo_high()? {
            self.check_deadline(deadline)?;
        }
        let rise_us = self.clock.now_us();
        while self.echo_high()? {
            self.check_deadline(deadline)?;
        }
        let fall_us = self.clock.now_us();

        Ok(fall_us.saturating_sub(rise_us) as u32)
    }

    fn echo_high(&mut self) -> Result<bool, SensorError> {
        self.echo.is_high().map_err(|_| SensorError::GpioReadFailed)
    }

    fn check_deadline(&self, deadline: u64) -> Result<(), SensorError> {
        if self.clock.now_us() >= deadline {
            Err(SensorError::EchoTimeout)
        } else {
            Ok(())
        }
    }
}

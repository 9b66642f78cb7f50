//! Hobby servo driver (SG90 or compatible) on one LEDC PWM channel.
//!
//! Standard servos take a 50 Hz frame whose HIGH time encodes the angle.
//! The pulse range matches the common Arduino servo libraries:
//! 544 µs at 0° to 2400 µs at 180°, linearly interpolated.
//!
//! No position feedback exists; a command is fire-and-forget.  Angles
//! outside 0–180 are clamped.
//!
//! ## Dual-target design
//!
//! Generic over `embedded-hal` [`SetDutyCycle`]: on ESP-IDF this is an
//! `esp-idf-hal` `LedcDriver`; on host/test a recording mock.

use embedded_hal::pwm::SetDutyCycle;

use crate::error::ActuatorError;

/// Pulse width at 0°.
pub const MIN_PULSE_US: u32 = 544;
/// Pulse width at 180°.
pub const MAX_PULSE_US: u32 = 2400;
/// Frame period at 50 Hz.
pub const PERIOD_US: u32 = 20_000;
pub const MAX_ANGLE: u8 = 180;

/// HIGH time for `angle` degrees (clamped to 0–180).
pub fn pulse_width_us(angle: u8) -> u32 {
    let angle = u32::from(angle.min(MAX_ANGLE));
    MIN_PULSE_US + angle * (MAX_PULSE_US - MIN_PULSE_US) / u32::from(MAX_ANGLE)
}

pub struct ServoDriver<P> {
    pwm: P,
    angle: Option<u8>,
}

impl<P: SetDutyCycle> ServoDriver<P> {
    /// Wrap a PWM channel already configured for a 50 Hz frame.  The servo
    /// is not moved until the first [`set_angle`](Self::set_angle).
    pub fn new(pwm: P) -> Self {
        Self { pwm, angle: None }
    }

    /// Command `angle` degrees.  Returns the angle actually applied after
    /// clamping.
    pub fn set_angle(&mut self, angle: i16) -> Result<u8, ActuatorError> {
        let clamped = angle.clamp(0, i16::from(MAX_ANGLE)) as u8;
        self.pwm
            .set_duty_cycle_fraction(pulse_width_us(clamped) as u16, PERIOD_US as u16)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.angle = Some(clamped);
        Ok(clamped)
    }

    /// Last commanded angle, `None` before the first successful move.
    pub fn angle(&self) -> Option<u8> {
        self.angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::pwm::{ErrorKind, ErrorType};

    /// 14-bit LEDC channel that records every duty write.
    #[derive(Default)]
    struct MockPwm {
        duties: Vec<u16>,
    }

    impl ErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            (1 << 14) - 1
        }
        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.duties.push(duty);
            Ok(())
        }
    }

    struct FailingPwm;

    impl ErrorType for FailingPwm {
        type Error = ErrorKind;
    }

    impl SetDutyCycle for FailingPwm {
        fn max_duty_cycle(&self) -> u16 {
            255
        }
        fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), ErrorKind> {
            Err(ErrorKind::Other)
        }
    }

    #[test]
    fn pulse_width_endpoints() {
        assert_eq!(pulse_width_us(0), 544);
        assert_eq!(pulse_width_us(90), 1472);
        assert_eq!(pulse_width_us(180), 2400);
        assert_eq!(pulse_width_us(255), 2400);
    }

    #[test]
    fn set_angle_writes_scaled_duty() {
        let mut servo = ServoDriver::new(MockPwm::default());
        assert_eq!(servo.angle(), None);

        assert_eq!(servo.set_angle(90), Ok(90));
        assert_eq!(servo.angle(), Some(90));
        assert_eq!(servo.pwm.duties, vec![(1472u32 * 16383 / 20_000) as u16]);
    }

    #[test]
    fn out_of_range_angles_clamp() {
        let mut servo = ServoDriver::new(MockPwm::default());
        assert_eq!(servo.set_angle(-30), Ok(0));
        assert_eq!(servo.set_angle(999), Ok(180));
    }

    #[test]
    fn pwm_failure_is_reported() {
        let mut servo = ServoDriver::new(FailingPwm);
        assert_eq!(servo.set_angle(10), Err(ActuatorError::PwmWriteFailed));
        assert_eq!(servo.angle(), None);
    }
}

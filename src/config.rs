//! System configuration parameters
//!
//! All tunable parameters for the ROBOBOB controller.  The firmware has no
//! persistent storage: [`SystemConfig::default()`] is the configuration
//! compiled into the binary.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- BLE ---
    /// Advertised GAP device name
    pub device_name: heapless::String<24>,
    /// Advertising TX power in dBm (mapped to the nearest ESP power level)
    pub adv_tx_power_dbm: i8,

    // --- Proximity ---
    /// Distance (cm) at or below which the proximity command fires
    pub trigger_distance_cm: u32,
    /// Servo angle commanded when an obstacle comes within range
    pub proximity_angle: i16,
    /// Servo angle commanded once the obstacle moves away again
    pub release_angle: i16,

    // --- Ultrasonic sensor ---
    /// Echo pulse microseconds per centimetre of distance (round trip)
    pub us_per_cm: u32,
    /// Give up waiting for an echo after this many microseconds
    pub echo_timeout_us: u32,

    // --- Timing ---
    /// Minimum spacing between distance samples (milliseconds)
    pub sample_interval_ms: u32,
    /// Time the loop stays busy after each servo move (milliseconds)
    pub settle_ms: u32,
    /// Outer loop poll period (milliseconds)
    pub loop_interval_ms: u32,
    /// Task watchdog timeout (milliseconds)
    pub watchdog_timeout_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str("ROBOBOB");

        Self {
            // BLE
            device_name,
            adv_tx_power_dbm: 9,

            // Proximity
            trigger_distance_cm: 7,
            proximity_angle: 90,
            release_angle: 0,

            // Ultrasonic sensor
            us_per_cm: 58,
            echo_timeout_us: 30_000, // ~5 m, beyond HC-SR04 range

            // Timing
            sample_interval_ms: 200,
            settle_ms: 1000,
            loop_interval_ms: 10,
            watchdog_timeout_ms: 10_000,
        }
    }
}

impl SystemConfig {
    /// Reject values that would stall or break the control loop.
    pub fn validate(&self) -> Result<()> {
        if self.device_name.is_empty() {
            return Err(Error::Config("device_name must not be empty"));
        }
        if self.us_per_cm == 0 {
            return Err(Error::Config("us_per_cm must be non-zero"));
        }
        if self.echo_timeout_us == 0 {
            return Err(Error::Config("echo_timeout_us must be non-zero"));
        }
        if self.sample_interval_ms == 0 || self.loop_interval_ms == 0 {
            return Err(Error::Config("intervals must be non-zero"));
        }
        if !(0..=180).contains(&self.proximity_angle) || !(0..=180).contains(&self.release_angle) {
            return Err(Error::Config("angles must be within 0-180"));
        }
        if self.watchdog_timeout_ms <= self.settle_ms {
            return Err(Error::Config("watchdog_timeout_ms must exceed settle_ms"));
        }
        Ok(())
    }
}

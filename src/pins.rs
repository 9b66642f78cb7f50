//! GPIO / peripheral pin assignments for the ROBOBOB board (Inland ESP32
//! WROOM-32D module).
//!
//! `main` claims the typed `peripherals.pins.gpioN` singletons; the numbers
//! here must match them and are what the boot log reports.

// ---------------------------------------------------------------------------
// Servo (SG90 or compatible hobby servo)
// ---------------------------------------------------------------------------

/// LEDC PWM output driving the servo signal line.
pub const SERVO_GPIO: i32 = 33;
/// Standard hobby-servo frame rate (20 ms period).
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// LEDC timer resolution (bits).  14-bit gives ~1.2 µs per step at 50 Hz.
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 14;

// ---------------------------------------------------------------------------
// HC-SR04 ultrasonic distance sensor
// ---------------------------------------------------------------------------

/// Digital input: echo pulse, HIGH for the round-trip time of flight.
pub const ECHO_GPIO: i32 = 16;
/// Digital output: 10 µs HIGH pulse starts a measurement.
pub const TRIG_GPIO: i32 = 17;

// ---------------------------------------------------------------------------
// UART debug console
// ---------------------------------------------------------------------------

pub const CONSOLE_BAUD: u32 = 115_200;

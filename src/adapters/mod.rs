//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `ble`          | CommandChannelPort | Bluedroid GATT server    |
//! | `hardware`     | SensorPort         | HC-SR04 on GPIO16/17     |
//! |                | ActuatorPort       | Servo on LEDC / GPIO33   |
//! | `log_sink`     | EventSink          | Serial log output        |
//! | `time`         | MonotonicClock     | ESP32 system timer       |

pub mod ble;
pub mod hardware;
pub mod log_sink;
pub mod time;
pub(super) mod utils;

//! ROBOBOB firmware entry point.
//!
//! Hexagonal architecture with a single cooperative polling loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   BleAdapter     Esp32Time     │
//! │  (Sensor+Actuator) (EventSink)    (CommandChan)  (Clock)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ControlLoop (pure logic)                  │    │
//! │  │  sample · arbitrate · actuate · settle                 │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                        ▲                                       │
//! │          CommandMailbox (BLE task ─▶ main loop)                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{info, warn};

use robobob::adapters::ble::{BleAdapter, CommandChannelPort};
use robobob::adapters::hardware::HardwareAdapter;
use robobob::adapters::log_sink::LogEventSink;
use robobob::adapters::time::Esp32TimeAdapter;
use robobob::app::mailbox::CommandMailbox;
use robobob::app::ports::MonotonicClock;
use robobob::app::service::ControlLoop;
use robobob::config::SystemConfig;
use robobob::drivers::servo::ServoDriver;
use robobob::drivers::watchdog::Watchdog;
use robobob::pins;
use robobob::sensors::distance::DistanceSensor;

/// Written by the Bluedroid task, drained by the control loop.
static MAILBOX: CommandMailbox = CommandMailbox::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ROBOBOB v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    info!("Console at {} baud", pins::CONSOLE_BAUD);

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::default();
    config.validate()?;
    match serde_json::to_string(&config) {
        Ok(json) => info!("Config: {}", json),
        Err(e) => warn!("Config: could not serialise ({})", e),
    }

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let clock = Esp32TimeAdapter::new();

    let trig = PinDriver::output(peripherals.pins.gpio17)?;
    let echo = PinDriver::input(peripherals.pins.gpio16)?;
    info!(
        "HC-SR04: TRIG GPIO{}, ECHO GPIO{}",
        pins::TRIG_GPIO,
        pins::ECHO_GPIO
    );

    let servo_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new()
            .frequency(Hertz(pins::SERVO_PWM_FREQ_HZ))
            .resolution(Resolution::Bits14),
    )?;
    let servo_pwm = LedcDriver::new(peripherals.ledc.channel0, &servo_timer, peripherals.pins.gpio33)?;
    info!(
        "Servo: GPIO{} at {} Hz, {}-bit duty",
        pins::SERVO_GPIO,
        pins::SERVO_PWM_FREQ_HZ,
        pins::SERVO_PWM_RESOLUTION_BITS
    );

    let sensor = DistanceSensor::new(
        trig,
        echo,
        Ets,
        clock,
        config.us_per_cm,
        config.echo_timeout_us,
    );
    let mut hw = HardwareAdapter::new(sensor, ServoDriver::new(servo_pwm));

    // ── 4. BLE command channel ────────────────────────────────
    let mut ble = BleAdapter::new(
        config.device_name.clone(),
        config.adv_tx_power_dbm,
        &MAILBOX,
    );
    if let Err(e) = ble.start() {
        // Proximity control still works without the radio.
        warn!("BLE unavailable ({}), continuing with proximity control only", e);
    }

    // ── 5. Control loop ───────────────────────────────────────
    let watchdog = Watchdog::new(config.watchdog_timeout_ms);
    let mut sink = LogEventSink::new();
    let loop_interval_ms = config.loop_interval_ms;
    let mut control = ControlLoop::new(config, &MAILBOX);
    control.start(&mut sink);

    loop {
        control.tick(clock.now_ms(), &mut hw, &mut sink);
        watchdog.feed();
        FreeRtos::delay_ms(loop_interval_ms);
    }
}

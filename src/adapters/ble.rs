//! BLE command channel adapter.
//!
//! Implements [`CommandChannelPort`], the hexagonal boundary for the
//! Bluetooth Low Energy servo command endpoint.  Every write to the
//! command characteristic is parsed as a decimal angle and posted to the
//! shared [`CommandMailbox`]; the control loop picks it up on its next
//! iteration.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via raw
//!   `esp_idf_svc::sys` calls.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Item           | UUID                                     | Perms      |
//! |----------------|------------------------------------------|------------|
//! | Servo service  | `7a2d44ce-a094-46f2-9988-2f8d606e4764`   |            |
//! | Command        | `bb9919db-e7d9-4602-8546-709bd3f8e78a`   | Read+Write |
//!
//! Writes carry ASCII decimal text (`"90"`).  Reads return the fixed
//! [`READ_RESPONSE`]; no state is exposed.

use log::{error, info, warn};

use super::utils::printable_payload;
use crate::app::commands::{parse_command, CommandSource};
use crate::app::mailbox::CommandMailbox;
use crate::error::CommsError;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x7a2d44ce_a094_46f2_9988_2f8d606e4764;
pub const CHAR_COMMAND: u128 = 0xbb9919db_e7d9_4602_8546_709bd3f8e78a;

/// Fixed answer to every GATT read of the command characteristic.
pub const READ_RESPONSE: &[u8] = b"ok";

/// Supported advertising TX power steps on the ESP32 (dBm).
const TX_POWER_STEPS_DBM: [i8; 8] = [-12, -9, -6, -3, 0, 3, 6, 9];

/// Payload limit of a legacy advertising or scan response PDU.
pub const LEGACY_ADV_PAYLOAD_MAX: usize = 31;
/// Length and type bytes in front of every AD structure.
const AD_HEADER_LEN: usize = 2;
/// Flags AD structure (header + one flags byte).
const AD_FLAGS_LEN: usize = AD_HEADER_LEN + 1;

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

pub trait CommandChannelPort {
    /// Bring up the stack, register the service and advertise indefinitely.
    /// One-shot: there is no matching stop.
    fn start(&mut self) -> Result<(), CommsError>;
    fn is_active(&self) -> bool;
    /// Writes received on the command characteristic since boot.
    fn received_count(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Connected,
    Failed,
}

// ───────────────────────────────────────────────────────────────
// Shared write / read handling
// ───────────────────────────────────────────────────────────────

/// Handle one write to the command characteristic: log it, parse it, and
/// post the value.  Malformed payloads post `0`.  Returns the posted value.
///
/// Runs in the Bluedroid task on the device; the mailbox makes the post
/// safe against the control loop.
pub fn handle_command_write(mailbox: &CommandMailbox, raw: &[u8]) -> i16 {
    info!("BLE: write characteristic called");
    match printable_payload(raw) {
        Some(text) => info!("BLE: command received \"{}\"", text),
        None => info!("BLE: command received ({} non-text bytes)", raw.len()),
    }

    let value = parse_command(raw);
    let pending = mailbox.post(value, CommandSource::Wireless);
    if pending > 1 {
        warn!("BLE: {} commands pending, earlier values overwritten", pending);
    }
    value
}

/// Handle a read of the command characteristic.
pub fn handle_command_read() -> &'static [u8] {
    info!("BLE: read received");
    READ_RESPONSE
}

/// Round a requested TX power to the nearest supported step, ties toward
/// the lower power.
pub fn nearest_tx_power_step(dbm: i8) -> i8 {
    TX_POWER_STEPS_DBM
        .iter()
        .copied()
        .min_by_key(|step| (i16::from(*step) - i16::from(dbm)).abs())
        .unwrap_or(0)
}

/// Advertising packet size: flags plus the complete 128-bit service UUID.
/// TX power is not advertised.
pub const fn adv_data_len() -> usize {
    AD_FLAGS_LEN + AD_HEADER_LEN + core::mem::size_of::<u128>()
}

/// Scan response size: the complete device name only.
pub const fn scan_rsp_len(name_len: usize) -> usize {
    AD_HEADER_LEN + name_len
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF Bluedroid glue
// ───────────────────────────────────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures.  These statics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static BLE_CMD_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_WRITE_COUNT: AtomicU32 = AtomicU32::new(0);
/// Mirrors [`BleState`] as `u8` (0 idle, 1 advertising, 2 connected, 3 failed).
#[cfg(target_os = "espidf")]
static BLE_STATE: AtomicU8 = AtomicU8::new(0);
/// Advertising starts once both data sets are acknowledged.
#[cfg(target_os = "espidf")]
static ADV_CONFIG_PENDING: AtomicU8 = AtomicU8::new(0);
#[cfg(target_os = "espidf")]
const ADV_CONFIG_FLAG: u8 = 1 << 0;
#[cfg(target_os = "espidf")]
const SCAN_RSP_CONFIG_FLAG: u8 = 1 << 1;
#[cfg(target_os = "espidf")]
static BLE_MAILBOX: std::sync::OnceLock<&'static CommandMailbox> = std::sync::OnceLock::new();

/// Service UUID in advertising byte order.
#[cfg(target_os = "espidf")]
static ADV_SERVICE_UUID: [u8; 16] = SERVICE_UUID.to_le_bytes();

#[cfg(target_os = "espidf")]
fn state_to_u8(state: BleState) -> u8 {
    match state {
        BleState::Idle => 0,
        BleState::Advertising => 1,
        BleState::Connected => 2,
        BleState::Failed => 3,
    }
}

#[cfg(target_os = "espidf")]
fn state_from_u8(raw: u8) -> BleState {
    match raw {
        1 => BleState::Advertising,
        2 => BleState::Connected,
        3 => BleState::Failed,
        _ => BleState::Idle,
    }
}

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    // SAFETY: esp_bt_uuid_t is a plain C struct; all-zero is valid.
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    t.uuid.uuid128 = uuid.to_le_bytes();
    t
}

#[cfg(target_os = "espidf")]
unsafe fn start_advertising() -> Result<(), CommsError> {
    use esp_idf_svc::sys::*;
    // SAFETY: plain C struct; the remaining fields are valid when zeroed.
    let mut adv_params = esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        ..unsafe { core::mem::zeroed() }
    };
    let ret = unsafe { esp_ble_gap_start_advertising(&mut adv_params) };
    if ret != ESP_OK {
        return Err(CommsError::AdvertisingFailed(ret));
    }
    BLE_STATE.store(state_to_u8(BleState::Advertising), AtomicOrdering::Relaxed);
    Ok(())
}

/// Start (or restart) advertising from a Bluedroid callback.  A failure
/// leaves the adapter `Failed`; proximity control carries on.
#[cfg(target_os = "espidf")]
fn resume_advertising() {
    // SAFETY: only called from Bluedroid callbacks, after stack init.
    if let Err(e) = unsafe { start_advertising() } {
        error!("BLE: {}", e);
        BLE_STATE.store(state_to_u8(BleState::Failed), AtomicOrdering::Relaxed);
    }
}

#[cfg(target_os = "espidf")]
fn adv_config_done(flag: u8) {
    let before = ADV_CONFIG_PENDING.fetch_and(!flag, AtomicOrdering::AcqRel);
    if before & !flag == 0 {
        resume_advertising();
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => {
            adv_config_done(ADV_CONFIG_FLAG);
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
            adv_config_done(SCAN_RSP_CONFIG_FLAG);
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising started");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    // SAFETY: Bluedroid passes a valid param pointer for every event; the
    // union member read below always matches `event`.
    unsafe {
        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                log::info!("BLE GATTS: app registered (if={})", gatts_if);

                ADV_CONFIG_PENDING.store(
                    ADV_CONFIG_FLAG | SCAN_RSP_CONFIG_FLAG,
                    AtomicOrdering::Release,
                );

                // 128-bit UUID in the advertising packet, name in the scan
                // response; a long name beside the UUID exceeds 31 bytes.
                let mut adv_data = esp_ble_adv_data_t {
                    set_scan_rsp: false,
                    include_name: false,
                    include_txpower: false,
                    service_uuid_len: ADV_SERVICE_UUID.len() as u16,
                    p_service_uuid: ADV_SERVICE_UUID.as_ptr().cast_mut(),
                    flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
                    ..core::mem::zeroed()
                };
                let ret = esp_ble_gap_config_adv_data(&mut adv_data);
                if ret != ESP_OK {
                    error!("BLE: {}", CommsError::AdvertisingFailed(ret));
                    BLE_STATE.store(state_to_u8(BleState::Failed), AtomicOrdering::Relaxed);
                }

                let mut scan_rsp = esp_ble_adv_data_t {
                    set_scan_rsp: true,
                    include_name: true,
                    ..core::mem::zeroed()
                };
                let ret = esp_ble_gap_config_adv_data(&mut scan_rsp);
                if ret != ESP_OK {
                    error!("BLE: {}", CommsError::AdvertisingFailed(ret));
                    BLE_STATE.store(state_to_u8(BleState::Failed), AtomicOrdering::Relaxed);
                }

                let mut svc_id = esp_gatt_srvc_id_t {
                    id: esp_gatt_id_t {
                        uuid: uuid128_to_esp(SERVICE_UUID),
                        inst_id: 0,
                    },
                    is_primary: true,
                };
                // Service + characteristic declaration + value.
                esp_ble_gatts_create_service(gatts_if, &mut svc_id, 4);
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let svc_handle = (*param).create.service_handle;
                log::info!("BLE GATTS: service created (handle={})", svc_handle);
                esp_ble_gatts_start_service(svc_handle);

                let mut char_uuid = uuid128_to_esp(CHAR_COMMAND);
                esp_ble_gatts_add_char(
                    svc_handle,
                    &mut char_uuid,
                    (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                    (ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_WRITE)
                        as esp_gatt_char_prop_t,
                    core::ptr::null_mut(),
                    core::ptr::null_mut(),
                );
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                let handle = (*param).add_char.attr_handle;
                BLE_CMD_CHAR_HANDLE.store(u32::from(handle), AtomicOrdering::Relaxed);
                log::info!("BLE GATTS: command char (handle={})", handle);
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let p = &(*param).connect;
                BLE_STATE.store(state_to_u8(BleState::Connected), AtomicOrdering::Relaxed);
                log::info!("BLE GATTS: client connected (conn_id={})", p.conn_id);
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                log::info!("BLE GATTS: client disconnected, re-advertising");
                resume_advertising();
            }
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let p = &(*param).write;
                if u32::from(p.handle) != BLE_CMD_CHAR_HANDLE.load(AtomicOrdering::Relaxed) {
                    return;
                }
                let data = core::slice::from_raw_parts(p.value, usize::from(p.len));
                if let Some(mailbox) = BLE_MAILBOX.get() {
                    handle_command_write(mailbox, data);
                    BLE_WRITE_COUNT.fetch_add(1, AtomicOrdering::Relaxed);
                }
                if p.need_rsp {
                    esp_ble_gatts_send_response(
                        gatts_if,
                        p.conn_id,
                        p.trans_id,
                        esp_gatt_status_t_ESP_GATT_OK,
                        core::ptr::null_mut(),
                    );
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
                let p = &(*param).read;
                if u32::from(p.handle) != BLE_CMD_CHAR_HANDLE.load(AtomicOrdering::Relaxed)
                    || !p.need_rsp
                {
                    return;
                }
                let body = handle_command_read();
                let mut rsp: esp_gatt_rsp_t = core::mem::zeroed();
                rsp.attr_value.handle = p.handle;
                rsp.attr_value.len = body.len() as u16;
                rsp.attr_value.value[..body.len()].copy_from_slice(body);
                esp_ble_gatts_send_response(
                    gatts_if,
                    p.conn_id,
                    p.trans_id,
                    esp_gatt_status_t_ESP_GATT_OK,
                    &mut rsp,
                );
            }
            _ => {}
        }
    }
}

#[cfg(target_os = "espidf")]
fn tx_power_level(dbm: i8) -> esp_idf_svc::sys::esp_power_level_t {
    use esp_idf_svc::sys::*;
    match nearest_tx_power_step(dbm) {
        -12 => esp_power_level_t_ESP_PWR_LVL_N12,
        -9 => esp_power_level_t_ESP_PWR_LVL_N9,
        -6 => esp_power_level_t_ESP_PWR_LVL_N6,
        -3 => esp_power_level_t_ESP_PWR_LVL_N3,
        0 => esp_power_level_t_ESP_PWR_LVL_N0,
        3 => esp_power_level_t_ESP_PWR_LVL_P3,
        6 => esp_power_level_t_ESP_PWR_LVL_P6,
        _ => esp_power_level_t_ESP_PWR_LVL_P9,
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleAdapter {
    #[cfg(not(target_os = "espidf"))]
    state: BleState,
    #[cfg(not(target_os = "espidf"))]
    received: u32,
    device_name: heapless::String<24>,
    tx_power_dbm: i8,
    mailbox: &'static CommandMailbox,
}

impl BleAdapter {
    pub fn new(
        device_name: heapless::String<24>,
        tx_power_dbm: i8,
        mailbox: &'static CommandMailbox,
    ) -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            state: BleState::Idle,
            #[cfg(not(target_os = "espidf"))]
            received: 0,
            device_name,
            tx_power_dbm,
            mailbox,
        }
    }

    pub fn device_name(&self) -> &str {
        self.device_name.as_str()
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    pub fn state(&self) -> BleState {
        state_from_u8(BLE_STATE.load(AtomicOrdering::Relaxed))
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn state(&self) -> BleState {
        self.state
    }

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> Result<(), CommsError> {
        use esp_idf_svc::sys::*;

        let _ = BLE_MAILBOX.set(self.mailbox);

        // SAFETY: one-shot stack bring-up from the main task before the
        // control loop starts; nothing else touches the controller.
        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK {
                return Err(CommsError::ControllerInitFailed(ret));
            }
            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK {
                return Err(CommsError::ControllerInitFailed(ret));
            }

            let ret = esp_bluedroid_init();
            if ret != ESP_OK {
                return Err(CommsError::BluedroidInitFailed(ret));
            }
            let ret = esp_bluedroid_enable();
            if ret != ESP_OK {
                return Err(CommsError::BluedroidInitFailed(ret));
            }

            let ret = esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            if ret != ESP_OK {
                return Err(CommsError::GattRegisterFailed(ret));
            }
            let ret = esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            if ret != ESP_OK {
                return Err(CommsError::GattRegisterFailed(ret));
            }

            let mut name = heapless::Vec::<u8, 25>::new();
            let _ = name.extend_from_slice(self.device_name.as_bytes());
            let _ = name.push(0);
            esp_ble_gap_set_device_name(name.as_ptr().cast());

            let ret = esp_ble_tx_power_set(
                esp_ble_power_type_t_ESP_BLE_PWR_TYPE_ADV,
                tx_power_level(self.tx_power_dbm),
            );
            if ret != ESP_OK {
                warn!("BLE: tx power set failed ({}), using stack default", ret);
            }

            // Service creation and advertising continue in the GATTS / GAP
            // callbacks once the app is registered.
            let ret = esp_ble_gatts_app_register(0);
            if ret != ESP_OK {
                return Err(CommsError::GattRegisterFailed(ret));
            }
        }

        info!(
            "BLE(espidf): Bluedroid up, advertising as '{}' at {} dBm",
            self.device_name,
            nearest_tx_power_step(self.tx_power_dbm)
        );
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> Result<(), CommsError> {
        info!(
            "BLE(sim): advertising '{}' (service {:032x}) at {} dBm",
            self.device_name,
            SERVICE_UUID,
            nearest_tx_power_step(self.tx_power_dbm)
        );
        self.state = BleState::Advertising;
        Ok(())
    }

    // ── Simulation hooks ──────────────────────────────────────
    //
    // On the device these transitions come from the GATTS callback.

    /// A central wrote the command characteristic.
    #[cfg(not(target_os = "espidf"))]
    pub fn on_command_write(&mut self, raw: &[u8]) -> i16 {
        self.received = self.received.saturating_add(1);
        handle_command_write(self.mailbox, raw)
    }

    /// A central read the command characteristic.
    #[cfg(not(target_os = "espidf"))]
    pub fn on_command_read(&mut self) -> &'static [u8] {
        handle_command_read()
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn on_central_connected(&mut self) {
        info!("BLE(sim): central connected");
        self.state = BleState::Connected;
    }

    /// Advertising restarts so the endpoint stays discoverable.
    #[cfg(not(target_os = "espidf"))]
    pub fn on_central_disconnected(&mut self) {
        info!("BLE(sim): central disconnected, re-advertising");
        if self.state != BleState::Failed {
            self.state = BleState::Advertising;
        }
    }
}

// ───────────────────────────────────────────────────────────────
// CommandChannelPort implementation
// ───────────────────────────────────────────────────────────────

impl CommandChannelPort for BleAdapter {
    fn start(&mut self) -> Result<(), CommsError> {
        info!("BLE: starting command channel as '{}'", self.device_name);
        match self.platform_start() {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("BLE: {}", e);
                #[cfg(target_os = "espidf")]
                BLE_STATE.store(state_to_u8(BleState::Failed), AtomicOrdering::Relaxed);
                #[cfg(not(target_os = "espidf"))]
                {
                    self.state = BleState::Failed;
                }
                Err(e)
            }
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.state(), BleState::Advertising | BleState::Connected)
    }

    #[cfg(target_os = "espidf")]
    fn received_count(&self) -> u32 {
        BLE_WRITE_COUNT.load(AtomicOrdering::Relaxed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn received_count(&self) -> u32 {
        self.received
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

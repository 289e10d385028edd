//! Callback payloads and constants of the libcec C ABI.
//!
//! These mirror the `cectypes.h` layouts the callback table receives, so
//! that any [`Driver`] can hand raw payloads to it without linking libcec.
//! With the `libcec` feature the layouts are checked against the
//! generated `libcec-sys` bindings.
//!
//! [`Driver`]: crate::driver::Driver

use std::ffi::{c_char, c_int, c_void};

pub const CEC_MAX_DATA_PACKET_SIZE: usize = 16 * 4;
pub const CEC_DEFAULT_TRANSMIT_TIMEOUT: i32 = 1000;
pub const CEC_DEFAULT_CONNECT_TIMEOUT: u32 = 10000;
pub const LIBCEC_OSD_NAME_SIZE: usize = 15;

pub const CEC_LOG_ERROR: c_int = 1;
pub const CEC_LOG_WARNING: c_int = 2;
pub const CEC_LOG_NOTICE: c_int = 4;
pub const CEC_LOG_TRAFFIC: c_int = 8;
pub const CEC_LOG_DEBUG: c_int = 16;

pub const CEC_ALERT_SERVICE_DEVICE: c_int = 0;
pub const CEC_ALERT_CONNECTION_LOST: c_int = 1;
pub const CEC_ALERT_PERMISSION_ERROR: c_int = 2;
pub const CEC_ALERT_PORT_BUSY: c_int = 3;
pub const CEC_ALERT_PHYSICAL_ADDRESS_ERROR: c_int = 4;
pub const CEC_ALERT_TV_POLL_FAILED: c_int = 5;

pub const CEC_PARAMETER_TYPE_STRING: c_int = 0;
pub const CEC_PARAMETER_TYPE_UNKNOWN: c_int = 1;

pub const CEC_MENU_STATE_ACTIVATED: c_int = 0;
pub const CEC_MENU_STATE_DEACTIVATED: c_int = 1;

pub const CEC_POWER_STATUS_ON: c_int = 0x00;
pub const CEC_POWER_STATUS_STANDBY: c_int = 0x01;
pub const CEC_POWER_STATUS_IN_TRANSITION_STANDBY_TO_ON: c_int = 0x02;
pub const CEC_POWER_STATUS_IN_TRANSITION_ON_TO_STANDBY: c_int = 0x03;
pub const CEC_POWER_STATUS_UNKNOWN: c_int = 0x99;

pub const CEC_AUDIO_MUTE_STATUS_MASK: u8 = 0x80;
pub const CEC_AUDIO_VOLUME_STATUS_MASK: u8 = 0x7F;
pub const CEC_AUDIO_VOLUME_MIN: u8 = 0x00;
pub const CEC_AUDIO_VOLUME_MAX: u8 = 0x64;
pub const CEC_AUDIO_VOLUME_STATUS_UNKNOWN: u8 = 0x7F;

pub const CECDEVICE_UNKNOWN: c_int = -1;
pub const CECDEVICE_UNREGISTERED: c_int = 15;

pub const CEC_DEVICE_TYPE_TV: c_int = 0;
pub const CEC_DEVICE_TYPE_RECORDING_DEVICE: c_int = 1;
pub const CEC_DEVICE_TYPE_RESERVED: c_int = 2;
pub const CEC_DEVICE_TYPE_TUNER: c_int = 3;
pub const CEC_DEVICE_TYPE_PLAYBACK_DEVICE: c_int = 4;
pub const CEC_DEVICE_TYPE_AUDIO_SYSTEM: c_int = 5;

/// Menu-state callbacks report back whether they handled the change.
pub const MENU_STATE_HANDLED: c_int = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CecLogMessage {
    pub message: *const c_char,
    pub level: c_int,
    /// Milliseconds since the connection was opened
    pub time: i64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CecKeypress {
    pub keycode: c_int,
    /// Milliseconds the key was held, zero while still pressed
    pub duration: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CecDatapacket {
    pub data: [u8; CEC_MAX_DATA_PACKET_SIZE],
    pub size: u8,
}

impl Default for CecDatapacket {
    fn default() -> Self {
        Self {
            data: [0; CEC_MAX_DATA_PACKET_SIZE],
            size: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CecCommand {
    pub initiator: c_int,
    pub destination: c_int,
    pub ack: i8,
    pub eom: i8,
    pub opcode: c_int,
    pub parameters: CecDatapacket,
    pub opcode_set: i8,
    pub transmit_timeout: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LibcecParameter {
    pub param_type: c_int,
    pub param_data: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CecLogicalAddresses {
    pub primary: c_int,
    pub addresses: [c_int; 16],
}

/// `ICECCallbacks`
#[repr(C)]
#[derive(Debug)]
pub struct Callbacks {
    pub log_message: Option<unsafe extern "C" fn(*mut c_void, *const CecLogMessage)>,
    pub key_press: Option<unsafe extern "C" fn(*mut c_void, *const CecKeypress)>,
    pub command_received: Option<unsafe extern "C" fn(*mut c_void, *const CecCommand)>,
    /// The payload is a `libcec_configuration`, which no handler reads
    pub configuration_changed: Option<unsafe extern "C" fn(*mut c_void, *const c_void)>,
    pub alert: Option<unsafe extern "C" fn(*mut c_void, c_int, LibcecParameter)>,
    pub menu_state_changed: Option<unsafe extern "C" fn(*mut c_void, c_int) -> c_int>,
    pub source_activated: Option<unsafe extern "C" fn(*mut c_void, c_int, u8)>,
    pub command_handler: Option<unsafe extern "C" fn(*mut c_void, *const CecCommand) -> c_int>,
}

//! Names for CEC protocol codes.
//!
//! Every lookup is total: codes missing from the tables resolve to
//! [`UNKNOWN`]. These are called from the callback path and must never
//! panic.

use {
    crate::sys,
    std::{ffi::c_int, fmt},
};

pub const UNKNOWN: &str = "Unknown";

/// A 4-bit logical address together with its role name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalAddress {
    address: u8,
    name: &'static str,
}

impl LogicalAddress {
    pub const TV: Self = Self::from_nibble(0);
    pub const RECORDING_DEVICE_1: Self = Self::from_nibble(1);
    pub const PLAYBACK_DEVICE_1: Self = Self::from_nibble(4);
    pub const AUDIO_SYSTEM: Self = Self::from_nibble(5);
    pub const BROADCAST: Self = Self::from_nibble(15);
    /// Address 15 as reported for a device the driver could not resolve.
    pub const UNREGISTERED: Self = Self {
        address: sys::CECDEVICE_UNREGISTERED as u8,
        name: "Unregistered",
    };

    /// Resolve an address code, rejecting anything outside `0..=15`.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0..=15 => Some(Self::from_nibble(code)),
            _ => None,
        }
    }

    /// Resolve the low nibble of `byte`, as carried in a frame header.
    pub const fn from_nibble(byte: u8) -> Self {
        let address = byte & 0x0F;
        Self {
            address,
            name: logical_address_name(address),
        }
    }

    /// Resolve a driver-supplied `cec_logical_address`. Codes outside
    /// `0..=15` (including `CECDEVICE_UNKNOWN`) become [`Self::UNREGISTERED`].
    pub fn from_raw(code: c_int) -> Self {
        match u8::try_from(code).ok().and_then(Self::from_code) {
            Some(address) => address,
            None => {
                log::warn!("logical address {code} out of range, treating as unregistered");
                Self::UNREGISTERED
            }
        }
    }

    pub const fn address(self) -> u8 {
        self.address
    }

    pub const fn name(self) -> &'static str {
        self.name
    }

    pub(crate) fn raw(self) -> c_int {
        c_int::from(self.address)
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:X})", self.name, self.address)
    }
}

pub const fn logical_address_name(address: u8) -> &'static str {
    match address {
        0 => "TV",
        1 => "Recorder 1",
        2 => "Recorder 2",
        3 => "Tuner 1",
        4 => "Playback 1",
        5 => "Audio",
        6 => "Tuner 2",
        7 => "Tuner 3",
        8 => "Playback 2",
        9 => "Recorder 3",
        10 => "Tuner 4",
        11 => "Playback 3",
        12 => "Reserved 1",
        13 => "Reserved 2",
        14 => "Free use",
        15 => "Broadcast",
        _ => UNKNOWN,
    }
}

pub fn opcode_name(opcode: u8) -> &'static str {
    match opcode {
        0x00 => "feature abort",
        0x04 => "image view on",
        0x05 => "tuner step increment",
        0x06 => "tuner step decrement",
        0x07 => "tuner device status",
        0x08 => "give tuner device status",
        0x09 => "record on",
        0x0A => "record status",
        0x0B => "record off",
        0x0D => "text view on",
        0x0F => "record tv screen",
        0x1A => "give deck status",
        0x1B => "deck status",
        0x32 => "set menu language",
        0x33 => "clear analogue timer",
        0x34 => "set analogue timer",
        0x35 => "timer status",
        0x36 => "standby",
        0x41 => "play",
        0x42 => "deck control",
        0x43 => "timer cleared status",
        0x44 => "user control pressed",
        0x45 => "user control release",
        0x46 => "give osd name",
        0x47 => "set osd name",
        0x64 => "set osd string",
        0x67 => "set timer program title",
        0x70 => "system audio mode request",
        0x71 => "give audio status",
        0x72 => "set system audio mode",
        0x7A => "report audio status",
        0x7D => "give system audio mode status",
        0x7E => "system audio mode status",
        0x80 => "routing change",
        0x81 => "routing information",
        0x82 => "active source",
        0x83 => "give physical address",
        0x84 => "report physical address",
        0x85 => "request active source",
        0x86 => "set stream path",
        0x87 => "device vendor id",
        0x89 => "vendor command",
        0x8A => "vendor remote button down",
        0x8B => "vendor remote button up",
        0x8C => "give device vendor id",
        0x8D => "menu request",
        0x8E => "menu status",
        0x8F => "give device power status",
        0x90 => "report power status",
        0x91 => "get menu language",
        0x92 => "select analogue service",
        0x93 => "select digital service",
        0x97 => "set digital timer",
        0x99 => "clear digital timer",
        0x9A => "set audio rate",
        0x9D => "inactive source",
        0x9E => "cec version",
        0x9F => "get cec version",
        0xA0 => "vendor command with id",
        0xA1 => "clear external timer",
        0xA2 => "set external timer",
        0xA3 => "report short audio descriptors",
        0xA4 => "request short audio descriptors",
        0xC0 => "initiate arc",
        0xC1 => "report arc initiated",
        0xC2 => "report arc terminated",
        0xC3 => "request arc initiation",
        0xC4 => "request arc termination",
        0xC5 => "terminate arc",
        0xF8 => "cdc",
        0xFF => "abort",
        _ => UNKNOWN,
    }
}

/// User control (remote key) codes used by the service.
pub mod key {
    pub const SELECT: u8 = 0x00;
    pub const POWER: u8 = 0x40;
    pub const VOLUME_UP: u8 = 0x41;
    pub const VOLUME_DOWN: u8 = 0x42;
    pub const MUTE: u8 = 0x43;
    pub const PLAY: u8 = 0x44;
    pub const STOP: u8 = 0x45;
    pub const PAUSE: u8 = 0x46;
    pub const MUTE_FUNCTION: u8 = 0x65;
    pub const RESTORE_VOLUME_FUNCTION: u8 = 0x66;
}

pub fn user_control_name(code: u8) -> &'static str {
    match code {
        0x00 => "select",
        0x01 => "up",
        0x02 => "down",
        0x03 => "left",
        0x04 => "right",
        0x05 => "right-up",
        0x06 => "right-down",
        0x07 => "left-up",
        0x08 => "left-down",
        0x09 => "root menu",
        0x0A => "setup menu",
        0x0B => "contents menu",
        0x0C => "favourite menu",
        0x0D => "exit",
        0x10 => "top menu",
        0x11 => "dvd menu",
        0x1D => "number entry mode",
        0x1E => "11",
        0x1F => "12",
        0x20 => "0",
        0x21 => "1",
        0x22 => "2",
        0x23 => "3",
        0x24 => "4",
        0x25 => "5",
        0x26 => "6",
        0x27 => "7",
        0x28 => "8",
        0x29 => "9",
        0x2A => "dot",
        0x2B => "enter",
        0x2C => "clear",
        0x2F => "next favourite",
        0x30 => "channel up",
        0x31 => "channel down",
        0x32 => "previous channel",
        0x33 => "sound select",
        0x34 => "input select",
        0x35 => "display information",
        0x36 => "help",
        0x37 => "page up",
        0x38 => "page down",
        0x40 => "power",
        0x41 => "volume up",
        0x42 => "volume down",
        0x43 => "mute",
        0x44 => "play",
        0x45 => "stop",
        0x46 => "pause",
        0x47 => "record",
        0x48 => "rewind",
        0x49 => "fast forward",
        0x4A => "eject",
        0x4B => "forward",
        0x4C => "backward",
        0x4D => "stop record",
        0x4E => "pause record",
        0x50 => "angle",
        0x51 => "sub picture",
        0x52 => "video on demand",
        0x53 => "electronic program guide",
        0x54 => "timer programming",
        0x55 => "initial configuration",
        0x56 => "select broadcast type",
        0x57 => "select sound presentation",
        0x60 => "play (function)",
        0x61 => "pause play (function)",
        0x62 => "record (function)",
        0x63 => "pause record (function)",
        0x64 => "stop (function)",
        0x65 => "mute (function)",
        0x66 => "restore volume",
        0x67 => "tune",
        0x68 => "select media",
        0x69 => "select AV input",
        0x6A => "select audio input",
        0x6B => "power toggle",
        0x6C => "power off",
        0x6D => "power on",
        0x71 => "F1 (blue)",
        0x72 => "F2 (red)",
        0x73 => "F3 (green)",
        0x74 => "F4 (yellow)",
        0x75 => "F5",
        0x76 => "data",
        _ => UNKNOWN,
    }
}

/// Key codes arrive from the driver as a C enum; anything that doesn't
/// fit a byte has no name.
pub fn user_control_name_raw(code: c_int) -> &'static str {
    u8::try_from(code).map_or(UNKNOWN, user_control_name)
}

pub fn vendor_name(vendor_id: u32) -> &'static str {
    match vendor_id {
        0x000039 | 0x000CE7 => "Toshiba",
        0x0000F0 => "Samsung",
        0x0005CD => "Denon",
        0x000678 => "Marantz",
        0x000982 => "Loewe",
        0x0009B0 => "Onkyo",
        0x000CB8 => "Medion",
        0x0010FA => "Apple",
        0x001582 => "Pulse Eight",
        0x001A11 => "Google",
        0x0020C7 => "Akai",
        0x002467 => "AOC",
        0x008045 => "Panasonic",
        0x00903E => "Philips",
        0x009053 => "Daewoo",
        0x00A0DE => "Yamaha",
        0x00D0D5 => "Grundig",
        0x00E036 => "Pioneer",
        0x00E091 => "LG",
        0x08001F => "Sharp",
        0x080046 => "Sony",
        0x18C086 => "Broadcom",
        0x6B746D => "Vizio",
        0x8065E9 => "Benq",
        0x9C645E => "Harman/Kardon",
        _ => UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_codes() {
        assert_eq!(opcode_name(0x04), "image view on");
        assert_eq!(opcode_name(0x82), "active source");
        assert_eq!(user_control_name(0x44), "play");
        assert_eq!(vendor_name(0x0000F0), "Samsung");
        assert_eq!(logical_address_name(0), "TV");
        assert_eq!(logical_address_name(4), "Playback 1");
    }

    #[test]
    fn unknown_codes_resolve_to_unknown() {
        assert_eq!(opcode_name(0x01), UNKNOWN);
        assert_eq!(opcode_name(0xFE), UNKNOWN);
        assert_eq!(user_control_name(0xEE), UNKNOWN);
        assert_eq!(user_control_name_raw(-1), UNKNOWN);
        assert_eq!(user_control_name_raw(0x1_0044), UNKNOWN);
        assert_eq!(vendor_name(0xDEADBE), UNKNOWN);
        assert_eq!(logical_address_name(16), UNKNOWN);
    }

    #[test]
    fn logical_address_stays_in_range() {
        assert_eq!(LogicalAddress::from_code(16), None);
        assert_eq!(LogicalAddress::from_code(5), Some(LogicalAddress::AUDIO_SYSTEM));
        assert_eq!(LogicalAddress::from_nibble(0x4F).address(), 0xF);
        assert_eq!(LogicalAddress::from_raw(-1), LogicalAddress::UNREGISTERED);
        assert_eq!(LogicalAddress::from_raw(300).to_string(), "Unregistered (F)");
        assert_eq!(LogicalAddress::from_raw(15), LogicalAddress::BROADCAST);
        assert_eq!(LogicalAddress::from_raw(8).name(), "Playback 2");
    }

    #[test]
    fn logical_address_display() {
        assert_eq!(LogicalAddress::TV.to_string(), "TV (0)");
        assert_eq!(LogicalAddress::BROADCAST.to_string(), "Broadcast (F)");
    }
}

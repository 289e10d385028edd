//! Request/response operations on an open connection.

use {
    crate::{
        connection::{Connection, DeviceType},
        driver::Driver,
        error::{Error, Result},
        symbol::{self, LogicalAddress},
        sys,
    },
    std::{ffi::c_int, fmt},
    strum::Display,
};

/// Names the operation in [`Error::QueryFailed`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Query {
    PowerOn,
    Standby,
    SetActiveSource,
    SetInactiveView,
    SendKeypress,
    SendKeyRelease,
    OsdName,
    PhysicalAddress,
    PollDevice,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PowerStatus {
    On,
    Standby,
    #[strum(to_string = "starting")]
    TransitionToOn,
    #[strum(to_string = "shutting down")]
    TransitionToStandby,
    #[strum(to_string = "")]
    Unknown,
}

impl PowerStatus {
    pub fn from_raw(status: c_int) -> Self {
        match status {
            sys::CEC_POWER_STATUS_ON => Self::On,
            sys::CEC_POWER_STATUS_STANDBY => Self::Standby,
            sys::CEC_POWER_STATUS_IN_TRANSITION_STANDBY_TO_ON => Self::TransitionToOn,
            sys::CEC_POWER_STATUS_IN_TRANSITION_ON_TO_STANDBY => Self::TransitionToStandby,
            _ => Self::Unknown,
        }
    }
}

#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AudioStatusError {
    #[error("audio status is unknown")]
    Unknown,
    #[error("audio status volume {0} is reserved")]
    Reserved(u8),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AudioStatus {
    /// 0 to 100
    pub volume: u8,
    pub muted: bool,
}

impl AudioStatus {
    pub fn from_raw(status: u8) -> Result<Self, AudioStatusError> {
        let volume = status & sys::CEC_AUDIO_VOLUME_STATUS_MASK;
        let muted = status & sys::CEC_AUDIO_MUTE_STATUS_MASK != 0;

        match volume {
            sys::CEC_AUDIO_VOLUME_MIN..=sys::CEC_AUDIO_VOLUME_MAX => Ok(Self { volume, muted }),
            sys::CEC_AUDIO_VOLUME_STATUS_UNKNOWN => Err(AudioStatusError::Unknown),
            reserved => Err(AudioStatusError::Reserved(reserved)),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalAddress(pub u16);

impl PhysicalAddress {
    pub const INVALID: Self = Self(0xFFFF);
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [high, low] = self.0.to_be_bytes();
        write!(
            f,
            "{:x}.{:x}.{:x}.{:x}",
            high >> 4,
            high & 0x0F,
            low >> 4,
            low & 0x0F
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VendorId(pub u32);

impl VendorId {
    pub fn name(self) -> &'static str {
        symbol::vendor_name(self.0)
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:06x})", self.name(), self.0)
    }
}

/// Presence set indexed by logical address.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ActiveDevices([bool; 16]);

impl ActiveDevices {
    pub fn contains(&self, address: LogicalAddress) -> bool {
        self.0[usize::from(address.address())]
    }

    pub fn iter(&self) -> impl Iterator<Item = LogicalAddress> + '_ {
        self.0
            .iter()
            .zip(0u8..)
            .filter(|(&present, _)| present)
            .map(|(_, address)| LogicalAddress::from_nibble(address))
    }

    pub fn is_empty(&self) -> bool {
        !self.0.contains(&true)
    }
}

impl From<sys::CecLogicalAddresses> for ActiveDevices {
    fn from(addresses: sys::CecLogicalAddresses) -> Self {
        Self(addresses.addresses.map(|present| present != 0))
    }
}

fn check(accepted: bool, query: Query) -> Result<()> {
    if accepted {
        Ok(())
    } else {
        Err(Error::QueryFailed(query))
    }
}

impl<D: Driver> Connection<D> {
    pub fn power_on(&self, address: LogicalAddress) -> Result<()> {
        check(self.driver().power_on_devices(address.raw()), Query::PowerOn)
    }

    pub fn standby(&self, address: LogicalAddress) -> Result<()> {
        check(self.driver().standby_devices(address.raw()), Query::Standby)
    }

    pub fn set_active_source(&self, device_type: DeviceType) -> Result<()> {
        check(
            self.driver().set_active_source(device_type.code()),
            Query::SetActiveSource,
        )
    }

    pub fn set_inactive_view(&self) -> Result<()> {
        check(self.driver().set_inactive_view(), Query::SetInactiveView)
    }

    pub fn volume_up(&self) -> Result<AudioStatus> {
        Ok(AudioStatus::from_raw(self.driver().volume_up(true))?)
    }

    pub fn volume_down(&self) -> Result<AudioStatus> {
        Ok(AudioStatus::from_raw(self.driver().volume_down(true))?)
    }

    /// Toggle mute on the audio system.
    pub fn mute(&self) -> Result<AudioStatus> {
        Ok(AudioStatus::from_raw(self.driver().mute_audio(true))?)
    }

    pub fn audio_status(&self) -> Result<AudioStatus> {
        Ok(AudioStatus::from_raw(self.driver().audio_status())?)
    }

    /// Press `key` on `address`, waiting for the acknowledgement.
    pub fn send_keypress(&self, address: LogicalAddress, key: u8) -> Result<()> {
        self.send_keypress_with(address, key, true)
    }

    pub fn send_keypress_with(&self, address: LogicalAddress, key: u8, wait: bool) -> Result<()> {
        check(
            self.driver()
                .send_keypress(address.raw(), c_int::from(key), wait),
            Query::SendKeypress,
        )
    }

    pub fn send_key_release(&self, address: LogicalAddress) -> Result<()> {
        self.send_key_release_with(address, true)
    }

    pub fn send_key_release_with(&self, address: LogicalAddress, wait: bool) -> Result<()> {
        check(
            self.driver().send_key_release(address.raw(), wait),
            Query::SendKeyRelease,
        )
    }

    pub fn active_devices(&self) -> ActiveDevices {
        self.driver().active_devices().into()
    }

    /// Addresses claimed by this client.
    pub fn logical_addresses(&self) -> ActiveDevices {
        self.driver().logical_addresses().into()
    }

    /// `None` while no source is active.
    pub fn active_source(&self) -> Option<LogicalAddress> {
        match self.driver().active_source() {
            sys::CECDEVICE_UNKNOWN => None,
            address => Some(LogicalAddress::from_raw(address)),
        }
    }

    pub fn is_active_source(&self, address: LogicalAddress) -> bool {
        self.driver().is_active_source(address.raw())
    }

    pub fn osd_name(&self, address: LogicalAddress) -> Result<String> {
        self.driver()
            .device_osd_name(address.raw())
            .filter(|name| !name.is_empty())
            .ok_or(Error::QueryFailed(Query::OsdName))
    }

    pub fn vendor_id(&self, address: LogicalAddress) -> VendorId {
        VendorId(self.driver().device_vendor_id(address.raw()))
    }

    pub fn physical_address(&self, address: LogicalAddress) -> Result<PhysicalAddress> {
        match PhysicalAddress(self.driver().device_physical_address(address.raw())) {
            PhysicalAddress::INVALID => Err(Error::QueryFailed(Query::PhysicalAddress)),
            physical => Ok(physical),
        }
    }

    pub fn power_status(&self, address: LogicalAddress) -> PowerStatus {
        PowerStatus::from_raw(self.driver().device_power_status(address.raw()))
    }

    /// Whether `address` acknowledges a poll.
    pub fn poll_device(&self, address: LogicalAddress) -> Result<()> {
        check(self.driver().poll_device(address.raw()), Query::PollDevice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_address_renders_nibbles() {
        assert_eq!(PhysicalAddress(0x1000).to_string(), "1.0.0.0");
        assert_eq!(PhysicalAddress(0x3a0f).to_string(), "3.a.0.f");
    }

    #[test]
    fn power_status_names() {
        let names: Vec<String> = [0x00, 0x01, 0x02, 0x03, 0x99, 0x42]
            .into_iter()
            .map(|status| PowerStatus::from_raw(status).to_string())
            .collect();
        assert_eq!(
            names,
            ["on", "standby", "starting", "shutting down", "", ""]
        );
    }

    #[test]
    fn audio_status_decoding() {
        assert_eq!(
            AudioStatus::from_raw(0x32),
            Ok(AudioStatus {
                volume: 50,
                muted: false
            })
        );
        assert_eq!(
            AudioStatus::from_raw(0x80 | 100),
            Ok(AudioStatus {
                volume: 100,
                muted: true
            })
        );
        assert_eq!(AudioStatus::from_raw(0x7F), Err(AudioStatusError::Unknown));
        assert_eq!(AudioStatus::from_raw(0xFF), Err(AudioStatusError::Unknown));
        assert_eq!(
            AudioStatus::from_raw(101),
            Err(AudioStatusError::Reserved(101))
        );
    }

    #[test]
    fn active_devices_iterates_present() {
        let mut raw = sys::CecLogicalAddresses::default();
        raw.addresses[0] = 1;
        raw.addresses[5] = 1;
        let devices = ActiveDevices::from(raw);

        assert!(devices.contains(LogicalAddress::TV));
        assert!(!devices.contains(LogicalAddress::PLAYBACK_DEVICE_1));
        assert_eq!(
            devices.iter().collect::<Vec<_>>(),
            [LogicalAddress::TV, LogicalAddress::AUDIO_SYSTEM]
        );
        assert!(ActiveDevices::default().is_empty());
    }

    #[test]
    fn query_names() {
        assert_eq!(Query::PhysicalAddress.to_string(), "physical_address");
        assert_eq!(
            Error::QueryFailed(Query::PowerOn).to_string(),
            "power_on failed"
        );
    }
}

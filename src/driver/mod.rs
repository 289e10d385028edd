//! The native driver boundary.
//!
//! [`Driver`] names every entry point the connection uses. Arguments and
//! results stay in the driver's own encoding (raw address codes, status
//! bytes); decoding them is the caller's job.

#[cfg(feature = "libcec")]
pub mod libcec;
#[cfg(any(test, feature = "simulated"))]
pub mod simulated;

use {
    crate::{connection::Configuration, dispatcher::Dispatcher, sys},
    std::{ffi::c_int, ffi::c_void, sync::Arc, time::Duration},
};

/// Callback table and the opaque parameter the driver passes back to every
/// callback.
#[derive(Debug, Copy, Clone)]
pub struct Registration {
    pub callbacks: &'static sys::Callbacks,
    pub param: *mut c_void,
}

// `param` points at a `Dispatcher`, which is `Sync`
unsafe impl Send for Registration {}
unsafe impl Sync for Registration {}

impl Registration {
    pub(crate) fn new(dispatcher: &Arc<Dispatcher>) -> Self {
        Self {
            callbacks: &crate::dispatcher::CALLBACKS,
            param: Arc::as_ptr(dispatcher) as *mut c_void,
        }
    }
}

/// An adapter reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterDescriptor {
    pub path: String,
    pub comm: String,
}

impl AdapterDescriptor {
    pub fn matches(&self, name: &str) -> bool {
        self.path.contains(name) || self.comm.contains(name)
    }
}

/// A native CEC driver instance bound to one connection handle.
///
/// Dropping the driver releases the handle. Implementations must not
/// invoke callbacks after they have been dropped.
pub trait Driver: Sized {
    type Context;

    /// Build a connection handle with `registration` installed as the
    /// callback table. `None` if the driver has no usable handle.
    fn initialise(
        context: Self::Context,
        configuration: &Configuration,
        registration: Registration,
    ) -> Option<Self>;

    fn find_adapters(&self) -> Vec<AdapterDescriptor>;

    fn open(&mut self, port: &str, timeout: Duration) -> bool;

    /// Whether the adapter accepted the frame for transmission.
    fn transmit(&self, command: &sys::CecCommand) -> bool;

    fn power_on_devices(&self, address: c_int) -> bool;

    fn standby_devices(&self, address: c_int) -> bool;

    fn set_active_source(&self, device_type: c_int) -> bool;

    fn set_inactive_view(&self) -> bool;

    /// The following three return the resulting audio status byte.
    fn volume_up(&self, send_release: bool) -> u8;

    fn volume_down(&self, send_release: bool) -> u8;

    fn mute_audio(&self, send_release: bool) -> u8;

    fn audio_status(&self) -> u8;

    fn send_keypress(&self, address: c_int, key: c_int, wait: bool) -> bool;

    fn send_key_release(&self, address: c_int, wait: bool) -> bool;

    fn active_devices(&self) -> sys::CecLogicalAddresses;

    fn logical_addresses(&self) -> sys::CecLogicalAddresses;

    fn active_source(&self) -> c_int;

    fn is_active_source(&self, address: c_int) -> bool;

    fn device_osd_name(&self, address: c_int) -> Option<String>;

    fn device_vendor_id(&self, address: c_int) -> u32;

    fn device_physical_address(&self, address: c_int) -> u16;

    fn device_power_status(&self, address: c_int) -> c_int;

    fn poll_device(&self, address: c_int) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_matches_path_or_comm() {
        let adapter = AdapterDescriptor {
            path: "/sys/devices/pci0000:00/usb1/1-2".to_owned(),
            comm: "/dev/ttyACM0".to_owned(),
        };
        assert!(adapter.matches("ttyACM"));
        assert!(adapter.matches("usb1"));
        assert!(adapter.matches(""));
        assert!(!adapter.matches("RPI"));
    }
}

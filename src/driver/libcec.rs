//! [`Driver`] backed by the system libcec, through the `libcec-sys`
//! bindings.
//!
//! The callback payloads libcec hands back are read through the mirrors in
//! [`sys`], whose layouts are checked against `libcec-sys` in that module.

use {
    super::{AdapterDescriptor, Driver, Registration},
    crate::{connection::Configuration, sys},
    libcec_sys::{
        cec_adapter, cec_command, cec_logical_addresses, libcec_configuration,
        libcec_connection_t, ICECCallbacks,
    },
    log::warn,
    std::{
        ffi::{c_char, c_int, CString},
        mem::MaybeUninit,
        ptr::{self, NonNull},
        time::Duration,
    },
};

/// Most adapters a single discovery reports.
const MAX_ADAPTERS: usize = 10;

pub struct LibCec {
    connection: NonNull<std::ffi::c_void>,
}

// libcec serialises calls on a connection handle internally
unsafe impl Send for LibCec {}
unsafe impl Sync for LibCec {}

impl LibCec {
    fn raw(&self) -> libcec_connection_t {
        self.connection.as_ptr() as libcec_connection_t
    }
}

impl Drop for LibCec {
    fn drop(&mut self) {
        // Stops the worker thread; no callback fires after this returns
        unsafe { libcec_sys::libcec_destroy(self.raw()) }
    }
}

fn configure(configuration: &Configuration, registration: Registration) -> libcec_configuration {
    let mut native = unsafe {
        let mut native = MaybeUninit::<libcec_configuration>::zeroed();
        libcec_sys::libcec_clear_configuration(native.as_mut_ptr());
        native.assume_init()
    };

    // The field is NUL terminated, so it holds one byte less than its size
    let name = configuration.device_name.as_bytes();
    native.strDeviceName.fill(0);
    let len = name.len().min(native.strDeviceName.len() - 1);
    for (field, &byte) in native.strDeviceName.iter_mut().zip(&name[..len]) {
        *field = byte as c_char;
    }

    native.deviceTypes.types.fill(sys::CEC_DEVICE_TYPE_RESERVED as _);
    native.deviceTypes.types[0] = configuration.device_type.code() as _;

    native.callbackParam = registration.param;
    // Same layout as `ICECCallbacks`. libcec declares the table mutable but
    // only reads it
    native.callbacks = registration.callbacks as *const sys::Callbacks as *mut ICECCallbacks;
    native
}

fn succeeded(status: c_int) -> bool {
    status > 0
}

/// Copy a NUL terminated fixed-width C string field.
fn string_from_chars(chars: &[c_char]) -> String {
    let bytes: Vec<u8> = chars
        .iter()
        .map(|&c| c as u8)
        .take_while(|&b| b != 0)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn logical_addresses(native: cec_logical_addresses) -> sys::CecLogicalAddresses {
    sys::CecLogicalAddresses {
        primary: native.primary as c_int,
        addresses: native.addresses.map(|address| address as c_int),
    }
}

impl Driver for LibCec {
    type Context = ();

    fn initialise(
        _context: (),
        configuration: &Configuration,
        registration: Registration,
    ) -> Option<Self> {
        let mut native = configure(configuration, registration);
        let connection =
            NonNull::new(unsafe { libcec_sys::libcec_initialise(&mut native) } as *mut _)?;
        let cec = Self { connection };
        unsafe { libcec_sys::libcec_init_video_standalone(cec.raw()) };
        Some(cec)
    }

    fn find_adapters(&self) -> Vec<AdapterDescriptor> {
        let mut adapters: [cec_adapter; MAX_ADAPTERS] = unsafe { std::mem::zeroed() };
        let found = unsafe {
            libcec_sys::libcec_find_adapters(
                self.raw(),
                adapters.as_mut_ptr(),
                MAX_ADAPTERS as u8,
                ptr::null(),
            )
        };
        if found < 0 {
            warn!("adapter discovery failed ({found})");
            return Vec::new();
        }

        adapters[..(found as usize).min(MAX_ADAPTERS)]
            .iter()
            .map(|adapter| AdapterDescriptor {
                path: string_from_chars(&adapter.path),
                comm: string_from_chars(&adapter.comm),
            })
            .collect()
    }

    fn open(&mut self, port: &str, timeout: Duration) -> bool {
        let Ok(port) = CString::new(port) else {
            warn!("adapter port {port:?} contains a NUL byte");
            return false;
        };
        let timeout = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        succeeded(unsafe { libcec_sys::libcec_open(self.raw(), port.as_ptr(), timeout) } as c_int)
    }

    fn transmit(&self, command: &sys::CecCommand) -> bool {
        let command = command as *const sys::CecCommand as *const cec_command;
        succeeded(unsafe { libcec_sys::libcec_transmit(self.raw(), command) } as c_int)
    }

    fn power_on_devices(&self, address: c_int) -> bool {
        succeeded(unsafe { libcec_sys::libcec_power_on_devices(self.raw(), address as _) } as c_int)
    }

    fn standby_devices(&self, address: c_int) -> bool {
        succeeded(unsafe { libcec_sys::libcec_standby_devices(self.raw(), address as _) } as c_int)
    }

    fn set_active_source(&self, device_type: c_int) -> bool {
        succeeded(
            unsafe { libcec_sys::libcec_set_active_source(self.raw(), device_type as _) } as c_int,
        )
    }

    fn set_inactive_view(&self) -> bool {
        succeeded(unsafe { libcec_sys::libcec_set_inactive_view(self.raw()) } as c_int)
    }

    fn volume_up(&self, send_release: bool) -> u8 {
        unsafe { libcec_sys::libcec_volume_up(self.raw(), c_int::from(send_release)) as u8 }
    }

    fn volume_down(&self, send_release: bool) -> u8 {
        unsafe { libcec_sys::libcec_volume_down(self.raw(), c_int::from(send_release)) as u8 }
    }

    fn mute_audio(&self, send_release: bool) -> u8 {
        unsafe { libcec_sys::libcec_mute_audio(self.raw(), c_int::from(send_release)) as u8 }
    }

    fn audio_status(&self) -> u8 {
        unsafe { libcec_sys::libcec_audio_get_status(self.raw()) as u8 }
    }

    fn send_keypress(&self, address: c_int, key: c_int, wait: bool) -> bool {
        succeeded(unsafe {
            libcec_sys::libcec_send_keypress(self.raw(), address as _, key as _, c_int::from(wait))
        } as c_int)
    }

    fn send_key_release(&self, address: c_int, wait: bool) -> bool {
        succeeded(unsafe {
            libcec_sys::libcec_send_key_release(self.raw(), address as _, c_int::from(wait))
        } as c_int)
    }

    fn active_devices(&self) -> sys::CecLogicalAddresses {
        logical_addresses(unsafe { libcec_sys::libcec_get_active_devices(self.raw()) })
    }

    fn logical_addresses(&self) -> sys::CecLogicalAddresses {
        logical_addresses(unsafe { libcec_sys::libcec_get_logical_addresses(self.raw()) })
    }

    fn active_source(&self) -> c_int {
        unsafe { libcec_sys::libcec_get_active_source(self.raw()) as c_int }
    }

    fn is_active_source(&self, address: c_int) -> bool {
        succeeded(unsafe { libcec_sys::libcec_is_active_source(self.raw(), address as _) } as c_int)
    }

    fn device_osd_name(&self, address: c_int) -> Option<String> {
        let mut name = [0 as c_char; sys::LIBCEC_OSD_NAME_SIZE];
        let status = unsafe {
            libcec_sys::libcec_get_device_osd_name(self.raw(), address as _, name.as_mut_ptr())
        };
        // The buffer is not terminated when the name fills it
        (status == 0).then(|| string_from_chars(&name))
    }

    fn device_vendor_id(&self, address: c_int) -> u32 {
        unsafe { libcec_sys::libcec_get_device_vendor_id(self.raw(), address as _) as u32 }
    }

    fn device_physical_address(&self, address: c_int) -> u16 {
        unsafe { libcec_sys::libcec_get_device_physical_address(self.raw(), address as _) as u16 }
    }

    fn device_power_status(&self, address: c_int) -> c_int {
        unsafe { libcec_sys::libcec_get_device_power_status(self.raw(), address as _) as c_int }
    }

    fn poll_device(&self, address: c_int) -> bool {
        succeeded(unsafe { libcec_sys::libcec_poll_device(self.raw(), address as _) } as c_int)
    }
}

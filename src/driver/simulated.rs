//! An in-process bus that stands in for libcec.
//!
//! [`SimulatedBus`] is the shared handle: it scripts adapters and devices,
//! records what the connection sends, and fires native callbacks through
//! the registered table exactly as the real driver's worker thread would.

use {
    super::{AdapterDescriptor, Driver, Registration},
    crate::{connection::Configuration, sys},
    parking_lot::{Mutex, RwLock},
    std::{
        ffi::{c_int, c_void, CString},
        sync::Arc,
        time::Duration,
    },
};

#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    pub osd_name: String,
    pub vendor_id: u32,
    pub physical_address: u16,
    pub power_status: c_int,
}

impl SimulatedDevice {
    pub fn new(osd_name: &str, vendor_id: u32, physical_address: u16) -> Self {
        Self {
            osd_name: osd_name.to_owned(),
            vendor_id,
            physical_address,
            power_status: sys::CEC_POWER_STATUS_STANDBY,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    adapters: Vec<AdapterDescriptor>,
    devices: [Option<SimulatedDevice>; 16],
    own_address: Option<u8>,
    active_source: Option<u8>,
    audio_status: Option<u8>,
    refuse_initialise: bool,
    refuse_open: bool,
    refuse_transmit: bool,
    configuration: Option<Configuration>,
    opened: Option<(String, Duration)>,
    transmitted: Vec<Vec<u8>>,
    keys: Vec<(u8, Option<u8>)>,
    destroyed: usize,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    registration: RwLock<Option<Registration>>,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    shared: Arc<Shared>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_adapter(&self, path: &str, comm: &str) -> &Self {
        self.shared.state.lock().adapters.push(AdapterDescriptor {
            path: path.to_owned(),
            comm: comm.to_owned(),
        });
        self
    }

    pub fn add_device(&self, address: u8, device: SimulatedDevice) -> &Self {
        if let Some(slot) = self.shared.state.lock().devices.get_mut(usize::from(address)) {
            *slot = Some(device);
        }
        self
    }

    /// The address the local client claims once opened.
    pub fn claim_address(&self, address: u8) -> &Self {
        self.shared.state.lock().own_address = Some(address);
        self
    }

    pub fn set_active_source_address(&self, address: Option<u8>) -> &Self {
        self.shared.state.lock().active_source = address;
        self
    }

    /// Install an audio system status byte, `None` for no audio system.
    pub fn set_audio_status(&self, status: Option<u8>) -> &Self {
        self.shared.state.lock().audio_status = status;
        self
    }

    pub fn refuse_initialise(&self) -> &Self {
        self.shared.state.lock().refuse_initialise = true;
        self
    }

    pub fn refuse_open(&self) -> &Self {
        self.shared.state.lock().refuse_open = true;
        self
    }

    pub fn refuse_transmit(&self) -> &Self {
        self.shared.state.lock().refuse_transmit = true;
        self
    }

    pub fn configuration(&self) -> Option<Configuration> {
        self.shared.state.lock().configuration.clone()
    }

    /// Port and timeout the adapter was opened with.
    pub fn opened(&self) -> Option<(String, Duration)> {
        self.shared.state.lock().opened.clone()
    }

    /// Frames accepted for transmission, as bus bytes.
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().transmitted.clone()
    }

    /// Destination and key of each key press, `None` for releases.
    pub fn keys(&self) -> Vec<(u8, Option<u8>)> {
        self.shared.state.lock().keys.clone()
    }

    pub fn power_status_of(&self, address: u8) -> Option<c_int> {
        self.shared
            .state
            .lock()
            .devices
            .get(usize::from(address))?
            .as_ref()
            .map(|device| device.power_status)
    }

    pub fn destroyed(&self) -> usize {
        self.shared.state.lock().destroyed
    }

    pub fn is_registered(&self) -> bool {
        self.shared.registration.read().is_some()
    }

    /// Run `f` against the live registration. The read guard is held for
    /// the duration of the callback, so teardown waits for it to return.
    fn fire<R>(&self, f: impl FnOnce(&sys::Callbacks, *mut c_void) -> R) -> Option<R> {
        let registration = self.shared.registration.read();
        let registration = registration.as_ref()?;
        Some(f(registration.callbacks, registration.param))
    }

    pub fn fire_log_message(&self, level: c_int, message: &str, time_ms: i64) -> bool {
        let Ok(message) = CString::new(message) else {
            return false;
        };
        let payload = sys::CecLogMessage {
            message: message.as_ptr(),
            level,
            time: time_ms,
        };
        self.fire(|callbacks, param| {
            if let Some(callback) = callbacks.log_message {
                unsafe { callback(param, &payload) }
            }
        })
        .is_some()
    }

    pub fn fire_key_press(&self, keycode: c_int, duration_ms: u32) -> bool {
        let payload = sys::CecKeypress {
            keycode,
            duration: duration_ms,
        };
        self.fire(|callbacks, param| {
            if let Some(callback) = callbacks.key_press {
                unsafe { callback(param, &payload) }
            }
        })
        .is_some()
    }

    pub fn fire_command(&self, command: &sys::CecCommand) -> bool {
        self.fire(|callbacks, param| {
            if let Some(callback) = callbacks.command_received {
                unsafe { callback(param, command) }
            }
        })
        .is_some()
    }

    /// Deliver bus bytes as a received command. The first byte is the
    /// header; an empty slice is ignored.
    pub fn fire_frame(&self, bytes: &[u8]) -> bool {
        let Some((&header, rest)) = bytes.split_first() else {
            return false;
        };
        let mut command = sys::CecCommand {
            initiator: c_int::from(header >> 4),
            destination: c_int::from(header & 0x0F),
            ack: 1,
            eom: 1,
            transmit_timeout: sys::CEC_DEFAULT_TRANSMIT_TIMEOUT,
            ..Default::default()
        };
        if let Some((&opcode, parameters)) = rest.split_first() {
            command.opcode = c_int::from(opcode);
            command.opcode_set = 1;
            let size = parameters.len().min(sys::CEC_MAX_DATA_PACKET_SIZE);
            command.parameters.data[..size].copy_from_slice(&parameters[..size]);
            command.parameters.size = size as u8;
        }
        self.fire_command(&command)
    }

    pub fn fire_alert(&self, alert: c_int, parameter: Option<&str>) -> bool {
        let text = match parameter.map(CString::new) {
            Some(Ok(text)) => Some(text),
            Some(Err(_)) => return false,
            None => None,
        };
        let payload = match &text {
            Some(text) => sys::LibcecParameter {
                param_type: sys::CEC_PARAMETER_TYPE_STRING,
                param_data: text.as_ptr() as *mut c_void,
            },
            None => sys::LibcecParameter {
                param_type: sys::CEC_PARAMETER_TYPE_UNKNOWN,
                param_data: std::ptr::null_mut(),
            },
        };
        self.fire(|callbacks, param| {
            if let Some(callback) = callbacks.alert {
                unsafe { callback(param, alert, payload) }
            }
        })
        .is_some()
    }

    /// Returns the callback's acknowledgment value.
    pub fn fire_menu_state(&self, state: c_int) -> Option<c_int> {
        self.fire(|callbacks, param| {
            callbacks
                .menu_state_changed
                .map(|callback| unsafe { callback(param, state) })
        })
        .flatten()
    }

    pub fn fire_source_activated(&self, address: c_int, activated: bool) -> bool {
        self.fire(|callbacks, param| {
            if let Some(callback) = callbacks.source_activated {
                unsafe { callback(param, address, u8::from(activated)) }
            }
        })
        .is_some()
    }

    pub fn fire_configuration_changed(&self) -> bool {
        self.fire(|callbacks, param| {
            if let Some(callback) = callbacks.configuration_changed {
                unsafe { callback(param, std::ptr::null()) }
            }
        })
        .is_some()
    }
}

fn address(code: c_int) -> Option<usize> {
    usize::try_from(code).ok().filter(|&address| address < 16)
}

fn logical_addresses(present: impl Iterator<Item = usize>) -> sys::CecLogicalAddresses {
    let mut addresses = sys::CecLogicalAddresses {
        primary: sys::CECDEVICE_UNREGISTERED,
        addresses: [0; 16],
    };
    for address in present {
        if addresses.primary == sys::CECDEVICE_UNREGISTERED {
            addresses.primary = address as c_int;
        }
        addresses.addresses[address] = 1;
    }
    addresses
}

/// Driver half of the simulated bus, owned by the connection.
#[derive(Debug)]
pub struct SimulatedDriver {
    bus: SimulatedBus,
}

impl SimulatedDriver {
    fn state(&self) -> parking_lot::MutexGuard<'_, State> {
        self.bus.shared.state.lock()
    }

    fn set_power(&self, code: c_int, status: c_int) -> bool {
        let mut state = self.state();
        let targets: Vec<usize> = match address(code) {
            Some(15) => (0..15).collect(),
            Some(address) => vec![address],
            None => return false,
        };
        let mut reached = false;
        for target in targets {
            if let Some(device) = state.devices[target].as_mut() {
                device.power_status = status;
                reached = true;
            }
        }
        reached
    }

    fn audio(&self, update: impl FnOnce(u8) -> u8) -> u8 {
        let mut state = self.state();
        match state.audio_status {
            Some(status) => {
                let status = update(status);
                state.audio_status = Some(status);
                status
            }
            None => sys::CEC_AUDIO_VOLUME_STATUS_UNKNOWN,
        }
    }
}

impl Drop for SimulatedDriver {
    fn drop(&mut self) {
        self.bus.shared.registration.write().take();
        self.state().destroyed += 1;
    }
}

impl Driver for SimulatedDriver {
    type Context = SimulatedBus;

    fn initialise(
        bus: SimulatedBus,
        configuration: &Configuration,
        registration: Registration,
    ) -> Option<Self> {
        {
            let mut state = bus.shared.state.lock();
            if state.refuse_initialise {
                return None;
            }
            state.configuration = Some(configuration.clone());
        }
        *bus.shared.registration.write() = Some(registration);
        Some(Self { bus })
    }

    fn find_adapters(&self) -> Vec<AdapterDescriptor> {
        self.state().adapters.clone()
    }

    fn open(&mut self, port: &str, timeout: Duration) -> bool {
        let mut state = self.state();
        if state.refuse_open {
            return false;
        }
        state.opened = Some((port.to_owned(), timeout));
        true
    }

    fn transmit(&self, command: &sys::CecCommand) -> bool {
        let mut state = self.state();
        if state.refuse_transmit {
            return false;
        }
        let mut bytes = vec![((command.initiator as u8 & 0x0F) << 4) | (command.destination as u8 & 0x0F)];
        if command.opcode_set != 0 {
            bytes.push(command.opcode as u8);
            let size = usize::from(command.parameters.size).min(sys::CEC_MAX_DATA_PACKET_SIZE);
            bytes.extend_from_slice(&command.parameters.data[..size]);
        }
        state.transmitted.push(bytes);
        true
    }

    fn power_on_devices(&self, address: c_int) -> bool {
        self.set_power(address, sys::CEC_POWER_STATUS_ON)
    }

    fn standby_devices(&self, address: c_int) -> bool {
        self.set_power(address, sys::CEC_POWER_STATUS_STANDBY)
    }

    fn set_active_source(&self, _device_type: c_int) -> bool {
        let mut state = self.state();
        match state.own_address {
            Some(address) => {
                state.active_source = Some(address);
                true
            }
            None => false,
        }
    }

    fn set_inactive_view(&self) -> bool {
        let mut state = self.state();
        if state.active_source.is_some() && state.active_source == state.own_address {
            state.active_source = None;
        }
        true
    }

    fn volume_up(&self, _send_release: bool) -> u8 {
        self.audio(|status| {
            let volume = (status & sys::CEC_AUDIO_VOLUME_STATUS_MASK) + 1;
            (status & sys::CEC_AUDIO_MUTE_STATUS_MASK) | volume.min(sys::CEC_AUDIO_VOLUME_MAX)
        })
    }

    fn volume_down(&self, _send_release: bool) -> u8 {
        self.audio(|status| {
            let volume = (status & sys::CEC_AUDIO_VOLUME_STATUS_MASK).saturating_sub(1);
            (status & sys::CEC_AUDIO_MUTE_STATUS_MASK) | volume
        })
    }

    fn mute_audio(&self, _send_release: bool) -> u8 {
        self.audio(|status| status ^ sys::CEC_AUDIO_MUTE_STATUS_MASK)
    }

    fn audio_status(&self) -> u8 {
        self.audio(|status| status)
    }

    fn send_keypress(&self, address: c_int, key: c_int, _wait: bool) -> bool {
        let Some(destination) = self::address(address) else {
            return false;
        };
        let mut state = self.state();
        state.keys.push((destination as u8, Some(key as u8)));
        state.devices[destination].is_some()
    }

    fn send_key_release(&self, address: c_int, _wait: bool) -> bool {
        let Some(destination) = self::address(address) else {
            return false;
        };
        let mut state = self.state();
        state.keys.push((destination as u8, None));
        state.devices[destination].is_some()
    }

    fn active_devices(&self) -> sys::CecLogicalAddresses {
        let state = self.state();
        logical_addresses(
            state
                .devices
                .iter()
                .enumerate()
                .filter(|(_, device)| device.is_some())
                .map(|(address, _)| address),
        )
    }

    fn logical_addresses(&self) -> sys::CecLogicalAddresses {
        logical_addresses(self.state().own_address.map(usize::from).into_iter())
    }

    fn active_source(&self) -> c_int {
        self.state()
            .active_source
            .map_or(sys::CECDEVICE_UNKNOWN, c_int::from)
    }

    fn is_active_source(&self, address: c_int) -> bool {
        self.state().active_source.map(c_int::from) == Some(address)
    }

    fn device_osd_name(&self, address: c_int) -> Option<String> {
        let state = self.state();
        state.devices[self::address(address)?]
            .as_ref()
            .map(|device| device.osd_name.clone())
    }

    fn device_vendor_id(&self, address: c_int) -> u32 {
        let state = self.state();
        self::address(address)
            .and_then(|address| state.devices[address].as_ref())
            .map_or(0, |device| device.vendor_id)
    }

    fn device_physical_address(&self, address: c_int) -> u16 {
        let state = self.state();
        self::address(address)
            .and_then(|address| state.devices[address].as_ref())
            .map_or(0xFFFF, |device| device.physical_address)
    }

    fn device_power_status(&self, address: c_int) -> c_int {
        let state = self.state();
        self::address(address)
            .and_then(|address| state.devices[address].as_ref())
            .map_or(sys::CEC_POWER_STATUS_UNKNOWN, |device| device.power_status)
    }

    fn poll_device(&self, address: c_int) -> bool {
        let state = self.state();
        self::address(address).is_some_and(|address| state.devices[address].is_some())
    }
}

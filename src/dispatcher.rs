//! Native callback entry points.
//!
//! The driver only accepts plain function pointers, so [`CALLBACKS`] is a
//! static table of free functions. Each one recovers the [`Dispatcher`]
//! from the opaque parameter registered next to the table, turns its
//! payload into one [`Event`] and publishes it. Nothing here may unwind
//! into the driver: malformed payloads are decoded defensively or logged
//! and ignored.

use {
    crate::{
        event::{
            Alert, AlertKind, AlertParameter, Event, KeyPress, LogLevel, LogMessage, MenuState,
            SourceActivated,
        },
        frame::Command,
        stream::Publisher,
        symbol::{self, LogicalAddress},
        sys,
    },
    log::{trace, warn},
    std::{
        ffi::{c_int, c_void, CStr},
        time::{Duration, SystemTime},
    },
};

pub static CALLBACKS: sys::Callbacks = sys::Callbacks {
    log_message: Some(on_log_message),
    key_press: Some(on_key_press),
    command_received: Some(on_command_received),
    configuration_changed: Some(on_configuration_changed),
    alert: Some(on_alert),
    menu_state_changed: Some(on_menu_state_changed),
    source_activated: Some(on_source_activated),
    command_handler: None,
};

pub struct Dispatcher {
    publisher: Publisher,
}

impl Dispatcher {
    pub(crate) fn new(publisher: Publisher) -> Self {
        Self { publisher }
    }

    /// # Safety
    ///
    /// `param` must be null or the parameter from a live
    /// [`Registration`](crate::driver::Registration).
    unsafe fn from_param<'a>(param: *mut c_void) -> Option<&'a Self> {
        unsafe { (param as *const Self).as_ref() }
    }

    fn publish(&self, event: Event) {
        trace!("publishing {event:?}");
        if !self.publisher.publish(event) {
            log::debug!("event stream closed, event discarded");
        }
    }

    /// Stop accepting events and release any callback blocked on a full
    /// stream.
    pub(crate) fn close(&self) {
        self.publisher.close();
    }
}

/// Resolve the dispatcher and payload, or log why the callback is ignored.
unsafe fn bind<'a, T>(
    callback: &str,
    param: *mut c_void,
    payload: *const T,
) -> Option<(&'a Dispatcher, &'a T)> {
    let dispatcher = unsafe { Dispatcher::from_param(param) };
    let payload = unsafe { payload.as_ref() };
    match (dispatcher, payload) {
        (Some(dispatcher), Some(payload)) => Some((dispatcher, payload)),
        _ => {
            warn!("{callback} callback with null parameter or payload ignored");
            None
        }
    }
}

/// Copy a driver-owned C string. Null decodes as empty.
unsafe fn string_from_ptr(ptr: *const std::ffi::c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned()
}

unsafe extern "C" fn on_log_message(param: *mut c_void, message: *const sys::CecLogMessage) {
    let Some((dispatcher, message)) = (unsafe { bind("log message", param, message) }) else {
        return;
    };

    dispatcher.publish(Event::LogMessage(LogMessage::new(
        LogLevel::from_raw(message.level),
        unsafe { string_from_ptr(message.message) },
        Duration::from_millis(message.time.max(0) as u64),
    )));
}

unsafe extern "C" fn on_key_press(param: *mut c_void, key: *const sys::CecKeypress) {
    let Some((dispatcher, key)) = (unsafe { bind("key press", param, key) }) else {
        return;
    };

    dispatcher.publish(Event::KeyPress(KeyPress {
        code: key.keycode,
        name: symbol::user_control_name_raw(key.keycode),
        duration: Duration::from_millis(u64::from(key.duration)),
        timestamp: SystemTime::now(),
    }));
}

unsafe extern "C" fn on_command_received(param: *mut c_void, command: *const sys::CecCommand) {
    let Some((dispatcher, command)) = (unsafe { bind("command", param, command) }) else {
        return;
    };

    dispatcher.publish(Event::Command(Command::from_raw(command)));
}

/// Configuration changes carry nothing the application consumes yet.
unsafe extern "C" fn on_configuration_changed(_param: *mut c_void, _configuration: *const c_void) {
    log::debug!("adapter configuration changed");
}

unsafe extern "C" fn on_alert(param: *mut c_void, alert: c_int, parameter: sys::LibcecParameter) {
    let Some(dispatcher) = (unsafe { Dispatcher::from_param(param) }) else {
        warn!("alert callback with null parameter ignored");
        return;
    };

    let parameter = match parameter.param_type {
        sys::CEC_PARAMETER_TYPE_STRING => AlertParameter::String(unsafe {
            string_from_ptr(parameter.param_data as *const std::ffi::c_char)
        }),
        _ => AlertParameter::Unknown,
    };

    dispatcher.publish(Event::Alert(Alert {
        kind: AlertKind::from_raw(alert),
        parameter,
        timestamp: SystemTime::now(),
    }));
}

unsafe extern "C" fn on_menu_state_changed(param: *mut c_void, state: c_int) -> c_int {
    match unsafe { Dispatcher::from_param(param) } {
        Some(dispatcher) => dispatcher.publish(Event::MenuState(MenuState::from_raw(state))),
        None => warn!("menu state callback with null parameter ignored"),
    }

    sys::MENU_STATE_HANDLED
}

unsafe extern "C" fn on_source_activated(param: *mut c_void, address: c_int, activated: u8) {
    let Some(dispatcher) = (unsafe { Dispatcher::from_param(param) }) else {
        warn!("source activated callback with null parameter ignored");
        return;
    };

    dispatcher.publish(Event::SourceActivated(SourceActivated {
        address: LogicalAddress::from_raw(address),
        activated: activated != 0,
        timestamp: SystemTime::now(),
    }));
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::stream::{self, EventStream},
        std::{ffi::CString, ptr, sync::Arc},
    };

    fn dispatcher() -> (Arc<Dispatcher>, EventStream) {
        let (publisher, events) = stream::channel();
        (Arc::new(Dispatcher::new(publisher)), events)
    }

    fn param(dispatcher: &Arc<Dispatcher>) -> *mut c_void {
        Arc::as_ptr(dispatcher) as *mut c_void
    }

    #[test]
    fn log_message_is_decoded() {
        let (dispatcher, events) = dispatcher();
        let text = CString::new("<< 10:36").unwrap();
        let message = sys::CecLogMessage {
            message: text.as_ptr(),
            level: sys::CEC_LOG_TRAFFIC,
            time: 1500,
        };

        unsafe { on_log_message(param(&dispatcher), &message) };

        let Some(Event::LogMessage(message)) = events.try_recv() else {
            panic!("expected a log message");
        };
        assert_eq!(message.level, LogLevel::Traffic);
        assert_eq!(message.message, "<< 10:36");
        assert_eq!(message.direction, crate::event::Direction::Outbound);
        assert_eq!(message.since_connection, Duration::from_millis(1500));
    }

    #[test]
    fn null_log_text_is_empty() {
        let (dispatcher, events) = dispatcher();
        let message = sys::CecLogMessage {
            message: ptr::null(),
            level: sys::CEC_LOG_ERROR,
            time: -5,
        };

        unsafe { on_log_message(param(&dispatcher), &message) };

        let Some(Event::LogMessage(message)) = events.try_recv() else {
            panic!("expected a log message");
        };
        assert!(message.message.is_empty());
        assert_eq!(message.since_connection, Duration::ZERO);
    }

    #[test]
    fn null_payload_publishes_nothing() {
        let (dispatcher, events) = dispatcher();
        unsafe {
            on_key_press(param(&dispatcher), ptr::null());
            on_command_received(param(&dispatcher), ptr::null());
            on_key_press(ptr::null_mut(), &sys::CecKeypress::default());
        }
        assert!(events.try_recv().is_none());
    }

    #[test]
    fn key_press_resolves_name() {
        let (dispatcher, events) = dispatcher();
        let key = sys::CecKeypress {
            keycode: c_int::from(symbol::key::PAUSE),
            duration: 250,
        };

        unsafe { on_key_press(param(&dispatcher), &key) };

        let Some(Event::KeyPress(key)) = events.try_recv() else {
            panic!("expected a key press");
        };
        assert_eq!(key.name, "pause");
        assert_eq!(key.duration, Duration::from_millis(250));
    }

    #[test]
    fn alert_parameter_kinds() {
        let (dispatcher, events) = dispatcher();
        let text = CString::new("/dev/ttyACM0").unwrap();

        unsafe {
            on_alert(
                param(&dispatcher),
                sys::CEC_ALERT_PORT_BUSY,
                sys::LibcecParameter {
                    param_type: sys::CEC_PARAMETER_TYPE_STRING,
                    param_data: text.as_ptr() as *mut c_void,
                },
            )
        };
        let Some(Event::Alert(alert)) = events.try_recv() else {
            panic!("expected an alert");
        };
        assert_eq!(alert.kind, AlertKind::PortBusy);
        assert_eq!(
            alert.parameter,
            AlertParameter::String("/dev/ttyACM0".to_owned())
        );

        unsafe {
            on_alert(
                param(&dispatcher),
                sys::CEC_ALERT_CONNECTION_LOST,
                sys::LibcecParameter {
                    param_type: sys::CEC_PARAMETER_TYPE_UNKNOWN,
                    param_data: ptr::null_mut(),
                },
            )
        };
        let Some(Event::Alert(alert)) = events.try_recv() else {
            panic!("expected an alert");
        };
        assert_eq!(alert.kind, AlertKind::ConnectionLost);
        assert_eq!(alert.parameter, AlertParameter::Unknown);
    }

    #[test]
    fn menu_state_acknowledges() {
        let (dispatcher, events) = dispatcher();

        let ack = unsafe { on_menu_state_changed(param(&dispatcher), 0) };
        assert_eq!(ack, sys::MENU_STATE_HANDLED);
        let Some(Event::MenuState(state)) = events.try_recv() else {
            panic!("expected a menu state");
        };
        assert!(state.activated);

        let ack = unsafe { on_menu_state_changed(ptr::null_mut(), 1) };
        assert_eq!(ack, sys::MENU_STATE_HANDLED);
    }

    #[test]
    fn configuration_changed_publishes_nothing() {
        let (dispatcher, events) = dispatcher();
        unsafe { on_configuration_changed(param(&dispatcher), ptr::null()) };
        assert!(events.try_recv().is_none());
    }

    #[test]
    fn source_activated_resolves_address() {
        let (dispatcher, events) = dispatcher();
        unsafe { on_source_activated(param(&dispatcher), 4, 1) };

        let Some(Event::SourceActivated(source)) = events.try_recv() else {
            panic!("expected a source activation");
        };
        assert_eq!(source.address, LogicalAddress::PLAYBACK_DEVICE_1);
        assert!(source.activated);
    }
}

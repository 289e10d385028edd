//! Domain events published by the dispatcher.

use {
    crate::{frame::Command, symbol::LogicalAddress, sys},
    std::{ffi::c_int, time::Duration, time::SystemTime},
};

#[derive(Debug, Clone)]
pub enum Event {
    LogMessage(LogMessage),
    KeyPress(KeyPress),
    Command(Command),
    Alert(Alert),
    MenuState(MenuState),
    SourceActivated(SourceActivated),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Notice,
    Traffic,
    Debug,
    All,
}

impl LogLevel {
    /// Levels outside the driver's enumeration are reported as `All`.
    pub fn from_raw(level: c_int) -> Self {
        match level {
            sys::CEC_LOG_ERROR => Self::Error,
            sys::CEC_LOG_WARNING => Self::Warning,
            sys::CEC_LOG_NOTICE => Self::Notice,
            sys::CEC_LOG_TRAFFIC => Self::Traffic,
            sys::CEC_LOG_DEBUG => Self::Debug,
            _ => Self::All,
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Notice => log::Level::Info,
            LogLevel::Traffic => log::Level::Debug,
            LogLevel::Debug | LogLevel::All => log::Level::Trace,
        }
    }
}

/// Which way a traffic log line travelled, from libcec's `<<` / `>>`
/// message prefixes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
    Unknown,
}

impl Direction {
    pub fn of(message: &str) -> Self {
        if message.starts_with("<<") {
            Self::Outbound
        } else if message.starts_with(">>") {
            Self::Inbound
        } else {
            Self::Unknown
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
    pub direction: Direction,
    /// Offset from when the connection was opened, as reported by the driver
    pub since_connection: Duration,
    pub timestamp: SystemTime,
}

impl LogMessage {
    pub fn new(level: LogLevel, message: String, since_connection: Duration) -> Self {
        Self {
            level,
            direction: Direction::of(&message),
            message,
            since_connection,
            timestamp: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyPress {
    pub code: c_int,
    pub name: &'static str,
    /// Zero while the key is still held
    pub duration: Duration,
    pub timestamp: SystemTime,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, strum::Display)]
pub enum AlertKind {
    #[strum(to_string = "service device")]
    ServiceDevice,
    #[strum(to_string = "connection lost")]
    ConnectionLost,
    #[strum(to_string = "permission error")]
    PermissionError,
    #[strum(to_string = "port busy")]
    PortBusy,
    #[strum(to_string = "physical address error")]
    PhysicalAddressError,
    #[strum(to_string = "tv poll failed")]
    TvPollFailed,
    #[strum(to_string = "alert {0}")]
    Unrecognised(c_int),
}

impl AlertKind {
    pub fn from_raw(code: c_int) -> Self {
        match code {
            sys::CEC_ALERT_SERVICE_DEVICE => Self::ServiceDevice,
            sys::CEC_ALERT_CONNECTION_LOST => Self::ConnectionLost,
            sys::CEC_ALERT_PERMISSION_ERROR => Self::PermissionError,
            sys::CEC_ALERT_PORT_BUSY => Self::PortBusy,
            sys::CEC_ALERT_PHYSICAL_ADDRESS_ERROR => Self::PhysicalAddressError,
            sys::CEC_ALERT_TV_POLL_FAILED => Self::TvPollFailed,
            code => Self::Unrecognised(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertParameter {
    String(String),
    Unknown,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub kind: AlertKind,
    pub parameter: AlertParameter,
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone)]
pub struct MenuState {
    pub activated: bool,
    pub timestamp: SystemTime,
}

impl MenuState {
    /// `cec_menu_state` counts activated as 0.
    pub fn from_raw(state: c_int) -> Self {
        Self {
            activated: state == sys::CEC_MENU_STATE_ACTIVATED,
            timestamp: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceActivated {
    pub address: LogicalAddress,
    pub activated: bool,
    pub timestamp: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_from_prefix() {
        assert_eq!(Direction::of("<< 10:47:43:45:43"), Direction::Outbound);
        assert_eq!(Direction::of(">> 01:8c"), Direction::Inbound);
        assert_eq!(Direction::of("CEC client registered"), Direction::Unknown);
        assert_eq!(Direction::of("<"), Direction::Unknown);
        assert_eq!(Direction::of(""), Direction::Unknown);
    }

    #[test]
    fn menu_state_polarity() {
        assert!(MenuState::from_raw(0).activated);
        assert!(!MenuState::from_raw(1).activated);
        assert!(!MenuState::from_raw(-7).activated);
    }

    #[test]
    fn log_levels() {
        assert_eq!(LogLevel::from_raw(sys::CEC_LOG_TRAFFIC), LogLevel::Traffic);
        assert_eq!(LogLevel::from_raw(3), LogLevel::All);
        assert_eq!(LogLevel::Warning.to_string(), "warning");
        assert_eq!(log::Level::from(LogLevel::Notice), log::Level::Info);
    }

    #[test]
    fn alert_kinds() {
        assert_eq!(AlertKind::from_raw(1), AlertKind::ConnectionLost);
        assert_eq!(AlertKind::from_raw(5), AlertKind::TvPollFailed);
        assert_eq!(AlertKind::from_raw(42), AlertKind::Unrecognised(42));
        assert_eq!(AlertKind::PortBusy.to_string(), "port busy");
        assert_eq!(AlertKind::Unrecognised(42).to_string(), "alert 42");
    }
}

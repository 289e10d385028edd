//! Connection lifecycle.
//!
//! A [`Client`] holds an initialised driver handle with the callback table
//! registered. Opening an adapter turns it into a [`Connection`], the only
//! place bus commands and queries are available. Dropping either releases
//! the handle after closing the event stream.

use {
    crate::{
        dispatcher::Dispatcher,
        driver::{AdapterDescriptor, Driver, Registration},
        error::{Error, Result},
        frame::{self, Command},
        stream::{self, EventStream},
        sys,
    },
    log::debug,
    serde::Deserialize,
    std::{fmt, sync::Arc, time::Duration},
    strum::{Display, EnumString},
};

/// Bytes of the OSD name a client may announce.
pub const DEVICE_NAME_CAPACITY: usize = 12;

pub const DEFAULT_OPEN_TIMEOUT: Duration =
    Duration::from_millis(sys::CEC_DEFAULT_CONNECT_TIMEOUT as u64);

pub type DeviceName = heapless::String<DEVICE_NAME_CAPACITY>;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(from = "String")]
pub enum DeviceType {
    Tv,
    #[default]
    Recording,
    Reserved,
    Tuner,
    Playback,
    Audio,
}

impl DeviceType {
    /// Unrecognised names select the default.
    pub fn from_name(name: &str) -> Self {
        name.to_ascii_lowercase().parse().unwrap_or_else(|_| {
            log::warn!("unknown device type {name:?}, using {}", Self::default());
            Self::default()
        })
    }

    pub(crate) fn code(self) -> std::ffi::c_int {
        match self {
            Self::Tv => sys::CEC_DEVICE_TYPE_TV,
            Self::Recording => sys::CEC_DEVICE_TYPE_RECORDING_DEVICE,
            Self::Reserved => sys::CEC_DEVICE_TYPE_RESERVED,
            Self::Tuner => sys::CEC_DEVICE_TYPE_TUNER,
            Self::Playback => sys::CEC_DEVICE_TYPE_PLAYBACK_DEVICE,
            Self::Audio => sys::CEC_DEVICE_TYPE_AUDIO_SYSTEM,
        }
    }
}

impl From<String> for DeviceType {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

/// What a client announces on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub device_name: DeviceName,
    pub device_type: DeviceType,
    pub open_timeout: Duration,
}

impl Configuration {
    pub fn new(device_name: &str, device_type: DeviceType) -> Self {
        Self {
            device_name: truncate_name(device_name),
            device_type,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
        }
    }

    pub fn with_open_timeout(mut self, open_timeout: Duration) -> Self {
        self.open_timeout = open_timeout;
        self
    }
}

/// Keep the longest prefix of `name` that fits, never splitting a char.
pub fn truncate_name(name: &str) -> DeviceName {
    let mut truncated = DeviceName::new();
    for c in name.chars() {
        if truncated.push(c).is_err() {
            break;
        }
    }
    truncated
}

/// Driver handle plus the dispatcher its callbacks point at.
struct Session<D: Driver> {
    // Declared first so it is released before the dispatcher it refers to
    driver: D,
    dispatcher: Arc<Dispatcher>,
}

impl<D: Driver> Drop for Session<D> {
    fn drop(&mut self) {
        // Unblock any callback waiting on the stream so the driver can
        // release its handle
        self.dispatcher.close();
        debug!("releasing driver handle");
    }
}

/// An initialised driver handle that has not opened an adapter yet.
pub struct Client<D: Driver> {
    session: Session<D>,
    configuration: Configuration,
}

impl<D: Driver> Client<D> {
    /// Register the callback table and request a driver handle. Events
    /// fired by the driver from here on appear on the returned stream.
    pub fn initialise(
        context: D::Context,
        configuration: Configuration,
    ) -> Result<(Self, EventStream)> {
        let (publisher, events) = stream::channel();
        let dispatcher = Arc::new(Dispatcher::new(publisher));
        let driver = D::initialise(context, &configuration, Registration::new(&dispatcher))
            .ok_or(Error::InitializationFailed)?;

        debug!(
            "initialised as {:?} ({})",
            configuration.device_name.as_str(),
            configuration.device_type
        );
        Ok((
            Self {
                session: Session { driver, dispatcher },
                configuration,
            },
            events,
        ))
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn adapters(&self) -> Vec<AdapterDescriptor> {
        self.session.driver.find_adapters()
    }

    /// Open the first adapter whose path or port contains `name`. On
    /// failure the client is handed back inside the error.
    pub fn open(mut self, name: &str) -> std::result::Result<Connection<D>, OpenError<D>> {
        let Some(adapter) = self
            .session
            .driver
            .find_adapters()
            .into_iter()
            .find(|adapter| adapter.matches(name))
        else {
            return Err(OpenError {
                client: self,
                error: Error::NoDeviceFound(name.to_owned()),
            });
        };

        debug!("opening {} ({})", adapter.comm, adapter.path);
        if !self
            .session
            .driver
            .open(&adapter.comm, self.configuration.open_timeout)
        {
            return Err(OpenError {
                client: self,
                error: Error::AdapterOpenFailed(adapter.comm),
            });
        }

        Ok(Connection {
            session: self.session,
            port: adapter.comm,
            configuration: self.configuration,
        })
    }
}

impl<D: Driver> fmt::Debug for Client<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}

pub struct OpenError<D: Driver> {
    client: Client<D>,
    error: Error,
}

impl<D: Driver> OpenError<D> {
    pub fn error(&self) -> &Error {
        &self.error
    }

    pub fn into_parts(self) -> (Client<D>, Error) {
        (self.client, self.error)
    }
}

impl<D: Driver> fmt::Debug for OpenError<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> fmt::Display for OpenError<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<D: Driver> std::error::Error for OpenError<D> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<D: Driver> From<OpenError<D>> for Error {
    fn from(error: OpenError<D>) -> Self {
        error.error
    }
}

/// An open adapter.
pub struct Connection<D: Driver> {
    session: Session<D>,
    port: String,
    configuration: Configuration,
}

impl<D: Driver> fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("port", &self.port)
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> Connection<D> {
    /// The port the adapter was opened on.
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub(crate) fn driver(&self) -> &D {
        &self.session.driver
    }

    /// Encode `text` and transmit it.
    pub fn transmit(&self, text: &str) -> Result<()> {
        self.transmit_command(&frame::encode(text)?)
    }

    /// Succeeds when the adapter accepts the frame, not when the
    /// destination acknowledges it.
    pub fn transmit_command(&self, command: &Command) -> Result<()> {
        debug!("transmitting {command}");
        if self.driver().transmit(&sys::CecCommand::from(command)) {
            Ok(())
        } else {
            Err(Error::TransmitFailed)
        }
    }

    /// Close the event stream and release the adapter.
    pub fn destroy(self) {
        debug!("closing {}", self.port);
    }
}

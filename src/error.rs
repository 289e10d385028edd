use crate::{frame::FrameError, query::AudioStatusError, query::Query};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("driver returned no connection handle")]
    InitializationFailed,
    #[error("no adapter matching {0:?}")]
    NoDeviceFound(String),
    #[error("failed to open adapter {0}")]
    AdapterOpenFailed(String),
    #[error("adapter rejected the frame")]
    TransmitFailed,
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("{0} failed")]
    QueryFailed(Query),
    #[error(transparent)]
    AudioStatus(#[from] AudioStatusError),
}

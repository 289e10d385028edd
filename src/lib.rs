//! Typed access to an HDMI-CEC bus through libcec.
//!
//! [`Client::initialise`] registers the callback table with a [`Driver`]
//! and returns the [`EventStream`] the driver's callbacks are published on.
//! [`Client::open`] attaches an adapter and yields the [`Connection`] that
//! transmits frames and queries devices.
//!
//! [`meta_command`] and [`socket`] carry the service's control commands
//! between short-lived invocations and a long-running connection.

pub mod config;
pub mod connection;
mod dispatcher;
pub mod driver;
pub mod error;
pub mod event;
pub mod frame;
pub mod meta_command;
pub mod query;
pub mod socket;
pub mod stream;
pub mod symbol;
pub mod sys;

pub use {
    connection::{Client, Configuration, Connection, DeviceType, OpenError},
    driver::Driver,
    error::{Error, Result},
    event::Event,
    frame::{Command, FrameError},
    stream::EventStream,
    symbol::LogicalAddress,
};

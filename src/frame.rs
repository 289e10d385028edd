//! Addressed CEC frames and their compact hex text form.
//!
//! A frame is written as hex bytes, optionally separated (`"15:82:10:00"`).
//! The first byte carries initiator and destination nibbles, the second the
//! opcode, the rest are parameters.

use {
    crate::{
        symbol::{self, LogicalAddress},
        sys,
    },
    std::{fmt, str::FromStr, time::Duration, time::SystemTime},
};

/// Most parameter bytes a single CEC frame can carry.
pub const MAX_PARAMETERS: usize = 14;

/// Header, opcode and parameters.
pub const MAX_FRAME_LEN: usize = MAX_PARAMETERS + 2;

pub const DEFAULT_TRANSMIT_TIMEOUT: Duration =
    Duration::from_millis(sys::CEC_DEFAULT_TRANSMIT_TIMEOUT as u64);

pub type ParameterBlock = heapless::Vec<u8, MAX_PARAMETERS>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("malformed hex: {0}")]
    DecodeFailed(#[from] hex::FromHexError),
    #[error("{parameters} parameter bytes exceed the limit of {MAX_PARAMETERS}")]
    TooLong { parameters: usize },
    #[error("empty frame")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub initiator: LogicalAddress,
    pub destination: LogicalAddress,
    pub ack: bool,
    pub eom: bool,
    /// `None` for polling messages, which carry no opcode
    pub opcode: Option<u8>,
    pub parameters: ParameterBlock,
    pub transmit_timeout: Duration,
    pub timestamp: SystemTime,
}

/// Parse the hex text form of a frame.
pub fn encode(text: &str) -> Result<Command, FrameError> {
    let digits: String = text
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.') && !c.is_whitespace())
        .collect();
    Command::from_bytes(&hex::decode(digits)?)
}

impl Command {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let (&header, rest) = bytes.split_first().ok_or(FrameError::Empty)?;
        let (opcode, parameters) = match rest.split_first() {
            Some((&opcode, parameters)) => (Some(opcode), parameters),
            None => (None, &[][..]),
        };
        let parameters = ParameterBlock::from_slice(parameters).map_err(|()| {
            FrameError::TooLong {
                parameters: parameters.len(),
            }
        })?;

        Ok(Self {
            initiator: LogicalAddress::from_nibble(header >> 4),
            destination: LogicalAddress::from_nibble(header),
            ack: false,
            eom: false,
            opcode,
            parameters,
            transmit_timeout: DEFAULT_TRANSMIT_TIMEOUT,
            timestamp: SystemTime::now(),
        })
    }

    /// Decode a frame handed to us by the driver. The declared parameter
    /// size is never trusted past the native buffer or the bus limit.
    pub(crate) fn from_raw(raw: &sys::CecCommand) -> Self {
        let declared = usize::from(raw.parameters.size);
        let size = declared.min(sys::CEC_MAX_DATA_PACKET_SIZE).min(MAX_PARAMETERS);
        if size != declared {
            log::warn!("command declares {declared} parameter bytes, keeping {size}");
        }

        let mut parameters = ParameterBlock::new();
        // `size` is within capacity, so this cannot fail
        let _ = parameters.extend_from_slice(&raw.parameters.data[..size]);

        Self {
            initiator: LogicalAddress::from_raw(raw.initiator),
            destination: LogicalAddress::from_raw(raw.destination),
            ack: raw.ack != 0,
            eom: raw.eom != 0,
            opcode: match raw.opcode_set {
                0 => None,
                _ => Some(raw.opcode as u8),
            },
            parameters,
            transmit_timeout: Duration::from_millis(raw.transmit_timeout.max(0) as u64),
            timestamp: SystemTime::now(),
        }
    }

    pub fn opcode_set(&self) -> bool {
        self.opcode.is_some()
    }

    pub fn opcode_name(&self) -> Option<&'static str> {
        self.opcode.map(symbol::opcode_name)
    }

    pub fn is_broadcast(&self) -> bool {
        self.destination == LogicalAddress::BROADCAST
    }

    pub fn to_bytes(&self) -> heapless::Vec<u8, MAX_FRAME_LEN> {
        let mut bytes = heapless::Vec::new();
        let _ = bytes.push((self.initiator.address() << 4) | self.destination.address());
        if let Some(opcode) = self.opcode {
            let _ = bytes.push(opcode);
            let _ = bytes.extend_from_slice(&self.parameters);
        }
        bytes
    }
}

impl FromStr for Command {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        encode(s)
    }
}

impl From<&Command> for sys::CecCommand {
    fn from(command: &Command) -> Self {
        let mut parameters = sys::CecDatapacket::default();
        parameters.data[..command.parameters.len()].copy_from_slice(&command.parameters);
        parameters.size = command.parameters.len() as u8;

        Self {
            initiator: command.initiator.raw(),
            destination: command.destination.raw(),
            ack: i8::from(command.ack),
            eom: i8::from(command.eom),
            opcode: command.opcode.map_or(0, i32::from),
            parameters,
            opcode_set: i8::from(command.opcode_set()),
            transmit_timeout: command.transmit_timeout.as_millis().min(i32::MAX as u128) as i32,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        for (i, byte) in bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

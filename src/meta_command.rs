use {
    blocking::unblock,
    crate::{
        connection::Connection,
        driver::Driver,
        error::Error,
        frame::{self, Command, FrameError, MAX_FRAME_LEN},
        query::{AudioStatusError, PowerStatus},
        symbol::{key, LogicalAddress},
    },
    clap::Subcommand,
    postcard::experimental::max_size::MaxSize,
    serde::{Deserialize, Serialize},
    std::{future::Future, str::FromStr, sync::Arc},
};

#[derive(Subcommand, Serialize, Deserialize, MaxSize, Debug, Copy, Clone)]
pub enum MetaCommand {
    #[command(subcommand, about = "Change active source device")]
    Active(Active),

    #[command(subcommand, about = "Change device power status")]
    Power(Power),

    #[command(subcommand, about = "Change TV / AVR volume")]
    Volume(Volume),

    #[command(about = "Change TV / AVR mute status")]
    Mute {
        #[command(subcommand)]
        command: Option<Mute>,
    },

    #[command(about = "Transmit a raw frame, eg. 10:04")]
    Transmit { frame: WireFrame },
}

#[derive(Subcommand, Serialize, Deserialize, MaxSize, Debug, Copy, Clone)]
pub enum Active {
    #[command(about = "Set this device as the active source")]
    Set {
        #[arg(short, long, help = "Only if there's no other active sources")]
        cooperative: bool,
    },

    #[command(about = "Unset this device as the active source")]
    Unset,
}

#[derive(Subcommand, Serialize, Deserialize, MaxSize, Debug, Copy, Clone)]
pub enum Power {
    #[command(about = "Power on all devices")]
    On,

    #[command(about = "Power off all devices")]
    Off {
        #[arg(short, long, help = "Only if this device is the active source")]
        cooperative: bool,
    },
}

#[derive(Subcommand, Serialize, Deserialize, MaxSize, Debug, Copy, Clone)]
pub enum Volume {
    #[command(about = "Increase volume")]
    Up {
        #[arg(default_value_t = 1)]
        steps: u8,
    },

    #[command(about = "Decrease volume")]
    Down {
        #[arg(default_value_t = 1)]
        steps: u8,
    },

    #[command(about = "Set volume (needs an audio system reporting its status)")]
    Set { volume: u8 },
}

#[derive(Subcommand, Serialize, Deserialize, MaxSize, Debug, Copy, Clone)]
pub enum Mute {
    #[command(about = "Toggle TV / AVR mute status [default]")]
    Toggle,

    #[command(about = "Mute TV / AVR")]
    On,

    #[command(about = "Unmute TV / AVR")]
    Off,
}

/// A validated frame in a fixed-size form that fits one datagram.
#[derive(Serialize, Deserialize, MaxSize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct WireFrame {
    len: u8,
    bytes: [u8; MAX_FRAME_LEN],
}

impl WireFrame {
    pub fn command(&self) -> Result<Command, FrameError> {
        let len = usize::from(self.len).min(MAX_FRAME_LEN);
        Command::from_bytes(&self.bytes[..len])
    }
}

impl FromStr for WireFrame {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = frame::encode(s)?.to_bytes();
        let mut bytes = [0; MAX_FRAME_LEN];
        bytes[..encoded.len()].copy_from_slice(&encoded);
        Ok(Self {
            len: encoded.len() as u8,
            bytes,
        })
    }
}

impl MetaCommand {
    pub fn run<D>(self, cec: Arc<Connection<D>>) -> impl Future<Output = Result<(), Error>>
    where
        D: Driver + Send + Sync + 'static,
    {
        unblock(move || self.run_sync(&cec))
    }

    pub fn run_sync<D: Driver>(self, cec: &Connection<D>) -> Result<(), Error> {
        match self {
            MetaCommand::Active(Active::Set { cooperative: false }) => active_set(cec),
            MetaCommand::Active(Active::Set { cooperative: true }) => active_set_cooperative(cec),
            MetaCommand::Active(Active::Unset) => cec.set_inactive_view(),
            MetaCommand::Power(Power::On) => cec.power_on(LogicalAddress::BROADCAST),
            MetaCommand::Power(Power::Off { cooperative: false }) => power_off(cec),
            MetaCommand::Power(Power::Off { cooperative: true }) => power_off_cooperative(cec),
            MetaCommand::Volume(Volume::Up { steps }) => volume_up(cec, steps),
            MetaCommand::Volume(Volume::Down { steps }) => volume_down(cec, steps),
            MetaCommand::Volume(Volume::Set { volume }) => volume_set(cec, volume),
            MetaCommand::Mute {
                command: None | Some(Mute::Toggle),
            } => mute_toggle(cec),
            MetaCommand::Mute {
                command: Some(Mute::On),
            } => mute_set(cec, true),
            MetaCommand::Mute {
                command: Some(Mute::Off),
            } => mute_set(cec, false),
            MetaCommand::Transmit { frame } => cec.transmit_command(&frame.command()?),
        }
    }
}

fn active_set<D: Driver>(cec: &Connection<D>) -> Result<(), Error> {
    cec.set_active_source(cec.configuration().device_type)
}

fn active_set_cooperative<D: Driver>(cec: &Connection<D>) -> Result<(), Error> {
    match cec.active_source().map(|source| cec.power_status(source)) {
        None
        | Some(PowerStatus::TransitionToStandby | PowerStatus::Standby | PowerStatus::Unknown) => {
            active_set(cec)
        }
        Some(PowerStatus::TransitionToOn | PowerStatus::On) => Ok(()),
    }
}

fn power_off<D: Driver>(cec: &Connection<D>) -> Result<(), Error> {
    cec.standby(LogicalAddress::BROADCAST)
}

fn power_off_cooperative<D: Driver>(cec: &Connection<D>) -> Result<(), Error> {
    let Some(active_source) = cec.active_source() else {
        return Ok(());
    };

    if cec.logical_addresses().contains(active_source) {
        power_off(cec)?
    }

    Ok(())
}

/// Audio systems that never report their status still act on the key.
fn tolerate_unknown<T>(result: Result<T, Error>) -> Result<(), Error> {
    match result {
        Ok(_) | Err(Error::AudioStatus(AudioStatusError::Unknown)) => Ok(()),
        Err(err) => Err(err),
    }
}

fn volume_up<D: Driver>(cec: &Connection<D>, steps: u8) -> Result<(), Error> {
    for _ in 0..steps {
        tolerate_unknown(cec.volume_up())?;
    }

    Ok(())
}

fn volume_down<D: Driver>(cec: &Connection<D>, steps: u8) -> Result<(), Error> {
    for _ in 0..steps {
        tolerate_unknown(cec.volume_down())?;
    }

    Ok(())
}

fn volume_set<D: Driver>(cec: &Connection<D>, volume: u8) -> Result<(), Error> {
    let status = cec.audio_status()?;
    let steps = i16::from(volume.min(100)) - i16::from(status.volume);
    if steps >= 0 {
        volume_up(cec, steps as u8)?;
    } else {
        volume_down(cec, steps.unsigned_abs() as u8)?;
    }

    Ok(())
}

fn press<D: Driver>(cec: &Connection<D>, key: u8) -> Result<(), Error> {
    cec.send_keypress(LogicalAddress::TV, key)?;
    cec.send_key_release(LogicalAddress::TV)
}

fn mute_toggle<D: Driver>(cec: &Connection<D>) -> Result<(), Error> {
    match cec.mute() {
        Ok(_) => Ok(()),
        Err(Error::AudioStatus(AudioStatusError::Unknown)) => press(cec, key::MUTE),
        Err(err) => Err(err),
    }
}

fn mute_set<D: Driver>(cec: &Connection<D>, muted: bool) -> Result<(), Error> {
    match cec.audio_status() {
        Ok(status) if status.muted == muted => Ok(()),
        Ok(_) => cec.mute().map(|_| ()),
        Err(Error::AudioStatus(AudioStatusError::Unknown)) => press(
            cec,
            if muted {
                key::MUTE_FUNCTION
            } else {
                key::RESTORE_VOLUME_FUNCTION
            },
        ),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            connection::{Client, Configuration, DeviceType},
            driver::simulated::{SimulatedBus, SimulatedDevice, SimulatedDriver},
            sys,
        },
    };

    fn connect(bus: &SimulatedBus) -> Connection<SimulatedDriver> {
        bus.add_adapter("/sys/usb1", "/dev/ttyACM0")
            .add_device(0, SimulatedDevice::new("TV", 0x00E091, 0x0000));
        let (client, _events) = Client::<SimulatedDriver>::initialise(
            bus.clone(),
            Configuration::new("cec-bridge", DeviceType::Playback),
        )
        .unwrap();
        client.open("").unwrap()
    }

    #[test]
    fn wire_frame_survives_a_datagram() {
        let command = MetaCommand::Transmit {
            frame: "15:82:10:00".parse().unwrap(),
        };
        let mut buf = [0u8; MetaCommand::POSTCARD_MAX_SIZE];
        let bytes = postcard::to_slice(&command, &mut buf).unwrap();

        let MetaCommand::Transmit { frame } = postcard::from_bytes(bytes).unwrap() else {
            panic!("expected transmit");
        };
        assert_eq!(frame.command().unwrap().to_bytes(), [0x15, 0x82, 0x10, 0x00]);
    }

    #[test]
    fn wire_frame_rejects_bad_text() {
        assert_eq!("".parse::<WireFrame>(), Err(FrameError::Empty));
        assert!(matches!(
            "zz".parse::<WireFrame>(),
            Err(FrameError::DecodeFailed(_))
        ));
    }

    #[test]
    fn transmit_sends_frame() {
        let bus = SimulatedBus::new();
        let cec = connect(&bus);
        MetaCommand::Transmit {
            frame: "10:04".parse().unwrap(),
        }
        .run_sync(&cec)
        .unwrap();
        assert_eq!(bus.transmitted(), vec![vec![0x10, 0x04]]);
    }

    #[test]
    fn volume_set_steps_towards_target() {
        let bus = SimulatedBus::new();
        let cec = connect(&bus);
        bus.set_audio_status(Some(32));

        MetaCommand::Volume(Volume::Set { volume: 35 })
            .run_sync(&cec)
            .unwrap();
        assert_eq!(cec.audio_status().unwrap().volume, 35);

        MetaCommand::Volume(Volume::Set { volume: 30 })
            .run_sync(&cec)
            .unwrap();
        assert_eq!(cec.audio_status().unwrap().volume, 30);
    }

    #[test]
    fn volume_steps_tolerate_unknown_status() {
        let bus = SimulatedBus::new();
        let cec = connect(&bus);
        MetaCommand::Volume(Volume::Up { steps: 2 })
            .run_sync(&cec)
            .unwrap();
    }

    #[test]
    fn mute_falls_back_to_key_press() {
        let bus = SimulatedBus::new();
        let cec = connect(&bus);

        MetaCommand::Mute {
            command: Some(Mute::On),
        }
        .run_sync(&cec)
        .unwrap();
        assert_eq!(bus.keys(), [(0, Some(key::MUTE_FUNCTION)), (0, None)]);
    }

    #[test]
    fn mute_on_is_idempotent_with_audio_system() {
        let bus = SimulatedBus::new();
        let cec = connect(&bus);
        bus.set_audio_status(Some(0x80 | 20));

        MetaCommand::Mute {
            command: Some(Mute::On),
        }
        .run_sync(&cec)
        .unwrap();
        assert!(cec.audio_status().unwrap().muted);

        MetaCommand::Mute {
            command: Some(Mute::Off),
        }
        .run_sync(&cec)
        .unwrap();
        assert!(!cec.audio_status().unwrap().muted);
        assert!(bus.keys().is_empty());
    }

    #[test]
    fn cooperative_power_off_needs_active_source() {
        let bus = SimulatedBus::new();
        let cec = connect(&bus);
        bus.claim_address(4);
        cec.power_on(LogicalAddress::TV).unwrap();

        MetaCommand::Power(Power::Off { cooperative: true })
            .run_sync(&cec)
            .unwrap();
        assert_eq!(
            bus.power_status_of(0),
            Some(sys::CEC_POWER_STATUS_ON)
        );

        MetaCommand::Active(Active::Set { cooperative: false })
            .run_sync(&cec)
            .unwrap();
        MetaCommand::Power(Power::Off { cooperative: true })
            .run_sync(&cec)
            .unwrap();
        assert_eq!(
            bus.power_status_of(0),
            Some(sys::CEC_POWER_STATUS_STANDBY)
        );
    }
}

use {
    async_executor::LocalExecutor,
    async_io::block_on,
    blocking::unblock,
    cec_bridge::{
        config::{Config, ConfigError},
        driver::libcec::LibCec,
        event::{AlertParameter, Event},
        meta_command::MetaCommand,
        socket, Client, Connection, DeviceType, EventStream,
    },
    clap::{Parser, Subcommand},
    env_logger::Env,
    futures_util::StreamExt,
    log::{debug, error, info, log, warn},
    std::{
        io::{self, ErrorKind},
        path::PathBuf,
        process::ExitCode,
        sync::Arc,
    },
};

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let result = args
        .config()
        .and_then(|config| block_on(args.command.unwrap_or_default().run(config)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log_error(err);
            ExitCode::FAILURE
        }
    }
}

#[derive(Parser)]
struct Args {
    #[arg(long, global = true, help = "Read settings from a TOML file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "OSD name announced on the bus")]
    device_name: Option<String>,

    #[arg(long, global = true, help = "Device type announced on the bus")]
    device_type: Option<DeviceType>,

    #[arg(long, global = true, help = "Adapter path or port to open")]
    adapter: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Args {
    fn config(&self) -> Result<Config, Error> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(device_name) = &self.device_name {
            config.device_name = device_name.clone();
        }
        if let Some(device_type) = self.device_type {
            config.device_type = device_type;
        }
        if let Some(adapter) = &self.adapter {
            config.adapter = adapter.clone();
        }

        Ok(config)
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run the cec-bridge service [default]")]
    Serve,

    #[command(about = "List CEC adapters")]
    Scan,

    #[command(flatten)]
    MetaCommand(MetaCommand),
}

impl Command {
    async fn run(self, config: Config) -> Result<(), Error> {
        match self {
            Command::Serve => serve(config).await,
            Command::Scan => scan(config).await,
            Command::MetaCommand(command) => send_or_run(config, command).await,
        }
    }
}

impl Default for Command {
    fn default() -> Self {
        Command::Serve
    }
}

async fn serve(config: Config) -> Result<(), Error> {
    let listener = socket::Listener::bind()?;
    let local_ex = LocalExecutor::new();

    local_ex
        .run(async {
            let cec = connect(&local_ex, &config).await?;
            let mut requests = listener.into_stream();
            while let Some(request) = requests.next().await {
                if let Some(command) = log_result(request) {
                    debug!("received {command:?}");
                    log_result(command.run(cec.clone()).await);
                }
            }

            Ok(())
        })
        .await
}

async fn scan(config: Config) -> Result<(), Error> {
    let local_ex = LocalExecutor::new();

    local_ex
        .run(async {
            let (client, events) = Client::<LibCec>::initialise((), config.configuration())?;
            // Discovery logs through the callbacks too
            local_ex.spawn(log_events(events)).detach();

            for adapter in unblock(move || client.adapters()).await {
                println!("{}\t{}", adapter.comm, adapter.path);
            }

            Ok(())
        })
        .await
}

async fn send_or_run(config: Config, command: MetaCommand) -> Result<(), Error> {
    match socket::send(&command).await {
        Ok(()) => return Ok(()),
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::ConnectionRefused) => {
            log_notice(
                Error::Send(err),
                "falling back to a direct CEC connection...",
            );
        }
        Err(err) => log_error(Error::Send(err)),
    };

    let local_ex = LocalExecutor::new();
    local_ex
        .run(async {
            let cec = connect(&local_ex, &config).await?;
            command.run(cec).await?;
            Ok(())
        })
        .await
}

/// Open the configured adapter, logging its events on `ex`.
async fn connect(
    ex: &LocalExecutor<'_>,
    config: &Config,
) -> Result<Arc<Connection<LibCec>>, Error> {
    let (client, events) = Client::<LibCec>::initialise((), config.configuration())?;

    // Callbacks block until their event is taken, so drain the stream
    // before the adapter starts talking
    ex.spawn(log_events(events)).detach();

    let adapter = config.adapter.clone();
    let cec = unblock(move || client.open(&adapter).map_err(cec_bridge::Error::from)).await?;
    info!("connected to {}", cec.port());
    Ok(Arc::new(cec))
}

async fn log_events(events: EventStream) {
    while let Some(event) = events.recv().await {
        match event {
            Event::LogMessage(message) => {
                log!(target: "cec", log::Level::from(message.level), "{}", message.message)
            }
            Event::KeyPress(key) => debug!(
                "key {} ({:#04x}) held {:?}",
                key.name, key.code, key.duration
            ),
            Event::Command(command) => debug!(
                "{} -> {}: {} [{command}]",
                command.initiator,
                command.destination,
                command.opcode_name().unwrap_or("poll")
            ),
            Event::Alert(alert) => match alert.parameter {
                AlertParameter::String(parameter) => warn!("{}: {parameter}", alert.kind),
                AlertParameter::Unknown => warn!("{}", alert.kind),
            },
            Event::MenuState(state) => info!(
                "menu {}",
                if state.activated {
                    "activated"
                } else {
                    "deactivated"
                }
            ),
            Event::SourceActivated(source) => info!(
                "{} {} the active source",
                source.address,
                if source.activated { "is" } else { "is no longer" }
            ),
        }
    }

    debug!("event stream closed");
}

fn log_result<T, E: Into<Error>>(result: Result<T, E>) -> Option<T> {
    match result {
        Err(err) => {
            log_error(err);
            None
        }
        Ok(ok) => Some(ok),
    }
}

fn log_error<E: Into<Error>>(err: E) {
    error!("{}", err.into());
}

fn log_notice<E: Into<Error>>(err: E, recovery_message: &str) {
    info!("{}, {}", err.into(), recovery_message);
}

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error("cec: {0}")]
    Cec(#[from] cec_bridge::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Socket(#[from] socket::Error),
    #[error("failed to send to cec-bridge service: {0}")]
    Send(io::Error),
}

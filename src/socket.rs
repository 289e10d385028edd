//! The service's unix datagram socket.
//!
//! Every datagram carries one postcard encoded [`MetaCommand`]. Datagram
//! sockets have no end of stream, so the request stream only ends when the
//! socket fails for good.

use {
    crate::meta_command::MetaCommand,
    async_io::Async,
    async_net::unix::UnixDatagram,
    futures_util::{ready, Stream},
    log::debug,
    postcard::experimental::max_size::MaxSize,
    std::{
        env, fs, io,
        os::unix::net,
        path::{Path, PathBuf},
        pin::Pin,
        sync::Arc,
        task::{Context, Poll},
    },
};

/// Where the service listens for meta commands.
pub fn path() -> PathBuf {
    let mut socket_path = env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir);

    socket_path.push("cec-bridge");
    socket_path
}

#[derive(Debug)]
pub struct Listener {
    socket: UnixDatagram,
}

impl Listener {
    /// Bind the service socket at [`path`], replacing a stale one.
    pub fn bind() -> Result<Self, Error> {
        Self::bind_at(&path())
    }

    pub fn bind_at(path: &Path) -> Result<Self, Error> {
        if let Err(err) = fs::remove_file(path) {
            if err.kind() != io::ErrorKind::NotFound {
                return Err(Error::Io(err));
            }
        }

        debug!("listening on {}", path.display());
        Ok(Self {
            socket: UnixDatagram::bind(path)?,
        })
    }

    /// Decoded requests in arrival order. A malformed datagram yields an
    /// error item and the stream carries on.
    pub fn into_stream(self) -> impl Stream<Item = Result<MetaCommand, Error>> {
        Requests {
            socket: self.socket.into(),
        }
    }
}

/// Send one meta command to a running service.
pub async fn send(command: &MetaCommand) -> Result<(), io::Error> {
    send_to(command, &path()).await
}

pub async fn send_to(command: &MetaCommand, path: &Path) -> Result<(), io::Error> {
    let mut buf = [0u8; MetaCommand::POSTCARD_MAX_SIZE];
    let datagram = postcard::to_slice(command, &mut buf)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    UnixDatagram::unbound()?.send_to(datagram, path).await?;
    Ok(())
}

fn decode(datagram: &[u8]) -> Result<MetaCommand, Error> {
    if datagram.is_empty() {
        return Err(Error::EmptyDatagram);
    }

    postcard::from_bytes(datagram).map_err(Error::InvalidCommand)
}

struct Requests {
    socket: Arc<Async<net::UnixDatagram>>,
}

impl Stream for Requests {
    type Item = Result<MetaCommand, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let mut buf = [0u8; MetaCommand::POSTCARD_MAX_SIZE];
            match self.socket.get_ref().recv(&mut buf) {
                Ok(len) => return Poll::Ready(Some(decode(&buf[..len]))),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                Err(err) => return Poll::Ready(Some(Err(Error::Io(err)))),
            }

            ready!(self.socket.poll_readable(cx))?;
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("received an empty datagram")]
    EmptyDatagram,
    #[error("invalid command: {0}")]
    InvalidCommand(postcard::Error),
}

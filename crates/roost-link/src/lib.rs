//! Serial link to the flight actuator. Commands are newline-terminated
//! `"throttle,roll,pitch,yaw"` frames; the actuator answers with free-form
//! feedback bytes that matter only as a liveness signal at startup.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::debug;

/// Upper bound on one feedback read, matching the actuator firmware buffer.
pub const MAX_FRAME_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("open actuator port {dev}: {source}")]
    Open {
        dev: String,
        #[source]
        source: tokio_serial::Error,
    },
    #[error("actuator link i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// The actuator connection, generic over its transport so tests can drive it
/// over an in-memory duplex pipe instead of real hardware.
pub struct ActuatorLink<T = SerialStream> {
    io: T,
    label: String,
    connected: bool,
}

impl ActuatorLink<SerialStream> {
    pub fn open(dev: &str, baud: u32) -> Result<Self, LinkError> {
        let io = tokio_serial::new(dev, baud)
            .open_native_async()
            .map_err(|source| LinkError::Open {
                dev: dev.to_owned(),
                source,
            })?;
        debug!("actuator link open: {} @ {}", dev, baud);
        Ok(Self {
            io,
            label: dev.to_owned(),
            connected: true,
        })
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> ActuatorLink<T> {
    pub fn from_io(io: T, label: impl Into<String>) -> Self {
        Self {
            io,
            label: label.into(),
            connected: true,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Writes one command frame. An I/O failure marks the link down.
    pub async fn send_command(&mut self, command: &str) -> Result<(), LinkError> {
        let res = async {
            self.io.write_all(command.as_bytes()).await?;
            self.io.write_all(b"\n").await?;
            self.io.flush().await?;
            Ok(())
        }
        .await;
        if res.is_err() {
            self.connected = false;
        }
        res
    }

    /// Blocks until the actuator produces feedback bytes. Returns the count.
    pub async fn read_feedback(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        match self.io.read(buf).await {
            Ok(n) => Ok(n),
            Err(e) => {
                self.connected = false;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_are_newline_framed() {
        let (ours, mut theirs) = tokio::io::duplex(1024);
        let mut link = ActuatorLink::from_io(ours, "test");
        link.send_command("1000,1500,1500,1500").await.unwrap();
        link.send_command("1200,1500,1500,1500").await.unwrap();

        let mut buf = vec![0u8; 64];
        let n = theirs.read(&mut buf).await.unwrap();
        assert_eq!(
            &buf[..n],
            b"1000,1500,1500,1500\n1200,1500,1500,1500\n" as &[u8]
        );
    }

    #[tokio::test]
    async fn feedback_bytes_are_surfaced() {
        let (ours, mut theirs) = tokio::io::duplex(64);
        let mut link = ActuatorLink::from_io(ours, "test");
        theirs.write_all(b"ok").await.unwrap();

        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = link.read_feedback(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ok");
        assert!(link.is_connected());
    }

    #[tokio::test]
    async fn a_closed_peer_marks_the_link_down() {
        let (ours, theirs) = tokio::io::duplex(8);
        drop(theirs);
        let mut link = ActuatorLink::from_io(ours, "test");
        assert!(link.send_command("1000,1500,1500,1500").await.is_err());
        assert!(!link.is_connected());
    }
}

//! TCP sender for remote collectors
//!
//! Each send is framed as a `JOB <job>` header line followed by the payload
//! and a newline, so the collector learns the job even when the payload does
//! not carry it.

use crate::core::{LoggerError, Result, Sender, SenderConfig};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

/// Sender writing job-framed payloads over one TCP connection
///
/// When credentials are configured, `AUTH <username> <token>` is written as
/// the first line of every connection. Every payload is preceded by a
/// `JOB <job>` line. A failed write drops the connection
/// and retries once on a fresh one.
///
/// # Example
///
/// ```no_run
/// use rust_cloud_logger::core::SenderConfig;
/// use rust_cloud_logger::senders::TcpSender;
///
/// let sender = TcpSender::connect(SenderConfig::new("127.0.0.1:5140"))
///     .expect("collector should be reachable");
/// ```
pub struct TcpSender {
    config: SenderConfig,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpSender {
    /// Connect to `config.endpoint`
    pub fn connect(config: SenderConfig) -> Result<Self> {
        let stream = Self::open(&config)?;
        Ok(Self {
            config,
            stream: Mutex::new(Some(stream)),
        })
    }

    /// Connect using `CLOUDLOG_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::connect(SenderConfig::from_env()?)
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn resolve(config: &SenderConfig) -> Result<SocketAddr> {
        config
            .endpoint
            .to_socket_addrs()
            .map_err(|e| LoggerError::connection(&config.endpoint, e.to_string()))?
            .next()
            .ok_or_else(|| LoggerError::connection(&config.endpoint, "no address resolved"))
    }

    fn open(config: &SenderConfig) -> Result<TcpStream> {
        let io_err = |e: std::io::Error| LoggerError::connection(&config.endpoint, e.to_string());

        let addr = Self::resolve(config)?;
        let mut stream = TcpStream::connect_timeout(&addr, config.connect_timeout).map_err(io_err)?;
        stream
            .set_write_timeout(Some(config.write_timeout))
            .map_err(io_err)?;
        stream
            .set_read_timeout(Some(config.write_timeout))
            .map_err(io_err)?;
        stream.set_nodelay(true).map_err(io_err)?;

        if let (Some(username), Some(token)) = (&config.username, &config.token) {
            writeln!(stream, "AUTH {} {}", username, token).map_err(io_err)?;
        }
        Ok(stream)
    }

    fn write_payload(stream: &mut TcpStream, job: &str, payload: &[u8]) -> std::io::Result<()> {
        let job = job.replace('\n', "\\n").replace('\r', "\\r");
        let mut frame = Vec::with_capacity(job.len() + payload.len() + 6);
        frame.extend_from_slice(b"JOB ");
        frame.extend_from_slice(job.as_bytes());
        frame.push(b'\n');
        frame.extend_from_slice(payload);
        frame.push(b'\n');
        stream.write_all(&frame)?;
        stream.flush()
    }
}

impl Sender for TcpSender {
    fn send(&self, job: &str, payload: &[u8]) -> Result<()> {
        let mut guard = self.stream.lock();

        if let Some(stream) = guard.as_mut() {
            match Self::write_payload(stream, job, payload) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(endpoint = %self.config.endpoint, error = %e, "write failed, reconnecting");
                    *guard = None;
                }
            }
        }

        let mut stream = Self::open(&self.config)?;
        Self::write_payload(&mut stream, job, payload)
            .map_err(|e| LoggerError::connection(&self.config.endpoint, e.to_string()))?;
        *guard = Some(stream);
        Ok(())
    }

    fn name(&self) -> &str {
        "tcp"
    }
}

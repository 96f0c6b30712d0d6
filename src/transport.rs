//! Connection to the host adb daemon
//!
//! The host daemon speaks a small text protocol: a request is the service
//! name prefixed by its length as four hex digits, the reply is a four byte
//! status (`OKAY` or `FAIL`). A FAIL status is followed by a hex-length
//! prefixed reason. Device services are reached by first selecting a device
//! with `host:transport:<serial>` on the same socket.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::ConnectionError;

/// Default host daemon address
pub const DEFAULT_SERVER: &str = "localhost:5037";

/// Byte stream already switched into `sync:` mode
pub trait SyncStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> SyncStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// Source of sync connections
///
/// [`AdbServer`] is the real implementation. Tests substitute in-memory
/// streams.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
	/// Open a new stream to the sync service of `serial`
	async fn open_sync(&self, serial: &str) -> Result<Box<dyn SyncStream>, ConnectionError>;

	/// One-shot host service request, returning the reply payload
	async fn query(&self, service: &str) -> Result<Vec<u8>, ConnectionError>;
}

/// The adb host daemon listening on TCP
#[derive(Debug, Clone)]
pub struct AdbServer {
	addr: String,
}

impl AdbServer {
	pub fn new(addr: impl Into<String>) -> Self {
		let addr = addr.into();
		let addr = if addr.is_empty() { DEFAULT_SERVER.to_string() } else { addr };
		AdbServer { addr }
	}

	pub fn addr(&self) -> &str {
		&self.addr
	}

	/// Open a socket and request `service` on it
	pub async fn connect(&self, service: &str) -> Result<TcpStream, ConnectionError> {
		let mut conn = TcpStream::connect(&self.addr)
			.await
			.map_err(|e| ConnectionError::DialFailed { addr: self.addr.clone(), source: e })?;
		conn.set_nodelay(true)
			.map_err(|e| ConnectionError::Io { service: service.to_string(), source: e })?;
		request_service(&mut conn, service).await?;
		Ok(conn)
	}

	/// Open a socket, select a device and request `service` on it
	pub async fn connect_device(
		&self,
		serial: &str,
		service: &str,
	) -> Result<TcpStream, ConnectionError> {
		let select = if serial.is_empty() {
			"host:transport-any".to_string()
		} else {
			format!("host:transport:{}", serial)
		};
		let mut conn = self.connect(&select).await?;
		request_service(&mut conn, service).await?;
		Ok(conn)
	}
}

impl Default for AdbServer {
	fn default() -> Self {
		AdbServer::new(DEFAULT_SERVER)
	}
}

#[async_trait]
impl Transport for AdbServer {
	async fn open_sync(&self, serial: &str) -> Result<Box<dyn SyncStream>, ConnectionError> {
		let conn = self.connect_device(serial, "sync:").await?;
		debug!("opened sync connection to {} via {}", serial, self.addr);
		Ok(Box::new(conn))
	}

	async fn query(&self, service: &str) -> Result<Vec<u8>, ConnectionError> {
		let mut conn = self.connect(service).await?;
		recv_message(&mut conn)
			.await
			.map_err(|e| ConnectionError::Io { service: service.to_string(), source: e })
	}
}

/// Send a service request and require an OKAY status
pub async fn request_service<S>(conn: &mut S, service: &str) -> Result<(), ConnectionError>
where
	S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
	let io_err = |e| ConnectionError::Io { service: service.to_string(), source: e };
	send_message(conn, service).await.map_err(io_err)?;
	let status = recv_status(conn).await.map_err(io_err)?;
	if status == *b"OKAY" {
		return Ok(());
	}
	// FAIL carries a reason; anything else is reported as is
	let reason = if status == *b"FAIL" { recv_message(conn).await.ok() } else { None };
	Err(ConnectionError::ServiceRefused {
		service: service.to_string(),
		status: String::from_utf8_lossy(&status).into_owned(),
		reason: reason.map(|r| String::from_utf8_lossy(&r).into_owned()),
	})
}

/// Write `msg` prefixed by its length as four lowercase hex digits
pub async fn send_message<W>(conn: &mut W, msg: &str) -> std::io::Result<()>
where
	W: AsyncWrite + Unpin + ?Sized,
{
	if msg.len() > 0xffff {
		return Err(std::io::Error::new(
			std::io::ErrorKind::InvalidInput,
			format!("service name too long ({} bytes)", msg.len()),
		));
	}
	conn.write_all(format!("{:04x}{}", msg.len(), msg).as_bytes()).await?;
	conn.flush().await
}

async fn recv_status<R>(conn: &mut R) -> std::io::Result<[u8; 4]>
where
	R: AsyncRead + Unpin + ?Sized,
{
	let mut b = [0u8; 4];
	conn.read_exact(&mut b).await?;
	Ok(b)
}

/// Read a message prefixed by its length as four hex digits
pub async fn recv_message<R>(conn: &mut R) -> std::io::Result<Vec<u8>>
where
	R: AsyncRead + Unpin + ?Sized,
{
	let prefix = recv_status(conn).await?;
	let len = std::str::from_utf8(&prefix)
		.ok()
		.and_then(|s| usize::from_str_radix(s, 16).ok())
		.ok_or_else(|| {
			std::io::Error::new(
				std::io::ErrorKind::InvalidData,
				format!("invalid length prefix {:?}", String::from_utf8_lossy(&prefix)),
			)
		})?;
	let mut buf = vec![0u8; len];
	conn.read_exact(&mut buf).await?;
	Ok(buf)
}


// vim: ts=4

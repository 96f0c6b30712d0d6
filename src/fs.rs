//! Read-only view of a device filesystem over the sync protocol
//!
//! [`AdbFs`] is the entry point. Every operation borrows a connection from
//! the pool for the duration of one exchange and gives it back afterwards;
//! a connection that broke mid-frame is evicted instead. Closing the
//! filesystem aborts exchanges still running with a closed error.
//!
//! Prefer [`AdbFs::stat`], [`AdbFs::read_dir`] and [`AdbFs::read_file`] over
//! [`AdbFs::open`]: `open` always costs an extra stat round trip, and an open
//! regular file keeps its connection until it is read to the end or closed.
//!
//! ```ignore
//! use adbfs::{AdbFs, AdbServer};
//! use std::sync::Arc;
//!
//! let fs = AdbFs::connect(Arc::new(AdbServer::default()), None).await?;
//! for entry in fs.read_dir("sdcard").await? {
//!     println!("{} {}", entry.metadata().mode(), entry.name());
//! }
//! fs.close().await;
//! ```

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ConnectionError, PathError, SyncError};
use crate::file::File;
use crate::metadata::{DirEntry, FileInfo, FileMode};
use crate::pool::{ConnPool, PooledConn};
use crate::protocol::{codec, StatV1, SyncId};
use crate::transport::{AdbServer, SyncStream, Transport};
use crate::validation::{base_name, device_path, validate_path};

struct FsInner {
	features: Vec<String>,
	pool: ConnPool,
}

/// Filesystem of one device
///
/// Cheap to clone; clones share the connection pool. Call [`AdbFs::close`]
/// when done: it closes idle connections at once and makes every running or
/// later operation fail with a closed error, reads on open files included.
#[derive(Clone)]
pub struct AdbFs {
	inner: Arc<FsInner>,
}

impl AdbFs {
	/// Connect to device `serial`, or to the only attached device if `None`
	///
	/// Resolves the serial, reads the device feature list and opens one sync
	/// connection to make sure the device is reachable.
	pub async fn connect(
		transport: Arc<dyn Transport>,
		serial: Option<&str>,
	) -> Result<AdbFs, ConnectionError> {
		let serial = match serial {
			Some(serial) => serial.to_string(),
			None => {
				let buf = transport
					.query("host:get-serialno")
					.await
					.map_err(|e| ConnectionError::step("get any device serial number", e))?;
				String::from_utf8_lossy(&buf).into_owned()
			}
		};

		let buf = transport
			.query(&format!("host-serial:{}:features", serial))
			.await
			.map_err(|e| ConnectionError::step("get device features", e))?;
		let features: Vec<String> = String::from_utf8_lossy(&buf)
			.split(',')
			.filter(|f| !f.is_empty())
			.map(str::to_string)
			.collect();
		debug!("device {} features: {:?}", serial, features);

		let fs = AdbFs { inner: Arc::new(FsInner { features, pool: ConnPool::new(transport, serial) }) };

		match fs.pool().lend().await {
			Ok(conn) => fs.pool().release(conn),
			Err(SyncError::Connection(e)) => return Err(e),
			Err(e) => {
				return Err(ConnectionError::Sync {
					step: "connect to sync service",
					source: Box::new(e),
				})
			}
		}
		info!("connected to device {}", fs.serial());
		Ok(fs)
	}

	/// Connect through the host daemon named in `config`
	pub async fn connect_with(config: &Config) -> Result<AdbFs, ConnectionError> {
		let server = AdbServer::new(config.server.clone());
		AdbFs::connect(Arc::new(server), config.serial.as_deref()).await
	}

	pub fn serial(&self) -> &str {
		self.inner.pool.serial()
	}

	/// Feature strings advertised by the device
	///
	/// Informational only: this client always speaks protocol v1.
	pub fn features(&self) -> &[String] {
		&self.inner.features
	}

	pub fn supports(&self, feature: &str) -> bool {
		self.inner.features.iter().any(|f| f == feature)
	}

	/// Connection pool, for inspection
	pub fn pool(&self) -> &ConnPool {
		&self.inner.pool
	}

	/// Close all connections; later operations fail with a closed error
	pub async fn close(&self) {
		self.inner.pool.close_all().await;
	}

	pub fn is_closed(&self) -> bool {
		self.inner.pool.is_closed()
	}

	async fn lend(&self, op: &'static str, name: &str) -> Result<PooledConn, PathError> {
		self.pool().lend().await.map_err(|e| PathError::new(op, name, e))
	}

	/// Metadata of `name`
	///
	/// A path the daemon cannot stat fails with [`crate::ErrorKind::NotFound`];
	/// protocol v1 reports not-found and permission-denied identically.
	pub async fn stat(&self, name: &str) -> Result<FileInfo, PathError> {
		check_path("stat", name)?;
		let mut conn = self.lend("stat", name).await?;
		let result = conn.exchange(|s| stat_remote(s, name)).await;
		self.pool().finish(conn, &result);
		let st = result.map_err(|e| PathError::new("stat", name, e))?;
		Ok(FileInfo::from_stat(base_name(name), &st))
	}

	/// Entries of directory `name`, without `.` and `..`
	///
	/// An empty listing of something that exists but is not a directory
	/// fails with [`crate::ErrorKind::NotADirectory`], and of something that
	/// cannot be stat'ed with [`crate::ErrorKind::NotFound`].
	pub async fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>, PathError> {
		check_path("readdir", name)?;
		let mut conn = self.lend("readdir", name).await?;
		let result = conn.exchange(|s| read_dir_remote(s, name)).await;
		self.pool().finish(conn, &result);
		result.map_err(|e| PathError::new("readdir", name, e))
	}

	/// Whole contents of file `name`
	pub async fn read_file(&self, name: &str) -> Result<Vec<u8>, PathError> {
		check_path("readfile", name)?;
		let mut conn = self.lend("readfile", name).await?;
		match conn.exchange(|s| read_file_remote(s, name)).await {
			Ok(data) => {
				self.pool().release(conn);
				Ok(data)
			}
			Err(e) => {
				// a transfer cut short leaves unread chunks on the stream
				self.pool().evict(conn);
				Err(PathError::new("readfile", name, e))
			}
		}
	}

	/// Open `name` for streaming reads (or, for a directory, listing)
	///
	/// Always stats first. A regular file keeps a dedicated connection until
	/// it reaches end of stream or is closed.
	pub async fn open(&self, name: &str) -> Result<File, PathError> {
		check_path("open", name)?;
		let mut conn = self.lend("open", name).await?;

		let st = match conn.exchange(|s| stat_remote(s, name)).await {
			Ok(st) => st,
			Err(e) => {
				if e.breaks_stream() {
					self.pool().evict(conn);
				} else {
					self.pool().release(conn);
				}
				return Err(PathError::new("open", name, e));
			}
		};

		if FileMode::from_raw(st.mode).is_dir() {
			self.pool().release(conn);
			return Ok(File::directory(self.clone(), name, st));
		}

		let path = device_path(name);
		if let Err(e) = conn.exchange(|s| codec::send_request(s, SyncId::RECV_V1, &path)).await {
			self.pool().evict(conn);
			return Err(PathError::new("open", name, e));
		}
		Ok(File::reading(self.clone(), name, st, conn))
	}
}

impl std::fmt::Debug for AdbFs {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AdbFs")
			.field("serial", &self.serial())
			.field("features", &self.inner.features)
			.field("closed", &self.is_closed())
			.finish()
	}
}

fn check_path(op: &'static str, name: &str) -> Result<(), PathError> {
	validate_path(name).map_err(|e| {
		debug!("{} {:?} rejected: {}", op, name, e);
		PathError::new(op, name, SyncError::InvalidPath)
	})
}

/// LSTAT `name`; an all-zero reply means not found (or permission denied)
async fn stat_remote(stream: &mut dyn SyncStream, name: &str) -> Result<StatV1, SyncError> {
	codec::send_request(stream, SyncId::LSTAT_V1, &device_path(name)).await?;
	let st = codec::read_record::<StatV1, _>(stream)
		.await?
		.ok_or_else(|| SyncError::protocol("unexpected DONE in reply to STAT"))?;
	if st.is_unknown() {
		return Err(SyncError::NotFoundOrDenied);
	}
	Ok(st)
}

async fn read_dir_remote(
	stream: &mut dyn SyncStream,
	name: &str,
) -> Result<Vec<DirEntry>, SyncError> {
	codec::send_request(stream, SyncId::LIST_V1, &device_path(name)).await?;

	let mut entries = Vec::new();
	let mut seen = false;
	while let Some((dent, raw_name)) = codec::read_dent(stream).await? {
		seen = true;
		if raw_name == b"." || raw_name == b".." {
			continue;
		}
		let entry_name = String::from_utf8_lossy(&raw_name).into_owned();
		entries.push(DirEntry::new(entry_name, &dent.stat()));
	}

	if !seen {
		// missing, unreadable and non-directory paths all list as empty
		let st = stat_remote(stream, name).await?;
		if !FileMode::from_raw(st.mode).is_dir() {
			return Err(SyncError::NotADirectory);
		}
	}
	Ok(entries)
}

async fn read_file_remote(stream: &mut dyn SyncStream, name: &str) -> Result<Vec<u8>, SyncError> {
	codec::send_request(stream, SyncId::RECV_V1, &device_path(name)).await?;
	let mut buf = Vec::new();
	while codec::read_chunk(stream, &mut buf).await?.is_some() {}
	Ok(buf)
}

// vim: ts=4

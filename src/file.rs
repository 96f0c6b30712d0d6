//! Open file handles
//!
//! A handle on a regular file owns one pooled connection on which RECV has
//! been sent. Data chunks are pulled from it as the caller reads. At the end
//! of the transfer the connection goes back to the pool; closing (or
//! dropping) the handle before that evicts it, since unread chunks are still
//! in flight. Closing the filesystem fails any further read with a closed
//! error.

use std::cmp;
use std::mem;

use tracing::trace;

use crate::error::{PathError, SyncError};
use crate::fs::AdbFs;
use crate::metadata::{DirEntry, FileInfo, FileMode};
use crate::pool::PooledConn;
use crate::protocol::codec::{self, SYNC_DATA_MAX};
use crate::protocol::StatV1;
use crate::validation::base_name;

/// Largest buffer [`File::read_to_end`] reserves up front
const READ_AHEAD_MAX: u32 = 16 * SYNC_DATA_MAX;

enum State {
	/// Directory handle, no connection
	Directory,
	/// Transfer in progress; `chunk[pos..]` is not yet handed out
	Reading { conn: PooledConn, chunk: Vec<u8>, pos: usize },
	/// Transfer complete, connection returned to the pool
	Exhausted,
	/// Transfer failed, connection evicted
	Failed(SyncError),
	/// Closed before the end of the transfer, connection evicted
	Closed,
}

/// Handle returned by [`AdbFs::open`]
pub struct File {
	fs: AdbFs,
	name: String,
	st: StatV1,
	state: State,
}

impl File {
	pub(crate) fn directory(fs: AdbFs, name: &str, st: StatV1) -> Self {
		File { fs, name: name.to_string(), st, state: State::Directory }
	}

	pub(crate) fn reading(fs: AdbFs, name: &str, st: StatV1, conn: PooledConn) -> Self {
		File {
			fs,
			name: name.to_string(),
			st,
			state: State::Reading { conn, chunk: Vec::new(), pos: 0 },
		}
	}

	/// Path this handle was opened with
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Metadata captured when the handle was opened
	pub fn stat(&self) -> FileInfo {
		FileInfo::from_stat(base_name(&self.name), &self.st)
	}

	fn is_dir(&self) -> bool {
		FileMode::from_raw(self.st.mode).is_dir()
	}

	/// Read up to `buf.len()` bytes; `Ok(0)` means end of file
	///
	/// Once the end is reached, further reads keep returning `Ok(0)`. Once a
	/// read failed, further reads return the same error. An empty `buf` reads
	/// nothing but still reports the state of the handle.
	pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, PathError> {
		loop {
			let fetched = match &mut self.state {
				State::Directory => return Err(self.error(SyncError::IsADirectory)),
				State::Exhausted => return Ok(0),
				State::Failed(e) => {
					let e = e.duplicate();
					return Err(self.error(e));
				}
				State::Closed => return Err(self.error(SyncError::Closed)),
				State::Reading { conn, chunk, pos } => {
					if conn.pool_closed() {
						Err(SyncError::Closed)
					} else if buf.is_empty() {
						return Ok(0);
					} else if *pos < chunk.len() {
						let n = cmp::min(buf.len(), chunk.len() - *pos);
						buf[..n].copy_from_slice(&chunk[*pos..*pos + n]);
						*pos += n;
						return Ok(n);
					} else {
						chunk.clear();
						*pos = 0;
						conn.exchange(move |s| codec::read_chunk(s, chunk)).await
					}
				}
			};

			match fetched {
				// empty chunks are legal; go round again
				Ok(Some(_)) => {}
				Ok(None) => {
					if let State::Reading { conn, .. } = mem::replace(&mut self.state, State::Exhausted)
					{
						trace!("{}: end of transfer", self.name);
						self.fs.pool().release(conn);
					}
					return Ok(0);
				}
				Err(e) => {
					let latched = e.duplicate();
					if let State::Reading { conn, .. } =
						mem::replace(&mut self.state, State::Failed(latched))
					{
						self.fs.pool().evict(conn);
					}
					return Err(self.error(e));
				}
			}
		}
	}

	/// Read everything that is left
	pub async fn read_to_end(&mut self) -> Result<Vec<u8>, PathError> {
		// the reported size may be bogus
		let mut out = Vec::with_capacity(cmp::min(self.st.size, READ_AHEAD_MAX) as usize);
		let mut buf = vec![0u8; SYNC_DATA_MAX as usize];
		loop {
			let n = self.read(&mut buf).await?;
			if n == 0 {
				return Ok(out);
			}
			out.extend_from_slice(&buf[..n]);
		}
	}

	/// List the directory this handle refers to
	///
	/// Each call is a fresh listing on a pooled connection.
	pub async fn read_dir(&self) -> Result<Vec<DirEntry>, PathError> {
		if !self.is_dir() {
			return Err(PathError::new("readdir", self.name.as_str(), SyncError::NotADirectory));
		}
		self.fs.read_dir(&self.name).await
	}

	/// Stop reading
	///
	/// If the transfer is still running its connection is evicted and later
	/// reads fail with a closed error. A finished handle is left as it is.
	pub fn close(&mut self) {
		if let State::Reading { .. } = self.state {
			if let State::Reading { conn, .. } = mem::replace(&mut self.state, State::Closed) {
				self.fs.pool().evict(conn);
			}
		}
	}

	/// Whether the handle still holds a pooled connection
	pub fn holds_connection(&self) -> bool {
		matches!(self.state, State::Reading { .. })
	}

	fn error(&self, e: SyncError) -> PathError {
		PathError::new("read", self.name.as_str(), e)
	}
}

impl Drop for File {
	fn drop(&mut self) {
		self.close();
	}
}

impl std::fmt::Debug for File {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("File")
			.field("name", &self.name)
			.field("stat", &self.st)
			.field("holds_connection", &self.holds_connection())
			.finish()
	}
}

// vim: ts=4

//! Pool of sync connections to one device
//!
//! Each sync connection can carry one exchange at a time, so the pool hands
//! out a connection exclusively ([`ConnPool::lend`]) and takes it back
//! afterwards ([`ConnPool::release`]). A connection whose byte stream is no
//! longer aligned on a frame boundary is destroyed ([`ConnPool::evict`]).
//!
//! The mutex only guards the free/busy table; it is never held while dialing
//! or doing any other I/O. There is no upper bound on the number of
//! connections: when none is free a new one is opened.
//!
//! Closing the pool also reaches lent connections: every exchange runs
//! through [`PooledConn::exchange`], which gives up with a closed error as
//! soon as the pool is closed.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::error::{ConnectionError, SyncError};
use crate::protocol::codec;
use crate::transport::{SyncStream, Transport};

/// Identity of a pooled connection, never reused within a pool
pub type ConnId = u64;

enum Slot {
	/// Idle, stream owned by the pool
	Free(Box<dyn SyncStream>),
	/// Lent out, stream owned by the borrower
	Busy,
}

#[derive(Default)]
struct PoolState {
	closed: bool,
	slots: HashMap<ConnId, Slot>,
}

/// A connection lent out by the pool
pub struct PooledConn {
	id: ConnId,
	stream: Box<dyn SyncStream>,
	closed: watch::Receiver<bool>,
}

impl PooledConn {
	pub fn id(&self) -> ConnId {
		self.id
	}

	/// Whether the owning pool has been closed since this was lent
	pub fn pool_closed(&self) -> bool {
		*self.closed.borrow()
	}

	/// Run one exchange on the stream
	///
	/// Fails with [`SyncError::Closed`] without touching the stream if the
	/// pool is already closed, and abandons the exchange mid-flight if the
	/// pool is closed while it runs. The stream is then at an unknown
	/// position; the caller drops the connection either way.
	pub async fn exchange<'a, T, F, Fut>(&'a mut self, exchange: F) -> Result<T, SyncError>
	where
		F: FnOnce(&'a mut dyn SyncStream) -> Fut,
		Fut: Future<Output = Result<T, SyncError>> + 'a,
	{
		let PooledConn { id, stream, closed } = self;
		if *closed.borrow() {
			return Err(SyncError::Closed);
		}
		let work = exchange(&mut **stream);
		tokio::select! {
			result = work => result,
			_ = wait_closed(closed) => {
				debug!("sync connection #{}: exchange abandoned, pool closed", id);
				Err(SyncError::Closed)
			}
		}
	}
}

/// Resolves once the pool is closed; never resolves if the pool is dropped
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
	loop {
		let is_closed = *closed.borrow_and_update();
		if is_closed {
			return;
		}
		if closed.changed().await.is_err() {
			std::future::pending::<()>().await;
		}
	}
}

impl fmt::Debug for PooledConn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PooledConn").field("id", &self.id).finish()
	}
}

/// Connection pool for one device serial
pub struct ConnPool {
	transport: Arc<dyn Transport>,
	serial: String,
	next_id: AtomicU64,
	state: Mutex<PoolState>,
	closed: watch::Sender<bool>,
}

impl ConnPool {
	pub fn new(transport: Arc<dyn Transport>, serial: impl Into<String>) -> Self {
		ConnPool {
			transport,
			serial: serial.into(),
			next_id: AtomicU64::new(1),
			state: Mutex::new(PoolState::default()),
			closed: watch::channel(false).0,
		}
	}

	fn lock(&self) -> MutexGuard<'_, PoolState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	pub fn serial(&self) -> &str {
		&self.serial
	}

	/// Borrow a free connection, opening a new one if none is free
	pub async fn lend(&self) -> Result<PooledConn, SyncError> {
		{
			let mut state = self.lock();
			if state.closed {
				return Err(SyncError::Closed);
			}
			let free = state
				.slots
				.iter()
				.find_map(|(id, slot)| if let Slot::Free(_) = slot { Some(*id) } else { None });
			if let Some(id) = free {
				if let Some(Slot::Free(stream)) = state.slots.insert(id, Slot::Busy) {
					trace!("lend sync connection #{}", id);
					return Ok(PooledConn { id, stream, closed: self.closed.subscribe() });
				}
			}
		}

		let stream = self
			.transport
			.open_sync(&self.serial)
			.await
			.map_err(|e| ConnectionError::step("connect to sync service", e))?;
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);

		let mut state = self.lock();
		if state.closed {
			// closed while dialing; the new stream is dropped here
			return Err(SyncError::Closed);
		}
		state.slots.insert(id, Slot::Busy);
		debug!("opened sync connection #{} ({} in pool)", id, state.slots.len());
		Ok(PooledConn { id, stream, closed: self.closed.subscribe() })
	}

	/// Return a connection after a complete exchange
	///
	/// A connection that is no longer a pool member (evicted, or the pool was
	/// closed meanwhile) is dropped instead.
	pub fn release(&self, conn: PooledConn) {
		let mut state = self.lock();
		if let Some(slot) = state.slots.get_mut(&conn.id) {
			if let Slot::Busy = slot {
				trace!("release sync connection #{}", conn.id);
				*slot = Slot::Free(conn.stream);
				return;
			}
		}
		debug!("dropping sync connection #{} outside the pool", conn.id);
	}

	/// Destroy a connection whose stream position is undefined
	pub fn evict(&self, conn: PooledConn) {
		let mut state = self.lock();
		state.slots.remove(&conn.id);
		warn!("evicted sync connection #{} ({} left in pool)", conn.id, state.slots.len());
		// dropping the stream closes it
	}

	/// Release or evict depending on how the exchange ended
	pub fn finish<T>(&self, conn: PooledConn, result: &Result<T, SyncError>) {
		match result {
			Err(e) if e.breaks_stream() => self.evict(conn),
			_ => self.release(conn),
		}
	}

	/// Close every connection and refuse further lending
	///
	/// Idle connections get QUIT and are shut down here. Lent connections are
	/// told through their [`PooledConn::exchange`] signal: a running exchange
	/// fails with a closed error and the borrower drops the stream.
	pub async fn close_all(&self) {
		let (idle, busy): (Vec<(ConnId, Box<dyn SyncStream>)>, usize) = {
			let mut state = self.lock();
			state.closed = true;
			let mut busy = 0;
			let idle = state
				.slots
				.drain()
				.filter_map(|(id, slot)| match slot {
					Slot::Free(stream) => Some((id, stream)),
					Slot::Busy => {
						busy += 1;
						None
					}
				})
				.collect();
			(idle, busy)
		};
		self.closed.send_replace(true);
		if busy > 0 {
			debug!("aborting {} lent sync connection(s)", busy);
		}

		for (id, mut stream) in idle {
			if let Err(e) = codec::send_quit(stream.as_mut()).await {
				debug!("sync connection #{}: QUIT failed: {}", id, e);
			}
			if let Err(e) = stream.shutdown().await {
				debug!("sync connection #{}: shutdown failed: {}", id, e);
			}
		}
		debug!("sync connection pool for {} closed", self.serial);
	}

	pub fn is_closed(&self) -> bool {
		self.lock().closed
	}

	/// Number of member connections, free and busy
	pub fn len(&self) -> usize {
		self.lock().slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Number of idle connections
	pub fn free_count(&self) -> usize {
		self.lock().slots.values().filter(|s| matches!(s, Slot::Free(_))).count()
	}
}

impl fmt::Debug for ConnPool {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConnPool").field("serial", &self.serial).finish()
	}
}


// vim: ts=4

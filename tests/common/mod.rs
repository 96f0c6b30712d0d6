//! In-memory device for integration tests
//!
//! `StubDevice` holds a small file tree and answers sync requests the way
//! the device daemon does: listings start with `.` and `..`, DONE carries a
//! zeroed body, failures are libc-style texts. `StubTransport` hands out
//! `tokio::io::duplex` streams, each served by its own task.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{duplex, AsyncRead, AsyncWrite, AsyncWriteExt};

use adbfs::protocol::{codec, SyncId};
use adbfs::{AdbFs, ConnectionError, SyncStream, Transport};

pub const SERIAL: &str = "emulator-5554";
pub const FEATURES: &str = "shell_v2,cmd,stat_v2,ls_v2,fixed_push_mkdir,apex,abb";

// ============================================================================
// Device model
// ============================================================================

#[derive(Debug, Clone)]
pub enum Node {
	Dir { mode: u32, mtime: u32 },
	File { mode: u32, mtime: u32, data: Vec<u8> },
	/// Exists but cannot be read: stat is all zero, RECV fails
	Denied,
	/// Answers with a malformed frame
	Garbled,
	/// Regular file whose transfer breaks after a first chunk of `abc`
	GarbledData { size: u32 },
	/// Regular file whose stat reports `size` whatever the real length
	Misreported { size: u32, data: Vec<u8> },
	/// Stats as a regular file; listings and transfers never get an answer
	Stall,
}

#[derive(Default)]
pub struct Stats {
	pub requests: AtomicUsize,
	pub sessions_closed: AtomicUsize,
	pub log: Mutex<Vec<(String, String)>>,
}

pub struct StubDevice {
	nodes: BTreeMap<String, Node>,
	raw_listings: BTreeMap<String, Vec<(String, u32)>>,
	chunk_size: usize,
	pub stats: Stats,
}

impl StubDevice {
	pub fn new() -> Self {
		let mut nodes = BTreeMap::new();
		nodes.insert("/".to_string(), Node::Dir { mode: 0o40755, mtime: 1 });
		StubDevice {
			nodes,
			raw_listings: BTreeMap::new(),
			chunk_size: 64 * 1024,
			stats: Stats::default(),
		}
	}

	pub fn dir(mut self, path: &str) -> Self {
		self.nodes.insert(path.to_string(), Node::Dir { mode: 0o40755, mtime: 1_600_000_000 });
		self
	}

	pub fn file(self, path: &str, data: &[u8]) -> Self {
		self.file_with(path, 0o100644, 1_700_000_000, data)
	}

	pub fn file_with(mut self, path: &str, mode: u32, mtime: u32, data: &[u8]) -> Self {
		self.nodes.insert(path.to_string(), Node::File { mode, mtime, data: data.to_vec() });
		self
	}

	pub fn node(mut self, path: &str, node: Node) -> Self {
		self.nodes.insert(path.to_string(), node);
		self
	}

	/// Replace the generated listing of `path` with exactly these entries
	pub fn raw_listing(mut self, path: &str, entries: &[(&str, u32)]) -> Self {
		self.raw_listings
			.insert(path.to_string(), entries.iter().map(|(n, m)| (n.to_string(), *m)).collect());
		self
	}

	pub fn chunk_size(mut self, size: usize) -> Self {
		self.chunk_size = size;
		self
	}

	pub fn requests(&self) -> usize {
		self.stats.requests.load(Ordering::SeqCst)
	}

	pub fn sessions_closed(&self) -> usize {
		self.stats.sessions_closed.load(Ordering::SeqCst)
	}

	/// (tag, path) of every request received so far
	pub fn log(&self) -> Vec<(String, String)> {
		self.stats.log.lock().unwrap().clone()
	}

	fn parent(path: &str) -> &str {
		match path.rfind('/') {
			Some(0) => "/",
			Some(i) => &path[..i],
			None => "/",
		}
	}

	fn children(&self, dir: &str) -> Vec<(String, &Node)> {
		self.nodes
			.iter()
			.filter(|(p, _)| p.as_str() != "/" && Self::parent(p) == dir)
			.map(|(p, n)| (p.rsplit('/').next().unwrap_or("").to_string(), n))
			.collect()
	}

	fn stat_words(node: Option<&Node>) -> [u32; 3] {
		match node {
			Some(Node::Dir { mode, mtime }) => [*mode, 4096, *mtime],
			Some(Node::File { mode, mtime, data }) => [*mode, data.len() as u32, *mtime],
			Some(Node::GarbledData { size }) | Some(Node::Misreported { size, .. }) => {
				[0o100644, *size, 1_700_000_000]
			}
			Some(Node::Stall) => [0o100644, 100, 1_700_000_000],
			_ => [0, 0, 0],
		}
	}

	fn respond(&self, id: SyncId, path: &str) -> Option<Vec<u8>> {
		let mut out = Vec::new();
		let node = self.nodes.get(path);
		if let Some(Node::Stall) = node {
			if id == SyncId::LIST_V1 || id == SyncId::RECV_V1 {
				return Some(out);
			}
		}
		match id {
			SyncId::LSTAT_V1 => {
				if let Some(Node::Garbled) = node {
					out.extend_from_slice(b"JUNK");
					return Some(out);
				}
				out.extend_from_slice(b"STAT");
				for w in Self::stat_words(node).iter() {
					out.extend_from_slice(&w.to_le_bytes());
				}
			}
			SyncId::LIST_V1 => {
				let entries: Vec<(String, u32)> = if let Some(raw) = self.raw_listings.get(path) {
					raw.clone()
				} else if let Some(Node::Dir { mode, .. }) = node {
					let mut v = vec![(".".to_string(), *mode), ("..".to_string(), 0o40755)];
					for (name, child) in self.children(path) {
						v.push((name, Self::stat_words(Some(child))[0]));
					}
					v
				} else {
					Vec::new()
				};
				for (name, mode) in entries {
					out.extend_from_slice(b"DENT");
					for w in [mode, 0, 1_650_000_000, name.len() as u32].iter() {
						out.extend_from_slice(&w.to_le_bytes());
					}
					out.extend_from_slice(name.as_bytes());
				}
				out.extend_from_slice(b"DONE");
				out.extend_from_slice(&[0u8; 16]);
			}
			SyncId::RECV_V1 => match node {
				Some(Node::File { data, .. }) | Some(Node::Misreported { data, .. }) => {
					for chunk in data.chunks(self.chunk_size) {
						out.extend_from_slice(b"DATA");
						out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
						out.extend_from_slice(chunk);
					}
					out.extend_from_slice(b"DONE");
					out.extend_from_slice(&[0u8; 4]);
				}
				Some(Node::Garbled) | Some(Node::GarbledData { .. }) => {
					out.extend_from_slice(b"DATA");
					out.extend_from_slice(&3u32.to_le_bytes());
					out.extend_from_slice(b"abc");
					out.extend_from_slice(b"JUNK");
				}
				Some(Node::Dir { .. }) => fail(&mut out, "read failed: Is a directory"),
				Some(Node::Denied) => fail(&mut out, "open failed: Permission denied"),
				None => fail(&mut out, "open failed: No such file or directory"),
				Some(Node::Stall) => {}
			},
			SyncId::QUIT => return None,
			_ => fail(&mut out, "unknown command"),
		}
		Some(out)
	}
}

fn fail(out: &mut Vec<u8>, msg: &str) {
	out.extend_from_slice(b"FAIL");
	out.extend_from_slice(&(msg.len() as u32).to_le_bytes());
	out.extend_from_slice(msg.as_bytes());
}

/// Answer sync requests on `stream` until QUIT or end of stream
pub async fn serve<S>(device: Arc<StubDevice>, mut stream: S)
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	loop {
		let (id, path) = match codec::read_request(&mut stream).await {
			Ok(req) => req,
			Err(_) => break,
		};
		device.stats.requests.fetch_add(1, Ordering::SeqCst);
		device.stats.log.lock().unwrap().push((id.to_string(), path.clone()));
		let reply = match device.respond(id, &path) {
			Some(reply) => reply,
			None => break,
		};
		if stream.write_all(&reply).await.is_err() {
			break;
		}
	}
	device.stats.sessions_closed.fetch_add(1, Ordering::SeqCst);
}

// ============================================================================
// Transport
// ============================================================================

pub struct StubTransport {
	pub device: Arc<StubDevice>,
	pub dials: AtomicUsize,
	pub queries: AtomicUsize,
	/// When set, any attempt to reach the device fails the test
	pub forbidden: AtomicBool,
	pub refuse_sync: AtomicBool,
}

impl StubTransport {
	pub fn new(device: StubDevice) -> Arc<Self> {
		Arc::new(StubTransport {
			device: Arc::new(device),
			dials: AtomicUsize::new(0),
			queries: AtomicUsize::new(0),
			forbidden: AtomicBool::new(false),
			refuse_sync: AtomicBool::new(false),
		})
	}

	pub fn dials(&self) -> usize {
		self.dials.load(Ordering::SeqCst)
	}

	pub fn forbid(&self) {
		self.forbidden.store(true, Ordering::SeqCst);
	}
}

#[async_trait]
impl Transport for StubTransport {
	async fn open_sync(&self, serial: &str) -> Result<Box<dyn SyncStream>, ConnectionError> {
		assert!(!self.forbidden.load(Ordering::SeqCst), "transport contacted");
		if serial != SERIAL || self.refuse_sync.load(Ordering::SeqCst) {
			return Err(ConnectionError::ServiceRefused {
				service: format!("host:transport:{}", serial),
				status: "FAIL".to_string(),
				reason: Some(format!("device '{}' not found", serial)),
			});
		}
		self.dials.fetch_add(1, Ordering::SeqCst);
		let (near, far) = duplex(64 * 1024);
		tokio::spawn(serve(self.device.clone(), far));
		Ok(Box::new(near))
	}

	async fn query(&self, service: &str) -> Result<Vec<u8>, ConnectionError> {
		assert!(!self.forbidden.load(Ordering::SeqCst), "transport contacted");
		self.queries.fetch_add(1, Ordering::SeqCst);
		if service == "host:get-serialno" {
			return Ok(SERIAL.as_bytes().to_vec());
		}
		if service == format!("host-serial:{}:features", SERIAL) {
			return Ok(FEATURES.as_bytes().to_vec());
		}
		Err(ConnectionError::ServiceRefused {
			service: service.to_string(),
			status: "FAIL".to_string(),
			reason: Some("unknown host service".to_string()),
		})
	}
}

/// Connect a filesystem to a stub device
pub async fn connect(device: StubDevice) -> (Arc<StubTransport>, AdbFs) {
	let transport = StubTransport::new(device);
	let fs = AdbFs::connect(transport.clone(), Some(SERIAL)).await.expect("connect to stub device");
	(transport, fs)
}

// vim: ts=4

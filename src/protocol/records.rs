//! Fixed-size little-endian records of sync protocol v1
//!
//! Each record type knows its tag and exact wire size, and decodes itself
//! from a byte slice of that size. Variable-length tails (entry names, chunk
//! payloads, failure messages) are read separately by the codec.

use super::id::SyncId;

/// A fixed-size response body
pub trait WireRecord: Sized {
	/// Tag announcing this record
	const ID: SyncId;
	/// Exact number of body bytes following the tag
	const SIZE: usize;

	/// Decode from exactly `SIZE` bytes
	fn decode(buf: &[u8]) -> Self;
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
	u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Reply to STAT: mode, size, mtime
///
/// All fields zero means the daemon could not stat the path. Protocol v1
/// does not say why, so not-found and permission-denied look the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatV1 {
	pub mode: u32,
	pub size: u32,
	pub mtime: u32,
}

impl StatV1 {
	pub fn is_unknown(&self) -> bool {
		*self == StatV1::default()
	}
}

impl WireRecord for StatV1 {
	const ID: SyncId = SyncId::LSTAT_V1;
	const SIZE: usize = 12;

	fn decode(buf: &[u8]) -> Self {
		StatV1 { mode: le_u32(buf, 0), size: le_u32(buf, 4), mtime: le_u32(buf, 8) }
	}
}

/// Header of one directory entry; `name_len` name bytes follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DentV1 {
	pub mode: u32,
	pub size: u32,
	pub mtime: u32,
	pub name_len: u32,
}

impl DentV1 {
	pub fn stat(&self) -> StatV1 {
		StatV1 { mode: self.mode, size: self.size, mtime: self.mtime }
	}
}

impl WireRecord for DentV1 {
	const ID: SyncId = SyncId::DENT_V1;
	const SIZE: usize = 16;

	fn decode(buf: &[u8]) -> Self {
		DentV1 {
			mode: le_u32(buf, 0),
			size: le_u32(buf, 4),
			mtime: le_u32(buf, 8),
			name_len: le_u32(buf, 12),
		}
	}
}

/// Header of one data chunk; `size` payload bytes follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataHeader {
	pub size: u32,
}

impl WireRecord for DataHeader {
	const ID: SyncId = SyncId::DATA;
	const SIZE: usize = 4;

	fn decode(buf: &[u8]) -> Self {
		DataHeader { size: le_u32(buf, 0) }
	}
}

/// Body of OKAY/FAIL; `msg_len` message bytes follow on FAIL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
	pub msg_len: u32,
}

impl WireRecord for Status {
	const ID: SyncId = SyncId::OKAY;
	const SIZE: usize = 4;

	fn decode(buf: &[u8]) -> Self {
		Status { msg_len: le_u32(buf, 0) }
	}
}


// vim: ts=4

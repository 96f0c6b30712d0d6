//! Sync command and response tags

use std::fmt;

/// Four-byte ASCII tag opening every sync request and response
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncId(pub [u8; 4]);

impl SyncId {
	/// lstat, v1 record
	pub const LSTAT_V1: SyncId = SyncId(*b"STAT");
	/// Directory listing request
	pub const LIST_V1: SyncId = SyncId(*b"LIST");
	/// One directory entry in a listing reply
	pub const DENT_V1: SyncId = SyncId(*b"DENT");
	/// File upload (not implemented here)
	pub const SEND_V1: SyncId = SyncId(*b"SEND");
	/// File download request
	pub const RECV_V1: SyncId = SyncId(*b"RECV");
	/// End of a sequence of records
	pub const DONE: SyncId = SyncId(*b"DONE");
	/// One chunk of file data
	pub const DATA: SyncId = SyncId(*b"DATA");
	pub const OKAY: SyncId = SyncId(*b"OKAY");
	pub const FAIL: SyncId = SyncId(*b"FAIL");
	/// Ends the sync session
	pub const QUIT: SyncId = SyncId(*b"QUIT");

	pub fn as_bytes(&self) -> &[u8; 4] {
		&self.0
	}
}

impl From<[u8; 4]> for SyncId {
	fn from(b: [u8; 4]) -> Self {
		SyncId(b)
	}
}

impl fmt::Display for SyncId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.0.iter().all(|b| b.is_ascii_graphic()) {
			// all bytes are ASCII, so this cannot fail
			f.write_str(std::str::from_utf8(&self.0).unwrap_or("????"))
		} else {
			write!(f, "0x{}", hex::encode(self.0))
		}
	}
}

impl fmt::Debug for SyncId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SyncId({})", self)
	}
}


// vim: ts=4

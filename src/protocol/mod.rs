//! Sync protocol v1 wire layer
//!
//! The sync service speaks fixed-size little-endian records introduced by a
//! four-byte tag. This module knows nothing about connections or pools; the
//! codec functions work on any tokio byte stream.
//!
//! # Example Usage
//!
//! ```ignore
//! use adbfs::protocol::{codec, SyncId, StatV1};
//!
//! codec::send_request(&mut stream, SyncId::LSTAT_V1, "/sdcard").await?;
//! let st = codec::read_record::<StatV1, _>(&mut stream).await?;
//! ```

pub mod codec;
pub mod failure;
pub mod id;
pub mod records;

// Re-export public API
pub use id::SyncId;
pub use records::{DataHeader, DentV1, StatV1, Status, WireRecord};

// vim: ts=4

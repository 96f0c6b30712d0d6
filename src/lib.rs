//! # adbfs - Device Filesystem over the adb Sync Protocol
//!
//! adbfs browses and reads files on an Android device by speaking the adb
//! `sync:` protocol (v1) directly, without running a shell on the device.
//! Connections to the sync service are pooled, so independent calls run
//! concurrently on separate connections.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use adbfs::{AdbFs, AdbServer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fs = AdbFs::connect(Arc::new(AdbServer::default()), None).await?;
//!     let info = fs.stat("sdcard/Download/notes.txt").await?;
//!     println!("{} bytes, {}", info.size(), info.mode());
//!     let data = fs.read_file("sdcard/Download/notes.txt").await?;
//!     fs.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```rust,ignore
//! let mut file = fs.open("sdcard/DCIM/video.mp4").await?;
//! let mut buf = vec![0u8; 64 * 1024];
//! loop {
//!     let n = file.read(&mut buf).await?;
//!     if n == 0 { break; }
//!     sink.write_all(&buf[..n]).await?;
//! }
//! ```
//!
//! Paths are slash-separated and relative to the device root (`sdcard/a.txt`,
//! or `.` for the root itself).

pub mod config;
pub mod error;
pub mod file;
pub mod fs;
pub mod logging;
pub mod metadata;
pub mod pool;
pub mod protocol;
pub mod transport;
pub mod validation;

// Re-export commonly used types and functions
pub use config::Config;
pub use error::{ConfigError, ConnectionError, ErrorKind, PathError, SyncError};
pub use file::File;
pub use fs::AdbFs;
pub use metadata::{DirEntry, FileInfo, FileMode, FileType};
pub use transport::{AdbServer, SyncStream, Transport};

// vim: ts=4

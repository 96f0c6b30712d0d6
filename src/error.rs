//! Error types for adbfs operations
//!
//! Every facade call fails with a [`PathError`] naming the operation and the
//! path. The cause is a [`SyncError`]; match on [`PathError::kind`] rather
//! than on message text.

use std::error::Error;
use std::fmt;
use std::io;

/// Coarse classification of a failure, stable for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Path rejected before any I/O
	InvalidPath,
	/// No such file or directory (at protocol v1 this also covers permission denied)
	NotFound,
	/// Permission denied, as reported by the device
	PermissionDenied,
	/// A directory operation was attempted on something else
	NotADirectory,
	/// A file operation was attempted on a directory
	IsADirectory,
	/// The device replied FAIL with a message we could not classify
	ProtocolFailure,
	/// The byte stream did not follow the sync framing
	Protocol,
	/// The client (or the file handle) was already closed
	Closed,
	/// I/O error on the underlying stream
	Io,
	/// Establishing a connection failed
	Connection,
}

/// Failure of a single sync exchange
#[derive(Debug)]
pub enum SyncError {
	/// Path syntax rejected
	InvalidPath,

	/// Device reported "No such file or directory"
	NotFound,

	/// All-zero stat record: not found or permission denied, v1 cannot tell
	NotFoundOrDenied,

	/// Device reported "Permission denied"
	PermissionDenied,

	/// Device reported "Not a directory", or listing a non-directory
	NotADirectory,

	/// Device reported "Is a directory", or reading a directory
	IsADirectory,

	/// FAIL status with an unrecognised message, raw text preserved
	Fail { message: String },

	/// Framing violation (unexpected tag, bad length, ...)
	Protocol { message: String },

	/// Pool or handle already closed
	Closed,

	/// I/O error
	Io(io::Error),

	/// Connection establishment failed (nested)
	Connection(ConnectionError),
}

impl SyncError {
	/// Build a framing error
	pub fn protocol(message: impl Into<String>) -> Self {
		SyncError::Protocol { message: message.into() }
	}

	/// Classify this error
	pub fn kind(&self) -> ErrorKind {
		match self {
			SyncError::InvalidPath => ErrorKind::InvalidPath,
			SyncError::NotFound | SyncError::NotFoundOrDenied => ErrorKind::NotFound,
			SyncError::PermissionDenied => ErrorKind::PermissionDenied,
			SyncError::NotADirectory => ErrorKind::NotADirectory,
			SyncError::IsADirectory => ErrorKind::IsADirectory,
			SyncError::Fail { .. } => ErrorKind::ProtocolFailure,
			SyncError::Protocol { .. } => ErrorKind::Protocol,
			SyncError::Closed => ErrorKind::Closed,
			SyncError::Io(_) => ErrorKind::Io,
			SyncError::Connection(_) => ErrorKind::Connection,
		}
	}

	/// Copy of this error, for handles that keep returning the same failure
	pub(crate) fn duplicate(&self) -> SyncError {
		match self {
			SyncError::InvalidPath => SyncError::InvalidPath,
			SyncError::NotFound => SyncError::NotFound,
			SyncError::NotFoundOrDenied => SyncError::NotFoundOrDenied,
			SyncError::PermissionDenied => SyncError::PermissionDenied,
			SyncError::NotADirectory => SyncError::NotADirectory,
			SyncError::IsADirectory => SyncError::IsADirectory,
			SyncError::Fail { message } => SyncError::Fail { message: message.clone() },
			SyncError::Protocol { message } => SyncError::Protocol { message: message.clone() },
			SyncError::Closed => SyncError::Closed,
			SyncError::Io(e) => SyncError::Io(io::Error::new(e.kind(), e.to_string())),
			// only produced while dialing, never latched by a handle
			SyncError::Connection(e) => SyncError::Protocol { message: e.to_string() },
		}
	}

	/// Whether the connection that produced this error can no longer be trusted
	///
	/// FAIL replies are complete frames, so the stream is still aligned after one.
	/// Anything that broke off mid-frame leaves the stream position undefined.
	pub fn breaks_stream(&self) -> bool {
		matches!(self, SyncError::Protocol { .. } | SyncError::Io(_))
	}
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::InvalidPath => write!(f, "invalid argument"),
			SyncError::NotFound => write!(f, "file does not exist"),
			SyncError::NotFoundOrDenied => {
				write!(f, "file does not exist (or permission denied)")
			}
			SyncError::PermissionDenied => write!(f, "permission denied"),
			SyncError::NotADirectory => write!(f, "not a directory"),
			SyncError::IsADirectory => write!(f, "is a directory"),
			SyncError::Fail { message } => write!(f, "sync error: {}", message),
			SyncError::Protocol { message } => write!(f, "protocol error: {}", message),
			SyncError::Closed => write!(f, "file already closed"),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::Connection(e) => write!(f, "{}", e),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Io(e) => Some(e),
			SyncError::Connection(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<ConnectionError> for SyncError {
	fn from(e: ConnectionError) -> Self {
		SyncError::Connection(e)
	}
}

/// Error returned by every filesystem operation: `{op} {path}: {source}`
#[derive(Debug)]
pub struct PathError {
	/// Operation name ("open", "stat", "readdir", "readfile", "read", ...)
	pub op: &'static str,
	/// Path as given by the caller
	pub path: String,
	/// Underlying cause
	pub source: SyncError,
}

impl PathError {
	pub fn new(op: &'static str, path: impl Into<String>, source: SyncError) -> Self {
		PathError { op, path: path.into(), source }
	}

	pub fn kind(&self) -> ErrorKind {
		self.source.kind()
	}
}

impl fmt::Display for PathError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}: {}", self.op, self.path, self.source)
	}
}

impl Error for PathError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		Some(&self.source)
	}
}

impl From<PathError> for io::Error {
	fn from(e: PathError) -> Self {
		let kind = match e.kind() {
			ErrorKind::InvalidPath => io::ErrorKind::InvalidInput,
			ErrorKind::NotFound => io::ErrorKind::NotFound,
			ErrorKind::PermissionDenied => io::ErrorKind::PermissionDenied,
			ErrorKind::Protocol => io::ErrorKind::InvalidData,
			ErrorKind::Closed => io::ErrorKind::NotConnected,
			ErrorKind::Io => match &e.source {
				SyncError::Io(inner) => inner.kind(),
				_ => io::ErrorKind::Other,
			},
			_ => io::ErrorKind::Other,
		};
		io::Error::new(kind, e)
	}
}

/// Transport bootstrap errors
#[derive(Debug)]
pub enum ConnectionError {
	/// TCP connect to the host daemon failed
	DialFailed { addr: String, source: io::Error },

	/// Service request was answered with something other than OKAY
	ServiceRefused { service: String, status: String, reason: Option<String> },

	/// I/O error while talking to a service
	Io { service: String, source: io::Error },

	/// A connect step failed (nested, with the step named)
	Step { step: &'static str, source: Box<ConnectionError> },

	/// A connect step failed at the sync level
	Sync { step: &'static str, source: Box<SyncError> },
}

impl ConnectionError {
	pub(crate) fn step(step: &'static str, source: ConnectionError) -> Self {
		ConnectionError::Step { step, source: Box::new(source) }
	}
}

impl fmt::Display for ConnectionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConnectionError::DialFailed { addr, source } => {
				write!(f, "connect {:?}: {}", addr, source)
			}
			ConnectionError::ServiceRefused { service, status, reason: Some(reason) } => {
				write!(f, "service {:?}: adb status {:?}: {}", service, status, reason)
			}
			ConnectionError::ServiceRefused { service, status, reason: None } => {
				write!(f, "service {:?}: adb status {:?}", service, status)
			}
			ConnectionError::Io { service, source } => {
				write!(f, "service {:?}: {}", service, source)
			}
			ConnectionError::Step { step, source } => write!(f, "{}: {}", step, source),
			ConnectionError::Sync { step, source } => write!(f, "{}: {}", step, source),
		}
	}
}

impl Error for ConnectionError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			ConnectionError::DialFailed { source, .. } => Some(source),
			ConnectionError::Io { source, .. } => Some(source),
			ConnectionError::Step { source, .. } => Some(source.as_ref()),
			ConnectionError::Sync { source, .. } => Some(source.as_ref()),
			_ => None,
		}
	}
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
	/// Reading the config file failed
	Read { path: String, source: io::Error },

	/// Config file is not valid TOML for [`crate::config::Config`]
	Parse { path: String, message: String },

	/// A value is out of range
	Invalid { message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::Read { path, source } => {
				write!(f, "Failed to read config {}: {}", path, source)
			}
			ConfigError::Parse { path, message } => {
				write!(f, "Failed to parse config {}: {}", path, message)
			}
			ConfigError::Invalid { message } => write!(f, "Invalid configuration: {}", message),
		}
	}
}

impl Error for ConfigError {}


// vim: ts=4

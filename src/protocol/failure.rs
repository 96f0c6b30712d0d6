//! Classification of FAIL messages
//!
//! The daemon only sends free text, typically `"<what> failed: <strerror>"`.
//! We match the strerror suffix against the glibc/bionic English wording.
//! This is best effort: a daemon with a different libc, locale or message
//! format falls through to [`SyncError::Fail`] with the raw text.

use crate::error::SyncError;

/// Map a FAIL message to an error
pub fn classify(message: &str) -> SyncError {
	if message.ends_with(": Is a directory") {
		SyncError::IsADirectory
	} else if message.ends_with(": Not a directory") {
		SyncError::NotADirectory
	} else if message.ends_with(": Permission denied") {
		SyncError::PermissionDenied
	} else if message.ends_with(": No such file or directory") {
		SyncError::NotFound
	} else {
		SyncError::Fail { message: message.to_string() }
	}
}


// vim: ts=4

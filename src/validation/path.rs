//! Path validation and device path construction
//!
//! Callers name files with slash-separated paths relative to the device
//! root, e.g. `sdcard/Download/a.txt`. The single path `.` names the root.

use super::ValidationError;

/// Validate a root-relative slash path
///
/// Rejected: the empty string, a leading or trailing '/', empty elements
/// (`a//b`), `.` or `..` elements other than the lone root `.`, and NUL
/// bytes.
pub fn validate_path(name: &str) -> Result<(), ValidationError> {
	if name.is_empty() {
		return Err(ValidationError::EmptyPath);
	}
	if name == "." {
		return Ok(());
	}
	if name.contains('\0') {
		return Err(ValidationError::NulByte(name.to_string()));
	}
	for elem in name.split('/') {
		match elem {
			"" => return Err(ValidationError::BadSeparator(name.to_string())),
			"." | ".." => return Err(ValidationError::DotElement(name.to_string())),
			_ => {}
		}
	}
	Ok(())
}

/// Check if a path is valid, see [`validate_path`]
pub fn is_valid_path(name: &str) -> bool {
	validate_path(name).is_ok()
}

/// Absolute path on the device for a validated relative path
pub fn device_path(name: &str) -> String {
	if name == "." {
		"/".to_string()
	} else {
		format!("/{}", name)
	}
}

/// Final element of a validated path
pub fn base_name(name: &str) -> &str {
	name.rsplit('/').next().unwrap_or(name)
}


// vim: ts=4

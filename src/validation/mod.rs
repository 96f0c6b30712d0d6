//! Input validation for adbfs
//!
//! Paths are checked before any connection is touched, so a rejected path
//! never causes network activity.

use std::error::Error;
use std::fmt;

pub mod path;

pub use path::*;

/// Why an input was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
	/// Path is empty
	EmptyPath,
	/// Path starts or ends with '/', or has an empty element
	BadSeparator(String),
	/// Path has a "." or ".." element
	DotElement(String),
	/// Path contains a NUL byte
	NulByte(String),
}

impl fmt::Display for ValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ValidationError::EmptyPath => write!(f, "Path is empty"),
			ValidationError::BadSeparator(p) => {
				write!(f, "Path {:?} must be relative without empty elements", p)
			}
			ValidationError::DotElement(p) => {
				write!(f, "Path {:?} contains a '.' or '..' element", p)
			}
			ValidationError::NulByte(p) => write!(f, "Path {:?} contains a NUL byte", p),
		}
	}
}

impl Error for ValidationError {}


// vim: ts=4

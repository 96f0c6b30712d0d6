//! File metadata as reported by the device
//!
//! The daemon sends raw Linux `st_mode` values. [`FileMode::from_raw`] splits
//! them into a file type, permission bits and the setuid/setgid/sticky flags.

use serde::Serialize;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::protocol::StatV1;

// Linux st_mode layout, independent of the host platform
const S_IFMT: u32 = 0o170000;
const S_IFSOCK: u32 = 0o140000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;
const S_IFBLK: u32 = 0o060000;
const S_IFDIR: u32 = 0o040000;
const S_IFCHR: u32 = 0o020000;
const S_IFIFO: u32 = 0o010000;
const S_ISUID: u32 = 0o4000;
const S_ISGID: u32 = 0o2000;
const S_ISVTX: u32 = 0o1000;

/// Kind of filesystem object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
	Regular,
	Directory,
	CharDevice,
	BlockDevice,
	NamedPipe,
	Symlink,
	Socket,
	/// Type bits did not match any known value
	Unknown,
}

impl FileType {
	fn from_raw(mode: u32) -> Self {
		match mode & S_IFMT {
			S_IFREG => FileType::Regular,
			S_IFDIR => FileType::Directory,
			S_IFCHR => FileType::CharDevice,
			S_IFBLK => FileType::BlockDevice,
			S_IFIFO => FileType::NamedPipe,
			S_IFLNK => FileType::Symlink,
			S_IFSOCK => FileType::Socket,
			_ => FileType::Unknown,
		}
	}

	/// Type letter as printed by `ls -l`
	pub fn as_char(&self) -> char {
		match self {
			FileType::Regular => '-',
			FileType::Directory => 'd',
			FileType::CharDevice => 'c',
			FileType::BlockDevice => 'b',
			FileType::NamedPipe => 'p',
			FileType::Symlink => 'l',
			FileType::Socket => 's',
			FileType::Unknown => '?',
		}
	}
}

/// Translated mode bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FileMode {
	file_type: FileType,
	perm: u32,
	setuid: bool,
	setgid: bool,
	sticky: bool,
	raw: u32,
}

impl FileMode {
	/// Translate a raw device `st_mode`
	pub fn from_raw(mode: u32) -> Self {
		FileMode {
			file_type: FileType::from_raw(mode),
			perm: mode & 0o777,
			setuid: mode & S_ISUID != 0,
			setgid: mode & S_ISGID != 0,
			sticky: mode & S_ISVTX != 0,
			raw: mode,
		}
	}

	pub fn file_type(&self) -> FileType {
		self.file_type
	}

	/// rwx bits for user, group and other
	pub fn permissions(&self) -> u32 {
		self.perm
	}

	pub fn is_setuid(&self) -> bool {
		self.setuid
	}

	pub fn is_setgid(&self) -> bool {
		self.setgid
	}

	pub fn is_sticky(&self) -> bool {
		self.sticky
	}

	/// The value the device sent
	pub fn raw(&self) -> u32 {
		self.raw
	}

	pub fn is_dir(&self) -> bool {
		self.file_type == FileType::Directory
	}

	pub fn is_file(&self) -> bool {
		self.file_type == FileType::Regular
	}

	/// Symlinks are reported as links; they are never followed
	pub fn is_symlink(&self) -> bool {
		self.file_type == FileType::Symlink
	}
}

impl fmt::Display for FileMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut s = String::with_capacity(10);
		s.push(self.file_type.as_char());
		for (shift, special, special_char) in
			[(6, self.setuid, 's'), (3, self.setgid, 's'), (0, self.sticky, 't')]
		{
			let bits = (self.perm >> shift) & 0o7;
			s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
			s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
			s.push(match (bits & 0o1 != 0, special) {
				(true, true) => special_char,
				(false, true) => special_char.to_ascii_uppercase(),
				(true, false) => 'x',
				(false, false) => '-',
			});
		}
		f.write_str(&s)
	}
}

/// Metadata for one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
	name: String,
	size: u64,
	mode: FileMode,
	#[serde(rename = "mtime", serialize_with = "serialize_mtime")]
	modified: SystemTime,
}

fn serialize_mtime<S: serde::Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
	let secs = t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
	s.serialize_u64(secs)
}

impl FileInfo {
	pub(crate) fn from_stat(name: impl Into<String>, st: &StatV1) -> Self {
		FileInfo {
			name: name.into(),
			size: u64::from(st.size),
			mode: FileMode::from_raw(st.mode),
			modified: UNIX_EPOCH + Duration::from_secs(u64::from(st.mtime)),
		}
	}

	/// Last path segment
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Size in bytes (v1 reports at most 4 GiB - 1)
	pub fn size(&self) -> u64 {
		self.size
	}

	pub fn mode(&self) -> FileMode {
		self.mode
	}

	pub fn modified(&self) -> SystemTime {
		self.modified
	}

	pub fn is_dir(&self) -> bool {
		self.mode.is_dir()
	}

	pub fn is_file(&self) -> bool {
		self.mode.is_file()
	}
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
	#[serde(flatten)]
	info: FileInfo,
}

impl DirEntry {
	pub(crate) fn new(name: String, st: &StatV1) -> Self {
		DirEntry { info: FileInfo::from_stat(name, st) }
	}

	pub fn name(&self) -> &str {
		self.info.name()
	}

	pub fn file_type(&self) -> FileType {
		self.info.mode().file_type()
	}

	pub fn is_dir(&self) -> bool {
		self.info.is_dir()
	}

	/// Metadata delivered with the listing; no extra round trip
	pub fn metadata(&self) -> &FileInfo {
		&self.info
	}
}


// vim: ts=4

//! Request framing and response decoding for sync protocol v1
//!
//! A request is `tag || u32 length || path`. A response starts with a tag;
//! FAIL carries a message and is turned into an error here, DONE ends a
//! sequence of records, anything else must be the record type asked for.

use std::convert::TryFrom;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use super::failure;
use super::id::SyncId;
use super::records::{DataHeader, DentV1, Status, WireRecord};
use crate::error::SyncError;

/// Largest data chunk the daemon sends
pub const SYNC_DATA_MAX: u32 = 64 * 1024;

/// Largest directory entry name we accept
pub const MAX_NAME_LEN: u32 = 4096;

/// Largest FAIL message we accept
pub const MAX_FAIL_LEN: u32 = 64 * 1024;

/// Write one request frame
pub async fn send_request<W>(w: &mut W, id: SyncId, path: &str) -> Result<(), SyncError>
where
	W: AsyncWrite + Unpin + ?Sized,
{
	let len = u32::try_from(path.len())
		.map_err(|_| SyncError::protocol(format!("path too long ({} bytes)", path.len())))?;
	let mut req = Vec::with_capacity(8 + path.len());
	req.extend_from_slice(id.as_bytes());
	req.extend_from_slice(&len.to_le_bytes());
	req.extend_from_slice(path.as_bytes());
	trace!("sync request {} {:?}", id, path);
	w.write_all(&req).await?;
	w.flush().await?;
	Ok(())
}

/// Ask the daemon to end the sync session
pub async fn send_quit<W>(w: &mut W) -> Result<(), SyncError>
where
	W: AsyncWrite + Unpin + ?Sized,
{
	send_request(w, SyncId::QUIT, "").await
}

/// Read one request frame (the daemon side of [`send_request`])
pub async fn read_request<R>(r: &mut R) -> Result<(SyncId, String), SyncError>
where
	R: AsyncRead + Unpin + ?Sized,
{
	let id = read_id(r).await?;
	let len = r.read_u32_le().await?;
	let buf = read_payload(r, len).await?;
	let path = String::from_utf8(buf)
		.map_err(|_| SyncError::protocol(format!("{} request path is not UTF-8", id)))?;
	Ok((id, path))
}

async fn read_id<R>(r: &mut R) -> Result<SyncId, SyncError>
where
	R: AsyncRead + Unpin + ?Sized,
{
	let mut b = [0u8; 4];
	r.read_exact(&mut b).await?;
	Ok(SyncId(b))
}

async fn read_payload<R>(r: &mut R, len: u32) -> Result<Vec<u8>, SyncError>
where
	R: AsyncRead + Unpin + ?Sized,
{
	let mut buf = vec![0u8; len as usize];
	r.read_exact(&mut buf).await?;
	Ok(buf)
}

/// Consume the status body following OKAY or FAIL
///
/// FAIL becomes the classified error. OKAY must carry an empty message.
/// Other tags are left alone.
async fn check_status<R>(r: &mut R, id: SyncId) -> Result<(), SyncError>
where
	R: AsyncRead + Unpin + ?Sized,
{
	if id == SyncId::FAIL {
		let st = read_fixed::<Status, R>(r).await?;
		if st.msg_len > MAX_FAIL_LEN {
			return Err(SyncError::protocol(format!(
				"failure message too long ({} bytes)",
				st.msg_len
			)));
		}
		let msg = read_payload(r, st.msg_len).await?;
		let msg = String::from_utf8_lossy(&msg);
		debug!("sync FAIL: {}", msg);
		return Err(failure::classify(&msg));
	}
	if id == SyncId::OKAY {
		let st = read_fixed::<Status, R>(r).await?;
		if st.msg_len != 0 {
			return Err(SyncError::protocol(format!(
				"okay response: message length must be zero, got {}",
				st.msg_len
			)));
		}
	}
	Ok(())
}

async fn read_fixed<T, R>(r: &mut R) -> Result<T, SyncError>
where
	T: WireRecord,
	R: AsyncRead + Unpin + ?Sized,
{
	let mut buf = [0u8; 16];
	let buf = &mut buf[..T::SIZE];
	r.read_exact(buf).await?;
	Ok(T::decode(buf))
}

/// Read a bare status response, expecting OKAY
pub async fn read_okay<R>(r: &mut R) -> Result<(), SyncError>
where
	R: AsyncRead + Unpin + ?Sized,
{
	let id = read_id(r).await?;
	check_status(r, id).await?;
	if id != SyncId::OKAY {
		return Err(SyncError::protocol(format!(
			"unexpected response id {} (expected {})",
			id,
			SyncId::OKAY
		)));
	}
	Ok(())
}

/// Read one record of type `T`, or `None` when the daemon sent DONE
///
/// DONE is followed by a full (meaningless) body of the expected shape, which
/// is consumed here so the stream stays aligned for the next request.
pub async fn read_record<T, R>(r: &mut R) -> Result<Option<T>, SyncError>
where
	T: WireRecord,
	R: AsyncRead + Unpin + ?Sized,
{
	let id = read_id(r).await?;
	check_status(r, id).await?;
	if id != T::ID && id != SyncId::DONE {
		return Err(SyncError::protocol(format!(
			"unexpected response id {} (expected {})",
			id,
			T::ID
		)));
	}
	let rec = read_fixed::<T, R>(r).await?;
	if id == SyncId::DONE {
		return Ok(None);
	}
	Ok(Some(rec))
}

/// Read one directory entry and its name, or `None` at the end of the listing
pub async fn read_dent<R>(r: &mut R) -> Result<Option<(DentV1, Vec<u8>)>, SyncError>
where
	R: AsyncRead + Unpin + ?Sized,
{
	let dent = match read_record::<DentV1, R>(r).await? {
		Some(dent) => dent,
		None => return Ok(None),
	};
	if dent.name_len > MAX_NAME_LEN {
		return Err(SyncError::protocol(format!("entry name too long ({} bytes)", dent.name_len)));
	}
	let name = read_payload(r, dent.name_len).await?;
	Ok(Some((dent, name)))
}

/// Append the next data chunk to `buf`
///
/// Returns the chunk length, or `None` when the transfer is complete.
pub async fn read_chunk<R>(r: &mut R, buf: &mut Vec<u8>) -> Result<Option<usize>, SyncError>
where
	R: AsyncRead + Unpin + ?Sized,
{
	let hdr = match read_record::<DataHeader, R>(r).await? {
		Some(hdr) => hdr,
		None => return Ok(None),
	};
	if hdr.size > SYNC_DATA_MAX {
		return Err(SyncError::protocol(format!(
			"data chunk too large ({} bytes, max {})",
			hdr.size, SYNC_DATA_MAX
		)));
	}
	let start = buf.len();
	buf.resize(start + hdr.size as usize, 0);
	r.read_exact(&mut buf[start..]).await?;
	Ok(Some(hdr.size as usize))
}


// vim: ts=4

//! AppCompatCache (ShimCache) decoding for Windows 10 and later.
//!
//! The `AppCompatCache` value under the `SYSTEM` hive holds a statistics
//! header followed by a run of records:
//!
//! ```text
//! header      0x30 bytes, or 0x34 on Creators Update and later
//! record      "10ts" | crc32 (u32) | entry length L (u32) | L bytes of entry
//! entry       path length P (u16) | P bytes UTF-16LE path | low (u32) | high (u32) | ...
//! ```
//!
//! Anything in an entry past the timestamp (insert flags, shim data) is
//! skipped by jumping to the end of the declared entry length.

use std::io::{self, Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use thiserror::Error;

use crate::models::CacheEntry;
use crate::utils::strings::utf16le_to_string;
use crate::utils::time::filetime_to_utc;

/// Tag at the start of every Windows 10 cache record.
pub const SHIM_SIGNATURE: &[u8; 4] = b"10ts";

/// Path reported for records that carry no path text.
pub const PATH_NOT_FOUND: &str = "Path not found...";

const RECORD_PREFIX_LEN: usize = 12;

/// Reasons a cache blob could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShimCacheError {
    #[error("cache blob is {len} bytes, shorter than the {needed}-byte header")]
    TruncatedHeader { len: usize, needed: usize },
    #[error("record prefix at offset {offset:#x} runs past the end of the blob")]
    TruncatedRecord { offset: usize },
    #[error("bad record signature at offset {offset:#x}")]
    BadSignature { offset: usize },
    #[error("record at offset {offset:#x} declares {declared} bytes but only {remaining} remain")]
    EntryOverrun {
        offset: usize,
        declared: usize,
        remaining: usize,
    },
    #[error("record at offset {offset:#x} is shorter than its path and timestamp")]
    TruncatedEntry { offset: usize },
    #[error("no record signature at offset 0x30 or 0x34")]
    UnknownFormat,
}

/// Header layout, chosen by where the first record signature sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderVariant {
    Standard,
    Creators,
}

impl HeaderVariant {
    pub fn header_len(self) -> usize {
        match self {
            HeaderVariant::Standard => 0x30,
            HeaderVariant::Creators => 0x34,
        }
    }

    /// Probe for the record signature at 0x30, then at 0x34.
    pub fn detect(blob: &[u8]) -> Option<HeaderVariant> {
        [HeaderVariant::Standard, HeaderVariant::Creators]
            .into_iter()
            .find(|variant| {
                let start = variant.header_len();
                blob.get(start..start + SHIM_SIGNATURE.len()) == Some(&SHIM_SIGNATURE[..])
            })
    }
}

/// Decode every record after a header of the given variant, in on-disk order.
///
/// Decoding stops at the first malformed record; nothing is read outside
/// `blob`.
pub fn decode(blob: &[u8], variant: HeaderVariant) -> Result<Vec<CacheEntry>, ShimCacheError> {
    let header_len = variant.header_len();
    let records = blob.get(header_len..).ok_or(ShimCacheError::TruncatedHeader {
        len: blob.len(),
        needed: header_len,
    })?;

    let mut cursor = Cursor::new(records);
    let mut entries = Vec::new();

    while (cursor.position() as usize) < records.len() {
        let start = cursor.position() as usize;
        let offset = header_len + start;

        if records.len() - start < RECORD_PREFIX_LEN {
            return Err(ShimCacheError::TruncatedRecord { offset });
        }

        let truncated = |_: io::Error| ShimCacheError::TruncatedRecord { offset };
        let mut signature = [0u8; 4];
        cursor.read_exact(&mut signature).map_err(truncated)?;
        let _crc = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
        let entry_len = cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;

        if &signature != SHIM_SIGNATURE {
            return Err(ShimCacheError::BadSignature { offset });
        }

        let payload_start = start + RECORD_PREFIX_LEN;
        let remaining = records.len() - payload_start;
        let payload = records
            .get(payload_start..payload_start.saturating_add(entry_len))
            .ok_or(ShimCacheError::EntryOverrun {
                offset,
                declared: entry_len,
                remaining,
            })?;

        entries.push(decode_entry(payload, offset)?);
        cursor.set_position((payload_start + entry_len) as u64);
    }

    debug!("Decoded {} shimcache records", entries.len());
    Ok(entries)
}

/// Detect the header variant and decode.
pub fn decode_blob(blob: &[u8]) -> Result<Vec<CacheEntry>, ShimCacheError> {
    let variant = HeaderVariant::detect(blob).ok_or(ShimCacheError::UnknownFormat)?;
    decode(blob, variant)
}

fn decode_entry(payload: &[u8], offset: usize) -> Result<CacheEntry, ShimCacheError> {
    let truncated = |_: io::Error| ShimCacheError::TruncatedEntry { offset };
    let mut entry = Cursor::new(payload);

    let path_len = entry.read_u16::<LittleEndian>().map_err(truncated)? as usize;
    let path = if path_len == 0 {
        PATH_NOT_FOUND.to_string()
    } else {
        let mut raw = vec![0u8; path_len];
        entry.read_exact(&mut raw).map_err(truncated)?;
        utf16le_to_string(&raw)
    };

    let low = entry.read_u32::<LittleEndian>().map_err(truncated)?;
    let high = entry.read_u32::<LittleEndian>().map_err(truncated)?;
    let filetime = (u64::from(high) << 32) | u64::from(low);

    Ok(CacheEntry {
        path,
        last_modified: filetime_to_utc(filetime),
    })
}

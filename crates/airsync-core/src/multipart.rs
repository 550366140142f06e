//! Multipart response envelope
//!
//! Multi-item fetches may answer with several WBXML documents in one body.
//! The body starts with a little-endian header:
//!
//! ```text
//! [count: i32][offset_0: i32][length_0: i32] ... [offset_n-1][length_n-1]
//! ```
//!
//! followed by the concatenated parts. Offsets are relative to the start of
//! the body.

use serde::{Deserialize, Serialize};

/// Smallest buffer that can hold a count and one descriptor
pub const MIN_ENVELOPE_LEN: usize = 12;

/// Location of one part inside the body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRange {
    pub offset: i32,
    pub length: i32,
}

/// Decoded multipart header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartMetadata {
    pub parts: Vec<PartRange>,
}

impl MultipartMetadata {
    /// Reads the envelope header
    ///
    /// Returns `None` when the buffer is shorter than
    /// [`MIN_ENVELOPE_LEN`], when the count is negative, or when the header
    /// claims more descriptors than the buffer holds.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < MIN_ENVELOPE_LEN {
            return None;
        }

        let count = read_i32(bytes, 0)?;
        let count = usize::try_from(count).ok()?;
        let header_len = count.checked_mul(8)?.checked_add(4)?;
        if header_len > bytes.len() {
            return None;
        }

        let parts = (4..header_len)
            .step_by(8)
            .map(|i| {
                Some(PartRange {
                    offset: read_i32(bytes, i)?,
                    length: read_i32(bytes, i + 4)?,
                })
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Self { parts })
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// `[count, offset_0, length_0, ...]`
    pub fn to_raw(&self) -> Vec<i32> {
        let mut raw = Vec::with_capacity(1 + self.parts.len() * 2);
        raw.push(self.parts.len() as i32);
        for part in &self.parts {
            raw.push(part.offset);
            raw.push(part.length);
        }
        raw
    }

    /// Bytes of part `index`, or `None` when the descriptor points outside
    /// `bytes`
    pub fn part<'a>(&self, bytes: &'a [u8], index: usize) -> Option<&'a [u8]> {
        let range = self.parts.get(index)?;
        let start = usize::try_from(range.offset).ok()?;
        let len = usize::try_from(range.length).ok()?;
        let end = start.checked_add(len)?;
        bytes.get(start..end)
    }
}

fn read_i32(bytes: &[u8], at: usize) -> Option<i32> {
    let chunk: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(i32::from_le_bytes(chunk))
}

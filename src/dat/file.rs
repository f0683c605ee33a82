// src/dat/file.rs

use crate::error::{Error, Result};

/// Marker introducing the variable-data heap.
const BOUNDARY: [u8; 8] = [0xBB; 8];

/// Raw bytes of one table, split into a fixed row region and a heap.
///
/// Layout: a 4-byte little-endian row count, `row_count` fixed-width rows,
/// then the heap introduced by eight `0xBB` bytes. Heap offsets stored in
/// rows count from the start of the marker itself.
#[derive(Debug)]
pub struct DatFile {
    pub row_count: usize,
    pub row_width: usize,
    bytes: Vec<u8>,
    boundary: usize,
}

impl DatFile {
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(Error::OutOfBounds {
                offset: 0,
                len: 4,
                have: bytes.len(),
            });
        }
        let mut head = [0u8; 4];
        head.copy_from_slice(&bytes[..4]);
        let row_count = u32::from_le_bytes(head) as usize;

        let boundary = bytes[4..]
            .windows(BOUNDARY.len())
            .position(|w| w == BOUNDARY)
            .map(|p| p + 4)
            .ok_or(Error::MissingBoundary)?;

        let fixed_len = boundary - 4;
        let row_width = if row_count == 0 {
            0
        } else {
            if fixed_len % row_count != 0 {
                return Err(Error::UnevenRows {
                    rows: row_count as u32,
                    len: fixed_len,
                });
            }
            fixed_len / row_count
        };

        Ok(Self {
            row_count,
            row_width,
            bytes,
            boundary,
        })
    }

    /// The fixed row region: `row_count` rows of `row_width` bytes each.
    pub fn fixed(&self) -> &[u8] {
        &self.bytes[4..self.boundary]
    }

    /// The variable-data heap. Offset 0 is the boundary marker itself, so
    /// real payloads start at offset 8.
    pub fn heap(&self) -> &[u8] {
        &self.bytes[self.boundary..]
    }
}

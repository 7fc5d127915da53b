//! Component G — file framing, chunk header half.
//!
//! A 65,536-byte chunk opens with a 512-byte header (spec.md §3, §4.G),
//! grounded in the teacher's `src/evtx_chunk_header.rs` field layout, ported
//! to `thiserror` and trimmed of the string/template offset tables: this
//! crate resolves names and templates directly off their wire offsets
//! (`name::read_name_at`, `binxml::template::TemplateCache`) rather than
//! pre-populating a chunk-wide lookup cache, so the 64 string-table buckets
//! and 32 template-table buckets are read and discarded (see DESIGN.md).

use crate::err::{EvtxError, Result};
use crate::primitives::{PrimitiveRead, ReadSeek};

pub const CHUNK_SIZE: u64 = 65_536;
pub const CHUNK_HEADER_SIZE: u64 = 512;
pub const CHUNK_MAGIC: &[u8; 8] = b"ElfChnk\0";

#[derive(Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub first_event_record_number: u64,
    pub last_event_record_number: u64,
    pub first_event_record_id: u64,
    pub last_event_record_id: u64,
    pub header_size: u32,
    pub last_event_record_data_offset: u32,
    pub free_space_offset: u32,
    pub events_checksum: u32,
    pub header_chunk_checksum: u32,
}

/// Whether the chunk magic is all-zero (empty slot, not an error, spec.md §3).
pub fn is_empty_magic(magic: &[u8; 8]) -> bool {
    magic.iter().all(|b| *b == 0)
}

impl ChunkHeader {
    /// Reads and validates a chunk's 512-byte header. Returns `Ok(None)` for
    /// an all-zero magic (empty slot, spec.md §3: "skipped"); a nonzero but
    /// mismatched magic is fatal (`InvalidEvtxChunkMagic`). The stream is
    /// always left at `chunk_start + CHUNK_HEADER_SIZE` on success.
    pub fn from_reader<T: ReadSeek + ?Sized>(stream: &mut T, chunk_start: u64) -> Result<Option<ChunkHeader>> {
        let mut magic = [0u8; 8];
        stream.read_exact_tagged(&mut magic, "chunk header magic")?;

        if is_empty_magic(&magic) {
            stream.seek_to_tagged(chunk_start + CHUNK_HEADER_SIZE, "end of empty chunk header")?;
            return Ok(None);
        }
        if &magic != CHUNK_MAGIC {
            return Err(EvtxError::InvalidEvtxChunkMagic { magic });
        }

        let first_event_record_number = stream.read_u64_tagged("chunk first event record number")?;
        let last_event_record_number = stream.read_u64_tagged("chunk last event record number")?;
        let first_event_record_id = stream.read_u64_tagged("chunk first event record id")?;
        let last_event_record_id = stream.read_u64_tagged("chunk last event record id")?;
        let header_size = stream.read_u32_tagged("chunk header size")?;
        let last_event_record_data_offset =
            stream.read_u32_tagged("chunk last event record data offset")?;
        let free_space_offset = stream.read_u32_tagged("chunk free space offset")?;
        let events_checksum = stream.read_u32_tagged("chunk events checksum")?;

        // Reserved (64) + flags (4), not used by this crate.
        let mut reserved_and_flags = [0u8; 68];
        stream.read_exact_tagged(&mut reserved_and_flags, "chunk reserved/flags bytes")?;

        let header_chunk_checksum = stream.read_u32_tagged("chunk header checksum")?;

        // 64 string-table offsets + 32 template-table offsets, discarded
        // (spec.md §4.F/§9 don't use a chunk-wide name/template cache keyed
        // by these buckets; see DESIGN.md).
        let mut offset_tables = [0u8; 64 * 4 + 32 * 4];
        stream.read_exact_tagged(&mut offset_tables, "chunk string/template offset tables")?;

        stream.seek_to_tagged(chunk_start + CHUNK_HEADER_SIZE, "end of chunk header")?;

        Ok(Some(ChunkHeader {
            first_event_record_number,
            last_event_record_number,
            first_event_record_id,
            last_event_record_id,
            header_size,
            last_event_record_data_offset,
            free_space_offset,
            events_checksum,
            header_chunk_checksum,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn valid_chunk_header_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(CHUNK_MAGIC);
        buf.extend_from_slice(&1u64.to_le_bytes());
        buf.extend_from_slice(&91u64.to_le_bytes());
        buf.extend_from_slice(&1u64.to_le_bytes());
        buf.extend_from_slice(&91u64.to_le_bytes());
        buf.extend_from_slice(&128u32.to_le_bytes());
        buf.extend_from_slice(&64928u32.to_le_bytes());
        buf.extend_from_slice(&65376u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.resize(buf.len() + 68, 0);
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.resize(CHUNK_HEADER_SIZE as usize, 0);
        buf
    }

    #[test]
    fn parses_valid_chunk_header() {
        let bytes = valid_chunk_header_bytes();
        let mut cur = Cursor::new(bytes);
        let header = ChunkHeader::from_reader(&mut cur, 0).unwrap().unwrap();
        assert_eq!(header.first_event_record_number, 1);
        assert_eq!(header.last_event_record_number, 91);
        assert_eq!(cur.position(), CHUNK_HEADER_SIZE);
    }

    #[test]
    fn all_zero_magic_is_skipped_not_an_error() {
        let bytes = vec![0u8; CHUNK_HEADER_SIZE as usize];
        let mut cur = Cursor::new(bytes);
        let header = ChunkHeader::from_reader(&mut cur, 0).unwrap();
        assert!(header.is_none());
        assert_eq!(cur.position(), CHUNK_HEADER_SIZE);
    }

    #[test]
    fn mismatched_nonzero_magic_is_fatal() {
        let mut bytes = valid_chunk_header_bytes();
        bytes[0..8].copy_from_slice(b"Garbage\0");
        let mut cur = Cursor::new(bytes);
        let err = ChunkHeader::from_reader(&mut cur, 0).unwrap_err();
        assert!(matches!(err, EvtxError::InvalidEvtxChunkMagic { .. }));
    }
}

//! Component B — name table reader.
//!
//! Resolves a name reference (a 32-bit absolute offset into the chunk) to a
//! UTF-16 string, restoring the read position afterward. Grounded in the
//! teacher's `src/binxml/name.rs` seek-then-restore pattern, simplified: this
//! crate does not maintain a string-interning cache across the chunk (see
//! DESIGN.md — template/record state, not name strings, is what's cached).

use crate::err::Result;
use crate::primitives::{read_len_prefixed_utf16_string, PrimitiveRead, ReadSeek};

/// Reads a name reference: a 32-bit offset, then (at that offset) 4 bytes of
/// unused link/hash, 2 bytes of unused hash, then a length-prefixed,
/// null-terminated UTF-16 string (spec.md §4.B).
pub fn read_name_ref<T: ReadSeek + ?Sized>(stream: &mut T) -> Result<String> {
    let offset = stream.read_u32_tagged("name reference offset")? as u64;
    read_name_at(stream, offset)
}

/// Reads the name string located at `offset`. If `offset` is the stream's
/// current position the name is read in place; otherwise the stream seeks
/// to `offset`, reads the name, then seeks back to the position it had
/// before this call (spec.md §4.B).
pub fn read_name_at<T: ReadSeek + ?Sized>(stream: &mut T, offset: u64) -> Result<String> {
    use std::io::Seek;

    let current = stream.stream_position().unwrap_or(0);

    if offset == current {
        read_name_body(stream)
    } else {
        stream.seek_to_tagged(offset, "name table entry")?;
        let name = read_name_body(stream)?;
        stream.seek_to_tagged(current, "restore position after name lookup")?;
        Ok(name)
    }
}

fn read_name_body<T: ReadSeek + ?Sized>(stream: &mut T) -> Result<String> {
    let mut unused = [0u8; 4];
    stream.read_exact_tagged(&mut unused, "name entry link/hash")?;
    let _hash = stream.read_u16_tagged("name entry hash")?;
    read_len_prefixed_utf16_string(stream, true)
}

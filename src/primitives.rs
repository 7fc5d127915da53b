//! Component A — primitive decoder.
//!
//! Reads little-endian integers and length-prefixed UTF-16 strings from a
//! seekable byte source. Grounded in the teacher's `try_read!` macro
//! (`src/macros.rs`) and `read_len_prefixed_utf16_string`
//! (`src/utils/binxml_utils.rs`), expressed here as an extension trait
//! instead of a macro so that every read site can tag its own `&'static
//! str` description for `EvtxError::FailedToRead`.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

use crate::err::{EvtxError, Result};

/// A source both the primitive decoder and the rest of the parser can seek
/// within (name table lookups, template/nested-BinXML seek-to-end).
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

fn position<T: Seek>(stream: &mut T) -> u64 {
    stream.stream_position().unwrap_or(0)
}

/// Little-endian primitive reads with offset-tagged errors.
pub trait PrimitiveRead: ReadSeek {
    fn read_u8_tagged(&mut self, what: &'static str) -> Result<u8> {
        let offset = position(self);
        self.read_u8()
            .map_err(|source| EvtxError::FailedToRead { offset, t: what, source })
    }

    fn read_i8_tagged(&mut self, what: &'static str) -> Result<i8> {
        let offset = position(self);
        self.read_i8()
            .map_err(|source| EvtxError::FailedToRead { offset, t: what, source })
    }

    fn read_u16_tagged(&mut self, what: &'static str) -> Result<u16> {
        let offset = position(self);
        self.read_u16::<LittleEndian>()
            .map_err(|source| EvtxError::FailedToRead { offset, t: what, source })
    }

    fn read_u32_tagged(&mut self, what: &'static str) -> Result<u32> {
        let offset = position(self);
        self.read_u32::<LittleEndian>()
            .map_err(|source| EvtxError::FailedToRead { offset, t: what, source })
    }

    fn read_i32_tagged(&mut self, what: &'static str) -> Result<i32> {
        let offset = position(self);
        self.read_i32::<LittleEndian>()
            .map_err(|source| EvtxError::FailedToRead { offset, t: what, source })
    }

    fn read_u64_tagged(&mut self, what: &'static str) -> Result<u64> {
        let offset = position(self);
        self.read_u64::<LittleEndian>()
            .map_err(|source| EvtxError::FailedToRead { offset, t: what, source })
    }

    fn read_i64_tagged(&mut self, what: &'static str) -> Result<i64> {
        let offset = position(self);
        self.read_i64::<LittleEndian>()
            .map_err(|source| EvtxError::FailedToRead { offset, t: what, source })
    }

    fn read_f64_tagged(&mut self, what: &'static str) -> Result<f64> {
        let offset = position(self);
        self.read_f64::<LittleEndian>()
            .map_err(|source| EvtxError::FailedToRead { offset, t: what, source })
    }

    fn read_exact_tagged(&mut self, buf: &mut [u8], what: &'static str) -> Result<()> {
        let offset = position(self);
        self.read_exact(buf)
            .map_err(|source| EvtxError::FailedToRead { offset, t: what, source })
    }

    /// Seeks to an absolute offset, tagging any failure with `what`.
    fn seek_to_tagged(&mut self, offset: u64, what: &'static str) -> Result<()> {
        let current = position(self);
        self.seek(SeekFrom::Start(offset))
            .map_err(|source| EvtxError::FailedToRead { offset: current, t: what, source })?;
        Ok(())
    }
}

impl<T: ReadSeek + ?Sized> PrimitiveRead for T {}

/// Reads a 16-bit code-unit count, then that many UTF-16LE code units,
/// transcoded directly to UTF-8 one code unit at a time (spec.md §4.A:
/// surrogate pairs are passed through as independent code units, matching
/// the source implementation rather than proper UTF-16 decoding).
///
/// With `null_terminated`, an extra two bytes (the NUL terminator) are
/// consumed and discarded after the payload.
pub fn read_len_prefixed_utf16_string<T: ReadSeek + ?Sized>(
    stream: &mut T,
    null_terminated: bool,
) -> Result<String> {
    let num_code_units = stream.read_u16_tagged("utf16 string length prefix")? as usize;

    let mut s = String::with_capacity(num_code_units);
    for _ in 0..num_code_units {
        let unit = stream.read_u16_tagged("utf16 code unit")?;
        push_code_unit_as_utf8(&mut s, unit);
    }

    if null_terminated {
        let mut discard = [0u8; 2];
        stream.read_exact_tagged(&mut discard, "utf16 null terminator")?;
    }

    Ok(s)
}

/// Encodes a single UTF-16 code unit directly as UTF-8 (1/2/3 bytes
/// depending on its numeric range), without surrogate pairing. Matches the
/// WTF-8-like behavior spec.md §4.A and §9 call out explicitly.
pub(crate) fn push_code_unit_as_utf8(out: &mut String, unit: u16) {
    let cp = unit as u32;
    if cp < 0x80 {
        out.push(cp as u8 as char);
    } else if cp < 0x800 {
        let b0 = 0xC0 | (cp >> 6) as u8;
        let b1 = 0x80 | (cp & 0x3F) as u8;
        push_raw_utf8_bytes(out, &[b0, b1]);
    } else {
        let b0 = 0xE0 | (cp >> 12) as u8;
        let b1 = 0x80 | ((cp >> 6) & 0x3F) as u8;
        let b2 = 0x80 | (cp & 0x3F) as u8;
        push_raw_utf8_bytes(out, &[b0, b1, b2]);
    }
}

/// Pushes raw (possibly non-canonical, e.g. lone-surrogate) UTF-8 byte
/// sequences onto a `String`. `unsafe` is required because the sequences
/// produced for lone surrogates are not valid UTF-8 per the strict
/// definition, mirroring the source's WTF-8-like passthrough.
fn push_raw_utf8_bytes(out: &mut String, bytes: &[u8]) {
    // Safety: every caller constructs a well-formed 2- or 3-byte UTF-8-shaped
    // sequence for a 16-bit code point; the only values that are not valid
    // strict UTF-8 are lone surrogates (0xD800..=0xDFFF), an explicitly
    // accepted by-design divergence (spec.md §9).
    unsafe {
        out.as_mut_vec().extend_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_bmp_round_trip() {
        let word = "hello"; // all single-byte BMP, exercises byte-for-byte path
        let mut buf = Vec::new();
        let units: Vec<u16> = word.encode_utf16().collect();
        buf.extend_from_slice(&(units.len() as u16).to_le_bytes());
        for u in &units {
            buf.extend_from_slice(&u.to_le_bytes());
        }
        let mut cur = Cursor::new(buf);
        let s = read_len_prefixed_utf16_string(&mut cur, false).unwrap();
        assert_eq!(s, "hello");
    }

    #[test]
    fn null_terminated_consumes_trailing_two_bytes() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&(b'x' as u16).to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes()); // NUL terminator
        buf.extend_from_slice(&[0xAA, 0xBB]); // sentinel bytes after
        let mut cur = Cursor::new(buf);
        let s = read_len_prefixed_utf16_string(&mut cur, true).unwrap();
        assert_eq!(s, "x");
        // cursor should now be positioned right after the NUL terminator
        assert_eq!(cur.position(), 6);
    }

    #[test]
    fn multi_byte_bmp_transcodes_correctly() {
        let word = "héllo"; // 'é' is 2-byte UTF-8, single UTF-16 code unit
        let mut buf = Vec::new();
        let units: Vec<u16> = word.encode_utf16().collect();
        buf.extend_from_slice(&(units.len() as u16).to_le_bytes());
        for u in &units {
            buf.extend_from_slice(&u.to_le_bytes());
        }
        let mut cur = Cursor::new(buf);
        let s = read_len_prefixed_utf16_string(&mut cur, false).unwrap();
        assert_eq!(s, "héllo");
    }
}

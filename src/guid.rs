//! GUID wire decoding and formatting, grounded in the teacher's `src/guid.rs`.

use std::fmt::{self, Display, Write as _};

use crate::err::Result;
use crate::primitives::{PrimitiveRead, ReadSeek};

/// A 16-byte Windows GUID: `{data1 (4), data2 (2), data3 (2), data4 (8)}`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Guid {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

impl Guid {
    pub fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Guid { data1, data2, data3, data4 }
    }

    /// Reads a GUID's 16 bytes: `u32 data1, u16 data2, u16 data3, [u8; 8] data4`.
    pub fn from_stream<T: ReadSeek + ?Sized>(stream: &mut T) -> Result<Guid> {
        let data1 = stream.read_u32_tagged("guid data1")?;
        let data2 = stream.read_u16_tagged("guid data2")?;
        let data3 = stream.read_u16_tagged("guid data3")?;
        let mut data4 = [0u8; 8];
        stream.read_exact_tagged(&mut data4, "guid data4")?;
        Ok(Guid::new(data1, data2, data3, data4))
    }
}

/// spec.md §4.C: `D1-W1-W2-B0B1-B2B3B4B5B6B7` with widths
/// `%08X-%02X-%02X-%02X%02X-...`.
impl Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::with_capacity(36);
        write!(
            s,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7],
        )
        .expect("writing to a String cannot fail");
        f.write_str(&s)
    }
}

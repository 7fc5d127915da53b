use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvtxError>;

#[derive(Debug, Error)]
pub enum EvtxError {
    #[error("Offset {offset}: An I/O error has occurred while trying to read {t}")]
    FailedToRead {
        offset: u64,
        t: &'static str,
        source: std::io::Error,
    },

    #[error("An I/O error has occurred")]
    IO {
        #[from]
        source: std::io::Error,
    },

    #[error("Failed to open file {}", path.display())]
    FailedToOpenFile {
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[error("Unsupported EVTX file version {version:#010x}, only 0x00030001 is supported")]
    UnsupportedVersion { version: u32 },

    #[error("Invalid EVTX file header magic, expected `ElfFile\\0`, found `{magic:02x?}`")]
    InvalidEvtxFileHeaderMagic { magic: [u8; 8] },

    #[error("Invalid EVTX chunk header magic, expected `ElfChnk\\0`, found `{magic:02x?}`")]
    InvalidEvtxChunkMagic { magic: [u8; 8] },

    #[error(
        "Offset {offset}: invalid EVTX record header magic, expected `2a2a0000`, found `{magic:02x?}`"
    )]
    InvalidEvtxRecordHeaderMagic { magic: [u8; 4], offset: u64 },

    #[error("Offset {offset}: malformed record ({message})")]
    MalformedRecord { message: &'static str, offset: u64 },

    #[error("Offset {offset}: `{value:#04x}` is not a valid BinXML token")]
    InvalidToken { value: u8, offset: u64 },

    #[error("Offset {offset}: template instance lead byte `{value:#04x}` is not `0x01`")]
    InvalidTemplateInstanceLeadByte { value: u8, offset: u64 },

    #[error("Offset {offset}: `{value:#04x}` is not a valid BinXML value type")]
    UnknownValueType { value: u8, offset: u64 },

    #[error("Offset {offset}: failed to decode UTF-16 string")]
    FailedToDecodeUTF16String { offset: u64 },

    #[error("Offset {offset}: unexpected end of input while reading {what}")]
    Truncated { what: &'static str, offset: u64 },
}

//! A parser for the Windows Event Log (EVTX) binary format and its BinXML
//! record encoding.
//!
//! The entry point is [`EvtxParser`]; construct one with
//! [`EvtxParser::from_path`] or [`EvtxParser::from_read_seek`], then drive it
//! to completion with [`EvtxParser::parse_file`].

pub mod binxml;
pub mod chunk_header;
pub mod err;
pub mod file_header;
pub mod guid;
pub mod name;
pub mod parser;
pub mod primitives;
pub mod record;
pub mod sid;
pub mod value;

pub use crate::binxml::interpreter::Variable;
pub use crate::err::{EvtxError, Result};
pub use crate::parser::{EvtxParser, ParsedRecord};

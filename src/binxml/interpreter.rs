//! Component D — the BinXML interpreter.
//!
//! A pull loop over one token byte at a time (spec.md §4.D), threading the
//! record driver's `xpath`/`attr`/`evtname`/`variable` state and an
//! optional template-compile sink (`ct`) through every token handler.
//! Grounded in the teacher's `binxml/deserializer.rs` token loop and
//! `binxml/tokens.rs` per-token readers, collapsed into a single recursive
//! function since this crate has no intermediate token-stream `Vec` to
//! build — each token is applied to `variable`/`ct` as it's read.

use std::io::Cursor;

use hashbrown::HashMap;
use log::{debug, trace};

use crate::binxml::template::{Template, TemplateCache};
use crate::binxml::tokens::{
    has_attributes, validate_token, ATTRIBUTE, CLOSE_ELEMENT, CLOSE_EMPTY_ELEMENT,
    CLOSE_START_ELEMENT, END_OF_FRAGMENT, FRAGMENT_HEADER, NORMAL_SUBSTITUTION,
    OPEN_START_ELEMENT, OPTIONAL_SUBSTITUTION, TEMPLATE_INSTANCE, TEMPLATE_INSTANCE_LEAD_BYTE,
    VALUE_TEXT,
};
use crate::err::{EvtxError, Result};
use crate::name;
use crate::primitives::{read_len_prefixed_utf16_string, PrimitiveRead, ReadSeek};
use crate::value;

use std::rc::Rc;

/// The record's accumulated key→value mapping (spec.md §3).
pub type Variable = HashMap<String, String, ahash::RandomState>;

/// Walks one BinXML fragment from `stream` until an `EndOfFragment` token
/// or physical EOF (spec.md §4.D).
///
/// `ct`, when `Some`, is the template currently being compiled: `ValueText`
/// writes go to its `fixed` map and substitution placeholders populate its
/// `subst` map instead of `variable` (spec.md §3, §4.E). `xpath`/`attr`/
/// `evtname` are shared with the caller across template-body parsing
/// (spec.md §4.E: a template's body is itself the record's XML structure,
/// so `OpenStartElement`/`Attribute` tokens inside it must update the same
/// path state the live record decode relies on for name binding).
pub fn interpret<T: ReadSeek + ?Sized>(
    stream: &mut T,
    templates: &mut TemplateCache,
    xpath: &mut Vec<String>,
    attr: &mut String,
    evtname: &mut String,
    variable: &mut Variable,
    mut ct: Option<&mut Template>,
) -> Result<()> {
    loop {
        let offset = stream.stream_position_or_zero();

        let mut tok_buf = [0u8; 1];
        let n = std::io::Read::read(stream, &mut tok_buf)
            .map_err(|source| EvtxError::FailedToRead { offset, t: "binxml token", source })?;
        if n == 0 {
            // Physical end of the bounded fragment; treated the same as an
            // explicit EndOfFragment token (spec.md §4.D).
            return Ok(());
        }
        let raw_token = tok_buf[0];
        trace!("offset {}: binxml token byte {:#04x}", offset, raw_token);

        let base = match validate_token(raw_token) {
            Some(base) => base,
            None => return Err(EvtxError::InvalidToken { value: raw_token, offset }),
        };

        match base {
            END_OF_FRAGMENT => return Ok(()),

            OPEN_START_ELEMENT => {
                let _reserved = stream.read_u16_tagged("open start element reserved field")?;
                let _data_size = stream.read_u32_tagged("open start element data size")?;
                let name = name::read_name_ref(stream)?;
                if has_attributes(raw_token) {
                    let _attr_block_size =
                        stream.read_u32_tagged("open start element attribute block size")?;
                }
                xpath.push(name);
                attr.clear();
            }

            CLOSE_START_ELEMENT => {
                attr.clear();
            }

            CLOSE_EMPTY_ELEMENT | CLOSE_ELEMENT => {
                xpath.pop();
                attr.clear();
            }

            VALUE_TEXT => {
                let _value_kind = stream.read_u8_tagged("value text kind byte")?;
                let text = read_len_prefixed_utf16_string(stream, false)?;
                handle_value_text(text, xpath, attr, evtname, variable, ct.as_deref_mut());
            }

            ATTRIBUTE => {
                let name = name::read_name_ref(stream)?;
                *attr = name;
            }

            TEMPLATE_INSTANCE => {
                handle_template_instance(stream, templates, xpath, attr, evtname, variable)?;
            }

            NORMAL_SUBSTITUTION | OPTIONAL_SUBSTITUTION => {
                let id = stream.read_u16_tagged("substitution placeholder id")?;
                let tag = stream.read_u8_tagged("substitution value type tag")?;
                if tag == 0 {
                    let _ = stream.read_u8_tagged("substitution null-type padding byte")?;
                }
                if let Some(template) = ct.as_deref_mut() {
                    let key = resolve_key(xpath, attr, evtname);
                    if !key.is_empty() {
                        template.subst.insert(id, key);
                    }
                }
            }

            FRAGMENT_HEADER => {
                let mut skip = [0u8; 3];
                stream.read_exact_tagged(&mut skip, "fragment header reserved bytes")?;
            }

            // `validate_token` only ever returns a base value from the set
            // matched above.
            _ => unreachable!("validate_token returned an unrecognized base token"),
        }
    }
}

/// spec.md §4.D "Name-binding rule (`resolveKey`)".
fn resolve_key(xpath: &[String], attr: &str, evtname: &str) -> String {
    if !attr.is_empty() {
        attr.to_string()
    } else if ends_with_event_data_data(xpath) && !evtname.is_empty() {
        evtname.to_string()
    } else if let Some(top) = xpath.last() {
        top.clone()
    } else {
        String::new()
    }
}

fn ends_with_event_data_data(xpath: &[String]) -> bool {
    xpath.len() >= 2
        && xpath[xpath.len() - 2] == "EventData"
        && xpath[xpath.len() - 1] == "Data"
}

fn is_event_data_data_name_attr(xpath: &[String], attr: &str) -> bool {
    attr == "Name" && ends_with_event_data_data(xpath)
}

/// spec.md §4.D "ValueText special case".
fn handle_value_text(
    text: String,
    xpath: &[String],
    attr: &str,
    evtname: &mut String,
    variable: &mut Variable,
    ct: Option<&mut Template>,
) {
    if is_event_data_data_name_attr(xpath, attr) {
        *evtname = text;
        return;
    }

    let quoted = format!("'{}'", text);
    let key = resolve_key(xpath, attr, evtname);
    if key.is_empty() {
        return;
    }

    match ct {
        Some(template) => {
            template.fixed.insert(key, quoted);
        }
        None => {
            variable.insert(key, quoted);
        }
    }
}

/// spec.md §4.E — `TemplateInstance` header, optional definition, and
/// argument vector.
fn handle_template_instance<T: ReadSeek + ?Sized>(
    stream: &mut T,
    templates: &mut TemplateCache,
    xpath: &mut Vec<String>,
    attr: &mut String,
    evtname: &mut String,
    variable: &mut Variable,
) -> Result<()> {
    let offset = stream.stream_position_or_zero();
    let lead = stream.read_u8_tagged("template instance lead byte")?;
    if lead != TEMPLATE_INSTANCE_LEAD_BYTE {
        return Err(EvtxError::InvalidTemplateInstanceLeadByte { value: lead, offset });
    }

    let id = stream.read_u32_tagged("template instance id")?;
    let _unused = stream.read_u32_tagged("template instance unused field")?;
    let mut n_arg = stream.read_u32_tagged("template instance arg count")?;

    let template: Rc<Template> = match templates.get(id) {
        Some(template) => {
            debug!("template {} is cached, skipping definition", id);
            template
        }
        None => {
            debug!("template {} is not cached, parsing its definition", id);
            let mut identity = [0u8; 16];
            stream.read_exact_tagged(&mut identity, "template definition identity")?;
            let body_len = stream.read_u32_tagged("template definition body length")? as u64;
            let body_start = stream.stream_position_or_zero();

            let mut new_template = Template::default();
            interpret(stream, templates, xpath, attr, evtname, &mut Variable::default(), Some(&mut new_template))?;

            // Seek-to-end discipline regardless of how much the body parse
            // consumed (spec.md §3 invariants, §9).
            stream.seek_to_tagged(body_start + body_len, "template definition body end")?;

            // The argument count after the body shadows the header's count
            // (spec.md §4.E).
            n_arg = stream.read_u32_tagged("template instance arg count (post-definition)")?;

            let rc = Rc::new(new_template);
            templates.insert(id, rc.clone());
            rc
        }
    };

    for (key, value) in template.fixed.iter() {
        variable.insert(key.clone(), value.clone());
    }

    let mut descriptors = Vec::with_capacity(n_arg as usize);
    for _ in 0..n_arg {
        let length = stream.read_u16_tagged("template argument descriptor length")?;
        let tag = stream.read_u8_tagged("template argument descriptor type")?;
        let _reserved = stream.read_u8_tagged("template argument descriptor reserved byte")?;
        descriptors.push((length, tag));
    }

    for (i, (length, tag)) in descriptors.into_iter().enumerate() {
        if length == 0 {
            continue;
        }

        let value_start = stream.stream_position_or_zero();
        let decoded = value::decode(stream, tag, length, |nested_bytes| {
            interpret_nested_binxml(nested_bytes, templates)
        })?;
        stream.seek_to_tagged(value_start + length as u64, "template argument value end")?;

        // Null-type arguments are suppressed to avoid mapping-noise
        // (spec.md §4.E).
        if tag == 0x00 {
            continue;
        }

        let id = i as u16;
        let key = template
            .subst
            .get(&id)
            .filter(|k| !k.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("arg_{}", id));
        variable.insert(key, decoded);
    }

    Ok(())
}

/// Decodes a nested BinXML value (type `0x21`, spec.md §4.C): runs the
/// interpreter over an isolated scope (fresh `xpath`/`attr`/`evtname`, no
/// template sink) and renders its resulting key→value mapping to a single
/// string, since this is the value's string form (spec.md §9: "the string
/// form is the only output"). Keys are sorted for a deterministic result.
fn interpret_nested_binxml(bytes: &[u8], templates: &mut TemplateCache) -> Result<String> {
    let mut cursor = Cursor::new(bytes);
    let mut nested_xpath = Vec::new();
    let mut nested_attr = String::new();
    let mut nested_evtname = String::new();
    let mut nested_variable = Variable::default();

    interpret(
        &mut cursor,
        templates,
        &mut nested_xpath,
        &mut nested_attr,
        &mut nested_evtname,
        &mut nested_variable,
        None,
    )?;

    let mut pairs: Vec<(&String, &String)> = nested_variable.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    Ok(pairs
        .into_iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join(","))
}

/// Small helper so offset-tagged errors inside the interpreter don't need
/// to thread `io::Result` plumbing just to report a position.
trait StreamPositionOrZero {
    fn stream_position_or_zero(&mut self) -> u64;
}

impl<T: ReadSeek + ?Sized> StreamPositionOrZero for T {
    fn stream_position_or_zero(&mut self) -> u64 {
        std::io::Seek::stream_position(self).unwrap_or(0)
    }
}

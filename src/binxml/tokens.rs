//! BinXML token-byte vocabulary (spec.md §4.D), grounded in the teacher's
//! `src/model/raw.rs` / `BinXMLRawToken` enum, flattened here to plain `u8`
//! constants since the interpreter dispatches on the byte directly rather
//! than through an intermediate enum.

/// Tokens with a "has attributes" variant encode it as this bit on top of
/// the base token value (e.g. `OpenStartElement` 0x01 / 0x41).
pub const HAS_ATTRIBUTES_FLAG: u8 = 0x40;

pub const END_OF_FRAGMENT: u8 = 0x00;
pub const OPEN_START_ELEMENT: u8 = 0x01;
pub const OPEN_START_ELEMENT_WITH_ATTRS: u8 = 0x41;
pub const CLOSE_START_ELEMENT: u8 = 0x02;
pub const CLOSE_EMPTY_ELEMENT: u8 = 0x03;
pub const CLOSE_ELEMENT: u8 = 0x04;
pub const VALUE_TEXT: u8 = 0x05;
pub const VALUE_TEXT_WITH_ATTRS: u8 = 0x45;
pub const ATTRIBUTE: u8 = 0x06;
pub const ATTRIBUTE_WITH_ATTRS: u8 = 0x46;
pub const TEMPLATE_INSTANCE: u8 = 0x0C;
pub const NORMAL_SUBSTITUTION: u8 = 0x0D;
pub const OPTIONAL_SUBSTITUTION: u8 = 0x0E;
pub const FRAGMENT_HEADER: u8 = 0x0F;

/// Strips the "has attributes" bit, leaving the base token value used for
/// dispatch (spec.md §4.D: "bit 0x40 on some tokens signals 'has
/// attributes'").
pub fn base_token(raw: u8) -> u8 {
    raw & !HAS_ATTRIBUTES_FLAG
}

pub fn has_attributes(raw: u8) -> bool {
    raw & HAS_ATTRIBUTES_FLAG != 0
}

/// Validates `raw` against the exact set of documented token bytes (spec.md
/// §4.D) and returns its base token value on success. The `0x40` "+attrs"
/// bit is only a legal encoding on `OpenStartElement`/`ValueText`/`Attribute`
/// (0x01/0x41, 0x05/0x45, 0x06/0x46); every other token has exactly one
/// valid byte, so e.g. `0x42`/`0x44`/`0x4C`/`0x4F` are not accepted even
/// though masking the bit off would land on a known base token. Mirrors the
/// teacher's exhaustive `BinXMLRawToken::from_u8` match
/// (`examples/omerbenamram-evtx/src/model/raw.rs`), which rejects the same
/// bytes via its trailing `_ => None`.
pub fn validate_token(raw: u8) -> Option<u8> {
    match raw {
        END_OF_FRAGMENT
        | OPEN_START_ELEMENT
        | OPEN_START_ELEMENT_WITH_ATTRS
        | CLOSE_START_ELEMENT
        | CLOSE_EMPTY_ELEMENT
        | CLOSE_ELEMENT
        | VALUE_TEXT
        | VALUE_TEXT_WITH_ATTRS
        | ATTRIBUTE
        | ATTRIBUTE_WITH_ATTRS
        | TEMPLATE_INSTANCE
        | NORMAL_SUBSTITUTION
        | OPTIONAL_SUBSTITUTION
        | FRAGMENT_HEADER => Some(base_token(raw)),
        _ => None,
    }
}

/// The lead byte a `TemplateInstance` token's header must carry.
pub const TEMPLATE_INSTANCE_LEAD_BYTE: u8 = 0x01;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_token_strips_attribute_flag() {
        assert_eq!(base_token(0x41), OPEN_START_ELEMENT);
        assert_eq!(base_token(0x45), VALUE_TEXT);
        assert_eq!(base_token(0x46), ATTRIBUTE);
        assert_eq!(base_token(0x01), OPEN_START_ELEMENT);
    }

    #[test]
    fn has_attributes_detects_flag() {
        assert!(has_attributes(0x41));
        assert!(!has_attributes(0x01));
    }

    #[test]
    fn validate_token_accepts_documented_attrs_variants() {
        assert_eq!(validate_token(0x01), Some(OPEN_START_ELEMENT));
        assert_eq!(validate_token(0x41), Some(OPEN_START_ELEMENT));
        assert_eq!(validate_token(0x05), Some(VALUE_TEXT));
        assert_eq!(validate_token(0x45), Some(VALUE_TEXT));
        assert_eq!(validate_token(0x06), Some(ATTRIBUTE));
        assert_eq!(validate_token(0x46), Some(ATTRIBUTE));
    }

    #[test]
    fn validate_token_rejects_undocumented_attrs_bit_combinations() {
        // None of these tokens have a documented "+attrs" encoding, so
        // setting 0x40 on them must not be accepted just because masking
        // the bit off happens to land on a known base token.
        for byte in [0x40u8, 0x42, 0x43, 0x44, 0x4C, 0x4D, 0x4E, 0x4F] {
            assert_eq!(validate_token(byte), None, "byte {:#04x} must be rejected", byte);
        }
    }

    #[test]
    fn validate_token_rejects_unknown_base_bytes() {
        for byte in [0x07u8, 0x08, 0x09, 0x0A, 0x0B, 0x10, 0xFF] {
            assert_eq!(validate_token(byte), None, "byte {:#04x} must be rejected", byte);
        }
    }
}

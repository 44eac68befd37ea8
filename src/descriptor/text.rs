//! Decoding of the text strings carried in SI descriptors (_ETSI EN 300 468, Annex A_).
//!
//! The first byte of a string may select a character table.  Without a selector, the default
//! table (a variant of ISO/IEC 6937) applies, which is approximated here by windows-1252.

use encoding_rs::Encoding;

/// Decodes a raw SI text field into a `String`.
///
/// Control codes in the range `0x80..=0x9f` are dropped from single-byte encoded text, except for
/// the CR/LF code `0x8a` which becomes `'\n'`.
pub fn decode(raw: &[u8]) -> String {
    let (encoding, body) = select_table(raw);
    if !encoding.is_single_byte() {
        return encoding.decode_without_bom_handling(body).0.into_owned();
    }
    let mut out = String::with_capacity(body.len());
    let mut start = 0;
    for (i, &b) in body.iter().enumerate() {
        if is_control(b) {
            out.push_str(&encoding.decode_without_bom_handling(&body[start..i]).0);
            if b == CR_LF {
                out.push('\n');
            }
            start = i + 1;
        }
    }
    out.push_str(&encoding.decode_without_bom_handling(&body[start..]).0);
    out
}

const CR_LF: u8 = 0x8a;

fn is_control(b: u8) -> bool {
    (0x80..=0x9f).contains(&b)
}

fn select_table(raw: &[u8]) -> (&'static Encoding, &[u8]) {
    let Some((&first, rest)) = raw.split_first() else {
        return (encoding_rs::WINDOWS_1252, raw);
    };
    match first {
        0x01 => (encoding_rs::ISO_8859_5, rest),
        0x02 => (encoding_rs::ISO_8859_6, rest),
        0x03 => (encoding_rs::ISO_8859_7, rest),
        0x04 => (encoding_rs::ISO_8859_8, rest),
        0x05 => (encoding_rs::WINDOWS_1254, rest),
        0x06 => (encoding_rs::ISO_8859_10, rest),
        0x07 => (encoding_rs::WINDOWS_874, rest),
        0x09 => (encoding_rs::ISO_8859_13, rest),
        0x0a => (encoding_rs::ISO_8859_14, rest),
        0x0b => (encoding_rs::ISO_8859_15, rest),
        0x10 if rest.len() >= 2 => (iso_8859_part(rest[1]), &rest[2..]),
        0x11 => (encoding_rs::UTF_16BE, rest),
        0x12 => (encoding_rs::EUC_KR, rest),
        0x13 => (encoding_rs::GBK, rest),
        0x14 => (encoding_rs::BIG5, rest),
        0x15 => (encoding_rs::UTF_8, rest),
        0x1f if !rest.is_empty() => (encoding_rs::WINDOWS_1252, &rest[1..]),
        0x00..=0x1f => (encoding_rs::WINDOWS_1252, rest),
        _ => (encoding_rs::WINDOWS_1252, raw),
    }
}

fn iso_8859_part(part: u8) -> &'static Encoding {
    match part {
        0x02 => encoding_rs::ISO_8859_2,
        0x03 => encoding_rs::ISO_8859_3,
        0x04 => encoding_rs::ISO_8859_4,
        0x05 => encoding_rs::ISO_8859_5,
        0x06 => encoding_rs::ISO_8859_6,
        0x07 => encoding_rs::ISO_8859_7,
        0x08 => encoding_rs::ISO_8859_8,
        0x09 => encoding_rs::WINDOWS_1254,
        0x0a => encoding_rs::ISO_8859_10,
        0x0b => encoding_rs::WINDOWS_874,
        0x0d => encoding_rs::ISO_8859_13,
        0x0e => encoding_rs::ISO_8859_14,
        0x0f => encoding_rs::ISO_8859_15,
        0x10 => encoding_rs::ISO_8859_16,
        _ => encoding_rs::WINDOWS_1252,
    }
}

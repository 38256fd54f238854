//! Byte decoding for uploaded CSV files.

use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decoded file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded text, without a byte order mark.
    pub text: String,
    /// Encoding the bytes were read as.
    pub encoding: &'static Encoding,
    /// Whether malformed byte sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

/// Decode an uploaded file.
///
/// Files exported from spreadsheet software here are Shift_JIS. A UTF-8 byte
/// order mark is the one signal that the file was saved as UTF-8 instead.
#[must_use]
pub fn decode(bytes: &[u8]) -> Decoded {
    let (encoding, body) = bytes
        .strip_prefix(UTF8_BOM)
        .map_or((SHIFT_JIS, bytes), |rest| (UTF_8, rest));

    let (text, had_errors) = encoding.decode_without_bom_handling(body);
    Decoded {
        text: text.into_owned(),
        encoding,
        had_errors,
    }
}

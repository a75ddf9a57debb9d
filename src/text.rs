//! Text handling shared by headers and bodies
//!
//! Everything that ends up in a message goes through here: arbitrary input is
//! forced to text with [`force_text`], and text that is not plain ASCII gets
//! encoded for headers with [RFC 2047](https://tools.ietf.org/html/rfc2047)
//! encoded-words or [RFC 2231](https://tools.ietf.org/html/rfc2231) parameters.

use std::{
    borrow::Cow,
    fmt::{self, Display},
    str::FromStr,
};

use base64::{engine::general_purpose::STANDARD, Engine};
use encoding_rs::{Encoding, WINDOWS_1252};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{Result, TextDecodeError};

/// Charset used when a message does not name one
pub const DEFAULT_CHARSET: &str = "utf-8";

// https://tools.ietf.org/html/rfc2047#section-2
const MAX_ENCODED_WORD_LEN: usize = 75;

// unreserved characters are kept, everything else is percent-encoded
const RFC2231_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// What to do with bytes that are invalid in the requested encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeErrors {
    /// Fail with [`Error::TextDecode`](crate::Error::TextDecode)
    #[default]
    Strict,
    /// Replace invalid input with U+FFFD
    Replace,
    /// Drop invalid input
    Ignore,
}

impl FromStr for DecodeErrors {
    type Err = UnknownDecodeErrors;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(DecodeErrors::Strict),
            "replace" => Ok(DecodeErrors::Replace),
            "ignore" => Ok(DecodeErrors::Ignore),
            _ => Err(UnknownDecodeErrors(s.to_owned())),
        }
    }
}

/// A decode error policy name that is not `strict`, `replace` or `ignore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDecodeErrors(String);

impl Display for UnknownDecodeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown decode error policy {:?}", self.0)
    }
}

impl std::error::Error for UnknownDecodeErrors {}

/// A value that can be forced to text
pub enum TextInput<'a> {
    /// Already text
    Str(&'a str),
    /// Raw bytes in some encoding
    Bytes(&'a [u8]),
    /// Several values rendered one after the other, separated by spaces
    Args(Vec<TextInput<'a>>),
    /// Anything else with a textual representation
    Display(&'a dyn Display),
}

impl fmt::Debug for TextInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextInput::Str(s) => f.debug_tuple("Str").field(s).finish(),
            TextInput::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            TextInput::Args(args) => f.debug_tuple("Args").field(args).finish(),
            TextInput::Display(d) => f.debug_tuple("Display").field(&d.to_string()).finish(),
        }
    }
}

impl<'a> From<&'a str> for TextInput<'a> {
    fn from(s: &'a str) -> Self {
        TextInput::Str(s)
    }
}

impl<'a> From<&'a String> for TextInput<'a> {
    fn from(s: &'a String) -> Self {
        TextInput::Str(s)
    }
}

impl<'a> From<&'a [u8]> for TextInput<'a> {
    fn from(b: &'a [u8]) -> Self {
        TextInput::Bytes(b)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for TextInput<'a> {
    fn from(b: &'a [u8; N]) -> Self {
        TextInput::Bytes(b)
    }
}

impl<'a> From<&'a Vec<u8>> for TextInput<'a> {
    fn from(b: &'a Vec<u8>) -> Self {
        TextInput::Bytes(b)
    }
}

impl<'a> From<Vec<TextInput<'a>>> for TextInput<'a> {
    fn from(args: Vec<TextInput<'a>>) -> Self {
        TextInput::Args(args)
    }
}

/// Forces `value` to a `String`
///
/// Text is returned unchanged, bytes are decoded with `encoding` following the
/// `errors` policy, argument lists are forced one by one and joined with
/// spaces, and any other value is formatted with [`Display`].
///
/// ```
/// use courier::text::{force_text, DecodeErrors};
///
/// # fn main() -> Result<(), courier::Error> {
/// assert_eq!(force_text(b"caf\xc3\xa9", "utf-8", DecodeErrors::Strict)?, "café");
/// assert!(force_text(b"caf\xe9", "ascii", DecodeErrors::Strict).is_err());
/// # Ok(())
/// # }
/// ```
pub fn force_text<'a, T: Into<TextInput<'a>>>(
    value: T,
    encoding: &str,
    errors: DecodeErrors,
) -> Result<String> {
    match value.into() {
        TextInput::Str(s) => Ok(s.to_owned()),
        TextInput::Bytes(bytes) => decode(bytes, encoding, errors),
        TextInput::Args(args) => {
            let parts = args
                .into_iter()
                .map(|arg| force_text(arg, encoding, errors))
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join(" "))
        }
        TextInput::Display(value) => Ok(value.to_string()),
    }
}

fn decode(bytes: &[u8], encoding: &str, errors: DecodeErrors) -> Result<String> {
    let label = encoding.trim().to_ascii_lowercase();
    match label.as_str() {
        "utf-8" | "utf8" => decode_utf8(bytes, encoding, errors),
        "ascii" | "us-ascii" => decode_ascii(bytes, encoding, errors),
        _ => {
            let codec = Encoding::for_label(label.as_bytes())
                .ok_or_else(|| TextDecodeError::new(bytes, encoding, "unknown encoding"))?;
            match errors {
                DecodeErrors::Strict => codec
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .map(Cow::into_owned)
                    .ok_or_else(|| {
                        TextDecodeError::new(bytes, encoding, "invalid byte sequence").into()
                    }),
                DecodeErrors::Replace => Ok(codec.decode_without_bom_handling(bytes).0.into_owned()),
                // U+FFFD already present in the input is dropped as well
                DecodeErrors::Ignore => Ok(codec
                    .decode_without_bom_handling(bytes)
                    .0
                    .chars()
                    .filter(|c| *c != char::REPLACEMENT_CHARACTER)
                    .collect()),
            }
        }
    }
}

fn decode_utf8(bytes: &[u8], encoding: &str, errors: DecodeErrors) -> Result<String> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_owned()),
        Err(err) => match errors {
            DecodeErrors::Strict => Err(TextDecodeError::new(
                bytes,
                encoding,
                format!("invalid utf-8 sequence at position {}", err.valid_up_to()),
            )
            .into()),
            DecodeErrors::Replace => Ok(String::from_utf8_lossy(bytes).into_owned()),
            DecodeErrors::Ignore => Ok(String::from_utf8_lossy(bytes)
                .chars()
                .filter(|c| *c != char::REPLACEMENT_CHARACTER)
                .collect()),
        },
    }
}

fn decode_ascii(bytes: &[u8], encoding: &str, errors: DecodeErrors) -> Result<String> {
    match errors {
        DecodeErrors::Strict => match bytes.iter().position(|b| !b.is_ascii()) {
            Some(position) => Err(TextDecodeError::new(
                bytes,
                encoding,
                format!(
                    "byte 0x{:02x} at position {position} is out of range",
                    bytes[position]
                ),
            )
            .into()),
            None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        },
        DecodeErrors::Replace => Ok(bytes
            .iter()
            .map(|&b| {
                if b.is_ascii() {
                    char::from(b)
                } else {
                    char::REPLACEMENT_CHARACTER
                }
            })
            .collect()),
        DecodeErrors::Ignore => Ok(bytes
            .iter()
            .filter(|b| b.is_ascii())
            .map(|&b| char::from(b))
            .collect()),
    }
}

/// Whether `s` can go into a header without encoding
#[inline]
pub fn is_ascii(s: &str) -> bool {
    s.is_ascii()
}

/// Encodes `s` in `charset`
///
/// Returns the bytes and the name of the charset actually used: when the
/// label is unknown or `s` contains characters the charset cannot represent,
/// utf-8 is used instead.
pub fn to_charset<'s>(s: &'s str, charset: &'s str) -> (Cow<'s, [u8]>, Cow<'s, str>) {
    let fallback = || (Cow::Borrowed(s.as_bytes()), Cow::Borrowed(DEFAULT_CHARSET));

    let label = charset.trim().to_ascii_lowercase();
    match label.as_str() {
        "utf-8" | "utf8" => (Cow::Borrowed(s.as_bytes()), Cow::Borrowed(charset.trim())),
        "ascii" | "us-ascii" if s.is_ascii() => {
            (Cow::Borrowed(s.as_bytes()), Cow::Borrowed(charset.trim()))
        }
        "ascii" | "us-ascii" => fallback(),
        _ => match Encoding::for_label(label.as_bytes()) {
            // encoding_rs reads the latin-1 labels as windows-1252
            Some(codec) if codec == WINDOWS_1252 && !label.contains("1252") => {
                match encode_latin1(s) {
                    Some(bytes) => (Cow::Owned(bytes), Cow::Borrowed(charset.trim())),
                    None => fallback(),
                }
            }
            // utf-16 and friends encode to utf-8 in encoding_rs
            Some(codec) if codec.output_encoding() == codec => {
                let (bytes, _, had_errors) = codec.encode(s);
                if had_errors {
                    fallback()
                } else if codec.name().eq_ignore_ascii_case(charset.trim()) {
                    (bytes, Cow::Borrowed(charset.trim()))
                } else {
                    // declare the charset the bytes are actually in
                    (bytes, Cow::Borrowed(codec.name()))
                }
            }
            _ => fallback(),
        },
    }
}

/// ISO-8859-1 maps the first 256 code points to single bytes
fn encode_latin1(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

/// Encodes `s` as a single `B` encoded-word
///
/// The word is not split, so it may exceed the recommended line length.
pub fn encode_word(s: &str, charset: &str) -> String {
    let (bytes, charset) = to_charset(s, charset);
    format!("=?{}?b?{}?=", charset, STANDARD.encode(bytes))
}

/// Encodes a header value
///
/// ASCII values are returned unchanged. Other values become a list of
/// encoded-words of at most 75 characters each, folded on `CRLF SP`.
pub fn encode_header(s: &str, charset: &str) -> String {
    if is_ascii(s) {
        return s.to_owned();
    }

    let (_, used) = to_charset(s, charset);
    let overhead = "=?".len() + used.len() + "?b?".len() + "?=".len();
    let max_bytes = (MAX_ENCODED_WORD_LEN.saturating_sub(overhead) / 4 * 3).max(3);

    let mut words = Vec::new();
    let mut chunk = String::new();
    let mut chunk_len = 0;
    let mut buf = [0; 4];
    for c in s.chars() {
        let len = to_charset(c.encode_utf8(&mut buf), &used).0.len();
        if chunk_len + len > max_bytes && !chunk.is_empty() {
            words.push(encode_word(&chunk, &used));
            chunk.clear();
            chunk_len = 0;
        }
        chunk.push(c);
        chunk_len += len;
    }
    if !chunk.is_empty() {
        words.push(encode_word(&chunk, &used));
    }

    words.join("\r\n ")
}

/// Encodes a parameter value with the RFC 2231 extended syntax, tagged `UTF8`
pub fn encode_rfc2231(s: &str) -> String {
    format!("UTF8''{}", utf8_percent_encode(s, RFC2231_ESCAPE))
}

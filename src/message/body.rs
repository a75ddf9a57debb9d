use std::{
    fmt::{self, Display},
    mem, str,
};

use email_encoding::body::Encoding;

use crate::text::to_charset;

/// `Content-Transfer-Encoding` of a part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContentTransferEncoding {
    SevenBit,
    EightBit,
    QuotedPrintable,
    Base64,
}

impl Display for ContentTransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::QuotedPrintable => "quoted-printable",
            Self::Base64 => "base64",
        })
    }
}

/// A part body that has already been transfer-encoded
#[derive(Debug, Clone)]
pub(crate) struct Body {
    buf: Vec<u8>,
    encoding: ContentTransferEncoding,
}

impl Body {
    /// Encodes text for a `text/*` part
    ///
    /// Line endings are converted to CRLF and the text is encoded in
    /// `charset`. Returns the body with the charset that was actually used,
    /// which is utf-8 when `charset` cannot represent `text`.
    pub(crate) fn text(text: &str, charset: &str) -> (Self, String) {
        let mut text = text.to_owned();
        in_place_crlf_line_endings(&mut text);

        let (bytes, used) = to_charset(&text, charset);
        let encoding = match str::from_utf8(&bytes) {
            Ok(s) => choose(Encoding::choose(s, false)),
            Err(_) => choose(Encoding::choose(&bytes[..], false)),
        };

        (Self::new_impl(bytes.into_owned(), encoding), used.into_owned())
    }

    /// Encodes arbitrary data as base64
    pub(crate) fn binary(data: &[u8]) -> Self {
        Self::new_impl(data.to_vec(), ContentTransferEncoding::Base64)
    }

    fn new_impl(buf: Vec<u8>, encoding: ContentTransferEncoding) -> Self {
        match encoding {
            ContentTransferEncoding::SevenBit | ContentTransferEncoding::EightBit => {
                Self { buf, encoding }
            }
            ContentTransferEncoding::QuotedPrintable => Self {
                buf: quoted_printable::encode(buf),
                encoding,
            },
            ContentTransferEncoding::Base64 => {
                let len = email_encoding::body::base64::encoded_len(buf.len());

                let mut out = String::with_capacity(len);
                // writing to a String does not fail
                let _ = email_encoding::body::base64::encode(&buf, &mut out);

                Self {
                    buf: out.into_bytes(),
                    encoding,
                }
            }
        }
    }

    #[inline]
    pub(crate) fn encoding(&self) -> ContentTransferEncoding {
        self.encoding
    }

    #[inline]
    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

impl AsRef<[u8]> for Body {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.buf.as_ref()
    }
}

fn choose(encoding: Encoding) -> ContentTransferEncoding {
    match encoding {
        Encoding::SevenBit => ContentTransferEncoding::SevenBit,
        Encoding::EightBit => ContentTransferEncoding::EightBit,
        Encoding::QuotedPrintable => ContentTransferEncoding::QuotedPrintable,
        Encoding::Base64 => ContentTransferEncoding::Base64,
    }
}

/// In place conversion to CRLF line endings
fn in_place_crlf_line_endings(string: &mut String) {
    let indices = find_all_lf_char_indices(string);

    for i in indices {
        // `indices` is in reverse order
        string.insert(i, '\r');
    }
}

/// Positions where `\r` is missing before a `\n`, last first
fn find_all_lf_char_indices(s: &str) -> Vec<usize> {
    let mut indices = Vec::new();

    let mut found_lf = false;
    for (i, c) in s.char_indices().rev() {
        if mem::take(&mut found_lf) && c != '\r' {
            indices.push(i + c.len_utf8());
        }

        found_lf = c == '\n';
    }

    if found_lf {
        indices.push(0);
    }

    indices
}

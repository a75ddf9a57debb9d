use mime::Mime;
use unicode_normalization::UnicodeNormalization;

use crate::{
    message::{body::Body, mimebody::SinglePart},
    text::{encode_rfc2231, is_ascii},
    Error, Result,
};

/// A file attached to a [`Message`](super::Message)
///
/// ```
/// use courier::Attachment;
///
/// let attachment = Attachment::new(Some("report.csv".into()), "text/csv", "a,b\n1,2\n")
///     .header("Content-ID", "<report>");
/// assert_eq!(attachment.disposition_type(), "attachment");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: Option<String>,
    content_type: String,
    data: Vec<u8>,
    disposition: String,
    headers: Vec<(String, String)>,
}

impl Attachment {
    /// Creates an attachment with the `attachment` disposition
    ///
    /// `content_type` is a `type/subtype` media type, it is checked when the
    /// message is rendered.
    pub fn new<C, D>(filename: Option<String>, content_type: C, data: D) -> Self
    where
        C: Into<String>,
        D: Into<Vec<u8>>,
    {
        Self {
            filename,
            content_type: content_type.into(),
            data: data.into(),
            disposition: "attachment".to_owned(),
            headers: Vec::new(),
        }
    }

    /// Sets the `Content-Disposition` type
    pub fn disposition<S: Into<String>>(mut self, disposition: S) -> Self {
        self.disposition = disposition.into();
        self
    }

    /// Displays the attachment inline
    pub fn inline(self) -> Self {
        self.disposition("inline")
    }

    /// Adds a header written after `Content-Disposition`
    pub fn header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Name of the attached file
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Media type of the data
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The attached data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Disposition type, `attachment` unless changed
    pub fn disposition_type(&self) -> &str {
        &self.disposition
    }

    /// Extra headers of the part
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub(crate) fn to_part(&self, ascii_filenames: bool) -> Result<SinglePart> {
        let content_type: Mime = self
            .content_type
            .parse()
            .map_err(|_| Error::InvalidMessage("invalid attachment content type"))?;

        let mut disposition = self.disposition.clone();
        if let Some(filename) = &self.filename {
            disposition.push_str("; ");
            disposition.push_str(&filename_param(filename, ascii_filenames));
        }

        let part = SinglePart::new(content_type.to_string(), Body::binary(&self.data))
            .header("Content-Disposition", disposition);

        Ok(self.headers.iter().fold(part, |part, (name, value)| {
            part.header(name.clone(), value.clone())
        }))
    }
}

fn filename_param(filename: &str, ascii_only: bool) -> String {
    // a line break would end the header
    let filename = filename.replace(['\r', '\n'], "");
    if ascii_only {
        let ascii = filename.nfkd().filter(char::is_ascii).collect::<String>();
        let ascii = ascii.split_whitespace().collect::<Vec<_>>().join(" ");
        format!("filename=\"{}\"", quote(&ascii))
    } else if is_ascii(&filename) {
        format!("filename=\"{}\"", quote(&filename))
    } else {
        format!("filename*={}", encode_rfc2231(&filename))
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

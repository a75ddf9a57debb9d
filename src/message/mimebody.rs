//! MIME part tree of a rendered message

use crate::message::{
    body::Body,
    header::{HeaderName, Headers},
    EmailFormat,
};

/// MIME part variants
#[derive(Debug, Clone)]
pub(crate) enum Part {
    /// Single part with content
    Single(SinglePart),
    /// Multiple parts of content
    Multi(MultiPart),
}

impl Part {
    pub(crate) fn headers(&self) -> &Headers {
        match self {
            Part::Single(part) => &part.headers,
            Part::Multi(part) => &part.headers,
        }
    }

    fn format_body(&self, out: &mut Vec<u8>) {
        match self {
            Part::Single(part) => part.format_body(out),
            Part::Multi(part) => part.format_body(out),
        }
    }
}

impl EmailFormat for Part {
    fn format(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.headers().to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        self.format_body(out);
    }
}

/// A leaf part: headers and an encoded body
#[derive(Debug, Clone)]
pub(crate) struct SinglePart {
    headers: Headers,
    body: Vec<u8>,
}

impl SinglePart {
    /// Creates a part with `Content-Type: content_type` holding `body`
    ///
    /// The `Content-Transfer-Encoding` header is taken from the body.
    pub(crate) fn new(content_type: String, body: Body) -> Self {
        let mut headers = Headers::new();
        headers.push("Content-Type", content_type);
        headers.push("Content-Transfer-Encoding", body.encoding().to_string());

        Self {
            headers,
            body: body.into_vec(),
        }
    }

    /// Creates a `text/<subtype>` part
    pub(crate) fn text(text: &str, subtype: &str, charset: &str) -> Self {
        let (body, charset) = Body::text(text, charset);
        Self::new(format!("text/{subtype}; charset={charset}"), body)
    }

    /// Appends a header after the existing ones
    pub(crate) fn header<N: Into<HeaderName>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push(name, value);
        self
    }

    #[cfg(test)]
    pub(crate) fn raw_body(&self) -> &[u8] {
        &self.body
    }

    fn format_body(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.body);
        out.extend_from_slice(b"\r\n");
    }
}

/// The kind of multipart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MultiPartKind {
    /// Body and attachments
    Mixed,
    /// Several renderings of the same content
    Alternative,
}

impl MultiPartKind {
    fn subtype(self) -> &'static str {
        match self {
            Self::Mixed => "mixed",
            Self::Alternative => "alternative",
        }
    }
}

/// A multipart container
#[derive(Debug, Clone)]
pub(crate) struct MultiPart {
    headers: Headers,
    boundary: String,
    parts: Vec<Part>,
}

impl MultiPart {
    /// Creates an empty multipart of `kind` delimited by `boundary`
    pub(crate) fn new(kind: MultiPartKind, boundary: String) -> Self {
        let mut headers = Headers::new();
        headers.push(
            "Content-Type",
            format!("multipart/{}; boundary=\"{}\"", kind.subtype(), boundary),
        );

        Self {
            headers,
            boundary,
            parts: Vec::new(),
        }
    }

    /// Adds a leaf part
    pub(crate) fn singlepart(mut self, part: SinglePart) -> Self {
        self.parts.push(Part::Single(part));
        self
    }

    /// Adds a nested multipart
    pub(crate) fn multipart(mut self, part: MultiPart) -> Self {
        self.parts.push(Part::Multi(part));
        self
    }

    fn format_body(&self, out: &mut Vec<u8>) {
        for part in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(b"\r\n");
            part.format(out);
        }

        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn formatted(part: &Part) -> String {
        let mut out = Vec::new();
        part.format(&mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn single_part_text() {
        let part = SinglePart::text("Hello\nthere", "plain", "utf-8");

        assert_eq!(part.raw_body(), b"Hello\r\nthere");
        assert_eq!(
            formatted(&Part::Single(part)),
            concat!(
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "Hello\r\n",
                "there\r\n"
            )
        );
    }

    #[test]
    fn single_part_extra_headers() {
        let part = SinglePart::new("image/png".to_owned(), Body::binary(b"png"))
            .header("Content-Disposition", "inline")
            .header(String::from("Content-ID"), "<logo>");

        assert_eq!(
            formatted(&Part::Single(part)),
            concat!(
                "Content-Type: image/png\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "Content-Disposition: inline\r\n",
                "Content-ID: <logo>\r\n",
                "\r\n",
                "cG5n\r\n"
            )
        );
    }

    #[test]
    fn nested_multipart() {
        let alternative = MultiPart::new(MultiPartKind::Alternative, "alt_F2mTKN843l".to_owned())
            .singlepart(SinglePart::text("Hello", "plain", "utf-8"))
            .singlepart(SinglePart::text("<p>Hello</p>", "html", "utf-8"));
        let mixed =
            MultiPart::new(MultiPartKind::Mixed, "mixed_F2mTKN843l".to_owned()).multipart(alternative);

        assert_eq!(
            formatted(&Part::Multi(mixed)),
            concat!(
                "Content-Type: multipart/mixed; boundary=\"mixed_F2mTKN843l\"\r\n",
                "\r\n",
                "--mixed_F2mTKN843l\r\n",
                "Content-Type: multipart/alternative; boundary=\"alt_F2mTKN843l\"\r\n",
                "\r\n",
                "--alt_F2mTKN843l\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "Hello\r\n",
                "--alt_F2mTKN843l\r\n",
                "Content-Type: text/html; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "<p>Hello</p>\r\n",
                "--alt_F2mTKN843l--\r\n",
                "--mixed_F2mTKN843l--\r\n"
            )
        );
    }
}

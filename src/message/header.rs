//! Ordered header lists
// https://tools.ietf.org/html/rfc5322#section-2.2

use std::{
    borrow::Cow,
    fmt::{self, Display},
    ops::Deref,
};

/// Header fields in the order they are written
///
/// Values are stored already encoded; they are written out as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Headers {
    headers: Vec<(HeaderName, String)>,
}

/// Name of a header field
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HeaderName(Cow<'static, str>);

impl Headers {
    #[inline]
    pub(crate) const fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Appends a header, keeping any previous header with the same name
    pub(crate) fn push<N: Into<HeaderName>, V: Into<String>>(&mut self, name: N, value: V) {
        self.headers.push((name.into(), value.into()));
    }
}

impl Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            Display::fmt(name, f)?;
            f.write_str(": ")?;
            f.write_str(value)?;
            f.write_str("\r\n")?;
        }

        Ok(())
    }
}

impl HeaderName {
    pub(crate) const fn new_from_ascii_static(ascii: &'static str) -> Self {
        Self(Cow::Borrowed(ascii))
    }
}

impl From<&'static str> for HeaderName {
    fn from(name: &'static str) -> Self {
        Self::new_from_ascii_static(name)
    }
}

impl From<String> for HeaderName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self)
    }
}

impl Deref for HeaderName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Headers;

    #[test]
    fn format_in_order() {
        let mut headers = Headers::new();
        headers.push("Subject", "Hello");
        headers.push("X-Tag", "one");
        headers.push(String::from("X-Tag"), "two");

        assert_eq!(
            headers.to_string(),
            "Subject: Hello\r\nX-Tag: one\r\nX-Tag: two\r\n"
        );
    }
}

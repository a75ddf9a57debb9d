//! Email addresses as they appear in message headers
//!
//! Addresses are kept as plain strings on a [`Message`](crate::Message) and
//! only sanitized when the message is rendered or handed to the transport:
//! non-ASCII display names and local-parts are turned into RFC 2047
//! encoded-words, internationalized domains into their IDNA form.

use std::fmt::{self, Display, Formatter};

use chumsky::Parser;

use crate::{
    text::{encode_header, encode_word, is_ascii},
    Error, Result,
};

mod parsers;

/// Characters that force a display name to be quoted
const SPECIALS: &[char] = &[
    '(', ')', '<', '>', '@', ',', ':', ';', '.', '\\', '"', '[', ']',
];

/// An address before sanitization
///
/// Either a raw header string such as `"Name <user@domain>"` or an
/// already split `(display name, address)` pair.
///
/// ```
/// use courier::address::Mailbox;
///
/// let mailbox = Mailbox::from(("Me", "me@example.com"));
/// assert_eq!(mailbox.to_string(), "Me <me@example.com>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mailbox {
    /// A header value, parsed leniently
    Raw(String),
    /// A display name and an address-spec
    Named {
        /// Display name, may be empty
        name: String,
        /// Address-spec
        address: String,
    },
}

impl Mailbox {
    /// Splits a header value into its display name and address-spec
    ///
    /// Input that does not look like `name <address>` is taken as the
    /// address-spec itself.
    pub fn parse(s: &str) -> (Option<String>, String) {
        parsers::mailbox()
            .parse(s)
            .unwrap_or_else(|_| (None, s.trim().to_owned()))
    }

    /// The display name and address-spec of this mailbox
    pub fn parts(&self) -> (Option<String>, String) {
        match self {
            Mailbox::Raw(raw) => Self::parse(raw),
            Mailbox::Named { name, address } => {
                let name = Some(name.trim())
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned);
                (name, address.trim().to_owned())
            }
        }
    }
}

impl Display for Mailbox {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Mailbox::Raw(raw) => f.write_str(raw),
            Mailbox::Named { name, address } if name.trim().is_empty() => f.write_str(address),
            Mailbox::Named { name, address } => {
                f.write_str(&format_address(Some(name.trim()), address.trim()))
            }
        }
    }
}

impl From<&str> for Mailbox {
    fn from(raw: &str) -> Self {
        Mailbox::Raw(raw.to_owned())
    }
}

impl From<&String> for Mailbox {
    fn from(raw: &String) -> Self {
        Mailbox::Raw(raw.clone())
    }
}

impl From<String> for Mailbox {
    fn from(raw: String) -> Self {
        Mailbox::Raw(raw)
    }
}

impl<N: Into<String>, A: Into<String>> From<(N, A)> for Mailbox {
    fn from((name, address): (N, A)) -> Self {
        Mailbox::Named {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl From<Mailbox> for String {
    fn from(mailbox: Mailbox) -> Self {
        match mailbox {
            Mailbox::Raw(raw) => raw,
            named => named.to_string(),
        }
    }
}

/// Encodes an address so it can be written to a header or an SMTP command
///
/// ```
/// use courier::address::sanitize_address;
///
/// # fn main() -> courier::Result<()> {
/// assert_eq!(
///     sanitize_address(("Tëst", "test@exämple.com"), "utf-8")?,
///     "=?utf-8?b?VMOrc3Q=?= <test@xn--exmple-cua.com>"
/// );
/// # Ok(())
/// # }
/// ```
pub fn sanitize_address<M: Into<Mailbox>>(addr: M, encoding: &str) -> Result<String> {
    let (name, address) = addr.into().parts();

    let address = if is_ascii(&address) {
        address
    } else {
        match address.split_once('@') {
            Some((local, domain)) => {
                let local = if is_ascii(local) {
                    local.to_owned()
                } else {
                    encode_word(local, encoding)
                };
                let domain = idna::domain_to_ascii(domain)
                    .map_err(|_| Error::Address(address.clone()))?;
                format!("{local}@{domain}")
            }
            None => encode_header(&address, encoding),
        }
    };

    let name = name.map(|name| encode_header(&name, encoding));
    Ok(format_address(name.as_deref(), &address))
}

/// Sanitizes every address of `addresses`, lazily
pub fn sanitize_addresses<'a, I>(
    addresses: I,
    encoding: &'a str,
) -> impl Iterator<Item = Result<String>> + 'a
where
    I: IntoIterator,
    I::Item: Into<Mailbox>,
    I::IntoIter: 'a,
{
    addresses
        .into_iter()
        .map(move |addr| sanitize_address(addr, encoding))
}

/// Encodes a subject line for the `Subject` header
pub fn sanitize_subject(subject: &str, encoding: &str) -> String {
    encode_header(subject, encoding)
}

/// The bare address-spec of a header address, as used in `MAIL FROM` and
/// `RCPT TO`
pub fn address_spec(addr: &str) -> String {
    Mailbox::parse(addr).1
}

fn format_address(name: Option<&str>, address: &str) -> String {
    match name {
        Some(name) => {
            let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
            if name.contains(SPECIALS) {
                format!("\"{escaped}\" <{address}>")
            } else {
                format!("{escaped} <{address}>")
            }
        }
        None => address.to_owned(),
    }
}

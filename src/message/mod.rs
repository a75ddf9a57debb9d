//! Messages and their MIME rendering
//!
//! A [`Message`] is a plain holder of everything that ends up in an email:
//! addresses, subject, bodies and attachments. Nothing is encoded until the
//! message is rendered with [`Message::as_bytes`] or [`Message::as_string`].
//!
//! ```rust
//! use courier::{Attachment, Message};
//!
//! # fn main() -> courier::Result<()> {
//! let mut message = Message::builder()
//!     .subject("Happy new year")
//!     .sender(("NoBody", "nobody@domain.tld"))
//!     .recipient("Hei <hei@domain.tld>")
//!     .body("Be happy!")
//!     .html("<p>Be <b>happy</b>!</p>")
//!     .attach(Attachment::new(Some("card.txt".into()), "text/plain", "Cheers"))
//!     .build();
//! message.add_recipient("yuin@domain.tld");
//!
//! let rendered = message.as_string()?;
//! assert!(rendered.contains("To: Hei <hei@domain.tld>, yuin@domain.tld\r\n"));
//! # Ok(())
//! # }
//! ```
//!
//! Which produces:
//!
//! ```sh
//! Subject: Happy new year
//! From: NoBody <nobody@domain.tld>
//! To: Hei <hei@domain.tld>, yuin@domain.tld
//! Message-ID: <6a1e9bca-55a5-4a4e-a6b6-5c4c1c71d6bf@localhost>
//! MIME-Version: 1.0
//! Content-Type: multipart/mixed; boundary="mixed_3Vk4cEtN6aLHOxbSq1Ev2Ng7cP0sXwBnYkQH"
//!
//! --mixed_3Vk4cEtN6aLHOxbSq1Ev2Ng7cP0sXwBnYkQH
//! Content-Type: multipart/alternative; boundary="alt_3Vk4cEtN6aLHOxbSq1Ev2Ng7cP0sXwBnYkQH"
//!
//! --alt_3Vk4cEtN6aLHOxbSq1Ev2Ng7cP0sXwBnYkQH
//! Content-Type: text/plain; charset=utf-8
//! Content-Transfer-Encoding: 7bit
//!
//! Be happy!
//! --alt_3Vk4cEtN6aLHOxbSq1Ev2Ng7cP0sXwBnYkQH
//! Content-Type: text/html; charset=utf-8
//! Content-Transfer-Encoding: 7bit
//!
//! <p>Be <b>happy</b>!</p>
//! --alt_3Vk4cEtN6aLHOxbSq1Ev2Ng7cP0sXwBnYkQH--
//! --mixed_3Vk4cEtN6aLHOxbSq1Ev2Ng7cP0sXwBnYkQH
//! Content-Type: text/plain
//! Content-Transfer-Encoding: base64
//! Content-Disposition: attachment; filename="card.txt"
//!
//! Q2hlZXJz
//! --mixed_3Vk4cEtN6aLHOxbSq1Ev2Ng7cP0sXwBnYkQH--
//! ```
//!
//! The `Date` header is only written once a date is set, which
//! [`Connection::send`](crate::Connection::send) does for unsent messages.

use std::collections::HashSet;

use chrono::{DateTime, Local};
use uuid::Uuid;

pub use self::attachment::Attachment;
use self::{
    header::Headers,
    mimebody::{MultiPart, MultiPartKind, Part, SinglePart},
};
use crate::{
    address::{sanitize_address, sanitize_addresses, sanitize_subject, Mailbox},
    connection::Connection,
    text::DEFAULT_CHARSET,
    Error, Result,
};

mod attachment;
mod body;
mod header;
mod mimebody;

const DEFAULT_MESSAGE_ID_DOMAIN: &str = "localhost";

/// Something that can be formatted as an email message
trait EmailFormat {
    fn format(&self, out: &mut Vec<u8>);
}

/// An email message
///
/// Fields are public and can be changed freely until the message is sent.
/// The message id and the MIME boundaries are fixed when the message is
/// created, so rendering an unchanged message twice gives the same bytes.
#[derive(Debug, Clone)]
pub struct Message {
    /// Subject line
    pub subject: String,
    /// `To` addresses, in order
    pub recipients: Vec<String>,
    /// Plain text body
    pub body: Option<String>,
    /// `From` address
    pub sender: Option<String>,
    /// `Cc` addresses
    pub cc: Vec<String>,
    /// Blind copies, never written to the headers
    pub bcc: Vec<String>,
    /// Attached files
    pub attachments: Vec<Attachment>,
    /// `Reply-To` address
    pub reply_to: Option<String>,
    /// Send date, in seconds since the Unix epoch
    pub date: Option<i64>,
    /// Charset for headers and text parts, utf-8 when unset
    pub charset: Option<String>,
    /// Headers written verbatim after the standard ones
    pub extra_headers: Vec<(String, String)>,
    /// ESMTP parameters of `MAIL FROM`
    pub mail_options: Vec<String>,
    /// ESMTP parameters of every `RCPT TO`
    pub rcpt_options: Vec<String>,
    /// Strip attachment filenames down to ASCII
    pub ascii_attachments: bool,
    alts: Vec<(String, String)>,
    message_id: String,
    boundary: String,
}

impl Message {
    /// Creates a message with only a subject
    pub fn new<S: Into<String>>(subject: S) -> Self {
        Self::builder().subject(subject).build()
    }

    /// Creates a new message builder
    #[inline]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// The `Message-ID` of this message, `<uuid@hostname>`
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// HTML rendering of the body, if any
    pub fn html(&self) -> Option<&str> {
        self.alternative("html")
    }

    /// Sets the HTML rendering of the body
    pub fn set_html<S: Into<String>>(&mut self, html: S) {
        self.set_alternative("html", html);
    }

    /// Alternative rendering of the body with MIME subtype `subtype`
    pub fn alternative(&self, subtype: &str) -> Option<&str> {
        self.alts
            .iter()
            .find(|(subtype_, _)| subtype.eq_ignore_ascii_case(subtype_))
            .map(|(_, content)| content.as_str())
    }

    /// Sets an alternative rendering of the body
    ///
    /// Alternatives are rendered as `text/<subtype>` parts in the order they
    /// were first set.
    pub fn set_alternative<T: Into<String>, C: Into<String>>(&mut self, subtype: T, content: C) {
        let subtype = subtype.into();
        let content = content.into();
        match self
            .alts
            .iter_mut()
            .find(|(subtype_, _)| subtype.eq_ignore_ascii_case(subtype_))
        {
            Some((_, current)) => *current = content,
            None => self.alts.push((subtype, content)),
        }
    }

    /// Removes an alternative rendering
    pub fn remove_alternative(&mut self, subtype: &str) -> Option<String> {
        let index = self
            .alts
            .iter()
            .position(|(subtype_, _)| subtype.eq_ignore_ascii_case(subtype_))?;
        Some(self.alts.remove(index).1)
    }

    /// All alternative renderings, in order
    pub fn alternatives(&self) -> impl Iterator<Item = (&str, &str)> {
        self.alts
            .iter()
            .map(|(subtype, content)| (subtype.as_str(), content.as_str()))
    }

    /// Appends a `To` address
    pub fn add_recipient<M: Into<Mailbox>>(&mut self, recipient: M) {
        self.recipients.push(recipient.into().into());
    }

    /// Appends an attachment
    pub fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Every address the message is delivered to
    ///
    /// Recipients, cc and bcc, without duplicates, in the order they appear.
    pub fn send_to(&self) -> Vec<&str> {
        dedup(
            self.recipients
                .iter()
                .chain(&self.cc)
                .chain(&self.bcc),
        )
    }

    /// Checks the headers for line breaks that would let a value inject
    /// other headers
    ///
    /// Addresses may not contain any line break. The subject may be folded:
    /// every line after the first starts with a space or a tab, and no line
    /// is empty or blank.
    pub fn has_bad_headers(&self) -> bool {
        let mut addresses = self
            .sender
            .iter()
            .chain(&self.reply_to)
            .chain(&self.recipients)
            .chain(&self.cc)
            .chain(&self.bcc);
        if addresses.any(|address| has_line_break(address)) {
            return true;
        }

        if has_line_break(&self.subject) {
            return self.subject.split("\r\n").enumerate().any(|(i, line)| {
                line.trim().is_empty()
                    || has_line_break(line)
                    || (i > 0 && !line.starts_with([' ', '\t']))
            });
        }

        false
    }

    /// Renders the message
    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.format(&mut out)?;
        Ok(out)
    }

    /// Renders the message as text
    pub fn as_string(&self) -> Result<String> {
        // only verbatim extra headers can carry non-ASCII text
        let bytes = self.as_bytes()?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()))
    }

    /// Sends the message over an open connection
    pub fn send(&mut self, connection: &mut Connection<'_>) -> Result<()> {
        connection.send(self, None)
    }

    fn charset(&self) -> &str {
        self.charset.as_deref().unwrap_or(DEFAULT_CHARSET)
    }

    fn format(&self, out: &mut Vec<u8>) -> Result<()> {
        let charset = self.charset();
        let sender = self
            .sender
            .as_deref()
            .ok_or(Error::InvalidMessage("missing sender"))?;

        let mut headers = Headers::new();
        if !self.subject.is_empty() {
            headers.push("Subject", sanitize_subject(&self.subject, charset));
        }
        headers.push("From", sanitize_address(sender, charset)?);
        let to = sanitize_addresses(dedup(&self.recipients), charset).collect::<Result<Vec<_>>>()?;
        if !to.is_empty() {
            headers.push("To", to.join(", "));
        }
        if let Some(date) = self.date {
            headers.push("Date", format_date(date)?);
        }
        headers.push("Message-ID", self.message_id.as_str());
        let cc = sanitize_addresses(dedup(&self.cc), charset).collect::<Result<Vec<_>>>()?;
        if !cc.is_empty() {
            headers.push("Cc", cc.join(", "));
        }
        if let Some(reply_to) = &self.reply_to {
            headers.push("Reply-To", sanitize_address(reply_to, charset)?);
        }
        for (name, value) in &self.extra_headers {
            headers.push(name.clone(), value.as_str());
        }
        headers.push("MIME-Version", "1.0");

        out.extend_from_slice(headers.to_string().as_bytes());
        self.mime_body(charset)?.format(out);
        Ok(())
    }

    fn mime_body(&self, charset: &str) -> Result<Part> {
        let text = self.body.as_deref().unwrap_or_default();
        if self.attachments.is_empty() && self.alts.is_empty() {
            return Ok(Part::Single(SinglePart::text(text, "plain", charset)));
        }

        let mut mixed = MultiPart::new(MultiPartKind::Mixed, format!("mixed_{}", self.boundary));
        if self.alts.is_empty() {
            mixed = mixed.singlepart(SinglePart::text(text, "plain", charset));
        } else {
            let alternative = self.alts.iter().fold(
                MultiPart::new(MultiPartKind::Alternative, format!("alt_{}", self.boundary))
                    .singlepart(SinglePart::text(text, "plain", charset)),
                |alternative, (subtype, content)| {
                    alternative.singlepart(SinglePart::text(content, subtype, charset))
                },
            );
            mixed = mixed.multipart(alternative);
        }

        for attachment in &self.attachments {
            mixed = mixed.singlepart(attachment.to_part(self.ascii_attachments)?);
        }

        Ok(Part::Multi(mixed))
    }
}

/// A builder for messages
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    /// Creates a new empty message
    pub fn new() -> Self {
        #[cfg(feature = "tracing")]
        tracing::trace!("creating message");

        let hostname = hostname::get()
            .map_err(|_| ())
            .and_then(|s| s.into_string().map_err(|_| ()))
            .unwrap_or_else(|_| DEFAULT_MESSAGE_ID_DOMAIN.to_owned());

        Self {
            message: Message {
                subject: String::new(),
                recipients: Vec::new(),
                body: None,
                sender: None,
                cc: Vec::new(),
                bcc: Vec::new(),
                attachments: Vec::new(),
                reply_to: None,
                date: None,
                charset: None,
                extra_headers: Vec::new(),
                mail_options: Vec::new(),
                rcpt_options: Vec::new(),
                ascii_attachments: false,
                alts: Vec::new(),
                // https://tools.ietf.org/html/rfc5322#section-3.6.4
                message_id: format!("<{}@{}>", Uuid::new_v4(), hostname),
                boundary: make_boundary(),
            },
        }
    }

    /// Set the subject
    pub fn subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.message.subject = subject.into();
        self
    }

    /// Set the sender, a header value or a `(name, address)` pair
    pub fn sender<M: Into<Mailbox>>(mut self, sender: M) -> Self {
        self.message.sender = Some(sender.into().into());
        self
    }

    /// Add a `To` address
    pub fn recipient<M: Into<Mailbox>>(mut self, recipient: M) -> Self {
        self.message.add_recipient(recipient);
        self
    }

    /// Add several `To` addresses
    pub fn recipients<I>(mut self, recipients: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Mailbox>,
    {
        for recipient in recipients {
            self.message.add_recipient(recipient);
        }
        self
    }

    /// Add a `Cc` address
    pub fn cc<M: Into<Mailbox>>(mut self, cc: M) -> Self {
        self.message.cc.push(cc.into().into());
        self
    }

    /// Add a blind copy address
    pub fn bcc<M: Into<Mailbox>>(mut self, bcc: M) -> Self {
        self.message.bcc.push(bcc.into().into());
        self
    }

    /// Set the `Reply-To` address
    pub fn reply_to<M: Into<Mailbox>>(mut self, reply_to: M) -> Self {
        self.message.reply_to = Some(reply_to.into().into());
        self
    }

    /// Set the plain text body
    pub fn body<S: Into<String>>(mut self, body: S) -> Self {
        self.message.body = Some(body.into());
        self
    }

    /// Set the HTML body
    pub fn html<S: Into<String>>(mut self, html: S) -> Self {
        self.message.set_html(html);
        self
    }

    /// Set an alternative body with MIME subtype `subtype`
    pub fn alternative<T: Into<String>, C: Into<String>>(mut self, subtype: T, content: C) -> Self {
        self.message.set_alternative(subtype, content);
        self
    }

    /// Add an attachment
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.message.attach(attachment);
        self
    }

    /// Set the date, in seconds since the Unix epoch
    pub fn date(mut self, date: i64) -> Self {
        self.message.date = Some(date);
        self
    }

    /// Set the charset of headers and text parts
    pub fn charset<S: Into<String>>(mut self, charset: S) -> Self {
        self.message.charset = Some(charset.into());
        self
    }

    /// Add a header, written as it is
    pub fn header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.message.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Add an ESMTP parameter to `MAIL FROM`, such as `SMTPUTF8` or `BODY=8BITMIME`
    pub fn mail_option<S: Into<String>>(mut self, option: S) -> Self {
        self.message.mail_options.push(option.into());
        self
    }

    /// Add an ESMTP parameter to `RCPT TO`, such as `NOTIFY=SUCCESS`
    pub fn rcpt_option<S: Into<String>>(mut self, option: S) -> Self {
        self.message.rcpt_options.push(option.into());
        self
    }

    /// Strip attachment filenames down to ASCII
    pub fn ascii_attachments(mut self, ascii_attachments: bool) -> Self {
        self.message.ascii_attachments = ascii_attachments;
        self
    }

    /// Build the message
    pub fn build(self) -> Message {
        self.message
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Current time, in seconds since the Unix epoch
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn format_date(date: i64) -> Result<String> {
    let date = DateTime::from_timestamp(date, 0).ok_or(Error::InvalidMessage("date out of range"))?;
    Ok(date.with_timezone(&Local).to_rfc2822())
}

fn make_boundary() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(40)
        .collect()
}

fn has_line_break(s: &str) -> bool {
    s.contains(['\r', '\n'])
}

fn dedup<'a, I: IntoIterator<Item = &'a String>>(addresses: I) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .map(String::as_str)
        .filter(|address| seen.insert(*address))
        .collect()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{Attachment, Message};

    fn message() -> Message {
        Message::builder()
            .subject("testing")
            .sender("from@example.com")
            .recipient("to@example.com")
            .build()
    }

    #[test]
    fn add_recipient_appends() {
        let mut msg = message();
        msg.add_recipient("second@example.com");
        msg.add_recipient(("Third", "third@example.com"));

        assert_eq!(
            msg.recipients,
            ["to@example.com", "second@example.com", "Third <third@example.com>"]
        );
    }

    #[test]
    fn sender_pair() {
        let msg = Message::builder().sender(("Me", "me@example.com")).build();

        assert_eq!(msg.sender.as_deref(), Some("Me <me@example.com>"));
    }

    #[test]
    fn send_to_dedups_in_order() {
        let msg = Message::builder()
            .recipients(["b@example.com", "a@example.com", "b@example.com"])
            .cc("c@example.com")
            .cc("a@example.com")
            .bcc("d@example.com")
            .build();

        assert_eq!(
            msg.send_to(),
            ["b@example.com", "a@example.com", "c@example.com", "d@example.com"]
        );
    }

    #[test]
    fn html_is_an_alternative() {
        let mut msg = message();
        assert_eq!(msg.html(), None);

        msg.set_html("<p>hi</p>");
        msg.set_alternative("json", "{}");
        msg.set_alternative("HTML", "<p>hello</p>");

        assert_eq!(msg.html(), Some("<p>hello</p>"));
        assert_eq!(
            msg.alternatives().collect::<Vec<_>>(),
            [("html", "<p>hello</p>"), ("json", "{}")]
        );
        assert_eq!(msg.remove_alternative("html").as_deref(), Some("<p>hello</p>"));
        assert_eq!(msg.html(), None);
    }

    #[test]
    fn bad_headers() {
        let mut msg = message();
        assert!(!msg.has_bad_headers());

        msg.sender = Some("from@example.com\r\nBcc: evil@example.com".into());
        assert!(msg.has_bad_headers());

        let mut msg = message();
        msg.reply_to = Some("reply@example.com\n".into());
        assert!(msg.has_bad_headers());

        let mut msg = message();
        msg.add_recipient("to@example.com\r");
        assert!(msg.has_bad_headers());

        let mut msg = message();
        msg.bcc.push("hidden@example.com\nTo: evil@example.com".into());
        assert!(msg.has_bad_headers());
    }

    #[test]
    fn folded_subject() {
        let mut msg = message();

        msg.subject = "testing\r\n testing".into();
        assert!(!msg.has_bad_headers());

        msg.subject = "testing\r\n\ttesting\r\n again".into();
        assert!(!msg.has_bad_headers());

        msg.subject = "testing\r\ntesting".into();
        assert!(msg.has_bad_headers());

        msg.subject = "testing\ntesting".into();
        assert!(msg.has_bad_headers());

        msg.subject = "\r\n testing".into();
        assert!(msg.has_bad_headers());

        msg.subject = "testing\r\n \r\n testing".into();
        assert!(msg.has_bad_headers());

        msg.subject = "testing\r\n".into();
        assert!(msg.has_bad_headers());
    }

    #[test]
    fn plain_message() {
        let msg = Message::builder()
            .subject("Hello")
            .sender("from@example.com")
            .recipient("to@example.com")
            .body("Hi there")
            .build();
        let rendered = msg.as_string().unwrap();

        assert_eq!(
            rendered,
            format!(
                concat!(
                    "Subject: Hello\r\n",
                    "From: from@example.com\r\n",
                    "To: to@example.com\r\n",
                    "Message-ID: {}\r\n",
                    "MIME-Version: 1.0\r\n",
                    "Content-Type: text/plain; charset=utf-8\r\n",
                    "Content-Transfer-Encoding: 7bit\r\n",
                    "\r\n",
                    "Hi there\r\n"
                ),
                msg.message_id()
            )
        );
    }

    #[test]
    fn render_is_idempotent() {
        let msg = message();
        let mut msg = msg;
        msg.set_html("<p>hi</p>");
        msg.attach(Attachment::new(Some("a.txt".into()), "text/plain", "a"));

        assert_eq!(msg.as_bytes().unwrap(), msg.as_bytes().unwrap());
    }

    #[test]
    fn missing_sender() {
        let msg = Message::builder().recipient("to@example.com").build();

        assert!(msg.as_bytes().is_err());
    }

    #[test]
    fn empty_body_is_plain() {
        let rendered = message().as_string().unwrap();

        assert!(rendered.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(!rendered.contains("multipart"));
    }

    #[test]
    fn attachment_makes_mixed() {
        let mut msg = message();
        msg.body = Some("see attached".into());
        msg.attach(Attachment::new(Some("a.txt".into()), "text/plain", "a"));
        let rendered = msg.as_string().unwrap();

        assert!(rendered.contains("Content-Type: multipart/mixed; boundary="));
        assert!(!rendered.contains("multipart/alternative"));
        assert!(rendered.contains("Content-Disposition: attachment; filename=\"a.txt\"\r\n"));
    }

    #[test]
    fn html_without_body() {
        let mut msg = message();
        msg.set_html("<p>hi</p>");
        let rendered = msg.as_string().unwrap();

        assert!(rendered.contains("multipart/alternative"));
        assert!(rendered.contains("Content-Type: text/html; charset=utf-8\r\n"));
    }

    #[test]
    fn header_order() {
        let msg = Message::builder()
            .subject("Hello")
            .sender("from@example.com")
            .recipient("to@example.com")
            .cc("cc@example.com")
            .bcc("bcc@example.com")
            .reply_to("reply@example.com")
            .header("X-Priority", "1")
            .date(0)
            .build();
        let rendered = msg.as_string().unwrap();
        let names = rendered
            .split("\r\n\r\n")
            .next()
            .unwrap()
            .split("\r\n")
            .map(|line| line.split(':').next().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            [
                "Subject",
                "From",
                "To",
                "Date",
                "Message-ID",
                "Cc",
                "Reply-To",
                "X-Priority",
                "MIME-Version",
                "Content-Type",
                "Content-Transfer-Encoding"
            ]
        );
        assert!(!rendered.contains("bcc@example.com"));
    }

    #[test]
    fn unicode_headers() {
        let msg = Message::builder()
            .subject("Тема сообщения")
            .sender(("Tëst", "test@example.com"))
            .recipient("user@exämple.com")
            .build();
        let rendered = msg.as_string().unwrap();

        assert!(rendered.contains("Subject: =?utf-8?b?0KLQtdC80LAg0YHQvtC+0LHRidC10L3QuNGP?=\r\n"));
        assert!(rendered.contains("From: =?utf-8?b?VMOrc3Q=?= <test@example.com>\r\n"));
        assert!(rendered.contains("To: user@xn--exmple-cua.com\r\n"));
    }

    #[test]
    fn message_ids_are_unique() {
        let first = message();
        let second = message();

        assert_ne!(first.message_id(), second.message_id());
        assert!(first.message_id().starts_with('<'));
        assert!(first.message_id().ends_with('>'));
        assert!(first.message_id().contains('@'));
    }
}

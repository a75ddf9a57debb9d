//! Transports deliver rendered messages
//!
//! A [`Connector`] opens a [`Session`] from the mail configuration; a
//! [`Connection`](crate::Connection) keeps that session open for as long as
//! it lives and hands it one [`Envelope`] and message at a time.
//!
//! Two connectors are provided:
//!
//! * [`SmtpConnector`](smtp::SmtpConnector) talks to an SMTP server, it is
//!   what [`Mail::new`](crate::Mail::new) uses
//! * [`StubConnector`](stub::StubConnector) records what would have been
//!   sent, for tests
//!
//! Other transports can be plugged in with
//! [`Mail::with_connector`](crate::Mail::with_connector).

use crate::{config::MailConfig, Error, Result};

pub mod smtp;
pub mod stub;

/// An open session with a mail server
pub trait Session {
    /// Sends a rendered message to the envelope recipients
    fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<()>;

    /// Ends the session
    fn quit(&mut self) -> Result<()>;
}

/// Opens sessions
pub trait Connector {
    /// Opens a new session according to `config`
    fn connect(&self, config: &MailConfig) -> Result<Box<dyn Session>>;
}

/// Simple email envelope representation
///
/// Addresses are bare address-specs, already encoded for the wire.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope recipients' addresses
    ///
    /// This can not be empty.
    forward_path: Vec<String>,
    /// The envelope sender address
    reverse_path: String,
    mail_options: Vec<String>,
    rcpt_options: Vec<String>,
}

impl Envelope {
    /// Creates a new envelope, which may fail if `to` is empty.
    ///
    /// ```
    /// use courier::transport::Envelope;
    ///
    /// # fn main() -> courier::Result<()> {
    /// let envelope = Envelope::new("from@example.com".into(), vec!["to@example.com".into()])?
    ///     .mail_options(vec!["SMTPUTF8".into()]);
    /// assert_eq!(envelope.to(), ["to@example.com"]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(from: String, to: Vec<String>) -> Result<Envelope> {
        if to.is_empty() {
            return Err(Error::InvalidMessage("missing destination address"));
        }
        Ok(Envelope {
            forward_path: to,
            reverse_path: from,
            mail_options: Vec::new(),
            rcpt_options: Vec::new(),
        })
    }

    /// Sets the `MAIL FROM` parameters
    pub fn mail_options(mut self, options: Vec<String>) -> Self {
        self.mail_options = options;
        self
    }

    /// Sets the `RCPT TO` parameters
    pub fn rcpt_options(mut self, options: Vec<String>) -> Self {
        self.rcpt_options = options;
        self
    }

    /// Gets the destination addresses of the envelope.
    pub fn to(&self) -> &[String] {
        self.forward_path.as_slice()
    }

    /// Gets the sender of the envelope, empty for a null sender
    pub fn from(&self) -> &str {
        &self.reverse_path
    }

    /// Gets the `MAIL FROM` parameters
    pub fn mail_parameters(&self) -> &[String] {
        &self.mail_options
    }

    /// Gets the `RCPT TO` parameters
    pub fn rcpt_parameters(&self) -> &[String] {
        &self.rcpt_options
    }
}

#[cfg(test)]
mod test {
    use super::Envelope;

    #[test]
    fn envelope_needs_recipients() {
        assert!(Envelope::new("from@example.com".into(), Vec::new()).is_err());

        let envelope = Envelope::new("from@example.com".into(), vec!["to@example.com".into()])
            .unwrap()
            .rcpt_options(vec!["NOTIFY=SUCCESS".into()]);
        assert_eq!(envelope.from(), "from@example.com");
        assert_eq!(envelope.rcpt_parameters(), ["NOTIFY=SUCCESS"]);
        assert!(envelope.mail_parameters().is_empty());
    }
}

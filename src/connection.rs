//! A connection sends any number of messages over one transport session
//!
//! ```rust
//! use courier::{transport::stub::StubConnector, Mail, MailConfig, Message};
//!
//! # fn main() -> courier::Result<()> {
//! let config = MailConfig::builder().max_emails(2).build()?;
//! let connector = StubConnector::new_positive();
//! let mail = Mail::with_connector(config, connector.clone());
//!
//! let mut connection = mail.connect()?;
//! for user in ["ana", "bo", "cy"] {
//!     let mut message = Message::builder()
//!         .subject("Newsletter")
//!         .sender("news@example.com")
//!         .recipient(format!("{user}@example.com"))
//!         .build();
//!     connection.send(&mut message, None)?;
//! }
//! connection.close()?;
//!
//! // the session was reopened after the second message
//! assert_eq!(connector.connections(), 2);
//! # Ok(())
//! # }
//! ```

use std::{
    fmt::{self, Debug, Formatter},
    mem,
};

use crate::{
    address::{address_spec, sanitize_address, sanitize_addresses},
    message::{now, Message, MessageBuilder},
    text::DEFAULT_CHARSET,
    transport::{Envelope, Session},
    Error, Mail, Result,
};

enum State {
    Closed,
    /// `None` when sending is suppressed
    Open(Option<Box<dyn Session>>),
}

/// An open connection of a [`Mail`] manager
///
/// Created by [`Mail::connect`]. The session is closed when the connection is
/// dropped; use [`Connection::close`] to see whether that went well.
pub struct Connection<'m> {
    mail: &'m Mail,
    state: State,
    num_emails: usize,
}

impl<'m> Connection<'m> {
    /// Creates a closed connection
    pub fn new(mail: &'m Mail) -> Self {
        Self {
            mail,
            state: State::Closed,
            num_emails: 0,
        }
    }

    /// Opens the transport session
    ///
    /// When sending is suppressed no session is created, the connection is
    /// open all the same. Opening an open connection does nothing.
    pub fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        self.state = State::Open(self.mail.open_session()?);
        self.num_emails = 0;
        Ok(())
    }

    /// Whether the connection is open
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Messages sent since the session was (re)opened
    pub fn num_emails(&self) -> usize {
        self.num_emails
    }

    /// Closes the transport session
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Open(Some(mut session)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(sent = self.num_emails, "closing session");

                session.quit()
            }
            _ => Ok(()),
        }
    }

    /// Sends a message
    ///
    /// `envelope_from` overrides the sender in `MAIL FROM`. The message gets
    /// a date if it has none, and is recorded in the manager's outboxes once
    /// it was handed to the transport, or right away when sending is
    /// suppressed.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidMessage`] without recipients or sender
    /// * [`Error::BadHeader`] when [`Message::has_bad_headers`]
    /// * [`Error::Transport`] when the server refuses the message, or the
    ///   session cannot be closed or reopened once `max_emails` is reached.
    ///   In the latter case the message was sent; the connection stays open
    ///   with a new session if reopening worked, and is closed otherwise.
    pub fn send(&mut self, message: &mut Message, envelope_from: Option<&str>) -> Result<()> {
        if !self.is_open() {
            return Err(Error::transport("connection is closed"));
        }
        if message.send_to().is_empty() {
            return Err(Error::InvalidMessage("no recipients have been added"));
        }
        let sender = match message.sender.as_deref() {
            Some(sender) if !sender.is_empty() => sender.to_owned(),
            _ => {
                return Err(Error::InvalidMessage(
                    "no sender given and no default sender configured",
                ))
            }
        };
        if message.has_bad_headers() {
            return Err(Error::BadHeader);
        }

        if message.date.is_none() {
            message.date = Some(now());
        }
        if self.mail.config().ascii_attachments() {
            message.ascii_attachments = true;
        }

        let mail = self.mail;
        match &mut self.state {
            State::Open(Some(session)) => {
                let charset = message.charset.as_deref().unwrap_or(DEFAULT_CHARSET);
                let from = sanitize_address(envelope_from.unwrap_or(&sender), charset)?;
                let to = sanitize_addresses(message.send_to(), charset)
                    .map(|address| address.map(|address| address_spec(&address)))
                    .collect::<Result<Vec<_>>>()?;
                let envelope = Envelope::new(address_spec(&from), to)?
                    .mail_options(message.mail_options.clone())
                    .rcpt_options(message.rcpt_options.clone());

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    message_id = message.message_id(),
                    recipients = envelope.to().len(),
                    "sending message"
                );

                session.send(&envelope, &message.as_bytes()?)?;
            }
            _ => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    message_id = message.message_id(),
                    "sending suppressed"
                );
            }
        }

        mail.dispatched(message);

        self.num_emails += 1;
        if Some(self.num_emails) == mail.config().max_emails() {
            self.num_emails = 0;
            self.cycle()?;
        }

        Ok(())
    }

    /// Builds a message, with the default sender if it has none, and sends it
    ///
    /// Returns the message as it was sent.
    pub fn send_message(&mut self, builder: MessageBuilder) -> Result<Message> {
        let mut message = builder.build();
        if message.sender.is_none() {
            message.sender = self.mail.config().default_sender().map(str::to_owned);
        }

        self.send(&mut message, None)?;
        Ok(message)
    }

    /// Replaces a live session with a new one
    fn cycle(&mut self) -> Result<()> {
        if let State::Open(Some(session)) = &mut self.state {
            #[cfg(feature = "tracing")]
            tracing::debug!("maximum number of messages reached, reconnecting");

            let quit = session.quit();

            match self.mail.open_session() {
                Ok(Some(new_session)) => *session = new_session,
                Ok(None) => self.state = State::Open(None),
                Err(err) => {
                    self.state = State::Closed;
                    return Err(err);
                }
            }

            return quit;
        }

        Ok(())
    }
}

impl Debug for Connection<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("open", &self.is_open())
            .field("num_emails", &self.num_emails)
            .finish_non_exhaustive()
    }
}

impl Drop for Connection<'_> {
    fn drop(&mut self) {
        if let Err(_err) = self.close() {
            #[cfg(feature = "tracing")]
            tracing::warn!("failed to close session: {_err}");
        }
    }
}

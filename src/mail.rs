use std::{
    fmt::{self, Debug, Formatter},
    sync::{Arc, Mutex, PoisonError, Weak},
};

use crate::{
    config::MailConfig,
    connection::Connection,
    message::{Message, MessageBuilder},
    transport::{smtp::SmtpConnector, Connector, Session},
    Result,
};

type SharedMessages = Arc<Mutex<Vec<Message>>>;

/// Sends messages according to a [`MailConfig`]
///
/// `Mail` is `Send + Sync`, share it between threads by reference or in an
/// `Arc`; every thread opens its own [`Connection`].
///
/// ```rust,no_run
/// use courier::{Mail, MailConfig, Message};
///
/// # fn main() -> courier::Result<()> {
/// let mail = Mail::from_settings([
///     ("MAIL_SERVER", "smtp.example.com"),
///     ("MAIL_DEFAULT_SENDER", "NoBody <nobody@example.com>"),
/// ])?;
///
/// let mut message = Message::builder()
///     .subject("Hello")
///     .recipient("Hei <hei@example.com>")
///     .body("Be happy!")
///     .build();
/// mail.send(&mut message)?;
/// # Ok(())
/// # }
/// ```
pub struct Mail {
    config: MailConfig,
    connector: Box<dyn Connector + Send + Sync>,
    outboxes: Mutex<Vec<Weak<Mutex<Vec<Message>>>>>,
}

impl Mail {
    /// Creates a manager sending over SMTP
    pub fn new(config: MailConfig) -> Self {
        Self::with_connector(config, SmtpConnector::new())
    }

    /// Creates a manager sending through `connector`
    pub fn with_connector<C>(config: MailConfig, connector: C) -> Self
    where
        C: Connector + Send + Sync + 'static,
    {
        Self {
            config,
            connector: Box::new(connector),
            outboxes: Mutex::new(Vec::new()),
        }
    }

    /// Creates a manager sending over SMTP, configured from `MAIL_*`
    /// settings
    ///
    /// See [`MailConfig::from_settings`].
    pub fn from_settings<I, K, V>(settings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        MailConfig::from_settings(settings).map(Self::new)
    }

    /// The configuration of this manager
    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// Opens a connection
    ///
    /// The connection is closed when it goes out of scope.
    pub fn connect(&self) -> Result<Connection<'_>> {
        let mut connection = Connection::new(self);
        connection.open()?;
        Ok(connection)
    }

    /// Sends a single message on a new connection
    ///
    /// The configured default sender is used if the message has none.
    pub fn send(&self, message: &mut Message) -> Result<()> {
        if message.sender.is_none() {
            message.sender = self.config.default_sender().map(str::to_owned);
        }

        let mut connection = self.connect()?;
        message.send(&mut connection)?;
        connection.close()
    }

    /// Builds a message and sends it on a new connection
    ///
    /// Returns the message as it was sent.
    pub fn send_message(&self, builder: MessageBuilder) -> Result<Message> {
        let mut connection = self.connect()?;
        let message = connection.send_message(builder)?;
        connection.close()?;
        Ok(message)
    }

    /// Records the messages dispatched from now on
    ///
    /// Every message sent, or suppressed, while the returned [`Outbox`] is
    /// alive is copied to it.
    ///
    /// ```rust
    /// use courier::{Mail, MailConfig, Message};
    ///
    /// # fn main() -> courier::Result<()> {
    /// let mail = Mail::new(MailConfig::builder().suppress_send(true).build()?);
    ///
    /// let outbox = mail.record_messages();
    /// mail.send_message(
    ///     Message::builder()
    ///         .subject("testing")
    ///         .sender("from@example.com")
    ///         .recipient("to@example.com"),
    /// )?;
    ///
    /// assert_eq!(outbox.len(), 1);
    /// assert_eq!(outbox.messages()[0].subject, "testing");
    /// # Ok(())
    /// # }
    /// ```
    pub fn record_messages(&self) -> Outbox {
        let outbox = Outbox::default();
        let mut outboxes = self
            .outboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        outboxes.retain(|weak| weak.strong_count() > 0);
        outboxes.push(Arc::downgrade(&outbox.messages));
        outbox
    }

    /// Opens a transport session, unless sending is suppressed
    pub(crate) fn open_session(&self) -> Result<Option<Box<dyn Session>>> {
        if self.config.suppress_send() {
            return Ok(None);
        }

        self.connector.connect(&self.config).map(Some)
    }

    /// Copies a dispatched message to the live outboxes
    pub(crate) fn dispatched(&self, message: &Message) {
        let mut outboxes = self
            .outboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        outboxes.retain(|weak| match weak.upgrade() {
            Some(messages) => {
                messages
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(message.clone());
                true
            }
            None => false,
        });
    }
}

impl Debug for Mail {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mail")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Messages recorded by [`Mail::record_messages`]
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    messages: SharedMessages,
}

impl Outbox {
    /// A copy of the messages recorded so far
    pub fn messages(&self) -> Vec<Message> {
        self.lock().clone()
    }

    /// Number of messages recorded so far
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no message was recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Message>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use super::Mail;
    use crate::{transport::stub::StubConnector, MailConfig, Message};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn mail_is_shareable() {
        assert_send_sync::<Mail>();
    }

    #[test]
    fn outbox_stops_recording_when_dropped() {
        let mail = Mail::with_connector(MailConfig::default(), StubConnector::new_positive());
        let builder = || {
            Message::builder()
                .sender("from@example.com")
                .recipient("to@example.com")
        };

        let first = mail.record_messages();
        mail.send_message(builder()).unwrap();
        {
            let second = mail.record_messages();
            mail.send_message(builder()).unwrap();
            assert_eq!(second.len(), 1);
        }
        mail.send_message(builder()).unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(mail.outboxes.lock().unwrap().len(), 1);
    }

    #[test]
    fn send_fills_default_sender() {
        let config = MailConfig::builder()
            .default_sender(("Default", "default@example.com"))
            .build()
            .unwrap();
        let mail = Mail::with_connector(config, StubConnector::new_positive());

        let mut message = Message::builder().recipient("to@example.com").build();
        mail.send(&mut message).unwrap();

        assert_eq!(message.sender.as_deref(), Some("Default <default@example.com>"));
        assert!(message.date.is_some());
    }
}

//! The stub transport records what would have been sent and drops the
//! content. It can be useful for testing purposes.
//!
//! ```rust
//! use courier::{transport::stub::StubConnector, Mail, MailConfig, Message};
//!
//! # fn main() -> courier::Result<()> {
//! let connector = StubConnector::new_positive();
//! let mail = Mail::with_connector(MailConfig::default(), connector.clone());
//!
//! let mut message = Message::builder()
//!     .sender("from@example.com")
//!     .recipient("to@example.com")
//!     .body("Hello")
//!     .build();
//! mail.send(&mut message)?;
//!
//! assert_eq!(connector.messages().len(), 1);
//! assert_eq!(connector.messages()[0].0.to(), ["to@example.com"]);
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use super::{Connector, Envelope, Session};
use crate::{config::MailConfig, Error, Result};

/// What happened on a stub session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubEvent {
    /// A session was opened
    Connect,
    /// A message was sent
    Send(Envelope, Vec<u8>),
    /// A session was closed
    Quit,
}

/// This connector records every session event and returns the given response
/// to sends
#[derive(Debug, Clone)]
pub struct StubConnector {
    response: StubResult,
    events: Arc<Mutex<Vec<StubEvent>>>,
}

/// Outcome of a stub send
pub type StubResult = std::result::Result<(), &'static str>;

impl StubConnector {
    /// Creates a new connector whose sessions always return the given response
    pub fn new(response: StubResult) -> StubConnector {
        StubConnector {
            response,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a new connector whose sessions always succeed
    pub fn new_positive() -> StubConnector {
        Self::new(Ok(()))
    }

    /// Every event recorded so far, across all sessions
    pub fn events(&self) -> Vec<StubEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Envelopes and messages sent so far
    pub fn messages(&self) -> Vec<(Envelope, Vec<u8>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                StubEvent::Send(envelope, email) => Some((envelope, email)),
                _ => None,
            })
            .collect()
    }

    /// Number of sessions opened so far
    pub fn connections(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| **event == StubEvent::Connect)
            .count()
    }
}

impl Connector for StubConnector {
    fn connect(&self, _config: &MailConfig) -> Result<Box<dyn Session>> {
        record(&self.events, StubEvent::Connect);
        Ok(Box::new(StubSession {
            response: self.response,
            events: Arc::clone(&self.events),
        }))
    }
}

struct StubSession {
    response: StubResult,
    events: Arc<Mutex<Vec<StubEvent>>>,
}

impl Session for StubSession {
    fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            from = envelope.from(),
            to = ?envelope.to(),
            "stub send"
        );

        self.response.map_err(Error::transport)?;
        record(&self.events, StubEvent::Send(envelope.clone(), email.to_vec()));
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        record(&self.events, StubEvent::Quit);
        Ok(())
    }
}

fn record(events: &Mutex<Vec<StubEvent>>, event: StubEvent) {
    events
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(event);
}

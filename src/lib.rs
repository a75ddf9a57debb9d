//! Courier composes email messages and delivers them over SMTP.
//!
//! It provides a message builder rendering RFC 5322 compliant messages, with
//! alternative bodies and attachments, and a mail manager opening SMTP
//! connections from `MAIL_*` settings.
//!
//! It implements the following extensions when talking to the server:
//!
//! * 8BITMIME ([RFC 6152](https://tools.ietf.org/html/rfc6152))
//! * STARTTLS ([RFC 2487](http://tools.ietf.org/html/rfc2487))
//! * AUTH ([RFC 4954](http://tools.ietf.org/html/rfc4954))
//!
//! ## Usage
//!
//! ```rust,no_run
//! use courier::{Attachment, Mail, MailConfig, Message};
//!
//! # fn main() -> courier::Result<()> {
//! let config = MailConfig::builder()
//!     .server("smtp.example.com")
//!     .port(587)
//!     .use_tls(true)
//!     .credentials("nobody", "secret")
//!     .default_sender(("NoBody", "nobody@example.com"))
//!     .build()?;
//! let mail = Mail::new(config);
//!
//! let mut message = Message::builder()
//!     .subject("Happy new year")
//!     .recipient("Hei <hei@example.com>")
//!     .body("Be happy!")
//!     .html("<p>Be <b>happy</b>!</p>")
//!     .attach(Attachment::new(
//!         Some("wishes.txt".to_owned()),
//!         "text/plain",
//!         "Be happy!",
//!     ))
//!     .build();
//! mail.send(&mut message)?;
//! # Ok(())
//! # }
//! ```
//!
//! Sending several messages over one connection:
//!
//! ```rust,no_run
//! use courier::{Mail, MailConfig, Message};
//!
//! # fn main() -> courier::Result<()> {
//! let mail = Mail::new(MailConfig::default());
//!
//! let mut connection = mail.connect()?;
//! for user in ["ana@example.com", "bo@example.com"] {
//!     let mut message = Message::builder()
//!         .subject("Newsletter")
//!         .sender("news@example.com")
//!         .recipient(user)
//!         .build();
//!     connection.send(&mut message, None)?;
//! }
//! connection.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! * `native-tls` (default): TLS and SSL through the platform TLS library
//! * `rustls-tls`: TLS and SSL through rustls
//! * `tracing` (default): log connection and send events with `tracing`
//! * `serde`: deserialize a [`MailConfig`]

#![doc(html_root_url = "https://docs.rs/courier/0.1.0")]
#![deny(unsafe_code, unstable_features)]
#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod address;
pub mod config;
mod connection;
mod error;
mod mail;
pub mod message;
pub mod text;
pub mod transport;

pub use crate::{
    config::{MailConfig, MailConfigBuilder},
    connection::Connection,
    error::{Error, Result, TextDecodeError},
    mail::{Mail, Outbox},
    message::{Attachment, Message, MessageBuilder},
};

//! The SMTP transport sends emails using the SMTP protocol.
//!
//! It drives a [`lettre`] `SmtpConnection` command by command, so every
//! message can carry its own `MAIL FROM` and `RCPT TO` parameters.
//!
//! It implements the following extensions:
//!
//! * STARTTLS: [RFC 2487](http://tools.ietf.org/html/rfc2487), when `use_tls` is set
//! * AUTH: [RFC 4954](http://tools.ietf.org/html/rfc4954) with PLAIN and LOGIN mechanisms
//! * 8BITMIME: [RFC 6152](https://tools.ietf.org/html/rfc6152), announced for non-ASCII messages
//!
//! `use_ssl` connects with TLS from the start instead (SMTPS). Both need one
//! of the `native-tls` or `rustls-tls` features.

use std::time::Duration;

use lettre::{
    transport::smtp::{
        authentication::{Credentials, DEFAULT_MECHANISMS},
        client::SmtpConnection,
        commands::{Data, Mail, Rcpt, Rset},
        extension::{ClientId, Extension, MailBodyParameter, MailParameter, RcptParameter},
    },
    Address,
};
#[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
use lettre::transport::smtp::client::TlsParameters;

use super::{Connector, Envelope, Session};
use crate::{config::MailConfig, Error, Result};

// Registered port numbers:
// https://www.iana.org/assignments/service-names-port-numbers/service-names-port-numbers.xhtml

/// Default smtp port
pub const SMTP_PORT: u16 = 25;

/// Default timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Opens SMTP sessions to the configured server
#[derive(Debug, Clone)]
pub struct SmtpConnector {
    timeout: Option<Duration>,
    hello_name: ClientId,
}

impl SmtpConnector {
    /// Creates a connector with a 60 second timeout, introducing itself with
    /// the local hostname
    pub fn new() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            hello_name: ClientId::default(),
        }
    }

    /// Set the timeout duration
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.hello_name = name;
        self
    }
}

impl Default for SmtpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for SmtpConnector {
    fn connect(&self, config: &MailConfig) -> Result<Box<dyn Session>> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            server = config.server(),
            port = config.port(),
            ssl = config.use_ssl(),
            tls = config.use_tls(),
            "connecting to SMTP server"
        );

        #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
        let tls_parameters = if config.use_ssl() || config.use_tls() {
            Some(TlsParameters::new(config.server().to_owned())?)
        } else {
            None
        };
        #[cfg(not(any(feature = "native-tls", feature = "rustls-tls")))]
        if config.use_ssl() || config.use_tls() {
            return Err(Error::config(
                if config.use_ssl() {
                    "MAIL_USE_SSL"
                } else {
                    "MAIL_USE_TLS"
                },
                "built without TLS support",
            ));
        }

        #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
        let wrapper = tls_parameters.as_ref().filter(|_| config.use_ssl());
        #[cfg(not(any(feature = "native-tls", feature = "rustls-tls")))]
        let wrapper = None;

        #[allow(unused_mut)]
        let mut conn = SmtpConnection::connect::<(&str, u16)>(
            (config.server(), config.port()),
            self.timeout,
            &self.hello_name,
            wrapper,
            None,
        )?;

        #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
        if let Some(tls_parameters) = tls_parameters.as_ref().filter(|_| config.use_tls()) {
            conn.starttls(tls_parameters, &self.hello_name)?;

            #[cfg(feature = "tracing")]
            tracing::debug!("connection upgraded with STARTTLS");
        }

        if let (Some(username), Some(password)) = (config.username(), config.password()) {
            let credentials = Credentials::new(username.to_owned(), password.to_owned());
            conn.auth(DEFAULT_MECHANISMS, &credentials)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(username, "authenticated");
        }

        Ok(Box::new(SmtpSession {
            conn,
            debug: config.debug(),
        }))
    }
}

/// A session opened by [`SmtpConnector`]
pub struct SmtpSession {
    conn: SmtpConnection,
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    debug: bool,
}

impl std::fmt::Debug for SmtpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSession")
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl SmtpSession {
    fn transaction(&mut self, envelope: &Envelope, email: &[u8]) -> Result<()> {
        let from = match envelope.from() {
            "" => None,
            from => Some(parse_address(from)?),
        };

        let mut mail_options = envelope
            .mail_parameters()
            .iter()
            .map(|option| {
                let (keyword, value) = split_option(option);
                MailParameter::Other { keyword, value }
            })
            .collect::<Vec<_>>();
        // Check for non-ascii content in the message
        if !email.is_ascii()
            && self
                .conn
                .server_info()
                .supports_feature(Extension::EightBitMime)
            && !envelope
                .mail_parameters()
                .iter()
                .any(|option| option.to_ascii_uppercase().starts_with("BODY="))
        {
            mail_options.push(MailParameter::Body(MailBodyParameter::EightBitMime));
        }

        let response = self.conn.command(Mail::new(from, mail_options))?;
        self.log(format_args!("MAIL FROM: {}", response.code()));

        for to in envelope.to() {
            let rcpt_options = envelope
                .rcpt_parameters()
                .iter()
                .map(|option| {
                    let (keyword, value) = split_option(option);
                    RcptParameter::Other { keyword, value }
                })
                .collect();
            let response = self.conn.command(Rcpt::new(parse_address(to)?, rcpt_options))?;
            self.log(format_args!("RCPT TO {to}: {}", response.code()));
        }

        self.conn.command(Data)?;
        let response = self.conn.message(email)?;
        self.log(format_args!(
            "message accepted: {}",
            response.message().collect::<Vec<_>>().join(" ")
        ));

        Ok(())
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn log(&self, args: std::fmt::Arguments<'_>) {
        #[cfg(feature = "tracing")]
        if self.debug {
            tracing::debug!("{args}");
        } else {
            tracing::trace!("{args}");
        }
    }
}

impl Session for SmtpSession {
    fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<()> {
        let result = self.transaction(envelope, email);
        if result.is_err() && !self.conn.has_broken() {
            // leave the connection usable for the next message
            let _ = self.conn.command(Rset);
        }
        result
    }

    fn quit(&mut self) -> Result<()> {
        self.conn.quit()?;
        Ok(())
    }
}

fn parse_address(address: &str) -> Result<Address> {
    address
        .parse()
        .map_err(|_| Error::Address(address.to_owned()))
}

/// Splits `KEYWORD=value` into its keyword and value
fn split_option(option: &str) -> (String, Option<String>) {
    match option.split_once('=') {
        Some((keyword, value)) => (keyword.to_owned(), Some(value.to_owned())),
        None => (option.to_owned(), None),
    }
}

#[cfg(test)]
mod test {
    use super::split_option;

    #[test]
    fn options() {
        assert_eq!(split_option("SMTPUTF8"), ("SMTPUTF8".to_owned(), None));
        assert_eq!(
            split_option("NOTIFY=SUCCESS,FAILURE"),
            ("NOTIFY".to_owned(), Some("SUCCESS,FAILURE".to_owned()))
        );
    }
}

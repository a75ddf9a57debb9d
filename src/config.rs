//! Mail settings
//!
//! [`MailConfig`] is read once from the host application's flat settings,
//! the `MAIL_*` keys:
//!
//! | key                      | default     |
//! |--------------------------|-------------|
//! | `MAIL_SERVER`            | `localhost` |
//! | `MAIL_PORT`              | `25`        |
//! | `MAIL_USERNAME`          |             |
//! | `MAIL_PASSWORD`          |             |
//! | `MAIL_USE_TLS`           | `false`     |
//! | `MAIL_USE_SSL`           | `false`     |
//! | `MAIL_DEFAULT_SENDER`    |             |
//! | `MAIL_DEBUG`             | `false`     |
//! | `MAIL_MAX_EMAILS`        |             |
//! | `MAIL_SUPPRESS_SEND`     | `false`     |
//! | `MAIL_ASCII_ATTACHMENTS` | `false`     |
//!
//! ```rust
//! use courier::MailConfig;
//!
//! # fn main() -> courier::Result<()> {
//! let config = MailConfig::from_settings([
//!     ("MAIL_SERVER", "smtp.example.com"),
//!     ("MAIL_PORT", "587"),
//!     ("MAIL_USE_TLS", "true"),
//!     ("MAIL_MAX_EMAILS", "100"),
//! ])?;
//! assert_eq!(config.port(), 587);
//! assert_eq!(config.max_emails(), Some(100));
//! # Ok(())
//! # }
//! ```
//!
//! Tests usually start from the defaults instead:
//!
//! ```rust
//! use courier::MailConfig;
//!
//! # fn main() -> courier::Result<()> {
//! let config = MailConfig::builder()
//!     .suppress_send(true)
//!     .default_sender(("Tests", "tests@example.com"))
//!     .build()?;
//! assert_eq!(config.default_sender(), Some("Tests <tests@example.com>"));
//! # Ok(())
//! # }
//! ```

use std::fmt::{self, Debug, Formatter};

use crate::{address::Mailbox, transport::smtp::SMTP_PORT, Error, Result};

/// Settings of a [`Mail`](crate::Mail) manager
///
/// The password is left out of the `Debug` output.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "serde_impls::RawConfig"))]
pub struct MailConfig {
    server: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    use_tls: bool,
    use_ssl: bool,
    default_sender: Option<String>,
    debug: bool,
    max_emails: Option<usize>,
    suppress_send: bool,
    ascii_attachments: bool,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_owned(),
            port: SMTP_PORT,
            username: None,
            password: None,
            use_tls: false,
            use_ssl: false,
            default_sender: None,
            debug: false,
            max_emails: None,
            suppress_send: false,
            ascii_attachments: false,
        }
    }
}

impl Debug for MailConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("use_tls", &self.use_tls)
            .field("use_ssl", &self.use_ssl)
            .field("default_sender", &self.default_sender)
            .field("debug", &self.debug)
            .field("max_emails", &self.max_emails)
            .field("suppress_send", &self.suppress_send)
            .field("ascii_attachments", &self.ascii_attachments)
            .finish()
    }
}

impl MailConfig {
    /// Creates a builder starting from the defaults
    pub fn builder() -> MailConfigBuilder {
        MailConfigBuilder {
            config: Self::default(),
        }
    }

    /// Reads the configuration from `MAIL_*` settings
    ///
    /// Keys are matched exactly; other keys are ignored, and so are empty
    /// values. Booleans are `true`/`false`, `1`/`0`, `yes`/`no` or
    /// `on`/`off`, in any case.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when a value cannot be parsed, `MAIL_MAX_EMAILS` is
    /// zero, or both `MAIL_USE_TLS` and `MAIL_USE_SSL` are set.
    pub fn from_settings<I, K, V>(settings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();

        for (key, value) in settings {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }

            match key.as_ref() {
                "MAIL_SERVER" => config.server = value.to_owned(),
                "MAIL_PORT" => {
                    config.port = value.parse().map_err(|_| {
                        Error::config("MAIL_PORT", format!("`{value}` is not a port number"))
                    })?;
                }
                "MAIL_USERNAME" => config.username = Some(value.to_owned()),
                "MAIL_PASSWORD" => config.password = Some(value.to_owned()),
                "MAIL_USE_TLS" => config.use_tls = parse_bool("MAIL_USE_TLS", value)?,
                "MAIL_USE_SSL" => config.use_ssl = parse_bool("MAIL_USE_SSL", value)?,
                "MAIL_DEFAULT_SENDER" => config.default_sender = Some(value.to_owned()),
                "MAIL_DEBUG" => config.debug = parse_bool("MAIL_DEBUG", value)?,
                "MAIL_MAX_EMAILS" => {
                    config.max_emails = Some(value.parse().map_err(|_| {
                        Error::config("MAIL_MAX_EMAILS", format!("`{value}` is not a count"))
                    })?);
                }
                "MAIL_SUPPRESS_SEND" => {
                    config.suppress_send = parse_bool("MAIL_SUPPRESS_SEND", value)?;
                }
                "MAIL_ASCII_ATTACHMENTS" => {
                    config.ascii_attachments = parse_bool("MAIL_ASCII_ATTACHMENTS", value)?;
                }
                _ => {}
            }
        }

        config.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.max_emails == Some(0) {
            return Err(Error::config("MAIL_MAX_EMAILS", "must be at least 1"));
        }
        if self.use_tls && self.use_ssl {
            return Err(Error::config(
                "MAIL_USE_SSL",
                "cannot be combined with MAIL_USE_TLS",
            ));
        }
        Ok(self)
    }

    /// SMTP server host
    pub fn server(&self) -> &str {
        &self.server
    }

    /// SMTP server port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Username used to authenticate
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Password used to authenticate
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Whether the connection is upgraded with STARTTLS
    pub fn use_tls(&self) -> bool {
        self.use_tls
    }

    /// Whether the connection uses TLS from the start
    pub fn use_ssl(&self) -> bool {
        self.use_ssl
    }

    /// Sender of messages that do not have one
    pub fn default_sender(&self) -> Option<&str> {
        self.default_sender.as_deref()
    }

    /// Whether the SMTP conversation is logged at debug level
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Number of messages after which a connection is reopened
    pub fn max_emails(&self) -> Option<usize> {
        self.max_emails
    }

    /// Whether sending is skipped
    pub fn suppress_send(&self) -> bool {
        self.suppress_send
    }

    /// Whether attachment filenames are stripped down to ASCII
    pub fn ascii_attachments(&self) -> bool {
        self.ascii_attachments
    }
}

/// Builder for [`MailConfig`]
#[derive(Debug, Clone)]
pub struct MailConfigBuilder {
    config: MailConfig,
}

impl MailConfigBuilder {
    /// Set the SMTP server host
    pub fn server<S: Into<String>>(mut self, server: S) -> Self {
        self.config.server = server.into();
        self
    }

    /// Set the SMTP server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the credentials used to authenticate
    pub fn credentials<U: Into<String>, P: Into<String>>(mut self, username: U, password: P) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    /// Upgrade the connection with STARTTLS
    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.config.use_tls = use_tls;
        self
    }

    /// Connect with TLS from the start
    pub fn use_ssl(mut self, use_ssl: bool) -> Self {
        self.config.use_ssl = use_ssl;
        self
    }

    /// Set the sender of messages that do not have one
    pub fn default_sender<M: Into<Mailbox>>(mut self, sender: M) -> Self {
        self.config.default_sender = Some(sender.into().into());
        self
    }

    /// Log the SMTP conversation at debug level
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Reopen the connection after this many messages
    pub fn max_emails(mut self, max_emails: usize) -> Self {
        self.config.max_emails = Some(max_emails);
        self
    }

    /// Skip the transport, messages are only recorded
    pub fn suppress_send(mut self, suppress_send: bool) -> Self {
        self.config.suppress_send = suppress_send;
        self
    }

    /// Strip attachment filenames down to ASCII
    pub fn ascii_attachments(mut self, ascii_attachments: bool) -> Self {
        self.config.ascii_attachments = ascii_attachments;
        self
    }

    /// Checks and returns the configuration
    pub fn build(self) -> Result<MailConfig> {
        self.config.validate()
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::config(key, format!("`{value}` is not a boolean"))),
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use serde::Deserialize;

    use super::MailConfig;
    use crate::Error;

    #[derive(Deserialize)]
    pub(super) struct RawConfig {
        #[serde(rename = "MAIL_SERVER")]
        server: Option<String>,
        #[serde(rename = "MAIL_PORT")]
        port: Option<u16>,
        #[serde(rename = "MAIL_USERNAME")]
        username: Option<String>,
        #[serde(rename = "MAIL_PASSWORD")]
        password: Option<String>,
        #[serde(rename = "MAIL_USE_TLS")]
        use_tls: Option<bool>,
        #[serde(rename = "MAIL_USE_SSL")]
        use_ssl: Option<bool>,
        #[serde(rename = "MAIL_DEFAULT_SENDER")]
        default_sender: Option<String>,
        #[serde(rename = "MAIL_DEBUG")]
        debug: Option<bool>,
        #[serde(rename = "MAIL_MAX_EMAILS")]
        max_emails: Option<usize>,
        #[serde(rename = "MAIL_SUPPRESS_SEND")]
        suppress_send: Option<bool>,
        #[serde(rename = "MAIL_ASCII_ATTACHMENTS")]
        ascii_attachments: Option<bool>,
    }

    impl TryFrom<RawConfig> for MailConfig {
        type Error = Error;

        fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
            let default = MailConfig::default();
            MailConfig {
                server: raw.server.unwrap_or(default.server),
                port: raw.port.unwrap_or(default.port),
                username: raw.username,
                password: raw.password,
                use_tls: raw.use_tls.unwrap_or_default(),
                use_ssl: raw.use_ssl.unwrap_or_default(),
                default_sender: raw.default_sender,
                debug: raw.debug.unwrap_or_default(),
                max_emails: raw.max_emails,
                suppress_send: raw.suppress_send.unwrap_or_default(),
                ascii_attachments: raw.ascii_attachments.unwrap_or_default(),
            }
            .validate()
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::MailConfig;
    use crate::Error;

    #[test]
    fn defaults() {
        let config = MailConfig::from_settings(Vec::<(String, String)>::new()).unwrap();

        assert_eq!(config, MailConfig::default());
        assert_eq!(config.server(), "localhost");
        assert_eq!(config.port(), 25);
        assert!(!config.use_tls());
        assert!(!config.suppress_send());
        assert_eq!(config.max_emails(), None);
    }

    #[test]
    fn settings() {
        let config = MailConfig::from_settings([
            ("MAIL_SERVER", "smtp.example.com"),
            ("MAIL_PORT", "465"),
            ("MAIL_USERNAME", "user"),
            ("MAIL_PASSWORD", "secret"),
            ("MAIL_USE_SSL", "Yes"),
            ("MAIL_DEFAULT_SENDER", "Me <me@example.com>"),
            ("MAIL_DEBUG", "on"),
            ("MAIL_MAX_EMAILS", "2"),
            ("MAIL_SUPPRESS_SEND", "0"),
            ("MAIL_ASCII_ATTACHMENTS", "TRUE"),
            ("SECRET_KEY", "ignored"),
            ("MAIL_USE_TLS", ""),
        ])
        .unwrap();

        assert_eq!(
            config,
            MailConfig::builder()
                .server("smtp.example.com")
                .port(465)
                .credentials("user", "secret")
                .use_ssl(true)
                .default_sender("Me <me@example.com>")
                .debug(true)
                .max_emails(2)
                .ascii_attachments(true)
                .build()
                .unwrap()
        );
    }

    #[test]
    fn invalid_values() {
        for (key, value) in [
            ("MAIL_PORT", "70000"),
            ("MAIL_PORT", "smtp"),
            ("MAIL_MAX_EMAILS", "-1"),
            ("MAIL_MAX_EMAILS", "0"),
            ("MAIL_DEBUG", "maybe"),
        ] {
            match MailConfig::from_settings([(key, value)]) {
                Err(Error::Config { key: reported, .. }) => assert_eq!(reported, key),
                other => panic!("{key}={value} gave {other:?}"),
            }
        }
    }

    #[test]
    fn debug_hides_password() {
        let config = MailConfig::builder()
            .credentials("user", "hunter2")
            .build()
            .unwrap();
        let debug = format!("{config:?}");

        assert!(debug.contains("\"user\""));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
        assert!(!format!("{:?}", crate::Mail::new(config)).contains("hunter2"));
    }

    #[test]
    fn tls_and_ssl_are_exclusive() {
        assert!(
            MailConfig::from_settings([("MAIL_USE_TLS", "true"), ("MAIL_USE_SSL", "true")])
                .is_err()
        );
        assert!(MailConfig::builder()
            .use_tls(true)
            .use_ssl(true)
            .build()
            .is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize() {
        let config: MailConfig = serde_json::from_str(
            r#"{"MAIL_SERVER": "smtp.example.com", "MAIL_USE_TLS": true, "MAIL_MAX_EMAILS": 10}"#,
        )
        .unwrap();

        assert_eq!(config.server(), "smtp.example.com");
        assert_eq!(config.port(), 25);
        assert!(config.use_tls());
        assert_eq!(config.max_emails(), Some(10));

        assert!(serde_json::from_str::<MailConfig>(r#"{"MAIL_MAX_EMAILS": 0}"#).is_err());
    }
}

use courier::{
    text::{force_text, DecodeErrors},
    transport::stub::StubConnector,
    Error, Mail, MailConfig, Message,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

#[test]
fn suppressed_from_settings() {
    init_logging();

    let mail = Mail::from_settings([
        ("MAIL_SUPPRESS_SEND", "true"),
        ("MAIL_DEFAULT_SENDER", "Robot <robot@example.com>"),
        ("MAIL_MAX_EMAILS", "1"),
    ])
    .unwrap();
    let outbox = mail.record_messages();

    let mut connection = mail.connect().unwrap();
    for _ in 0..3 {
        connection
            .send_message(
                Message::builder()
                    .subject("Report")
                    .recipient("ops@example.com")
                    .body("all good"),
            )
            .unwrap();
        assert_eq!(connection.num_emails(), 0);
    }
    drop(connection);

    let messages = outbox.messages();
    assert_eq!(messages.len(), 3);
    assert!(messages
        .iter()
        .all(|message| message.sender.as_deref() == Some("Robot <robot@example.com>")));
}

#[test]
fn debug_setting_reaches_connector() {
    init_logging();

    let config = MailConfig::from_settings([("MAIL_DEBUG", "true")]).unwrap();
    assert!(config.debug());

    let connector = StubConnector::new_positive();
    let mail = Mail::with_connector(config, connector.clone());
    mail.send_message(
        Message::builder()
            .sender("from@example.com")
            .recipient("to@example.com"),
    )
    .unwrap();

    assert_eq!(connector.connections(), 1);
}

#[test]
fn invalid_settings() {
    let err = Mail::from_settings([("MAIL_USE_TLS", "true"), ("MAIL_USE_SSL", "true")])
        .unwrap_err();

    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn undecodable_bytes() {
    let err = force_text(b"\xff", "ascii", DecodeErrors::Strict).unwrap_err();

    match err {
        Error::TextDecode(err) => {
            assert_eq!(err.original(), b"\xff");
            assert_eq!(err.encoding(), "ascii");
        }
        other => panic!("unexpected error: {other}"),
    }
}

use courier::{
    transport::stub::{StubConnector, StubEvent},
    Error, Mail, MailConfig, Message,
};
use pretty_assertions::assert_eq;

fn message(to: &str) -> Message {
    Message::builder()
        .subject("testing")
        .sender("from@example.com")
        .recipient(to)
        .body("testing")
        .build()
}

#[test]
fn stub_transport() {
    let connector = StubConnector::new_positive();
    let mail = Mail::with_connector(MailConfig::default(), connector.clone());

    let mut msg = message("to@example.com");
    mail.send(&mut msg).unwrap();

    let messages = connector.messages();
    assert_eq!(messages.len(), 1);
    let (envelope, email) = &messages[0];
    assert_eq!(envelope.from(), "from@example.com");
    assert_eq!(envelope.to(), ["to@example.com"]);
    assert_eq!(email, &msg.as_bytes().unwrap());
    assert_eq!(connector.events().first(), Some(&StubEvent::Connect));
    assert_eq!(connector.events().last(), Some(&StubEvent::Quit));
}

#[test]
fn connection_cycling() {
    let config = MailConfig::builder().max_emails(3).build().unwrap();
    let connector = StubConnector::new_positive();
    let mail = Mail::with_connector(config, connector.clone());

    let mut connection = mail.connect().unwrap();
    for i in 1..=2 {
        connection
            .send(&mut message(&format!("user{i}@example.com")), None)
            .unwrap();
        assert_eq!(connection.num_emails(), i);
    }
    assert_eq!(connector.connections(), 1);

    connection
        .send(&mut message("user3@example.com"), None)
        .unwrap();
    assert_eq!(connection.num_emails(), 0);
    assert_eq!(connector.connections(), 2);

    connection
        .send(&mut message("user4@example.com"), None)
        .unwrap();
    assert_eq!(connection.num_emails(), 1);
    connection.close().unwrap();

    let events = connector.events();
    assert!(matches!(
        events.as_slice(),
        [
            StubEvent::Connect,
            StubEvent::Send(..),
            StubEvent::Send(..),
            StubEvent::Send(..),
            StubEvent::Quit,
            StubEvent::Connect,
            StubEvent::Send(..),
            StubEvent::Quit,
        ]
    ));
}

#[test]
fn suppress_send_validates_without_transport() {
    let config = MailConfig::builder().suppress_send(true).build().unwrap();
    let connector = StubConnector::new_positive();
    let mail = Mail::with_connector(config, connector.clone());
    let outbox = mail.record_messages();

    let mut msg = message("to@example.com");
    msg.subject = "testing\r\ntesting".into();
    assert!(matches!(mail.send(&mut msg), Err(Error::BadHeader)));

    let mut msg = Message::builder()
        .sender("from@example.com")
        .body("nobody to send to")
        .build();
    assert!(matches!(
        mail.send(&mut msg),
        Err(Error::InvalidMessage(_))
    ));

    mail.send(&mut message("to@example.com")).unwrap();

    assert_eq!(outbox.len(), 1);
    assert!(connector.events().is_empty());
}

#[test]
fn bad_header_fails_send() {
    let connector = StubConnector::new_positive();
    let mail = Mail::with_connector(MailConfig::default(), connector.clone());

    let mut msg = message("to@example.com");
    msg.add_recipient("evil@example.com\r\nBcc: victim@example.com");
    let err = mail.send(&mut msg).unwrap_err();

    assert!(err.is_bad_header());
    assert!(connector.messages().is_empty());
}

#[test]
fn missing_sender() {
    let mail = Mail::with_connector(MailConfig::default(), StubConnector::new_positive());

    let mut msg = Message::builder().recipient("to@example.com").build();
    assert!(matches!(
        mail.send(&mut msg),
        Err(Error::InvalidMessage(_))
    ));
}

#[test]
fn ascii_attachments_setting() {
    let config = MailConfig::builder()
        .ascii_attachments(true)
        .build()
        .unwrap();
    let connector = StubConnector::new_positive();
    let mail = Mail::with_connector(config, connector.clone());

    let mut msg = message("to@example.com");
    msg.attach(courier::Attachment::new(
        Some("ünicödeß ←.→ ✓.txt".into()),
        "text/plain",
        "test",
    ));
    mail.send(&mut msg).unwrap();

    let messages = connector.messages();
    let email = String::from_utf8_lossy(&messages[0].1);
    assert!(email.contains("filename=\"unicode . .txt\""));
}

#[test]
fn unicode_recipient_envelope() {
    let connector = StubConnector::new_positive();
    let mail = Mail::with_connector(MailConfig::default(), connector.clone());

    mail.send(&mut message("Tëst <test@exämple.com>")).unwrap();

    let messages = connector.messages();
    assert_eq!(messages[0].0.to(), ["test@xn--exmple-cua.com"]);
}

#[test]
fn transport_failure() {
    let connector = StubConnector::new(Err("554 transaction failed"));
    let mail = Mail::with_connector(MailConfig::default(), connector);
    let outbox = mail.record_messages();

    let err = mail.send(&mut message("to@example.com")).unwrap_err();

    assert!(err.is_transport());
    assert!(outbox.is_empty());
}

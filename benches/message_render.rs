use courier::{address::sanitize_address, Attachment, Message};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn plain() -> Message {
    Message::builder()
        .subject("Happy new year")
        .sender(("NoBody", "nobody@domain.tld"))
        .recipient("Hei <hei@domain.tld>")
        .body("Be happy!")
        .date(1_700_000_000)
        .build()
}

fn mixed() -> Message {
    Message::builder()
        .subject("Szczęśliwego nowego roku")
        .sender(("Nikt", "nikt@domena.pl"))
        .recipient("Ktoś <ktos@domena.pl>")
        .cc("kopia@domena.pl")
        .body("Bądź szczęśliwy! ".repeat(40))
        .html("<p>Bądź <b>szczęśliwy</b>!</p>")
        .attach(Attachment::new(
            Some("życzenia.txt".to_owned()),
            "text/plain",
            vec![b'x'; 16 * 1024],
        ))
        .date(1_700_000_000)
        .build()
}

fn criterion_benchmark(c: &mut Criterion) {
    let message = plain();
    c.bench_function("render plain message", |b| {
        b.iter(|| black_box(&message).as_bytes().unwrap())
    });

    let message = mixed();
    c.bench_function("render multipart message", |b| {
        b.iter(|| black_box(&message).as_bytes().unwrap())
    });

    c.bench_function("sanitize unicode address", |b| {
        b.iter(|| sanitize_address(black_box("Tëst <tëst@exämple.com>"), "utf-8").unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

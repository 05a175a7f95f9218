//! Benchmarks for line parsing and command rendering.

use asif_proto::{command, parse_line, LineCodec, Message};
use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio_util::codec::Decoder;

const SIMPLE_MESSAGE: &str = "PING :irc.example.com";

const PREFIX_MESSAGE: &str = ":nick!user@host PRIVMSG #channel :Hello, world!";

const TAGGED_MESSAGE: &str =
    "@time=2023-01-01T00:00:00.000Z;msgid=abc123 :nick!user@host PRIVMSG #channel :Hello with tags!";

const NUMERIC_RESPONSE: &str =
    ":irc.server.net 005 nickname CHANTYPES=# PREFIX=(ov)@+ NETWORK=Example :are supported by this server";

fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Message Parsing");

    for (name, line) in [
        ("simple_ping", SIMPLE_MESSAGE),
        ("with_prefix", PREFIX_MESSAGE),
        ("with_tags", TAGGED_MESSAGE),
        ("numeric_response", NUMERIC_RESPONSE),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let msg: Message = black_box(line).parse().unwrap();
                black_box(msg)
            })
        });
    }

    group.bench_function("origin", |b| {
        let msg = parse_line(PREFIX_MESSAGE).unwrap().unwrap();
        b.iter(|| black_box(black_box(&msg).origin()))
    });

    group.finish();
}

fn benchmark_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("Command Rendering");

    group.bench_function("privmsg", |b| {
        b.iter(|| black_box(command::privmsg(black_box("#channel"), black_box("Hello, world!")).to_string()))
    });

    group.bench_function("pong", |b| {
        b.iter(|| black_box(command::pong(black_box("irc.example.com")).to_string()))
    });

    group.finish();
}

fn benchmark_codec(c: &mut Criterion) {
    let burst: String = std::iter::repeat(PREFIX_MESSAGE)
        .take(64)
        .map(|line| format!("{line}\r\n"))
        .collect();

    c.bench_function("codec_decode_burst", |b| {
        b.iter(|| {
            let mut codec = LineCodec::new("utf-8").unwrap();
            let mut buf = BytesMut::from(burst.as_str());
            let mut count = 0;
            while let Some(line) = codec.decode(&mut buf).unwrap() {
                black_box(line);
                count += 1;
            }
            count
        })
    });
}

criterion_group!(benches, benchmark_parsing, benchmark_rendering, benchmark_codec);
criterion_main!(benches);

use bytes::BytesMut;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use gsb_ng::Session;
use gsb_ng::commands::builtin;
use gsb_ng::config::ParserConfig;
use gsb_ng::network::LineCodec;
use gsb_ng::state::{Connection, Hub};
use std::hint::black_box;
use std::sync::Arc;
use tokio_util::codec::Decoder;

// Dispatch cost for one line through the built-in registry, including the
// write into the connection's outgoing queue.

fn dispatch_benchmark(c: &mut Criterion) {
    let registry = Arc::new(builtin::registry(&ParserConfig::default()).unwrap());
    let hub = Arc::new(Hub::new());
    let (conn, mut rx) = Connection::channel(hub.next_id(), "127.0.0.1:4000".parse().unwrap(), 1024);
    hub.insert(conn.clone());
    let mut session = Session::new(conn, hub, registry);

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    for (name, line) in [
        ("say", "say hello world"),
        ("substitution", "'hello world"),
        ("huh", "dance wildly"),
        ("mismatch", "who is there"),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                session.handle_line(black_box(line));
                while rx.try_recv().is_ok() {}
            })
        });
    }

    group.finish();
}

fn codec_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let raw = b"say The quick brown fox jumps over the lazy dog\r\n";
    group.throughput(Throughput::Bytes(raw.len() as u64));

    group.bench_function("decode_line", |b| {
        let mut codec = LineCodec::new(1024);
        b.iter(|| {
            let mut buf = BytesMut::from(&raw[..]);
            codec.decode(&mut buf).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, dispatch_benchmark, codec_benchmark);
criterion_main!(benches);

//! Parser throughput benchmarks.
//!
//! Numeric samples dominate wire traffic, so the sample path is sniffed
//! first in the parser. These benchmarks keep that ordering honest by
//! comparing the hot path against the keyword-dispatch paths.
//!
//! ```bash
//! cargo bench -p relaylink-protocol
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use relaylink_protocol::ParsedMessage;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let lines = [
        ("numeric_sample", "D|03|02|7.25|124500"),
        ("node_info", "D|03|00|NOINFO=Pump1,1.2.0,AA:BB:CC:DD:EE:FF,4|123456"),
        ("device_info", "D|03|02|DEINFO=Flow,1.0,Y,N,10|123999"),
        ("unknown_status", "D|07|01|Completely novel payload|42"),
        ("malformed", "not a frame at all"),
    ];

    for (name, line) in lines {
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| black_box(ParsedMessage::parse(black_box(line))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);

//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Benchmarks for server decoder throughput

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use mapperproxy_codec::consts::{GA, IAC};
use mapperproxy_codec::{Charset, OutputFormat, ServerDecoder};
use std::hint::black_box;
use tokio_util::codec::Decoder;

const ROOM: &[u8] = b"<room><name>Center Square</name>\r\n<description>A paved plaza, \
surrounded by the tall walls of the city.\r\n</description>\r\n<gratuitous>A fountain \
murmurs here.</gratuitous></room><exits>Exits: north, east, south, west.</exits>\r\n\
<prompt>* HP:Healthy MV:Fresh &gt;</prompt>";

fn session(rooms: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(rooms * (ROOM.len() + 32));
    for _ in 0..rooms {
        data.extend_from_slice(b"<movement dir=north/>");
        data.extend_from_slice(ROOM);
        data.extend_from_slice(&[IAC, GA]);
        data.extend_from_slice(b"\r\nYou are hungry.\r\n");
    }
    data
}

// ============================================================================
// Decoding Benchmarks
// ============================================================================

fn bench_plain_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("plain_text");

    for size in [100, 1000, 10000] {
        let data: Vec<u8> = (0..size).map(|i| b'a' + (i % 26) as u8).collect();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            let mut decoder = ServerDecoder::new(OutputFormat::Normal, Charset::Ascii);
            b.iter(|| black_box(decoder.feed(black_box(data))));
        });
    }

    group.finish();
}

fn bench_formats(c: &mut Criterion) {
    let mut group = c.benchmark_group("room_session");
    let data = session(50);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for format in [
        OutputFormat::Normal,
        OutputFormat::ScriptFriendly,
        OutputFormat::Raw,
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(format), &data, |b, data| {
            let mut decoder = ServerDecoder::new(format, Charset::Ascii);
            b.iter(|| black_box(decoder.feed(black_box(data))));
        });
    }

    group.finish();
}

fn bench_read_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_sizes");
    let data = session(50);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for read_size in [16, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(read_size), &data, |b, data| {
            let mut decoder = ServerDecoder::new(OutputFormat::Normal, Charset::Ascii);
            let mut buffer = BytesMut::with_capacity(read_size);
            b.iter(|| {
                for read in data.chunks(read_size) {
                    buffer.extend_from_slice(read);
                    while let Some(chunk) = decoder.decode(&mut buffer).unwrap() {
                        black_box(chunk);
                    }
                }
            });
        });
    }

    group.finish();
}

fn bench_mpi(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpi_frame");

    for size in [100, 10000] {
        let mut data = format!("\n~$#EV{size}\n").into_bytes();
        data.extend(std::iter::repeat_n(b'x', size));
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            let mut decoder = ServerDecoder::new(OutputFormat::Normal, Charset::Ascii);
            b.iter(|| black_box(decoder.feed(black_box(data))));
        });
    }

    group.finish();
}

criterion_group!(
    decoding_benches,
    bench_plain_text,
    bench_formats,
    bench_read_sizes,
    bench_mpi
);

criterion_main!(decoding_benches);

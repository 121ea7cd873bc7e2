use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fsa_reader::header::{read_header, write_header, Magic};
use fsa_reader::{fletcher32, Dictionary, SessionState};
use std::io::Cursor;

fn bench_fletcher32(c: &mut Criterion) {
    let data: Vec<u8> = (0..1024 * 1024u32).map(|i| (i * 13) as u8).collect();

    c.bench_function("fletcher32_1mb", |b| b.iter(|| fletcher32(black_box(&data))));
}

fn bench_header_decode(c: &mut Criterion) {
    let mut d = Dictionary::new();
    for key in 0..32u16 {
        d.add_u64(0, key, key as u64 * 4096);
    }
    d.add_string(1, 0, "some/long/path/inside/the/archive.txt");
    let mut bytes = Vec::new();
    write_header(&mut bytes, Magic::Object, 1, Some(0), &d).unwrap();
    let session = SessionState::default();

    c.bench_function("read_header_33_records", |b| {
        b.iter(|| read_header(&mut Cursor::new(black_box(&bytes)), &session, false).unwrap())
    });
}

fn bench_resync(c: &mut Criterion) {
    let mut bytes = vec![0u8; 64 * 1024];
    bytes.extend_from_slice(Magic::BlockHeader.bytes());

    c.bench_function("resync_64kb_garbage", |b| {
        b.iter(|| fsa_reader::recovery::resync(&mut Cursor::new(black_box(&bytes)), 0, None).unwrap())
    });
}

criterion_group!(benches, bench_fletcher32, bench_header_decode, bench_resync);
criterion_main!(benches);

use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use pipal::{
    BlockDescriptor, BlockHeader, DigitReader, MAX_DIGITS_PER_WORD, MemoryBucket, Radix, ResultSet,
    WordFormat, decode_word, find_palindromes,
};
use std::{io::SeekFrom, sync::Arc};
use tokio::runtime::Builder;

// Number of words decoded per iteration.
const TOTAL_WORDS: usize = 4096;
// Digits per scanned buffer.
const SCAN_DIGITS: usize = 1 << 20;

fn bench_decode_word(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_word");
    group.throughput(Throughput::Elements(TOTAL_WORDS as u64));

    for (name, radix, format) in [
        ("packed32/dec", Radix::Decimal, WordFormat::Packed32),
        ("packed32/hex", Radix::Hexadecimal, WordFormat::Packed32),
        ("ycd64/dec", Radix::Decimal, WordFormat::Ycd64),
        ("ycd64/hex", Radix::Hexadecimal, WordFormat::Ycd64),
    ] {
        let dpw = format.digits_per_word(radix);
        let max = radix.base().pow(dpw as u32 - 1);
        group.bench_function(name, |b| {
            let mut out = [0_u8; MAX_DIGITS_PER_WORD];
            b.iter(|| {
                for w in 0..TOTAL_WORDS as u64 {
                    decode_word(black_box(w * 7_919 % max), radix, &mut out[..dpw]).unwrap();
                    black_box(&out);
                }
            });
        });
    }
    group.finish();
}

/// Pseudo-random decimal digits with a few planted palindromes.
fn scan_input() -> Vec<u8> {
    let mut state = 0x2545_f491_u32;
    let mut digits: Vec<u8> = (0..SCAN_DIGITS)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            b'0' + (state % 10) as u8
        })
        .collect();
    for at in (1_000..SCAN_DIGITS - 1_000).step_by(100_003) {
        digits[at..at + 21].copy_from_slice(b"123456789010987654321");
    }
    digits
}

fn bench_find_palindromes(c: &mut Criterion) {
    let digits = scan_input();
    let mut group = c.benchmark_group("find_palindromes");
    group.throughput(Throughput::Bytes(SCAN_DIGITS as u64));
    group.bench_function("1MiB", |b| {
        b.iter(|| black_box(find_palindromes(black_box(&digits), 1).count()));
    });
    group.finish();
}

fn bench_digit_reader(c: &mut Criterion) {
    const BLOCK_DIGITS: u64 = 90_000;
    const BLOCKS: u64 = 4;

    let mut bucket = MemoryBucket::new();
    let mut blocks = Vec::new();
    for k in 0..BLOCKS {
        let name = format!("pi-{k}");
        let words = BLOCK_DIGITS / 9;
        let payload: Vec<u8> = (0..words as u32)
            .flat_map(|w| (w * 104_729 % 1_000_000_000).to_be_bytes())
            .collect();
        bucket = bucket.with_object(name.clone(), payload);
        blocks.push(BlockDescriptor {
            header: BlockHeader {
                radix: Radix::Decimal,
                block_id: k,
                block_size: BLOCK_DIGITS,
                payload_length: words * 4,
                total_digits: 0,
            },
            name,
            first_digit_offset: 0,
        });
    }
    let set = ResultSet::new(WordFormat::Packed32, blocks).unwrap();
    let bucket = Arc::new(bucket);
    let total = (BLOCK_DIGITS * BLOCKS) as usize;

    let rt = Builder::new_multi_thread()
        .enable_all()
        .worker_threads(1)
        .build()
        .unwrap();

    let mut group = c.benchmark_group("digit_reader");
    group.throughput(Throughput::Bytes(total as u64));
    group.bench_function("sequential", |b| {
        b.to_async(&rt).iter(|| async {
            let mut reader = DigitReader::new(set.reader(Arc::clone(&bucket)));
            let mut buf = vec![0_u8; total];
            reader.seek(SeekFrom::Start(0)).unwrap();
            reader.read_exact(&mut buf).await.unwrap();
            black_box(buf);
        });
    });
    group.bench_function("read_at", |b| {
        b.to_async(&rt).iter(|| async {
            let reader = DigitReader::new(set.reader(Arc::clone(&bucket)));
            let mut buf = vec![0_u8; total];
            reader.read_at(&mut buf, 0).await.unwrap();
            black_box(buf);
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_decode_word,
    bench_find_palindromes,
    bench_digit_reader,
);
criterion_main!(benches);

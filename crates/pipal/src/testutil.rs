use crate::{
    BlockDescriptor, BlockHeader, MemoryBucket, Radix, ResultSet, WordFormat, encode_word,
};

/// The first 400 decimal digits of pi after the point.
pub const PI_DEC: &str = concat!(
    "1415926535897932384626433832795028841971693993751058209749445923078164062862089986280348253421170679",
    "8214808651328230664709384460955058223172535940812848111745028410270193852110555964462294895493038196",
    "4428810975665933446128475648233786783165271201909145648566923460348610454326648213393607260249141273",
    "7245870066063155881748815209209628292540917153643678925903600113305305488204665213841469519415116094",
);

/// The first 400 hexadecimal digits of pi after the point.
pub const PI_HEX: &str = concat!(
    "243f6a8885a308d313198a2e03707344a4093822299f31d0082efa98ec4e6c89452821e638d01377be5466cf34e90c6cc0ac",
    "29b7c97c50dd3f84d5b5b54709179216d5d98979fb1bd1310ba698dfb5ac2ffd72dbd01adfb7b8e1afed6a267e96ba7c9045",
    "f12c7f9924a19947b3916cf70801f2e2858efc16636920d871574e69a458fea3f4933d7e0d95748f728eb658718bcd588215",
    "4aee7b54a41dc25a59b59c30d5392af26013c5d1b023286085f0ca417918b8db38ef8e79dcb0603a180e6c9e0e8bb01e8a3e",
);

/// Bytes of header text in front of every test shard's payload.
pub const PREAMBLE: u64 = 201;

/// Packs `digits` into the words of a single block.
pub fn pack_block(digits: &[u8], radix: Radix, format: WordFormat) -> Vec<u8> {
    let dpw = format.digits_per_word(radix);
    let mut out = Vec::new();
    for word in digits.chunks(dpw) {
        format.write_word(encode_word(word, radix, dpw).unwrap(), &mut out);
    }
    out
}

/// Splits `digits` into blocks of `block_size` (the last may be shorter) and
/// stores each as `shard-{k}.bin` behind a [`PREAMBLE`]. A non-zero
/// `total_digits` is recorded on the last block's header.
pub fn build_catalog(
    digits: &str,
    radix: Radix,
    format: WordFormat,
    block_size: usize,
    total_digits: u64,
) -> (MemoryBucket, ResultSet) {
    let mut bucket = MemoryBucket::new();
    let chunks: Vec<&[u8]> = digits.as_bytes().chunks(block_size).collect();
    let mut blocks = Vec::with_capacity(chunks.len());

    for (k, chunk) in chunks.iter().enumerate() {
        let name = format!("shard-{k}.bin");
        let payload = pack_block(chunk, radix, format);
        let mut object = vec![b'#'; PREAMBLE as usize];
        object.extend_from_slice(&payload);
        bucket = bucket.with_object(name.clone(), object);

        blocks.push(BlockDescriptor {
            header: BlockHeader {
                radix,
                block_id: k as u64,
                block_size: chunk.len() as u64,
                payload_length: payload.len() as u64,
                total_digits: if k + 1 == chunks.len() { total_digits } else { 0 },
            },
            name,
            first_digit_offset: PREAMBLE,
        });
    }

    (bucket, ResultSet::new(format, blocks).unwrap())
}

/// Four 30-digit decimal `.ycd` blocks as written by y-cruncher, holding
/// the first 100 digits. The last block ends with an all-zero padding word
/// past the declared total.
pub fn ycd_fixture() -> (MemoryBucket, ResultSet) {
    const WORDS: [[u8; 16]; 4] = [
        [
            0x60, 0xe2, 0x3e, 0xb8, 0xae, 0x61, 0xa6, 0x13, 0x00, 0x0f, 0x58, 0xf3, 0x84, 0x66,
            0xef, 0x56,
        ],
        [
            0x17, 0x3f, 0x65, 0x1a, 0x21, 0x09, 0xca, 0x45, 0x00, 0x60, 0x5b, 0x4a, 0x96, 0x06,
            0x14, 0x08,
        ],
        [
            0x09, 0xfb, 0xd6, 0x59, 0x35, 0x00, 0x33, 0x52, 0x00, 0xe9, 0xe5, 0x0f, 0x83, 0xb7,
            0xdf, 0x88,
        ],
        [
            0x00, 0xe6, 0xc6, 0x3d, 0x9b, 0x70, 0x7a, 0x2f, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ],
    ];

    let mut bucket = MemoryBucket::new();
    let mut blocks = Vec::new();
    for (k, words) in WORDS.iter().enumerate() {
        let name = format!("Pi - Dec - Chudnovsky - {k}.ycd");
        let mut object = vec![b'#'; PREAMBLE as usize];
        object.extend_from_slice(words);
        bucket = bucket.with_object(name.clone(), object);
        blocks.push(BlockDescriptor {
            header: BlockHeader {
                radix: Radix::Decimal,
                block_id: k as u64,
                block_size: 30,
                payload_length: 16,
                total_digits: if k == 3 { 100 } else { 0 },
            },
            name,
            first_digit_offset: PREAMBLE,
        });
    }

    (bucket, ResultSet::new(WordFormat::Ycd64, blocks).unwrap())
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use smf_core::value_codec::{Arity, ScalarFormat};
use smf_core::{
    pack_f16, unpack_f16, AttributeValue, ByteOrder, DecoderStream, ElementCodec, EncoderStream,
};

fn bench_half(c: &mut Criterion) {
    c.bench_function("pack_f16", |b| {
        b.iter(|| {
            for i in 0..1024u32 {
                black_box(pack_f16(black_box(f64::from(i) * 0.37)));
            }
        })
    });
    c.bench_function("unpack_f16", |b| {
        b.iter(|| {
            for bits in 0..1024u16 {
                black_box(unpack_f16(black_box(bits)));
            }
        })
    });
}

fn bench_float4(c: &mut Criterion) {
    let codec = ElementCodec::new(ScalarFormat::Float32, Arity::Four, ByteOrder::LittleEndian);
    let mut out = EncoderStream::new(Vec::new());
    for i in 0..4096 {
        let x = f64::from(i);
        codec
            .encode(&mut out, &AttributeValue::Float4([x, x + 1.0, x + 2.0, 1.0]))
            .unwrap();
    }
    let bytes = out.into_inner();

    c.bench_function("decode_float4_32", |b| {
        b.iter(|| {
            let mut input = DecoderStream::new(&bytes[..]);
            for _ in 0..4096 {
                black_box(codec.decode(&mut input).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_half, bench_float4);
criterion_main!(benches);

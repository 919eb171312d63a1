use bitwire::field::{Field, FieldKind};
use bitwire::schema::SchemaDecl;
use bitwire::value::{Record, Value};
use criterion::{Criterion, criterion_group, criterion_main};

fn gen_schema(field_count: usize) -> bitwire::compiled::Schema {
    let mut decl = SchemaDecl::new();
    for i in 0..field_count {
        decl = decl.field(format!("f{i}"), Field::new(FieldKind::Integer { bits: 16, signed: false, min: None, max: None }));
    }
    decl.compile().unwrap()
}

fn gen_value(field_count: usize) -> Record {
    (0..field_count).map(|i| (format!("f{i}"), Value::Int((i * 31 % 65536) as i64))).collect()
}

fn bench_encode(c: &mut Criterion) {
    for &field_count in &[1usize, 10, 50, 100] {
        let schema = gen_schema(field_count);
        let value = gen_value(field_count);

        c.bench_function(&format!("encode_{field_count}_fields"), |b| {
            b.iter(|| {
                let _ = schema.encode(&value).unwrap();
            })
        });
    }
}

fn bench_decode(c: &mut Criterion) {
    for &field_count in &[1usize, 10, 50, 100] {
        let schema = gen_schema(field_count);
        let value = gen_value(field_count);
        let bytes = schema.encode(&value).unwrap();

        c.bench_function(&format!("decode_{field_count}_fields"), |b| {
            b.iter(|| {
                let _ = schema.decode(&bytes).unwrap();
            })
        });
    }
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);

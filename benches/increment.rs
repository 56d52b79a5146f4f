use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hynorec::{thread_key, tword::TWord};

fn increment(c: &mut Criterion) {
    let key = thread_key::get();
    let x = TWord::new(0usize);

    c.bench_function("rw_increment", |b| {
        b.iter(|| {
            key.run(|tx| {
                let value = x.get(tx)?;
                x.set(tx, black_box(value.wrapping_add(1)))?;
                Ok(())
            })
        })
    });

    c.bench_function("read_only", |b| {
        b.iter(|| key.run(|tx| x.get(tx)))
    });

    c.bench_function("software_increment", |b| {
        b.iter(|| {
            key.run_software(|tx| {
                let value = x.get(tx)?;
                x.set(tx, black_box(value.wrapping_add(1)))?;
                Ok(())
            })
        })
    });
}

criterion_group!(benches, increment);
criterion_main!(benches);

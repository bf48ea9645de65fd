use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use spicecomb::merge::{combine_parallel, CombineOptions};
use spicecomb::parser::NetlistParser;

/// A synthetic extractor-style deck: `fingers` parallel FETs sharing one
/// node tuple plus a parasitic capacitor per finger.
fn fingered_fet_netlist(fingers: usize) -> String {
    let mut content = String::from("* synthetic extracted deck\n");
    for i in 0..fingers {
        content.push_str(&format!(
            "m{} x y z 0 nmos w=1u l=0.1u ad=2f as=2f\n",
            i
        ));
        content.push_str(&format!("c{} x 0 0.5f\n", i));
    }
    content
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let content = fingered_fet_netlist(200);
    let parser = NetlistParser::default();

    group.bench_function("parse_netlist", |b| {
        b.iter(|| parser.parse(&content).unwrap());
    });

    group.finish();
}

fn bench_combine(c: &mut Criterion) {
    let mut group = c.benchmark_group("combine");

    let parser = NetlistParser::default();
    for size in [10, 50, 200].iter() {
        let content = fingered_fet_netlist(*size);
        group.bench_with_input(BenchmarkId::new("combine_parallel", size), size, |b, _| {
            b.iter(|| {
                let mut netlist = parser.parse(&content).unwrap();
                combine_parallel(&mut netlist, &CombineOptions::default()).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_combine);
criterion_main!(benches);

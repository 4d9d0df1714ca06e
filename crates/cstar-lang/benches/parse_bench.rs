// Criterion benchmark for the tokenize -> freeze -> parse pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cstar_lang::parse::Ctx;
use cstar_lang::scope::ScopeKind;

/// A module's worth of synthetic functions, each declaring, mixing and
/// consuming a handful of locals.
fn synth_module(functions: usize) -> String {
    let mut text = String::new();
    for i in 0..functions {
        text.push_str(&format!(
            "int32 calc{i}(int32 a, int32 b) {{ \
                 int32 sum = a + b * 2; \
                 mut int32 acc = sum - 1; \
                 if true {{ int32 t = acc + 3; acc = t - 3; }} \
                 int32 out = acc + {i}; \
                 return out; \
             }}\n"
        ));
    }
    text.push_str("int32 main() { return calc0(1, 2); }\n");
    text
}

fn check(text: &str) {
    let mut ctx = Ctx::silent();
    let tokens = cstar_lang::lexer::tokenize(text, "<bench>", &mut ctx.reporter).freeze();
    ctx.table.enter("bench", ScopeKind::Namespace);
    let node = cstar_lang::parse::flow::parse_block(&tokens, 0, &mut ctx);
    black_box(node);
}

fn bench_pipeline(c: &mut Criterion) {
    let small = synth_module(5);
    let large = synth_module(200);

    c.bench_function("parse_small_module", |b| b.iter(|| check(black_box(&small))));
    c.bench_function("parse_large_module", |b| b.iter(|| check(black_box(&large))));

    c.bench_function("lex_large_module", |b| {
        b.iter(|| {
            let mut reporter = cstar_lang::Reporter::silent();
            black_box(cstar_lang::lexer::tokenize(
                black_box(&large),
                "<bench>",
                &mut reporter,
            ))
        })
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);

//! Performance benchmarks for nvg hot paths.
//!
//! Run with: `cargo bench --bench classify_perf`
//!
//! The hook runs before every Bash command, so the common case (no `git`
//! at all) must stay in the quick-reject path.

use std::fmt::Write as _;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use no_verify_guard::hook::parse_hook_input;
use no_verify_guard::{classify_command, find_governed_verb, tokenize};

// =============================================================================
// Benchmark Fixtures
// =============================================================================

const NO_GIT: &str = "ls -la /tmp && cargo build --release";
const SAFE_GIT: &str = "git status --short";
const QUOTED_MESSAGE: &str = "git commit -m 'Added --no-verify to docs'";
const BLOCKED: &str = "git -c user.name=bot commit -a --no-verify -m 'wip'";

/// A long pipeline with the governed command at the end.
fn long_chain() -> String {
    let mut command = String::new();
    for i in 0..200 {
        let _ = write!(command, "echo \"step {i}\" && ");
    }
    command.push_str("git push --no-verify");
    command
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let chain = long_chain();
    for (name, command) in [
        ("no_git", NO_GIT),
        ("safe_git", SAFE_GIT),
        ("quoted_message", QUOTED_MESSAGE),
        ("blocked", BLOCKED),
        ("long_chain", chain.as_str()),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), command, |b, cmd| {
            b.iter(|| classify_command(black_box(cmd)));
        });
    }
    group.finish();
}

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");
    group.bench_function("tokenize", |b| b.iter(|| tokenize(black_box(BLOCKED))));

    let tokens = tokenize(BLOCKED);
    group.bench_function("find_governed_verb", |b| {
        b.iter(|| find_governed_verb(black_box(&tokens)));
    });
    group.finish();
}

fn bench_hook_input(c: &mut Criterion) {
    let json = r#"{"session_id":"s","transcript_path":"/tmp/t.json","tool_name":"Bash","tool_input":{"command":"git commit --no-verify -m 'test'"}}"#;
    c.bench_function("parse_hook_input", |b| {
        b.iter(|| parse_hook_input(black_box(json)).map(|input| input.into_request()));
    });
}

// =============================================================================
// Criterion Setup
// =============================================================================

criterion_group!(benches, bench_classify, bench_stages, bench_hook_input);

criterion_main!(benches);

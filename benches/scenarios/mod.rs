//! Real-world scenario benchmarks.
//!
//! These benchmarks model actual usage: a full voice graph and the
//! polyphonic engine playing chords with modulation routed.

mod engine;

pub use engine::bench_engine;

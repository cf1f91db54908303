//! Benchmarks for low-level DSP primitives.

mod envelope;
mod filter;
mod unison;
mod wave;

pub use envelope::bench_envelope;
pub use filter::bench_filter;
pub use unison::bench_unison;
pub use wave::bench_wave;

//! unison_render - Offline demo of the unison engine
//!
//! Renders a detuned chord through the standard voice patch and prints the
//! level and voice count of every window. No audio device is needed.
//!
//! Run with: RUST_LOG=debug cargo run --bin unison_render

use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use unison_dsp::{EngineConfig, ModulationConnection, SynthEngine};

const SAMPLE_RATE: f32 = 48_000.0;
const WINDOW: usize = 4_800; // 100 ms
const CHORD: [u8; 3] = [57, 60, 64]; // A minor

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = EngineConfig::default()
        .with_sample_rate(SAMPLE_RATE)
        .with_polyphony(8);
    let mut engine = SynthEngine::new(config)?;

    // Patch: two saws, seven voices each, slow filter sweep.
    engine.set_parameter("osc_1_unison_voices", 7.0)?;
    engine.set_parameter("osc_1_unison_detune", 25.0)?;
    engine.set_parameter("osc_2_unison_voices", 5.0)?;
    engine.set_parameter("osc_2_harmonize", 1.0)?;
    engine.set_parameter("filter_cutoff", 64.0)?;
    engine.set_parameter("filter_resonance", 2.0)?;
    engine.set_parameter("amp_release", 0.5)?;
    engine.connect_modulation(&ModulationConnection::new("lfo_1", "filter_cutoff", 18.0))?;
    engine.connect_modulation(&ModulationConnection::new("mod_envelope", "osc_1_unison_detune", 40.0))?;
    engine.set_parameter("lfo_1_frequency", 0.5)?;

    for (i, &note) in CHORD.iter().enumerate() {
        engine.note_on(note, 100, i * 480);
    }
    info!(notes = ?CHORD, "chord started");

    let mut window = vec![0.0f32; WINDOW];
    println!("{:>6}  {:>8}  {:>8}  {:>6}", "ms", "rms", "peak", "voices");
    for step in 0..30 {
        if step == 15 {
            engine.all_notes_off(0);
            info!("chord released");
        }
        engine.process(&mut window);

        let rms = (window.iter().map(|s| s * s).sum::<f32>() / WINDOW as f32).sqrt();
        let peak = window.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        println!(
            "{:>6}  {:>8.4}  {:>8.4}  {:>6}",
            step * 100,
            rms,
            peak,
            engine.active_voice_count()
        );
    }

    let snapshot = engine.snapshot();
    info!(
        parameters = snapshot.parameters.len(),
        modulations = snapshot.modulations.len(),
        "final state"
    );
    Ok(())
}

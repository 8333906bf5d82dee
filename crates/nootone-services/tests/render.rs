use std::io::Cursor;

use fastrand::Rng;
use nootone_core::music::notes_from_json;
use nootone_core::{
    AudioClip, AudioSource, ChordEvent, HarmonizerSettings, InstrumentName, Recording, Timeline, TrackKind,
};
use nootone_services::{DirectoryAssets, InstrumentLibrary, MemoryAssets, OfflineRenderer, RenderConfig};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 8_000;
const IMPULSE: &str = "Going_home";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    cursor.into_inner()
}

fn sine(pitch: u8, seconds: f32) -> Vec<f32> {
    let freq = 440.0 * 2f32.powf((pitch as f32 - 69.0) / 12.0);
    let len = (seconds * SAMPLE_RATE as f32) as usize;
    (0..len)
        .map(|i| 0.5 * (i as f32 * freq * std::f32::consts::TAU / SAMPLE_RATE as f32).sin())
        .collect()
}

fn impulse_response() -> Vec<f32> {
    let mut rng = Rng::with_seed(5);
    (0..800).map(|i| (rng.f32() - 0.5) * (-(i as f32) / 150.0).exp()).collect()
}

/// Every instrument gets p and f recordings every octave from C1 to C7.
fn sample_files(instruments: &[InstrumentName]) -> Vec<(String, Vec<u8>)> {
    let mut files = vec![(format!("impulse-responses/{IMPULSE}.wav"), wav(&impulse_response(), SAMPLE_RATE))];
    for instrument in instruments {
        for pitch in (24..=96).step_by(12) {
            for dynamic in ["p", "f"] {
                files.push((format!("{}/{pitch}-{dynamic}.wav", instrument.id()), wav(&sine(pitch, 0.4), SAMPLE_RATE)));
            }
        }
    }
    files
}

fn memory_assets(instruments: &[InstrumentName]) -> MemoryAssets {
    let mut assets = MemoryAssets::new();
    for (location, bytes) in sample_files(instruments) {
        assets.insert(location, bytes);
    }
    assets
}

fn renderer(assets: MemoryAssets) -> OfflineRenderer {
    let config = RenderConfig { sample_rate: SAMPLE_RATE, ..RenderConfig::default() };
    let library = InstrumentLibrary { impulse_responses: vec![IMPULSE.to_string()], ..InstrumentLibrary::default() };
    OfflineRenderer::with_assets(config, library, assets).unwrap()
}

fn symbolic(instrument: InstrumentName, chords: Vec<ChordEvent>) -> TrackKind {
    TrackKind::Symbolic { instrument, chord_events: chords }
}

fn energy(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s * s).sum()
}

#[test]
fn test_symbolic_track_renders_after_onset() -> anyhow::Result<()> {
    init_tracing();
    let mut timeline = Timeline::new();
    timeline.add_track(
        symbolic(InstrumentName::NylonGuitar, vec![ChordEvent::from_pitches(0.5, &[60], 0.5, 1.0)]),
        "guitar",
    );

    let buffer = renderer(memory_assets(&[InstrumentName::NylonGuitar])).render_buffer(&timeline, &mut Rng::with_seed(1))?;
    // note end (0.5 + 0.5 + 0.1) plus the 1.5 s tail
    assert!((buffer.duration() - 2.6).abs() < 1e-3);
    assert_eq!(buffer.channels.len(), 2);

    let left = &buffer.channels[0];
    assert!(left[..3_990].iter().all(|s| s.abs() < 1e-6));
    assert!(energy(&left[4_000..8_800]) > 1.0);
    // centered pitch, identical channels
    let diff: f32 = left.iter().zip(&buffer.channels[1]).map(|(l, r)| (l - r).abs()).sum();
    assert!(diff < 1e-3);
    Ok(())
}

#[test]
fn test_notes_beyond_an_octave_are_skipped() -> anyhow::Result<()> {
    let mut timeline = Timeline::new();
    // nearest recording is 96, two octaves below
    timeline.add_track(
        symbolic(InstrumentName::Mandolin, vec![ChordEvent::from_pitches(0.0, &[120], 1.0, 1.0)]),
        "mandolin",
    );
    let buffer = renderer(memory_assets(&[InstrumentName::Mandolin])).render_buffer(&timeline, &mut Rng::with_seed(1))?;
    assert!((buffer.duration() - 1.5).abs() < 1e-3);
    assert!(buffer.channels.iter().flatten().all(|&s| s == 0.0));
    Ok(())
}

#[test]
fn test_missing_instrument_fails_only_its_track() -> anyhow::Result<()> {
    init_tracing();
    let mut timeline = Timeline::new();
    let chords = vec![ChordEvent::from_pitches(0.0, &[48, 52, 55], 1.0, 0.8)];
    timeline.add_track(symbolic(InstrumentName::GrandPiano, chords.clone()), "piano");
    timeline.add_track(symbolic(InstrumentName::UprightBass, chords), "bass");

    let buffer = renderer(memory_assets(&[InstrumentName::UprightBass])).render_buffer(&timeline, &mut Rng::with_seed(3))?;
    assert!(energy(&buffer.channels[0]) > 1.0);
    Ok(())
}

#[test]
fn test_arrangement_renders_to_normalized_wav() -> anyhow::Result<()> {
    init_tracing();
    let notes = notes_from_json(
        r#"[
            {"pitch": 60, "onset": 0.0, "duration": 0.5},
            {"pitch": 64, "onset": 0.5, "duration": 0.5},
            {"pitch": 67, "onset": 1.0, "duration": 0.5},
            {"pitch": 72, "onset": 1.5, "duration": 0.5}
        ]"#,
    )?;
    let recording = Recording {
        name: "Arpeggio".into(),
        tempo: 120.0,
        duration: 2.0,
        notes,
        clip: Some(AudioClip::new(AudioSource::Bytes(wav(&sine(60, 2.0), SAMPLE_RATE)), 0.0)),
    };
    let mut rng = Rng::with_seed(7);
    let (_, timeline) = recording.arrange(&HarmonizerSettings::default(), &mut rng)?;
    assert_eq!(timeline.len(), 4);

    let instruments = [
        HarmonizerSettings::default().instrument,
        InstrumentName::BuzzPad,
        InstrumentName::UprightBass,
    ];
    let renderer = renderer(memory_assets(&instruments));
    let rendered = renderer.render(&timeline, &mut Rng::with_seed(7))?;
    assert_eq!(rendered.sample_rate, SAMPLE_RATE);
    assert_eq!(rendered.channels, 2);
    assert!(rendered.duration >= 3.5);
    assert_eq!(&rendered.wav[0..4], b"RIFF");

    let reader = hound::WavReader::new(Cursor::new(rendered.wav.clone()))?;
    let samples: Vec<f32> = reader.into_samples::<f32>().collect::<Result<_, _>>()?;
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    // normalized to -6 dB
    assert!((peak - 0.501_187).abs() < 1e-3);

    let again = renderer.render(&timeline, &mut Rng::with_seed(7))?;
    assert_eq!(again.wav, rendered.wav);
    Ok(())
}

#[test]
fn test_renders_from_sample_directory() -> anyhow::Result<()> {
    let root = std::env::temp_dir().join(format!("nootone-render-{}", std::process::id()));
    for (location, bytes) in sample_files(&[InstrumentName::ElectricPiano]) {
        let path = root.join(location);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
    }

    let config = RenderConfig { sample_rate: SAMPLE_RATE, channels: 1, ..RenderConfig::default() };
    let library = InstrumentLibrary {
        root: root.clone(),
        impulse_responses: vec![IMPULSE.to_string()],
        ..InstrumentLibrary::default()
    };
    assert_eq!(DirectoryAssets::new(root.clone()).root(), root.as_path());

    let mut timeline = Timeline::new();
    timeline.add_track(
        symbolic(InstrumentName::ElectricPiano, vec![ChordEvent::from_pitches(0.0, &[62, 65, 69], 1.0, 0.6)]),
        "keys",
    );
    let renderer = OfflineRenderer::new(config, library)?;
    let rendered = renderer.render(&timeline, &mut Rng::with_seed(9))?;
    std::fs::remove_dir_all(&root)?;

    assert_eq!(rendered.channels, 1);
    assert!((rendered.duration - 2.6).abs() < 1e-3);
    Ok(())
}

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use micro_tuner::error::TransformError;
use micro_tuner::pipeline::{transform_fn, Consumer, Downstream, Source, Stage, Transform};
use micro_tuner::{
    build_tuner, CaptureSettings, Lifecycle, Note, NoteMapper, Pipeline, Sample,
    SpectralExtractor, ToneGenerator, TunerConfig,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn note_channel() -> (impl Transform<Input = Note, Output = ()>, Receiver<Note>) {
    let (tx, rx): (Sender<Note>, Receiver<Note>) = crossbeam_channel::unbounded();
    let sink = transform_fn(move |note: Note| {
        tx.send(note).map_err(|_| TransformError::custom("receiver dropped"))?;
        Ok(Some(()))
    });
    (sink, rx)
}

fn assert_note(note: &Note, semitone: u8, octave: i32) {
    assert_eq!(note.semitone(), semitone, "{}", note);
    assert_eq!(note.octave(), octave, "{}", note);
    assert!(note.delta().abs() < 0.1, "{}", note);
}

#[test]
fn test_tuner_detects_tones() {
    // A4, C5 and G#4, each off the centre of a frequency bin by less than a third.
    for (frequency, semitone, octave) in [(440.0, 0, 4), (523.25, 3, 5), (415.3, 11, 4)] {
        let config = TunerConfig::default();
        let capture = ToneGenerator::new(config.capture, frequency).with_capture_limit(5);
        let (sink, notes) = note_channel();
        let tuner = build_tuner(&config, capture, sink).unwrap();

        tuner.start().unwrap();
        for _ in 0..5 {
            let note = notes.recv_timeout(TIMEOUT).unwrap();
            assert_note(&note, semitone, octave);
        }
        tuner.stop().unwrap();
        assert!(!tuner.is_running());
        assert!(notes.try_recv().is_err());
    }
}

#[test]
fn test_custom_reference() {
    let config = TunerConfig {
        a4_frequency: 432.0,
        ..TunerConfig::default()
    };
    let capture = ToneGenerator::new(config.capture, 432.0).with_capture_limit(1);
    let (sink, notes) = note_channel();
    let tuner = build_tuner(&config, capture, sink).unwrap();

    tuner.start().unwrap();
    assert_note(&notes.recv_timeout(TIMEOUT).unwrap(), 0, 4);
    tuner.stop().unwrap();
}

#[test]
fn test_silence_produces_no_notes() {
    let config = TunerConfig::default();
    let capture = ToneGenerator::new(config.capture, 440.0)
        .with_amplitude(0.0)
        .with_capture_limit(3);
    let (sink, notes) = note_channel();
    let tuner = build_tuner(&config, capture, sink).unwrap();

    tuner.start().unwrap();
    tuner.stop().unwrap();
    assert!(notes.try_recv().is_err());
}

#[test]
fn test_quiet_tone_is_gated() {
    let config = TunerConfig {
        silence_threshold_db: Some(-60.0),
        ..TunerConfig::default()
    };
    let capture = ToneGenerator::new(config.capture, 440.0)
        .with_amplitude(1e-4)
        .with_capture_limit(3);
    let (sink, notes) = note_channel();
    let tuner = build_tuner(&config, capture, sink).unwrap();

    tuner.start().unwrap();
    tuner.stop().unwrap();
    assert!(notes.try_recv().is_err());
}

#[test]
fn test_stop_delivers_everything_captured() {
    let settings = CaptureSettings::default();
    let (sink, notes) = note_channel();

    let sink = Arc::new(Stage::new("sink", 2, sink, None).unwrap());
    let mapper = Arc::new(
        Stage::new(
            "note-mapper",
            2,
            NoteMapper::new(),
            Some(sink.clone() as Downstream<Note>),
        )
        .unwrap(),
    );
    let extractor = Arc::new(
        Stage::new(
            "spectral-extractor",
            2,
            SpectralExtractor::new(),
            Some(mapper.clone() as Downstream<f32>),
        )
        .unwrap(),
    );
    let source = Arc::new(Source::new(
        "capture",
        ToneGenerator::new(settings, 440.0),
        Some(extractor.clone() as Downstream<Sample>),
    ));
    let pipeline = Pipeline::new(source.clone());

    pipeline.start().unwrap();
    assert!(sink.is_running() && mapper.is_running() && extractor.is_running());
    notes.recv_timeout(TIMEOUT).unwrap();
    pipeline.stop().unwrap();

    for stage in [sink.is_running(), mapper.is_running(), extractor.is_running()] {
        assert!(!stage);
    }
    // Every capture handed over before stopping came out at the end.
    let captured = source.stats().processed;
    assert_eq!(extractor.stats().processed, captured);
    assert_eq!(mapper.stats().processed, captured);
    assert_eq!(sink.stats().processed, captured);
    assert_eq!(notes.try_iter().count() as u64 + 1, captured);
}

#[test]
fn test_mixed_samples_keep_their_order() {
    let sample_rate = 5000.0;
    let tone = |frequency: f32| {
        let data: Vec<f32> = (0..2048)
            .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin())
            .collect();
        Sample::from_data(sample_rate, data).unwrap()
    };

    let (sink, notes) = note_channel();
    let sink = Stage::new("sink", 1, sink, None).unwrap();
    let mapper =
        Stage::new("note-mapper", 1, NoteMapper::new(), Some(sink.into_consumer())).unwrap();
    let extractor = Stage::new(
        "spectral-extractor",
        1,
        SpectralExtractor::new(),
        Some(mapper.into_consumer()),
    )
    .unwrap();

    extractor.start().unwrap();
    extractor.submit(tone(440.0)).unwrap();
    // Too short, fails in the extractor without stopping it.
    extractor.submit(Sample::from_data(sample_rate, vec![0.5; 100]).unwrap()).unwrap();
    extractor.submit(Sample::from_data(sample_rate, vec![0.0; 2048]).unwrap()).unwrap();
    extractor.submit(tone(523.25)).unwrap();
    extractor.stop().unwrap();

    let received: Vec<Note> = notes.try_iter().collect();
    assert_eq!(received.len(), 2);
    assert_note(&received[0], 0, 4);
    assert_note(&received[1], 3, 5);

    let stats = extractor.stats();
    assert_eq!((stats.processed, stats.skipped, stats.failed), (2, 1, 1));
}

#[test]
fn test_wav_round_trip_through_tuner() {
    let settings = CaptureSettings::default();
    let mut generator = ToneGenerator::new(settings, 523.25);
    let tone = generator.capture().unwrap();

    let path = std::env::temp_dir().join("micro_tuner_round_trip.wav");
    dev_helpers::write_wav(&path, tone.sample_rate() as u32, 1, tone.data()).unwrap();
    let wav = dev_helpers::read_wav(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(wav.sample_rate, 5000);
    let sample = Sample::from_data(wav.sample_rate as f32, wav.to_mono()).unwrap();
    let frequency = SpectralExtractor::new().extract(&sample).unwrap().unwrap();
    let note = NoteMapper::new().map(f64::from(frequency)).unwrap();
    assert_note(&note, 3, 5);
}

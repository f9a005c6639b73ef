use ostinato_infra_synth_simple::sysex::data_set_message;
use ostinato_infra_synth_simple::{SimpleSynth, SimpleSynthConfig};
use ostinato_ports::engine::{EngineError, PolyStats, ReportHandler, SynthEngine};
use ostinato_ports::event::pack_short_message;
use ostinato_ports::memory::{mem_addr, MEMORY_MAP_SIZE};
use ostinato_ports::sample::{NativeBuffer, NativeSliceMut, SampleFormat};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
enum Report {
    Debug(String),
    OpenError(String),
    Lcd(String),
    Reset,
    Reconfig,
    ReverbMode(u8),
    ReverbTime(u8),
    ReverbLevel(u8),
    Poly(u8, PolyStats),
    Program(u8, u8, String),
}

type Reports = Arc<Mutex<Vec<Report>>>;

fn recording_handler() -> (ReportHandler, Reports) {
    let reports: Reports = Arc::default();
    let sink = || {
        let reports = reports.clone();
        move |report: Report| reports.lock().push(report)
    };
    let (debug, open_error, lcd, reset, reconfig) = (sink(), sink(), sink(), sink(), sink());
    let (reverb_mode, reverb_time, reverb_level) = (sink(), sink(), sink());
    let (poly, program) = (sink(), sink());

    let handler = ReportHandler {
        on_debug: Some(Box::new(move |m| debug(Report::Debug(m.to_string())))),
        on_open_error: Some(Box::new(move |m| open_error(Report::OpenError(m.to_string())))),
        on_lcd_message: Some(Box::new(move |m| lcd(Report::Lcd(m.to_string())))),
        on_device_reset: Some(Box::new(move || reset(Report::Reset))),
        on_device_reconfig: Some(Box::new(move || reconfig(Report::Reconfig))),
        on_reverb_mode: Some(Box::new(move |v| reverb_mode(Report::ReverbMode(v)))),
        on_reverb_time: Some(Box::new(move |v| reverb_time(Report::ReverbTime(v)))),
        on_reverb_level: Some(Box::new(move |v| reverb_level(Report::ReverbLevel(v)))),
        on_poly_state_changed: Some(Box::new(move |p, s| poly(Report::Poly(p, s)))),
        on_program_changed: Some(Box::new(move |p, b, n| {
            program(Report::Program(p, b, n.to_string()))
        })),
        ..ReportHandler::default()
    };
    (handler, reports)
}

fn open_synth(config: SimpleSynthConfig) -> (SimpleSynth, Reports) {
    let (handler, reports) = recording_handler();
    let mut synth = SimpleSynth::new(config, handler);
    synth.open().expect("synth should open");
    (synth, reports)
}

fn render_i16(synth: &mut SimpleSynth, frames: usize) -> Vec<i16> {
    let mut buffer = NativeBuffer::with_frames(SampleFormat::Int16, frames);
    synth.render(buffer.frames_mut(frames));
    match buffer {
        NativeBuffer::Int16(samples) => samples,
        NativeBuffer::Float32(_) => unreachable!(),
    }
}

fn note_on(channel: u8, note: u8, velocity: u8) -> u32 {
    pack_short_message(&[0x90 | channel, note, velocity])
}

fn memory_byte(synth: &SimpleSynth, sysex_address: u32) -> u8 {
    let mut out = [0u8; 1];
    synth.read_memory(mem_addr(sysex_address), &mut out);
    out[0]
}

#[test]
fn invalid_config_fails_to_open() {
    let (handler, reports) = recording_handler();
    let mut synth = SimpleSynth::new(
        SimpleSynthConfig {
            max_block_frames: 0,
            ..SimpleSynthConfig::default()
        },
        handler,
    );

    assert!(matches!(synth.open(), Err(EngineError::OpenFailed(_))));
    assert!(!synth.is_open());
    assert!(matches!(reports.lock().as_slice(), [Report::OpenError(_)]));
    assert!(!synth.play_msg(note_on(1, 60, 100), 0));
}

#[test]
fn notes_start_at_their_timestamp() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    assert!(synth.play_msg(note_on(1, 69, 127), 100));

    let samples = render_i16(&mut synth, 256);

    assert!(samples[..200].iter().all(|s| *s == 0));
    assert!(samples[202..].iter().any(|s| *s != 0));
    assert_eq!(synth.rendered_frames(), 256);
    assert_eq!(synth.pending_events(), 0);
    assert_eq!(
        reports.lock().as_slice(),
        &[Report::Poly(
            0,
            PolyStats {
                polys: 1,
                non_releasing: 1
            }
        )]
    );
}

#[test]
fn past_timestamps_play_immediately() {
    let (mut synth, _) = open_synth(SimpleSynthConfig::default());
    render_i16(&mut synth, 64);
    assert!(synth.play_msg(note_on(1, 69, 127), 10));

    let samples = render_i16(&mut synth, 16);
    assert!(samples.iter().any(|s| *s != 0));
}

#[test]
fn full_queue_rejects_messages() {
    let (mut synth, _) = open_synth(SimpleSynthConfig {
        queue_capacity: 2,
        ..SimpleSynthConfig::default()
    });
    assert!(synth.play_msg(note_on(1, 60, 100), 1000));
    assert!(synth.play_msg(note_on(1, 62, 100), 1000));
    assert!(!synth.play_msg(note_on(1, 64, 100), 1000));
    assert!(!synth.play_sysex(&data_set_message(0x10, 0x10_0016, &[50]), 1000));
}

#[test]
fn program_change_reports_patch_name() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    assert!(synth.play_msg(pack_short_message(&[0xC1, 70]), 0));
    render_i16(&mut synth, 8);

    assert_eq!(
        reports.lock().as_slice(),
        &[Report::Program(0, 1, "Tone B-06".to_string())]
    );
}

#[test]
fn rhythm_part_ignores_program_change() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    assert!(synth.play_msg(pack_short_message(&[0xC9, 3]), 0));
    render_i16(&mut synth, 8);
    assert!(reports.lock().is_empty());
}

#[test]
fn data_set_writes_memory_and_reports_reverb() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    assert!(synth.play_sysex(&data_set_message(0x10, 0x10_0001, &[2, 3, 4]), 0));
    assert!(synth.play_sysex(&data_set_message(0x10, 0x10_0016, &[50]), 0));
    render_i16(&mut synth, 8);

    assert_eq!(memory_byte(&synth, 0x10_0001), 2);
    assert_eq!(memory_byte(&synth, 0x10_0016), 50);
    assert_eq!(
        reports.lock().as_slice(),
        &[
            Report::ReverbMode(2),
            Report::ReverbTime(3),
            Report::ReverbLevel(4)
        ]
    );
}

#[test]
fn bad_checksum_is_ignored() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    let mut message = data_set_message(0x10, 0x10_0016, &[50]);
    let sum = message.len() - 2;
    message[sum] ^= 0x01;
    assert!(synth.play_sysex(&message, 0));
    render_i16(&mut synth, 8);

    assert_eq!(memory_byte(&synth, 0x10_0016), 100);
    assert!(matches!(reports.lock().as_slice(), [Report::Debug(_)]));
}

#[test]
fn display_writes_report_lcd_text() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    assert!(synth.play_sysex(&data_set_message(0x10, 0x20_0000, b"Hello"), 0));
    render_i16(&mut synth, 8);

    let expected = format!("{:<20}", "Hello");
    assert_eq!(synth.display_text(), expected);
    assert_eq!(reports.lock().as_slice(), &[Report::Lcd(expected)]);
}

#[test]
fn reset_restores_rom_contents() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    synth.write_memory(mem_addr(0x10_0016), &[10]);
    assert!(synth.play_sysex(&data_set_message(0x10, 0x7F_0000, &[0]), 0));
    render_i16(&mut synth, 8);

    assert_eq!(memory_byte(&synth, 0x10_0016), 100);
    assert_eq!(reports.lock().as_slice(), &[Report::Reset]);
}

#[test]
fn channel_assignment_follows_system_area() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    assert!(synth.play_sysex(&data_set_message(0x10, 0x10_000D, &[15]), 0));
    assert!(synth.play_msg(note_on(1, 69, 127), 0));
    let silent = render_i16(&mut synth, 64);
    assert!(silent.iter().all(|s| *s == 0));
    assert_eq!(reports.lock().as_slice(), &[Report::Reconfig]);

    assert!(synth.play_msg(note_on(15, 69, 127), 64));
    let playing = render_i16(&mut synth, 64);
    assert!(playing.iter().any(|s| *s != 0));
}

#[test]
fn float_output_is_produced_in_native_format() {
    let (mut synth, _) = open_synth(SimpleSynthConfig {
        sample_format: SampleFormat::Float32,
        ..SimpleSynthConfig::default()
    });
    assert!(synth.play_msg(note_on(1, 69, 127), 0));
    let mut buffer = NativeBuffer::with_frames(SampleFormat::Float32, 64);
    synth.render(buffer.frames_mut(64));

    match buffer {
        NativeBuffer::Float32(samples) => {
            assert!(samples.iter().any(|s| *s != 0.0));
            assert!(samples.iter().all(|s| s.abs() <= 1.0));
        }
        NativeBuffer::Int16(_) => panic!("expected float output"),
    }
}

#[test]
fn closed_synth_renders_silence() {
    let mut synth = SimpleSynth::default();
    let mut samples = vec![7i16; 32];
    synth.render(NativeSliceMut::Int16(&mut samples));
    assert!(samples.iter().all(|s| *s == 0));
}

#[test]
fn memory_access_clamps_at_the_map_end() {
    let (mut synth, _) = open_synth(SimpleSynthConfig::default());
    synth.write_memory(MEMORY_MAP_SIZE - 2, &[1, 2, 3, 4]);
    let mut out = [9u8; 4];
    synth.read_memory(MEMORY_MAP_SIZE - 2, &mut out);
    assert_eq!(out, [1, 2, 9, 9]);
}

fn control_change(channel: u8, controller: u8, value: u8) -> u32 {
    pack_short_message(&[0xB0 | channel, controller, value])
}

fn note_off(channel: u8, note: u8) -> u32 {
    pack_short_message(&[0x80 | channel, note, 0])
}

fn poly_reports(reports: &Reports) -> Vec<Report> {
    reports
        .lock()
        .drain(..)
        .filter(|report| matches!(report, Report::Poly(..)))
        .collect()
}

#[test]
fn oldest_voice_is_stolen() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig {
        max_voices: 2,
        ..SimpleSynthConfig::default()
    });
    for note in [60, 62, 64] {
        assert!(synth.play_msg(note_on(1, note, 100), 0));
    }
    render_i16(&mut synth, 8);
    assert_eq!(
        poly_reports(&reports),
        vec![Report::Poly(0, PolyStats { polys: 2, non_releasing: 2 })]
    );

    // 60 was stolen, so releasing it changes nothing.
    assert!(synth.play_msg(note_off(1, 60), 8));
    render_i16(&mut synth, 8);
    assert!(poly_reports(&reports).is_empty());

    assert!(synth.play_msg(note_off(1, 62), 16));
    render_i16(&mut synth, 8);
    assert_eq!(
        poly_reports(&reports),
        vec![Report::Poly(0, PolyStats { polys: 2, non_releasing: 1 })]
    );
}

#[test]
fn sustain_holds_released_notes() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    assert!(synth.play_msg(control_change(1, 64, 127), 0));
    assert!(synth.play_msg(note_on(1, 60, 100), 0));
    assert!(synth.play_msg(note_off(1, 60), 0));
    render_i16(&mut synth, 8);
    assert_eq!(
        poly_reports(&reports),
        vec![Report::Poly(0, PolyStats { polys: 1, non_releasing: 1 })]
    );

    assert!(synth.play_msg(control_change(1, 64, 0), 8));
    render_i16(&mut synth, 8);
    assert_eq!(
        poly_reports(&reports),
        vec![Report::Poly(0, PolyStats { polys: 1, non_releasing: 0 })]
    );
}

#[test]
fn released_voices_finish_after_the_release_time() {
    // 0.2 s of release at 1 kHz is 200 frames.
    let (mut synth, _) = open_synth(SimpleSynthConfig {
        native_rate_hz: 1_000,
        ..SimpleSynthConfig::default()
    });
    assert!(synth.play_msg(note_on(1, 69, 127), 0));
    assert!(synth.play_msg(control_change(1, 123, 0), 0));

    let samples = render_i16(&mut synth, 300);
    assert!(samples[..400].iter().any(|s| *s != 0));
    assert!(samples[400..].iter().all(|s| *s == 0));
}

#[test]
fn rhythm_notes_start_released() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    assert!(synth.play_msg(note_on(9, 36, 100), 0));
    render_i16(&mut synth, 8);
    assert_eq!(
        poly_reports(&reports),
        vec![Report::Poly(8, PolyStats { polys: 1, non_releasing: 0 })]
    );
}

#[test]
fn poly_change_is_reported_once() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    render_i16(&mut synth, 8);
    assert!(poly_reports(&reports).is_empty());

    assert!(synth.play_msg(note_on(1, 60, 100), 8));
    render_i16(&mut synth, 8);
    assert_eq!(poly_reports(&reports).len(), 1);
    render_i16(&mut synth, 8);
    assert!(poly_reports(&reports).is_empty());
}

#[test]
fn later_events_wait_behind_the_queue_head() {
    let (mut synth, _) = open_synth(SimpleSynthConfig::default());
    assert!(synth.play_msg(note_on(1, 60, 100), 10));
    assert!(synth.play_msg(note_on(1, 62, 100), 5));

    render_i16(&mut synth, 10);
    assert_eq!(synth.pending_events(), 2);
    render_i16(&mut synth, 1);
    assert_eq!(synth.pending_events(), 0);
}

#[test]
fn sysex_buffer_is_bounded_and_recycled() {
    let message = data_set_message(0x10, 0x20_0000, b"Hi");
    let (mut synth, _) = open_synth(SimpleSynthConfig {
        sysex_buffer_bytes: message.len() + 4,
        ..SimpleSynthConfig::default()
    });
    assert!(synth.play_sysex(&message, 0));
    assert!(!synth.play_sysex(&message, 0));

    render_i16(&mut synth, 8);
    assert_eq!(synth.pending_events(), 0);
    assert!(synth.play_sysex(&message, 8));
}

#[test]
fn unmapped_data_set_is_reported_as_debug_text() {
    let (mut synth, reports) = open_synth(SimpleSynthConfig::default());
    assert!(synth.play_sysex(&data_set_message(0x10, 0x18_0000, &[1]), 0));
    render_i16(&mut synth, 8);
    assert_eq!(
        reports.lock().as_slice(),
        &[Report::Debug("sysex write to unmapped address".to_string())]
    );
}

use ostinato_ports::engine::PolyStats;
use std::f32::consts::TAU;

const VOICE_AMPLITUDE: f32 = 0.2;
const RELEASE_SECONDS: f32 = 0.2;

/// Pitch and loudness settings a part applies to new notes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteSetup {
    pub sample_rate_hz: f32,
    /// Semitones, 0 = no shift.
    pub key_shift: i32,
    /// Cents, 0 = no detune.
    pub fine_tune: f32,
    /// Rhythm notes start in release and ignore note off.
    pub percussive: bool,
}

#[derive(Debug)]
pub struct Part {
    sustain_down: bool,
    voices: Vec<Voice>,
    max_voices: usize,
    note_counter: u64,
    volume: f32,
    reported: PolyStats,
}

#[derive(Clone, Debug)]
struct Voice {
    note: u8,
    freq: f32,
    phase: f32,
    velocity: f32,
    key_down: bool,
    sustained: bool,
    release_samples_left: u32,
    release_total_samples: u32,
    age: u64,
}

impl Part {
    pub fn new(max_voices: usize) -> Self {
        let max_voices = max_voices.max(1);
        Self {
            sustain_down: false,
            voices: Vec::with_capacity(max_voices),
            max_voices,
            note_counter: 0,
            volume: 100.0 / 127.0,
            reported: PolyStats::default(),
        }
    }

    pub fn note_on(&mut self, note: u8, velocity: u8, setup: NoteSetup) {
        self.note_counter = self.note_counter.wrapping_add(1);

        if self.voices.len() >= self.max_voices {
            if let Some((idx, _)) = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, voice)| voice.age)
            {
                self.voices.swap_remove(idx);
            }
        }

        let semitones = f32::from(note) + setup.key_shift as f32 - 69.0 + setup.fine_tune / 100.0;
        let freq = 440.0 * 2.0_f32.powf(semitones / 12.0);
        let velocity = (f32::from(velocity) / 127.0).clamp(0.05, 1.0);
        let release_total_samples = ((setup.sample_rate_hz * RELEASE_SECONDS) as u32).max(1);
        self.voices.push(Voice {
            note,
            freq,
            phase: 0.0,
            velocity,
            key_down: !setup.percussive,
            sustained: false,
            release_samples_left: if setup.percussive {
                release_total_samples
            } else {
                0
            },
            release_total_samples,
            age: self.note_counter,
        });
    }

    pub fn note_off(&mut self, note: u8) {
        for voice in &mut self.voices {
            if voice.note == note && voice.key_down {
                voice.key_down = false;
                if self.sustain_down {
                    voice.sustained = true;
                } else {
                    voice.release_samples_left = voice.release_total_samples;
                }
            }
        }
    }

    pub fn sustain(&mut self, down: bool) {
        self.sustain_down = down;

        if !down {
            for voice in &mut self.voices {
                if !voice.key_down && voice.sustained {
                    voice.sustained = false;
                    voice.release_samples_left = voice.release_total_samples;
                }
            }
        }
    }

    /// Releases every held note, sustain pedal included.
    pub fn all_notes_off(&mut self) {
        self.sustain_down = false;
        for voice in &mut self.voices {
            if voice.key_down || voice.sustained {
                voice.key_down = false;
                voice.sustained = false;
                voice.release_samples_left = voice.release_total_samples;
            }
        }
    }

    pub fn silence(&mut self) {
        self.voices.clear();
        self.sustain_down = false;
    }

    pub fn set_volume(&mut self, value: u8) {
        self.volume = f32::from(value.min(127)) / 127.0;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn stats(&self) -> PolyStats {
        PolyStats {
            polys: self.voices.len() as u32,
            non_releasing: self
                .voices
                .iter()
                .filter(|voice| voice.key_down || voice.sustained)
                .count() as u32,
        }
    }

    /// Returns the current stats if they changed since the last call.
    pub fn take_changed_stats(&mut self) -> Option<PolyStats> {
        let stats = self.stats();
        if stats == self.reported {
            return None;
        }
        self.reported = stats;
        Some(stats)
    }

    /// Mixes every voice into the buffers with the given channel gains.
    pub fn render_add(
        &mut self,
        sample_rate_hz: f32,
        gain_l: f32,
        gain_r: f32,
        out_l: &mut [f32],
        out_r: &mut [f32],
    ) {
        let frames = out_l.len().min(out_r.len());
        for voice in &mut self.voices {
            let phase_step = TAU * voice.freq / sample_rate_hz;
            for i in 0..frames {
                let mut gain = voice.velocity;
                if voice.release_samples_left > 0 {
                    gain *= voice.release_samples_left as f32 / voice.release_total_samples as f32;
                    voice.release_samples_left -= 1;
                } else if !voice.key_down && !voice.sustained {
                    break;
                }

                let sample = voice.phase.sin() * gain * VOICE_AMPLITUDE;
                out_l[i] += sample * gain_l;
                out_r[i] += sample * gain_r;
                voice.phase += phase_step;
                if voice.phase >= TAU {
                    voice.phase -= TAU;
                }
            }
        }

        self.voices
            .retain(|voice| voice.key_down || voice.sustained || voice.release_samples_left > 0);
    }
}

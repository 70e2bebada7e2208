use crate::core::{Channel, ChannelMessage, NoteMessage};
use crate::metronome::beat::{BeatStatus, SimpleBeat};
use crate::song::Song;

const METRONOME_CHANNEL: u8 = 9;
const NOTE_PREPARE_CLICK: u8 = 0x25;
const NOTE_WEAK_CLICK: u8 = 0x32;
const NOTE_STRONG_CLICK: u8 = 0x38;
const NOTE_STRONG_ACCENT: u8 = 0x51;
const CLICK_VELOCITY: u8 = 0x7f;

/// The visual feedback state a host UI should show for the current beat — a light, not a sound.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetronomeLight {
    Black,
    Red,
    Green,
}

fn note_on(note: u8) -> ChannelMessage {
    ChannelMessage::NoteOn(NoteMessage {
        channel: Channel::new(METRONOME_CHANNEL),
        note_number: note,
        velocity: CLICK_VELOCITY,
    })
}

fn note_off(note: u8) -> ChannelMessage {
    ChannelMessage::NoteOff(NoteMessage {
        channel: Channel::new(METRONOME_CHANNEL),
        note_number: note,
        velocity: CLICK_VELOCITY,
    })
}

/// Four beat oscillators driving a click track and a set of visual lights: one free-running pair
/// (frames/sound) that always ticks, and one pair locked to a [`Song`]'s position for when
/// `sync_midi` playback is requested. Owns no reference to the `Song` between calls — every method
/// that needs song state takes it as a parameter.
#[derive(Clone, Debug)]
pub struct Metronome {
    free_sound: SimpleBeat,
    free_frames: SimpleBeat,
    sync_sound: SimpleBeat,
    sync_frames: SimpleBeat,
    light: MetronomeLight,
    prepare_meter_position: i64,
    meter_length_micros: i64,
    bar_length_micros: i64,
    defer_micros: i64,
    timer: i32,
    meter_id: i32,
    play: bool,
    sync_midi: bool,
    knock_on_stick: bool,
    plus_minus: bool,
    initialized: bool,
}

impl Default for Metronome {
    fn default() -> Self {
        Self {
            free_sound: SimpleBeat::default(),
            free_frames: SimpleBeat::default(),
            sync_sound: SimpleBeat::default(),
            sync_frames: SimpleBeat::default(),
            light: MetronomeLight::Black,
            prepare_meter_position: 0,
            meter_length_micros: 0,
            bar_length_micros: 0,
            defer_micros: 0,
            timer: 1,
            meter_id: 0,
            play: false,
            sync_midi: false,
            knock_on_stick: false,
            plus_minus: false,
            initialized: true,
        }
    }
}

impl Metronome {
    /// Initializes from a loaded song's meter/tempo at its current position.
    pub fn init_with_song(song: &Song, defer_micros: i64) -> Self {
        let mut m = Self {
            defer_micros,
            ..Self::default()
        };
        m.recompute_meter_from_song(song);
        m.initialized = false;
        m
    }

    /// Initializes with a fixed meter and tempo, for metronome-only use with no loaded song.
    pub fn init_fixed(meter_amount: u32, meter_unit: u32, beats_per_minute: i64, defer_micros: i64) -> Self {
        let mut m = Self {
            defer_micros,
            ..Self::default()
        };
        let tempo_micros = 60_000_000 / beats_per_minute.max(1);
        m.recompute_meter_fixed(meter_amount, meter_unit, tempo_micros);
        m.initialized = false;
        m
    }

    fn recompute_meter_fixed(&mut self, meter_amount: u32, meter_unit: u32, tempo_micros: i64) {
        let unit = meter_unit.max(1) as i64;
        self.meter_length_micros = 4 * tempo_micros / unit;
        self.bar_length_micros = 4 * self.meter_length_micros * meter_amount.max(1) as i64 / unit;
        let amount = meter_amount as i32;
        self.free_sound.init(amount, self.meter_length_micros, 0);
        self.free_frames.init(amount, self.meter_length_micros, self.defer_micros);
    }

    fn recompute_meter_from_song(&mut self, song: &Song) {
        let deferred_position = song.position_micros() + self.defer_micros;
        let (amount, unit) = song.real_time_meter(deferred_position);
        let amount = amount.max(1) as i32;
        let unit = unit.max(1) as i64;
        let tempo = song.running_tempo_micros(deferred_position) as i64;
        self.meter_length_micros = 4 * tempo / unit;
        self.bar_length_micros = 4 * self.meter_length_micros * amount as i64 / unit;

        let (bar_id, mut meter_id) = song.bar_and_beat_id(deferred_position);
        let mut position = deferred_position - song.bar_beat_start_micros(bar_id, meter_id);
        if position > 0 {
            meter_id = (meter_id + 1) % amount.max(1) as usize;
        }
        if position < 0 {
            position = 0;
        }

        if self.sync_midi && deferred_position >= song.song_end_micros() {
            self.sync_midi = false;
        }

        if self.free_sound.position_micros() == 0 && self.meter_id == 0 {
            self.free_sound.init(amount, self.meter_length_micros, 0);
            self.sync_sound.init(amount, self.meter_length_micros, 0);
        }
        if self.sync_midi && !self.knock_on_stick {
            self.free_sound.set_at(amount, self.meter_length_micros, meter_id as i32, position);
        } else {
            self.free_sound.set(amount, self.meter_length_micros);
        }
        self.sync_sound.set_at(amount, self.meter_length_micros, meter_id as i32, position);

        let raw_position = song.position_micros();
        let (amount2, unit2) = song.real_time_meter(raw_position);
        let amount2 = amount2.max(1) as i32;
        let unit2 = unit2.max(1) as i64;
        let tempo2 = song.running_tempo_micros(raw_position) as i64;
        self.meter_length_micros = 4 * tempo2 / unit2;

        let (bar_id2, mut meter_id2) = song.bar_and_beat_id(raw_position);
        let mut position2 = raw_position - song.bar_beat_start_micros(bar_id2, meter_id2);
        if position2 > 0 {
            meter_id2 = (meter_id2 + 1) % amount2.max(1) as usize;
        }
        if position2 < 0 {
            position2 = 0;
        }

        if self.free_frames.position_micros() == 0 && self.meter_id == 0 {
            self.free_frames.init(amount2, self.meter_length_micros, self.defer_micros);
            self.sync_frames.init(amount2, self.meter_length_micros, 0);
        }
        if self.sync_midi && !self.knock_on_stick {
            self.free_frames.set_at(amount2, self.meter_length_micros, meter_id2 as i32, position2);
        } else {
            self.free_frames.set(amount2, self.meter_length_micros);
        }
        self.sync_frames.set_at(amount2, self.meter_length_micros, meter_id2 as i32, position2);
    }

    pub fn reset(&mut self) {
        self.free_frames.reset();
        self.free_sound.reset();
        self.sync_frames.reset();
        self.sync_sound.reset();
        self.prepare_meter_position = 0;
        self.light = MetronomeLight::Black;
        self.timer = 0;
        self.meter_id = 0;
        self.play = false;
        self.sync_midi = false;
        self.knock_on_stick = false;
        self.plus_minus = false;
    }

    /// Emits the note-off click-release triplet that ends a run, and resets visual state.
    pub fn close(&mut self) -> Vec<ChannelMessage> {
        self.timer = 0;
        self.light = MetronomeLight::Black;
        vec![
            note_off(NOTE_PREPARE_CLICK),
            note_off(NOTE_STRONG_ACCENT),
            note_off(NOTE_STRONG_CLICK),
        ]
    }

    fn strong_beat_events() -> Vec<ChannelMessage> {
        vec![
            note_off(NOTE_STRONG_CLICK),
            note_off(NOTE_STRONG_ACCENT),
            note_on(NOTE_STRONG_ACCENT),
        ]
    }

    fn weak_beat_events() -> Vec<ChannelMessage> {
        vec![note_off(NOTE_WEAK_CLICK), note_on(NOTE_WEAK_CLICK)]
    }

    fn prepare_beat_events() -> Vec<ChannelMessage> {
        vec![note_off(NOTE_PREPARE_CLICK), note_on(NOTE_PREPARE_CLICK)]
    }

    fn apply_light(&mut self, status: BeatStatus) {
        self.light = match status {
            BeatStatus::Rest => {
                self.timer += 1;
                if self.timer > 12 {
                    self.timer = 0;
                    MetronomeLight::Black
                } else {
                    self.light
                }
            }
            BeatStatus::Strong => MetronomeLight::Red,
            BeatStatus::SubsidiaryStrong | BeatStatus::Weak => MetronomeLight::Green,
        };
    }

    /// Advances all four beats by `delta_micros` against a loaded song, returning the click
    /// events (if any) that landed in this step. With `sync_midi` false the free-running pair
    /// drives output; with it true, once any prepare-meter count-in has elapsed, the song-synced
    /// pair takes over.
    pub fn update(
        &mut self,
        delta_micros: i64,
        song: &Song,
        play: bool,
        sync_midi: bool,
        prepare_meter: bool,
    ) -> Vec<ChannelMessage> {
        if self.initialized || delta_micros <= 0 {
            return Vec::new();
        }

        if !play {
            let was_playing = self.play;
            self.play = play;
            if was_playing {
                self.reset();
                return self.close();
            }
            return Vec::new();
        }
        self.play = play;

        if self.sync_midi != sync_midi
            && !self.sync_midi
            && song.position_micros() + self.defer_micros < song.song_end_micros()
        {
            self.reset();
        }
        self.sync_midi = sync_midi;

        if prepare_meter && self.prepare_meter_position == 0 {
            self.knock_on_stick = true;
        }

        self.recompute_meter_from_song(song);

        let frames_status = self.free_frames.update(delta_micros);
        self.apply_light(frames_status);

        // ticked unconditionally, like `free_frames` above, so its phase keeps tracking real
        // elapsed time even while sync output is driving the returned events.
        let sound_status = self.free_sound.update(delta_micros);

        if !self.sync_midi {
            return match sound_status {
                BeatStatus::Strong => Self::strong_beat_events(),
                BeatStatus::SubsidiaryStrong | BeatStatus::Weak => Self::weak_beat_events(),
                BeatStatus::Rest => Vec::new(),
            };
        }

        let mut remaining_delta = delta_micros;
        if self.knock_on_stick {
            self.prepare_meter_position += delta_micros;
            if self.prepare_meter_position >= self.bar_length_micros && self.bar_length_micros > 0 {
                self.knock_on_stick = false;
                remaining_delta = self.prepare_meter_position % self.bar_length_micros;
            } else {
                return match sound_status {
                    BeatStatus::Strong | BeatStatus::SubsidiaryStrong | BeatStatus::Weak => {
                        Self::prepare_beat_events()
                    }
                    BeatStatus::Rest => Vec::new(),
                };
            }
        }

        let sync_frames_status = self.sync_frames.update(remaining_delta);
        self.apply_light(sync_frames_status);

        let sync_sound_status = self.sync_sound.update(remaining_delta);
        match sync_sound_status {
            BeatStatus::Strong => Self::strong_beat_events(),
            BeatStatus::SubsidiaryStrong | BeatStatus::Weak => Self::weak_beat_events(),
            BeatStatus::Rest => Vec::new(),
        }
    }

    /// Advances the free-running pair with no song to sync to — metronome-only mode.
    pub fn update_free(&mut self, delta_micros: i64, play: bool) -> Vec<ChannelMessage> {
        if self.initialized || delta_micros <= 0 {
            return Vec::new();
        }

        if !play {
            let was_playing = self.play;
            self.play = play;
            if was_playing {
                self.reset();
                return self.close();
            }
            return Vec::new();
        }
        self.play = play;

        let frames_status = self.free_frames.update(delta_micros);
        match frames_status {
            BeatStatus::Rest => {
                if self.free_frames.progress() >= 0.25 {
                    self.light = MetronomeLight::Black;
                }
            }
            BeatStatus::Strong => self.light = MetronomeLight::Red,
            BeatStatus::SubsidiaryStrong | BeatStatus::Weak => self.light = MetronomeLight::Green,
        }

        if self.sync_midi {
            return Vec::new();
        }

        let sound_status = self.free_sound.update(delta_micros);
        match sound_status {
            BeatStatus::Strong => Self::strong_beat_events(),
            BeatStatus::SubsidiaryStrong | BeatStatus::Weak => Self::weak_beat_events(),
            BeatStatus::Rest => Vec::new(),
        }
    }

    pub fn light(&self) -> MetronomeLight {
        self.light
    }

    /// A signed progress value in `[-1.0, 1.0]` describing how far the active beat oscillator is
    /// from the middle of its meter: `1.0` at the very start, `-1.0` just before the next beat,
    /// sign flipping every time the tracked meter id changes. Intended to drive a continuously
    /// swinging visual indicator rather than a discrete light.
    pub fn metronome_value(&mut self) -> f64 {
        let (position, meter_id) = if self.sync_midi && !self.knock_on_stick {
            (self.sync_frames.position_micros(), self.sync_frames.meter_id())
        } else {
            (self.free_frames.position_micros(), self.free_frames.meter_id())
        };

        if self.meter_id != meter_id {
            self.plus_minus = !self.plus_minus;
            self.meter_id = meter_id;
        }

        if self.meter_length_micros == 0 {
            return 0.0;
        }
        let meter_position = position.max(0) % self.meter_length_micros;
        let half_meter = self.meter_length_micros / 2;
        let value = (half_meter - meter_position) as f64 / half_meter as f64;
        if self.plus_minus {
            -value
        } else {
            value
        }
    }

    /// A parabolic "toss height" value derived from how far through its meter the active frame
    /// oscillator has traveled, for driving a knock-on-stick-style visual throw animation.
    pub fn upcast_space(&self) -> f64 {
        let position = if self.sync_midi && !self.knock_on_stick {
            self.sync_frames.position_micros()
        } else {
            self.free_frames.position_micros()
        };

        if self.meter_length_micros == 0 {
            return 0.0;
        }
        let meter_position = position.max(0) % self.meter_length_micros;
        let half = (self.meter_length_micros / 2) as f64;
        let acceleration = 60.0 / (half * half);
        let velocity = acceleration * self.meter_length_micros as f64 * 0.5;
        (meter_position * meter_position) as f64 * acceleration * 0.5 - velocity * meter_position as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn minimal_song() -> Song {
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&480u16.to_be_bytes());
        let events: Vec<u8> = vec![
            0x00, 0xff, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08, // 4/4
            0x00, 0xff, 0x51, 0x03, 0x07, 0xa1, 0x20, // tempo 500_000
            0x00, 0xff, 0x2f, 0x00,
        ];
        let mut track = b"MTrk".to_vec();
        track.extend_from_slice(&(events.len() as u32).to_be_bytes());
        track.extend_from_slice(&events);
        bytes.extend(track);
        Song::read(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn free_sound_keeps_ticking_while_synced_without_knock_on_stick() {
        let song = minimal_song();
        let mut m = Metronome::init_with_song(&song, 0);

        m.update(1, &song, true, true, false);
        let after_first = m.free_sound.position_micros();
        m.update(300_000, &song, true, true, false);
        let after_second = m.free_sound.position_micros();

        assert_ne!(after_first, after_second);
    }

    #[test]
    fn fixed_init_produces_strong_beat_on_first_tick() {
        let mut m = Metronome::init_fixed(4, 4, 120, 0);
        let events = m.update_free(1, true);
        assert_eq!(events, Metronome::strong_beat_events());
    }

    #[test]
    fn stopping_playback_emits_close_events() {
        let mut m = Metronome::init_fixed(4, 4, 120, 0);
        m.update_free(1, true);
        let events = m.update_free(1, false);
        assert_eq!(events, vec![note_off(NOTE_PREPARE_CLICK), note_off(NOTE_STRONG_ACCENT), note_off(NOTE_STRONG_CLICK)]);
    }
}

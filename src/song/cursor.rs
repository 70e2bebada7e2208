use crate::core::ChannelMessage;
use crate::file::{Event, Track, TrackEvent};

/// Per-track cursor bookkeeping: everything needed to resume emitting a track's events from an
/// arbitrary point without re-scanning from the start.
#[derive(Clone, Debug, Default)]
struct TrackCursor {
    last_event: Option<usize>,
    running_micros: i64,
    loop_start_micros: i64,
    loop_end_micros: i64,
    end_micros: i64,
    change_play: bool,
}

impl TrackCursor {
    fn reset(&mut self, start: i64, end: i64) {
        self.running_micros = start;
        self.end_micros = end;
        self.last_event = None;
        self.loop_start_micros = 0;
        self.loop_end_micros = 0;
        self.change_play = false;
    }

    fn set_loop(&mut self, start: i64, end: i64) {
        self.loop_start_micros = start;
        self.loop_end_micros = end;
    }

    /// Returns the index one past `last_event`, i.e. where emission should resume.
    fn next_index(&self) -> usize {
        self.last_event.map_or(0, |i| i + 1)
    }

    fn control_events<'a>(&self, track: &'a Track) -> Vec<&'a TrackEvent> {
        track
            .events()
            .iter()
            .zip(track.microseconds())
            .take_while(|(_, &micros)| micros as i64 <= self.running_micros)
            .filter(|(e, _)| !matches!(e.event(), Event::Midi(ChannelMessage::NoteOn(_)) | Event::Midi(ChannelMessage::NoteOff(_))))
            .map(|(e, _)| e)
            .collect()
    }

    /// Rewinds `last_event` to the last event strictly before `pulse_micros`, leaving the next
    /// call free to re-emit everything from there.
    fn rewind_to(&mut self, track: &Track, micros: i64) {
        let mut idx: Option<usize> = None;
        for (i, &m) in track.microseconds().iter().enumerate() {
            if (m as i64) >= micros {
                break;
            }
            idx = Some(i);
        }
        self.last_event = idx;
    }

    fn set_play_start(&mut self, track: &Track, start: i64) -> Vec<TrackEvent> {
        self.rewind_to(track, start);
        self.running_micros = start;
        self.change_play = true;
        self.control_events(track).into_iter().cloned().collect()
    }

    fn update(&mut self, track: &Track, delta: i64) -> Vec<TrackEvent> {
        self.running_micros += delta;
        let mut events = Vec::new();
        if self.change_play {
            events.extend(self.control_events(track).into_iter().cloned());
            self.change_play = false;
        }
        let mut i = self.next_index();
        while i < track.len() {
            if (track.microseconds()[i] as i64) <= self.running_micros {
                events.push(track.events()[i].clone());
                self.last_event = Some(i);
                i += 1;
            } else {
                break;
            }
        }
        events
    }

    fn update_looped(&mut self, track: &Track, delta: i64) -> Vec<TrackEvent> {
        self.running_micros += delta;

        if self.loop_end_micros > self.loop_start_micros && self.running_micros > self.loop_end_micros {
            self.rewind_to(track, self.loop_start_micros);
            self.running_micros = self.running_micros - self.loop_end_micros + self.loop_start_micros;
            self.change_play = true;
        } else if self.loop_end_micros < self.loop_start_micros {
            if self.running_micros > self.end_micros {
                self.rewind_to(track, 0);
                self.running_micros = self.running_micros - self.end_micros;
                self.change_play = true;
            } else if self.running_micros > self.loop_end_micros && self.running_micros < self.loop_start_micros {
                self.rewind_to(track, self.loop_start_micros);
                self.running_micros = self.running_micros - self.loop_end_micros + self.loop_start_micros;
                self.change_play = true;
            }
        }

        let mut events = Vec::new();
        if self.change_play {
            events.extend(self.control_events(track).into_iter().cloned());
            self.change_play = false;
        }
        let mut i = self.next_index();
        while i < track.len() {
            if (track.microseconds()[i] as i64) <= self.running_micros {
                events.push(track.events()[i].clone());
                self.last_event = Some(i);
                i += 1;
            } else {
                break;
            }
        }
        events
    }
}

/// The playback cursor: tracks the current song position and drives per-track event emission.
/// Owned by [`crate::song::Song`]; every public operation here is a thin wrapper that fans out to
/// each track's [`TrackCursor`] and then reduces the per-track results into one ordered list.
#[derive(Clone, Debug, Default)]
pub(crate) struct PlaybackCursor {
    position_micros: i64,
    lead_out_micros: i64,
    loop_start_micros: i64,
    loop_end_micros: i64,
    song_start_micros: i64,
    song_end_micros: i64,
    defer_micros: i64,
    first_update_after_reset: bool,
    /// One-shot latch: the song_start/song_end/position defer shift in [`Self::reset_deferred`]
    /// must apply exactly once, on the first call, no matter how many times playback is reset.
    defer_applied: bool,
    track_cursors: Vec<TrackCursor>,
}

/// One emitted event, tagged with the index of the track it came from.
#[derive(Clone, Debug)]
pub struct TaggedEvent {
    pub track_id: usize,
    pub event: TrackEvent,
}

impl PlaybackCursor {
    pub(crate) fn new(track_count: usize, song_end_micros: i64) -> Self {
        Self {
            song_end_micros,
            track_cursors: vec![TrackCursor::default(); track_count],
            ..Default::default()
        }
    }

    pub(crate) fn reset(&mut self, lead_in: i64, lead_out: i64) {
        self.lead_out_micros = lead_out;
        self.position_micros = self.song_start_micros - lead_in;
        self.first_update_after_reset = true;
        for tc in &mut self.track_cursors {
            tc.reset(self.position_micros, self.song_end_micros);
        }
    }

    pub(crate) fn reset_deferred(&mut self, lead_in: i64, lead_out: i64, defer: i64, hide: bool) {
        self.lead_out_micros = lead_out;
        self.position_micros = if hide {
            self.song_start_micros - lead_in
        } else {
            -lead_in
        };
        if !self.defer_applied {
            self.defer_applied = true;
            self.song_end_micros -= defer;
            self.song_start_micros -= defer;
            self.defer_micros = defer;
            self.position_micros -= defer;
        }
        self.first_update_after_reset = true;
        for tc in &mut self.track_cursors {
            tc.reset(self.position_micros, self.song_end_micros);
        }
    }

    pub(crate) fn set_loop(&mut self, start: i64, end: i64) {
        self.loop_start_micros = start;
        self.loop_end_micros = end;
        for tc in &mut self.track_cursors {
            tc.set_loop(start, end);
        }
    }

    pub(crate) fn set_play_start(&mut self, tracks: &[Track], start: i64) -> Vec<TaggedEvent> {
        self.position_micros = start - self.defer_micros;
        let mut out = Vec::new();
        for (track_id, (tc, track)) in self.track_cursors.iter_mut().zip(tracks).enumerate() {
            for event in tc.set_play_start(track, start) {
                out.push(TaggedEvent { track_id, event });
            }
        }
        out
    }

    /// Drops the per-track cursor at `index`, keeping `track_cursors` aligned with a main track
    /// list a muted track has just been removed from.
    pub(crate) fn remove_track(&mut self, index: usize) {
        self.track_cursors.remove(index);
    }

    pub(crate) fn is_song_over(&self) -> bool {
        self.position_micros >= self.song_end_micros + self.lead_out_micros
    }

    pub(crate) fn update(&mut self, tracks: &[Track], mut delta: i64) -> Vec<TaggedEvent> {
        self.position_micros += delta;
        if self.first_update_after_reset {
            delta += self.position_micros;
            self.first_update_after_reset = false;
        }
        if delta == 0 || self.position_micros < 0 {
            return Vec::new();
        }
        if delta > self.position_micros {
            delta = self.position_micros;
        }
        let mut out = Vec::new();
        for (track_id, (tc, track)) in self.track_cursors.iter_mut().zip(tracks).enumerate() {
            for event in tc.update(track, delta) {
                out.push(TaggedEvent { track_id, event });
            }
        }
        out
    }

    pub(crate) fn update_looped(&mut self, tracks: &[Track], mut delta: i64) -> Vec<TaggedEvent> {
        if delta < 0 {
            return Vec::new();
        }
        self.position_micros += delta;
        if self.first_update_after_reset {
            delta += self.position_micros + self.defer_micros;
            self.first_update_after_reset = false;
        }
        if delta == 0 || self.position_micros + self.defer_micros < 0 {
            return Vec::new();
        }
        if delta > self.position_micros + self.defer_micros {
            delta = self.position_micros + self.defer_micros;
        }

        if self.loop_end_micros > self.loop_start_micros && self.position_micros >= self.loop_end_micros {
            self.position_micros = self.position_micros - self.loop_end_micros + self.loop_start_micros;
        } else if self.loop_end_micros < self.loop_start_micros {
            if self.position_micros >= self.song_end_micros {
                self.position_micros = self.position_micros - self.song_end_micros + self.song_start_micros;
            } else if self.position_micros >= self.loop_end_micros && self.position_micros < self.loop_start_micros {
                self.position_micros = self.position_micros - self.loop_end_micros + self.loop_start_micros;
            }
        }

        let mut out = Vec::new();
        for (track_id, (tc, track)) in self.track_cursors.iter_mut().zip(tracks).enumerate() {
            for event in tc.update_looped(track, delta) {
                out.push(TaggedEvent { track_id, event });
            }
        }
        out
    }

    pub(crate) fn position_micros(&self) -> i64 {
        self.position_micros
    }

    pub(crate) fn song_end_micros(&self) -> i64 {
        self.song_end_micros
    }

    /// Extends the song-end boundary, for multi-file concatenation: every subsequently-appended
    /// file's length adds directly onto the point `is_song_over` compares against.
    pub(crate) fn extend_song_end(&mut self, additional_micros: i64) {
        self.song_end_micros += additional_micros;
    }
}

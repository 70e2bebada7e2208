use crate::file::{Event, MetaEvent, Track};

const DEFAULT_TEMPO_USEC_PER_QUARTER: u32 = 500_000;

/// Converts a pulse count to microseconds, all intermediate products computed in `u64` before the
/// division by PPQN, which keeps the conversion exact for every pulse/tempo pair this engine
/// loads — a deliberate departure from a naive `f64` port.
fn pulses_to_micros(pulses: u64, tempo: u32, ppqn: u16) -> u64 {
    pulses * tempo as u64 / ppqn as u64
}

/// Walks the tempo track accumulating microseconds up to pulse `p`. O(number of tempo events).
pub(crate) fn pulse_to_microseconds(tempo_track: &Track, p: u64, ppqn: u16) -> u64 {
    let mut running_result: u64 = 0;
    let mut last_tempo_pulse: u64 = 0;
    let mut running_tempo: u32 = DEFAULT_TEMPO_USEC_PER_QUARTER;

    for (i, track_event) in tempo_track.events().iter().enumerate() {
        let tempo = match track_event.event() {
            Event::Meta(MetaEvent::SetTempo(t)) => t.get(),
            _ => continue,
        };
        let tempo_pulse = tempo_track.pulses()[i];

        if p > tempo_pulse {
            let delta = tempo_pulse - last_tempo_pulse;
            running_result += pulses_to_micros(delta, running_tempo, ppqn);
            running_tempo = tempo;
            last_tempo_pulse = tempo_pulse;
        } else {
            let delta = p - last_tempo_pulse;
            running_result += pulses_to_micros(delta, running_tempo, ppqn);
            return running_result;
        }
    }

    let remaining = p - last_tempo_pulse;
    running_result += pulses_to_micros(remaining, running_tempo, ppqn);
    running_result
}

/// One bar's per-beat start/end microsecond list, indexed by beat-within-bar.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BeatWindow {
    pub start_micros: u64,
    pub end_micros: u64,
}

/// The bar/beat timeline: parallel sequences indexed by bar-id.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Timeline {
    bar_pulses: Vec<u64>,
    bar_micros: Vec<u64>,
    bar_beats: Vec<Vec<BeatWindow>>,
}

impl Timeline {
    pub fn bar_count(&self) -> usize {
        self.bar_pulses.len()
    }

    pub fn bar_pulses(&self) -> &[u64] {
        &self.bar_pulses
    }

    pub fn bar_micros(&self) -> &[u64] {
        &self.bar_micros
    }

    pub fn beats_in_bar(&self, bar_id: usize) -> Option<&[BeatWindow]> {
        self.bar_beats.get(bar_id).map(|v| v.as_slice())
    }

    /// Song length in microseconds: the last bar's start, which is a sentinel bar emitted one
    /// step past the last note-off.
    pub fn song_end_micros(&self) -> u64 {
        self.bar_micros.last().copied().unwrap_or(0)
    }

    /// Count of bars whose start pulse is at or before `first_note_on_pulse`, less one — the
    /// lead-in bars with no notes in them.
    pub fn reserved_bars(&self, first_note_on_pulse: u64) -> usize {
        let count = self
            .bar_pulses
            .iter()
            .take_while(|&&p| p <= first_note_on_pulse)
            .count();
        count.saturating_sub(1)
    }

    /// Appends another timeline's bars onto this one, for multi-file concatenation. `other`'s
    /// leading bar is dropped (it duplicates the seam this timeline already ends on); every
    /// remaining bar's pulse and microsecond position is rebased onto `pulse_offset`/`micros_offset`.
    pub(crate) fn splice(&mut self, other: &Timeline, pulse_offset: u64, micros_offset: u64) {
        for &p in other.bar_pulses.iter().skip(1) {
            self.bar_pulses.push(pulse_offset + p);
        }
        for &m in other.bar_micros.iter().skip(1) {
            self.bar_micros.push(micros_offset + m);
        }
        for beats in other.bar_beats.iter().skip(1) {
            let offset_beats = beats
                .iter()
                .map(|b| BeatWindow {
                    start_micros: micros_offset + b.start_micros,
                    end_micros: micros_offset + b.end_micros,
                })
                .collect();
            self.bar_beats.push(offset_beats);
        }
    }
}

/// Builds the bar/beat timeline from the meter track (already normalized into the
/// second-to-last synthetic track), the tempo track (the last), and PPQN. Consecutive meter
/// events sharing the same numerator/denominator are coalesced into one segment. Empty meter
/// track yields an empty timeline; callers must tolerate that (no metronome or bar lookups are
/// possible without at least one declared meter).
pub(crate) fn build_timeline(
    meter_track: &Track,
    tempo_track: &Track,
    ppqn: u16,
    last_note_off_pulse: u64,
) -> Timeline {
    let mut timeline = Timeline::default();
    let meter_events: Vec<(u64, u8, u8)> = meter_track
        .events()
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match e.event() {
            Event::Meta(MetaEvent::TimeSignature(t)) => {
                Some((meter_track.pulses()[i], t.numerator(), t.denominator()))
            }
            _ => None,
        })
        .collect();

    if meter_events.is_empty() {
        return timeline;
    }

    let mut bar_pulses: u64 = 0;
    let mut current_numerator = meter_events[0].1;
    let mut current_denominator = meter_events[0].2;

    let emit_bar = |bar_pulses: u64,
                         numerator: u8,
                         denominator: u8,
                         timeline: &mut Timeline| {
        let mut beats = Vec::with_capacity(numerator as usize);
        for j in 0..numerator as u64 {
            let start_pulses = 4 * ppqn as u64 * j / denominator as u64;
            let end_pulses = 4 * ppqn as u64 * (j + 1) / denominator as u64;
            beats.push(BeatWindow {
                start_micros: pulse_to_microseconds(tempo_track, bar_pulses + start_pulses, ppqn),
                end_micros: pulse_to_microseconds(tempo_track, bar_pulses + end_pulses, ppqn),
            });
        }
        timeline.bar_beats.push(beats);
        timeline.bar_pulses.push(bar_pulses);
        timeline
            .bar_micros
            .push(pulse_to_microseconds(tempo_track, bar_pulses, ppqn));
    };

    for i in 0..meter_events.len() {
        let next = meter_events.get(i + 1);
        if let Some(&(_, n, d)) = next {
            if n == current_numerator && d == current_denominator {
                continue;
            }
        }
        let pulses_per_bar = 4 * ppqn as u64 * current_numerator as u64 / current_denominator as u64;
        let segment_end = match next {
            Some(&(p, _, _)) => p,
            None => break,
        };
        while bar_pulses < segment_end {
            emit_bar(bar_pulses, current_numerator, current_denominator, &mut timeline);
            bar_pulses += pulses_per_bar;
        }
        if let Some(&(_, n, d)) = next {
            current_numerator = n;
            current_denominator = d;
        }
    }

    let pulses_per_bar = 4 * ppqn as u64 * current_numerator as u64 / current_denominator as u64;
    while bar_pulses <= last_note_off_pulse {
        emit_bar(bar_pulses, current_numerator, current_denominator, &mut timeline);
        bar_pulses += pulses_per_bar;
    }

    if timeline.bar_pulses.last() != Some(&bar_pulses) {
        emit_bar(bar_pulses, current_numerator, current_denominator, &mut timeline);
    }

    timeline
}

/// Fills in each track's cumulative-microsecond sequence from its cumulative-pulse sequence,
/// using the tempo track's pulse→microsecond oracle. Called once per track, including the
/// synthetic meter/tempo tracks themselves.
pub(crate) fn assign_microseconds(tracks: &mut [Track], tempo_track_index: usize, ppqn: u16) {
    let tempo_track = tracks[tempo_track_index].clone();
    for track in tracks.iter_mut() {
        let micros: Vec<u64> = track
            .pulses()
            .iter()
            .map(|&p| pulse_to_microseconds(&tempo_track, p, ppqn))
            .collect();
        track.set_microseconds(micros);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{MicrosecondsPerQuarter, TrackEvent};

    fn tempo_track(events: Vec<(u64, u32)>) -> Track {
        let mut pulses = Vec::new();
        let mut track_events = Vec::new();
        let mut prev = 0u64;
        for (pulse, tempo) in events {
            track_events.push(TrackEvent::new(
                (pulse - prev) as u32,
                Event::Meta(MetaEvent::SetTempo(MicrosecondsPerQuarter::new(tempo))),
            ));
            pulses.push(pulse);
            prev = pulse;
        }
        Track::from_parts(track_events, pulses)
    }

    #[test]
    fn default_tempo_before_any_event() {
        let tempo = tempo_track(vec![]);
        let micros = pulse_to_microseconds(&tempo, 480, 480);
        assert_eq!(micros, 500_000);
    }

    #[test]
    fn applies_tempo_change_mid_song() {
        let tempo = tempo_track(vec![(480, 250_000)]);
        // before the change: 480 pulses at 500_000 us/qtr, ppqn 480 => 500_000 us
        assert_eq!(pulse_to_microseconds(&tempo, 480, 480), 500_000);
        // 480 pulses past the change at 250_000 us/qtr => +250_000
        assert_eq!(pulse_to_microseconds(&tempo, 960, 480), 750_000);
    }
}

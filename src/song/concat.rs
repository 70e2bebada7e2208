use crate::file::Track;
use crate::song::Song;

const LINKED_TRACK_NAME: &str = "drum";

fn is_named(track: &Track, name: &str) -> bool {
    track.name().map(|t| t.as_str().as_ref() == name).unwrap_or(false)
}

/// Rebuilds `base`'s cumulative pulse/microsecond sequence as `base`'s own events (minus its
/// trailing end-of-track event) followed by all of `other`'s events, rebased onto `pulse_offset`
/// and `micros_offset`. Delta-times are recomputed from the rebased absolute pulses rather than
/// copied, since this engine represents a track as parallel absolute-pulse arrays rather than a
/// raw delta chain.
fn splice_track(base: &mut Track, other: &Track, pulse_offset: u64, micros_offset: u64) {
    if other.is_empty() {
        return;
    }

    let mut events = base.events().to_vec();
    let mut pulses = base.pulses().to_vec();
    let mut micros = base.microseconds().to_vec();

    events.pop();
    pulses.pop();
    if !micros.is_empty() {
        micros.pop();
    }

    let mut prev_pulse = pulses.last().copied().unwrap_or(0);
    for (i, event) in other.events().iter().enumerate() {
        let abs_pulse = pulse_offset + other.pulses()[i];
        let delta = (abs_pulse - prev_pulse) as u32;
        events.push(event.with_delta_time(delta));
        pulses.push(abs_pulse);
        prev_pulse = abs_pulse;
    }
    for &m in other.microseconds() {
        micros.push(micros_offset + m);
    }

    *base = Track::from_parts(events, pulses);
    if !micros.is_empty() {
        base.set_microseconds(micros);
    }
}

/// Splices each of `others`, in order, onto `base`'s track named `"drum"` and bar/beat timeline.
/// A song with no track by that name, or whose same-named track is empty, contributes nothing and
/// is silently skipped — matching the non-fatal `false` return of the routine this is grounded on.
/// Every other track is left untouched.
pub(crate) fn concat(base: &mut Song, others: Vec<Song>) {
    let Some(base_drum_id) = base.tracks.iter().position(|t| is_named(t, LINKED_TRACK_NAME)) else {
        return;
    };

    for other in others {
        let Some(other_drum_id) = other.tracks.iter().position(|t| is_named(t, LINKED_TRACK_NAME)) else {
            continue;
        };
        if other.tracks[other_drum_id].is_empty() {
            continue;
        }

        let pulse_offset = base.timeline.bar_pulses().last().copied().unwrap_or(0);
        let micros_offset = base.timeline.bar_micros().last().copied().unwrap_or(0);

        splice_track(
            &mut base.tracks[base_drum_id],
            &other.tracks[other_drum_id],
            pulse_offset,
            micros_offset,
        );

        base.timeline.splice(&other.timeline, pulse_offset, micros_offset);

        for mut note in other.notes.iter().copied() {
            note.start_pulse += pulse_offset;
            note.end_pulse += pulse_offset;
            note.track_id = base_drum_id;
            base.notes.push(note);
        }
        base.notes.sort();

        base.base_song_length_micros += other.base_song_length_micros;
        base.cursor.extend_song_end(other.timeline.song_end_micros() as i64);
    }
}

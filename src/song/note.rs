use crate::core::ChannelMessage;
use crate::file::Track;
use std::collections::HashMap;

/// A discovered (start, end) note pair, independent of tempo — both bounds are pulses, not
/// microseconds. The microsecond bounds are attached later, once the timeline is built, by
/// [`crate::song::Song`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Note {
    pub start_pulse: u64,
    pub end_pulse: u64,
    pub note_id: u8,
    pub channel: crate::core::Channel,
    pub velocity: u8,
    pub track_id: usize,
    pub bar_id: u32,
}

impl Ord for Note {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.start_pulse, self.end_pulse, self.note_id, self.track_id).cmp(&(
            other.start_pulse,
            other.end_pulse,
            other.note_id,
            other.track_id,
        ))
    }
}

impl PartialOrd for Note {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// What kind of sound source a track represents, discovered from its events rather than declared
/// anywhere in the file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instrument {
    Program(u8),
    Percussion,
    /// The track mixes percussion-channel notes with non-percussion-channel notes.
    Various,
}

struct OpenNote {
    start_pulse: u64,
    channel: crate::core::Channel,
    velocity: u8,
}

/// Walks a track's events once, pairing note-on/note-off into [`Note`] records. A note-on with
/// `velocity > 0` that arrives while the same note-id is already open closes the previous one at
/// the current pulse before opening the new one. A trailing open note-on with no matching close is
/// discarded — the MIDI files this engine loads are not required to balance their notes, and
/// refusing to load over it would be needlessly strict.
pub(crate) fn pair_notes(track: &Track, track_id: usize) -> Vec<Note> {
    let mut open: HashMap<u8, OpenNote> = HashMap::new();
    let mut notes = Vec::new();

    for (i, track_event) in track.events().iter().enumerate() {
        let msg = match track_event.event() {
            crate::file::Event::Midi(msg) => msg,
            _ => continue,
        };
        let (note_id, is_start, is_end) = match msg {
            ChannelMessage::NoteOn(m) => (m.note_number, m.velocity > 0, m.velocity == 0),
            ChannelMessage::NoteOff(m) => (m.note_number, false, true),
            _ => continue,
        };
        let pulse = track.pulses()[i];

        if is_end {
            if let Some(o) = open.remove(&note_id) {
                notes.push(Note {
                    start_pulse: o.start_pulse,
                    end_pulse: pulse,
                    note_id,
                    channel: o.channel,
                    velocity: o.velocity,
                    track_id,
                    bar_id: 0,
                });
            }
            continue;
        }

        if is_start {
            if let Some(o) = open.remove(&note_id) {
                notes.push(Note {
                    start_pulse: o.start_pulse,
                    end_pulse: pulse,
                    note_id,
                    channel: o.channel,
                    velocity: o.velocity,
                    track_id,
                    bar_id: 0,
                });
            }
            open.insert(
                note_id,
                OpenNote {
                    start_pulse: pulse,
                    channel: msg.channel(),
                    velocity: match msg {
                        ChannelMessage::NoteOn(m) => m.velocity,
                        _ => unreachable!(),
                    },
                },
            );
        }
    }

    if !open.is_empty() {
        log::warn!(
            "track {} has {} unresolved note-on events at end of track, discarding",
            track_id,
            open.len()
        );
    }

    notes.sort();
    notes
}

/// Per-track instrument discovery: a track whose note-on events are exclusively on channel 9 or
/// 15 is percussion; one with a mix of percussion and non-percussion channels is "various";
/// otherwise the program number of the first program-change event is adopted, defaulting to 0.
pub(crate) fn discover_instrument(track: &Track) -> Instrument {
    let mut any_percussion = false;
    let mut any_non_percussion = false;

    for track_event in track.events() {
        if let crate::file::Event::Midi(ChannelMessage::NoteOn(m)) = track_event.event() {
            if m.channel.is_percussion_channel() {
                any_percussion = true;
            } else {
                any_non_percussion = true;
            }
        }
    }

    if any_percussion && !any_non_percussion {
        return Instrument::Percussion;
    }
    if any_percussion && any_non_percussion {
        return Instrument::Various;
    }

    let mut found = None;
    for track_event in track.events() {
        if let crate::file::Event::Midi(ChannelMessage::ProgramChange(p)) = track_event.event() {
            match found {
                Some(existing) if existing != p.program => return Instrument::Various,
                _ => found = Some(p.program),
            }
        }
    }
    Instrument::Program(found.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Channel, ChannelMessage, NoteMessage};
    use crate::file::{Event, Track, TrackEvent};

    fn track_with(events: Vec<(u32, Event)>) -> Track {
        let mut pulses = Vec::new();
        let mut running = 0u64;
        let track_events: Vec<TrackEvent> = events
            .into_iter()
            .map(|(delta, event)| {
                running += delta as u64;
                pulses.push(running);
                TrackEvent::new(delta, event)
            })
            .collect();
        Track::from_parts(track_events, pulses)
    }

    #[test]
    fn pairs_a_simple_note() {
        let channel = Channel::new(0);
        let track = track_with(vec![
            (
                0,
                Event::Midi(ChannelMessage::NoteOn(NoteMessage {
                    channel,
                    note_number: 60,
                    velocity: 100,
                })),
            ),
            (
                10,
                Event::Midi(ChannelMessage::NoteOff(NoteMessage {
                    channel,
                    note_number: 60,
                    velocity: 0,
                })),
            ),
        ]);
        let notes = pair_notes(&track, 0);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].start_pulse, 0);
        assert_eq!(notes[0].end_pulse, 10);
    }
}
